//! Remote content store access.
//!
//! The store is opaque to this crate: reads are GROQ queries with a
//! parameter map, writes are batches of mutations committed atomically.
//! [`ContentStore`] is the seam; [`HttpContentStore`] speaks the store's
//! HTTP API and tests substitute in-memory or failing implementations.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | query | `GET {host}/v{version}/data/query/{dataset}?query=...&$param=<json>` |
//! | mutate | `POST {host}/v{version}/data/mutate/{dataset}?returnIds=true` |

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::StoreConfig;
use crate::query::GroqQuery;

/// A single document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(Value),
    CreateIfNotExists(Value),
    Patch {
        id: String,
        set: Map<String, Value>,
        unset: Vec<String>,
    },
    Delete {
        id: String,
    },
}

impl Mutation {
    /// `set` patch with no unsets.
    pub fn set(id: impl Into<String>, set: Map<String, Value>) -> Self {
        Mutation::Patch {
            id: id.into(),
            set,
            unset: Vec::new(),
        }
    }

    /// The store's mutation envelope, e.g. `{"create": {...}}`.
    pub fn to_json(&self) -> Value {
        match self {
            Mutation::Create(doc) => serde_json::json!({ "create": doc }),
            Mutation::CreateIfNotExists(doc) => serde_json::json!({ "createIfNotExists": doc }),
            Mutation::Patch { id, set, unset } => {
                let mut patch = Map::new();
                patch.insert("id".into(), Value::String(id.clone()));
                if !set.is_empty() {
                    patch.insert("set".into(), Value::Object(set.clone()));
                }
                if !unset.is_empty() {
                    patch.insert("unset".into(), serde_json::json!(unset));
                }
                serde_json::json!({ "patch": patch })
            }
            Mutation::Delete { id } => serde_json::json!({ "delete": { "id": id } }),
        }
    }

    /// Id of the document this mutation touches, when known up front.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Mutation::Create(doc) | Mutation::CreateIfNotExists(doc) => doc["_id"].as_str(),
            Mutation::Patch { id, .. } | Mutation::Delete { id } => Some(id.as_str()),
        }
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub transaction_id: String,
    #[serde(default)]
    pub results: Vec<MutationResultItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MutationResultItem {
    pub id: String,
    #[serde(default)]
    pub operation: Option<String>,
}

impl MutationOutcome {
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Read/write access to the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Runs a query and returns the `result` member of the response.
    async fn fetch(&self, query: &GroqQuery) -> Result<Value>;

    /// Commits all mutations as one transaction.
    async fn mutate(&self, mutations: Vec<Mutation>) -> Result<MutationOutcome>;

    async fn create(&self, document: Value) -> Result<MutationOutcome> {
        self.mutate(vec![Mutation::Create(document)]).await
    }

    async fn patch(&self, id: &str, set: Map<String, Value>) -> Result<MutationOutcome> {
        self.mutate(vec![Mutation::set(id, set)]).await
    }
}

/// Collects mutations and commits them in one request.
#[derive(Debug, Default)]
pub struct Transaction {
    mutations: Vec<Mutation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub async fn commit(self, store: &dyn ContentStore) -> Result<MutationOutcome> {
        if self.mutations.is_empty() {
            bail!("refusing to commit an empty transaction");
        }
        store.mutate(self.mutations).await
    }
}

impl FromIterator<Mutation> for Transaction {
    fn from_iter<I: IntoIterator<Item = Mutation>>(iter: I) -> Self {
        Self {
            mutations: iter.into_iter().collect(),
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

/// [`ContentStore`] over the store's HTTP API.
pub struct HttpContentStore {
    client: reqwest::Client,
    read_base: String,
    write_base: String,
    token: Option<String>,
}

impl HttpContentStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("showroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let token = config.token();
        let (read_host, write_host) = match config.api_host {
            Some(ref host) => {
                let host = host.trim_end_matches('/').to_string();
                (host.clone(), host)
            }
            None => {
                let api = format!("https://{}.api.sanity.io", config.project_id);
                // The CDN only serves public, unauthenticated reads.
                let read = if config.use_cdn && token.is_none() {
                    format!("https://{}.apicdn.sanity.io", config.project_id)
                } else {
                    api.clone()
                };
                (read, api)
            }
        };

        let version = config.api_version.trim_start_matches('v');
        Ok(Self {
            client,
            read_base: format!("{}/v{}/data/query/{}", read_host, version, config.dataset),
            write_base: format!("{}/v{}/data/mutate/{}", write_host, version, config.dataset),
            token,
        })
    }

    pub fn query_url(&self) -> &str {
        &self.read_base
    }

    pub fn mutate_url(&self) -> &str {
        &self.write_base
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Query-string pairs for a query: the GROQ text plus one `$name` per
/// parameter, JSON-encoded.
pub fn query_pairs(query: &GroqQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("query".to_string(), query.render())];
    for (name, value) in query.params() {
        pairs.push((format!("${}", name), value.to_string()));
    }
    pairs
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn fetch(&self, query: &GroqQuery) -> Result<Value> {
        let req = self
            .client
            .get(&self.read_base)
            .query(&query_pairs(query));
        let resp = self
            .authorize(req)
            .send()
            .await
            .with_context(|| format!("query request for '{}' failed", query.doc_type()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("content store query returned {}: {}", status, body);
        }

        let body: QueryResponse = resp
            .json()
            .await
            .context("content store returned an unreadable query response")?;
        Ok(body.result)
    }

    async fn mutate(&self, mutations: Vec<Mutation>) -> Result<MutationOutcome> {
        let payload = serde_json::json!({
            "mutations": mutations.iter().map(Mutation::to_json).collect::<Vec<_>>(),
        });

        let req = self
            .client
            .post(&self.write_base)
            .query(&[("returnIds", "true")])
            .json(&payload);
        let resp = self
            .authorize(req)
            .send()
            .await
            .context("mutation request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("content store mutation returned {}: {}", status, body);
        }

        resp.json()
            .await
            .context("content store returned an unreadable mutation response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_search_filter, PRODUCT_SEARCH};

    fn store_config() -> StoreConfig {
        StoreConfig {
            project_id: "abc123".into(),
            dataset: "production".into(),
            api_version: "2024-01-01".into(),
            use_cdn: true,
            token_env: None,
            timeout_secs: 5,
            api_host: None,
        }
    }

    #[test]
    fn test_cdn_host_for_public_reads() {
        let store = HttpContentStore::new(&store_config()).unwrap();
        assert_eq!(
            store.query_url(),
            "https://abc123.apicdn.sanity.io/v2024-01-01/data/query/production"
        );
        assert_eq!(
            store.mutate_url(),
            "https://abc123.api.sanity.io/v2024-01-01/data/mutate/production"
        );
    }

    #[test]
    fn test_api_host_override() {
        let mut cfg = store_config();
        cfg.api_host = Some("http://127.0.0.1:9999/".into());
        let store = HttpContentStore::new(&cfg).unwrap();
        assert_eq!(
            store.query_url(),
            "http://127.0.0.1:9999/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn test_query_pairs_encode_params_as_json() {
        let q = GroqQuery::new("product").filter(build_search_filter(
            Some("pump"),
            Some("a,b"),
            &PRODUCT_SEARCH,
        ));
        let pairs = query_pairs(&q);
        assert_eq!(pairs[0].0, "query");
        assert!(pairs.contains(&("$search".to_string(), "\"pump*\"".to_string())));
        assert!(pairs.contains(&("$category0".to_string(), "\"a\"".to_string())));
        assert!(pairs.contains(&("$category1".to_string(), "\"b\"".to_string())));
    }

    #[test]
    fn test_mutation_envelopes() {
        let create = Mutation::Create(serde_json::json!({ "_id": "x", "_type": "t" }));
        assert_eq!(create.to_json()["create"]["_id"], "x");
        assert_eq!(create.document_id(), Some("x"));

        let mut set = Map::new();
        set.insert("order".into(), serde_json::json!(3));
        let patch = Mutation::set("doc-1", set);
        assert_eq!(
            patch.to_json(),
            serde_json::json!({ "patch": { "id": "doc-1", "set": { "order": 3 } } })
        );

        let delete = Mutation::Delete { id: "gone".into() };
        assert_eq!(delete.to_json(), serde_json::json!({ "delete": { "id": "gone" } }));
    }
}
