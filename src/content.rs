//! Typed, fail-soft reads of site content.
//!
//! Every public read on [`SiteContent`] returns a value, never an error. A
//! failed fetch or an undecodable response is logged at `warn` and replaced
//! by an empty list or `None`, so a page always renders (possibly empty)
//! instead of failing. A listing drops only the documents that fail to
//! decode. Drafts are never returned.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{
    Achievement, Certification, Client, Event, Installation, Post, PostCategory, Product,
    ProductCollection, TeamMember,
};
use crate::query::{
    build_search_filter, Filter, GroqQuery, SortKey, POST_SEARCH, PRODUCT_SEARCH, PUBLISHED_ONLY,
};
use crate::store::{ContentStore, HttpContentStore};

pub const PRODUCT_PROJECTION: &str = r#"
_id, title, "slug": slug.current, description, features, images, order,
"collection": collection->{ _id, title, "slug": slug.current }
"#;

pub const COLLECTION_PROJECTION: &str =
    r#"_id, title, "slug": slug.current, description, image, featured, order"#;

pub const TEAM_PROJECTION: &str = r#"_id, name, role, bio, image, isDirector, order"#;

pub const EVENT_PROJECTION: &str =
    r#"_id, title, "slug": slug.current, date, location, description, image, order"#;

pub const ACHIEVEMENT_PROJECTION: &str = r#"_id, title, description, year, image, order"#;

pub const CERTIFICATION_PROJECTION: &str = r#"_id, title, issuer, image, order"#;

pub const INSTALLATION_PROJECTION: &str = r#"
_id, title, "slug": slug.current, location, description, images,
"client": client->name, completedAt, order
"#;

pub const CLIENT_PROJECTION: &str = r#"_id, name, logo, website, order"#;

pub const POST_LIST_PROJECTION: &str = r#"
_id, title, "slug": slug.current, excerpt, publishedAt, mainImage,
"categories": categories[]->title, "author": author->name
"#;

pub const POST_DETAIL_PROJECTION: &str = r#"
_id, title, "slug": slug.current, excerpt, publishedAt, mainImage,
"categories": categories[]->title, "author": author->name, body
"#;

pub const CATEGORY_PROJECTION: &str = r#"_id, title, "slug": slug.current"#;

/// Display order used by every "ordered" document type.
pub const DISPLAY_ORDER: &[SortKey] = &[SortKey::asc("order"), SortKey::desc("_createdAt")];

const POST_ORDER: &[SortKey] = &[SortKey::desc("publishedAt"), SortKey::desc("_createdAt")];

/// Everything the home page shows, fetched concurrently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HomeContent {
    pub featured_collections: Vec<ProductCollection>,
    pub latest_posts: Vec<Post>,
    pub clients: Vec<Client>,
    pub upcoming_events: Vec<Event>,
}

/// Fail-soft content reads over a [`ContentStore`].
#[derive(Clone)]
pub struct SiteContent {
    store: Arc<dyn ContentStore>,
}

impl SiteContent {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Items that fail to decode are logged and skipped; the rest are kept.
    async fn list<T: DeserializeOwned>(&self, action: &str, query: GroqQuery) -> Vec<T> {
        let items = match self.try_fetch::<Option<Vec<Value>>>(&query).await {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(action, error = %e, "content fetch failed, using empty list");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| {
                let id = item["_id"].as_str().unwrap_or("?").to_string();
                match serde_json::from_value(item) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        tracing::warn!(action, id = %id, error = %e, "skipping undecodable document");
                        None
                    }
                }
            })
            .collect()
    }

    async fn one<T: DeserializeOwned>(&self, action: &str, query: GroqQuery) -> Option<T> {
        match self.try_fetch::<Option<T>>(&query).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(action, error = %e, "content fetch failed, using none");
                None
            }
        }
    }

    async fn try_fetch<T: DeserializeOwned>(&self, query: &GroqQuery) -> Result<T> {
        let value = self.store.fetch(query).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn products(&self, search: Option<&str>, category: Option<&str>) -> Vec<Product> {
        self.list("products", product_listing(search, category))
            .await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Option<Product> {
        self.one("product_by_slug", by_slug("product", slug, PRODUCT_PROJECTION))
            .await
    }

    pub async fn collections(&self) -> Vec<ProductCollection> {
        let query = published("productCollection")
            .order(DISPLAY_ORDER)
            .projection(COLLECTION_PROJECTION);
        self.list("collections", query).await
    }

    pub async fn featured_collections(&self) -> Vec<ProductCollection> {
        let query = published("productCollection")
            .filter(Filter::new().condition("featured == true"))
            .order(DISPLAY_ORDER)
            .projection(COLLECTION_PROJECTION);
        self.list("featured_collections", query).await
    }

    pub async fn team_members(&self) -> Vec<TeamMember> {
        let query = published("teamMember")
            .order(DISPLAY_ORDER)
            .projection(TEAM_PROJECTION);
        self.list("team_members", query).await
    }

    pub async fn directors(&self) -> Vec<TeamMember> {
        let query = published("teamMember")
            .filter(Filter::new().condition("isDirector == true"))
            .order(DISPLAY_ORDER)
            .projection(TEAM_PROJECTION);
        self.list("directors", query).await
    }

    pub async fn events(&self) -> Vec<Event> {
        let query = published("event")
            .order(&[SortKey::asc("order"), SortKey::desc("date")])
            .projection(EVENT_PROJECTION);
        self.list("events", query).await
    }

    /// Events dated today or later, soonest first.
    pub async fn upcoming_events(&self, limit: usize) -> Vec<Event> {
        self.list("upcoming_events", upcoming_events_query(Utc::now().date_naive(), limit))
            .await
    }

    pub async fn event_by_slug(&self, slug: &str) -> Option<Event> {
        self.one("event_by_slug", by_slug("event", slug, EVENT_PROJECTION))
            .await
    }

    pub async fn achievements(&self) -> Vec<Achievement> {
        let query = published("achievement")
            .order(DISPLAY_ORDER)
            .projection(ACHIEVEMENT_PROJECTION);
        self.list("achievements", query).await
    }

    pub async fn certifications(&self) -> Vec<Certification> {
        let query = published("certification")
            .order(DISPLAY_ORDER)
            .projection(CERTIFICATION_PROJECTION);
        self.list("certifications", query).await
    }

    pub async fn installations(&self) -> Vec<Installation> {
        let query = published("installation")
            .order(DISPLAY_ORDER)
            .projection(INSTALLATION_PROJECTION);
        self.list("installations", query).await
    }

    pub async fn clients(&self) -> Vec<Client> {
        let query = published("client")
            .order(DISPLAY_ORDER)
            .projection(CLIENT_PROJECTION);
        self.list("clients", query).await
    }

    pub async fn posts(&self, search: Option<&str>, category: Option<&str>) -> Vec<Post> {
        self.list("posts", post_listing(search, category)).await
    }

    pub async fn latest_posts(&self, limit: usize) -> Vec<Post> {
        let query = published("post")
            .order(POST_ORDER)
            .range(0, limit)
            .projection(POST_LIST_PROJECTION);
        self.list("latest_posts", query).await
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.one("post_by_slug", by_slug("post", slug, POST_DETAIL_PROJECTION))
            .await
    }

    pub async fn post_categories(&self) -> Vec<PostCategory> {
        let query = published("category")
            .order(&[SortKey::asc("title")])
            .projection(CATEGORY_PROJECTION);
        self.list("post_categories", query).await
    }

    pub async fn home(&self) -> HomeContent {
        let (featured_collections, latest_posts, clients, upcoming_events) = tokio::join!(
            self.featured_collections(),
            self.latest_posts(3),
            self.clients(),
            self.upcoming_events(3),
        );
        HomeContent {
            featured_collections,
            latest_posts,
            clients,
            upcoming_events,
        }
    }
}

/// Base query for public reads: published documents of `doc_type` only.
fn published(doc_type: &str) -> GroqQuery {
    GroqQuery::new(doc_type).filter(Filter::new().condition(PUBLISHED_ONLY))
}

/// Events on or after `today` (`YYYY-MM-DD` dates compare lexically).
pub fn upcoming_events_query(today: NaiveDate, limit: usize) -> GroqQuery {
    published("event")
        .filter(
            Filter::new()
                .condition("defined(date)")
                .condition("date >= $today")
                .param("today", today.format("%Y-%m-%d").to_string()),
        )
        .order(&[SortKey::asc("date"), SortKey::asc("order")])
        .range(0, limit)
        .projection(EVENT_PROJECTION)
}

fn by_slug(doc_type: &str, slug: &str, projection: &str) -> GroqQuery {
    published(doc_type)
        .filter(Filter::new().eq("slug.current", "slug", slug))
        .first()
        .projection(projection)
}

/// Whether `slug` is free for a document of `doc_type`, ignoring the
/// document `exclude_id` (and its draft). Unlike the reads above this
/// propagates store errors: authoring tools must not guess.
pub async fn ensure_unique_slug(
    store: &dyn ContentStore,
    doc_type: &str,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let id = exclude_id.unwrap_or("").trim_start_matches("drafts.");
    let query = GroqQuery::new(doc_type)
        .filter(
            Filter::new()
                .eq("slug.current", "slug", slug)
                .condition("!(_id in [$id, $draft])")
                .param("id", id)
                .param("draft", format!("drafts.{}", id)),
        )
        .projection("_id");

    let taken = store.fetch(&query).await?;
    Ok(match taken {
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        _ => false,
    })
}

pub fn product_listing(search: Option<&str>, category: Option<&str>) -> GroqQuery {
    published("product")
        .filter(build_search_filter(search, category, &PRODUCT_SEARCH))
        .order(DISPLAY_ORDER)
        .projection(PRODUCT_PROJECTION)
}

pub fn post_listing(search: Option<&str>, category: Option<&str>) -> GroqQuery {
    published("post")
        .filter(build_search_filter(search, category, &POST_SEARCH))
        .order(POST_ORDER)
        .projection(POST_LIST_PROJECTION)
}

/// CLI entry point: prints the listing query for a searchable type.
pub fn run_groq(doc_type: &str, search: Option<&str>, category: Option<&str>) -> Result<()> {
    let query = match doc_type {
        "product" => product_listing(search, category),
        "post" => post_listing(search, category),
        other => anyhow::bail!(
            "no listing query for type '{}' (expected product or post)",
            other
        ),
    };
    println!("{}", query.render());
    if !query.params().is_empty() {
        println!();
        println!("{}", serde_json::to_string_pretty(query.params())?);
    }
    Ok(())
}

/// CLI entry point: fetches products and prints them.
pub async fn run_products(
    config: &Config,
    search: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    let store = Arc::new(HttpContentStore::new(&config.store)?);
    let site = SiteContent::new(store);
    let products = site.products(search, category).await;

    if products.is_empty() {
        println!("No products.");
        return Ok(());
    }

    for (i, p) in products.iter().enumerate() {
        let collection = p
            .collection
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or("(no collection)");
        println!("{}. {} / {}", i + 1, collection, p.title);
        println!("    slug: {}", p.slug);
        if let Some(order) = p.order {
            println!("    order: {}", order);
        }
        println!("    images: {}", p.images.len());
        println!("    id: {}", p.id);
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Mutation, MutationOutcome};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned value and records every rendered query.
    struct CannedStore {
        result: Value,
        seen: Mutex<Vec<String>>,
    }

    impl CannedStore {
        fn new(result: Value) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentStore for CannedStore {
        async fn fetch(&self, query: &GroqQuery) -> Result<Value> {
            self.seen.lock().unwrap().push(query.render());
            Ok(self.result.clone())
        }

        async fn mutate(&self, _mutations: Vec<Mutation>) -> Result<MutationOutcome> {
            anyhow::bail!("read-only")
        }
    }

    struct DownStore;

    #[async_trait]
    impl ContentStore for DownStore {
        async fn fetch(&self, _query: &GroqQuery) -> Result<Value> {
            anyhow::bail!("connection refused")
        }

        async fn mutate(&self, _mutations: Vec<Mutation>) -> Result<MutationOutcome> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_failing_store_yields_empty_values() {
        let site = SiteContent::new(Arc::new(DownStore));
        assert!(site.products(Some("pump"), Some("a,b")).await.is_empty());
        assert!(site.product_by_slug("x").await.is_none());
        assert!(site.team_members().await.is_empty());
        assert!(site.posts(None, None).await.is_empty());
        assert!(site.post_by_slug("x").await.is_none());
        let home = site.home().await;
        assert!(home.featured_collections.is_empty());
        assert!(home.latest_posts.is_empty());
    }

    #[tokio::test]
    async fn test_null_result_is_empty() {
        let site = SiteContent::new(Arc::new(CannedStore::new(Value::Null)));
        assert!(site.clients().await.is_empty());
        assert!(site.event_by_slug("none").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_result_is_empty() {
        let site = SiteContent::new(Arc::new(CannedStore::new(json!([{ "unexpected": 1 }]))));
        assert!(site.products(None, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_products_decode_and_query_shape() {
        let store = Arc::new(CannedStore::new(json!([
            { "_id": "p1", "title": "Pump", "slug": "pump", "images": [] }
        ])));
        let site = SiteContent::new(store.clone());
        let products = site.products(Some("pu"), Some("water")).await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].slug, "pump");

        let seen = store.seen.lock().unwrap();
        assert!(seen[0].starts_with(
            "*[_type == \"product\" && !(_id in path(\"drafts.**\")) && (title match $search"
        ));
        assert!(seen[0].contains("collection->slug.current == $category"));
        assert!(seen[0].contains("order(order asc, _createdAt desc)"));
    }

    #[tokio::test]
    async fn test_ensure_unique_slug() {
        let free = CannedStore::new(json!([]));
        assert!(ensure_unique_slug(&free, "product", "pump", Some("drafts.p1"))
            .await
            .unwrap());

        let taken = CannedStore::new(json!([{ "_id": "p2" }]));
        assert!(!ensure_unique_slug(&taken, "product", "pump", None)
            .await
            .unwrap());

        assert!(ensure_unique_slug(&DownStore, "product", "pump", None)
            .await
            .is_err());
    }

    #[test]
    fn test_post_listing_matches_category_array() {
        let query = post_listing(None, Some("news, guides"));
        let rendered = query.render();
        assert!(rendered.contains("count((categories[]->slug.current)[@ in [$category0, $category1]]) > 0"));
        assert!(rendered.contains("order(publishedAt desc, _createdAt desc)"));
        assert_eq!(query.params()["category1"], json!("guides"));
    }

    #[test]
    fn test_run_groq_rejects_unknown_type() {
        assert!(run_groq("teamMember", None, None).is_err());
        assert!(run_groq("product", Some("pump"), None).is_ok());
    }

    #[tokio::test]
    async fn test_bad_document_does_not_blank_listing() {
        let store = Arc::new(CannedStore::new(json!([
            { "_id": "p1", "title": "Pump", "slug": "pump" },
            { "_id": "p2", "title": "Valve", "slug": "valve", "order": 2 },
            { "_id": "p3", "title": "Broken", "slug": null },
            { "_id": "p4", "title": "Negative", "slug": "neg", "order": -1 }
        ])));
        let site = SiteContent::new(store);
        let products = site.products(None, None).await;
        let slugs: Vec<&str> = products.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["pump", "valve"]);
    }

    #[tokio::test]
    async fn test_public_reads_exclude_drafts() {
        let store = Arc::new(CannedStore::new(Value::Null));
        let site = SiteContent::new(store.clone());
        site.products(Some("pump"), None).await;
        site.product_by_slug("pump").await;
        site.post_by_slug("hello").await;
        site.event_by_slug("expo").await;
        site.team_members().await;
        site.home().await;

        let seen = store.seen.lock().unwrap();
        assert_eq!(seen.len(), 9);
        for query in seen.iter() {
            assert!(query.contains(PUBLISHED_ONLY), "draft guard missing: {}", query);
        }
    }

    #[test]
    fn test_upcoming_events_query() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let query = upcoming_events_query(today, 3);
        let rendered = query.render();
        assert!(rendered.contains("defined(date) && date >= $today"));
        assert!(rendered.contains("order(date asc, order asc) [0...3]"));
        assert_eq!(query.params()["today"], json!("2026-10-19"));
    }

    #[tokio::test]
    async fn test_home_uses_upcoming_events() {
        let store = Arc::new(CannedStore::new(json!([])));
        let site = SiteContent::new(store.clone());
        site.home().await;
        let seen = store.seen.lock().unwrap();
        let events: Vec<&String> = seen
            .iter()
            .filter(|q| q.starts_with("*[_type == \"event\""))
            .collect();
        assert_eq!(events.len(), 1);
        assert!(events[0].contains("date >= $today"));
    }
}
