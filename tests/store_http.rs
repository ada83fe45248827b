//! Integration tests for the HTTP content store client.
//!
//! A small axum app stands in for the hosted store's query and mutate
//! endpoints. `HttpContentStore` is pointed at it through `store.api_host`,
//! so these tests exercise real requests, query-string encoding and response
//! decoding end to end.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use showroom::config::StoreConfig;
use showroom::content::SiteContent;
use showroom::migrate::{run_migration, Migration};
use showroom::store::{ContentStore, HttpContentStore, Mutation};

// ─── Fake store ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeStore {
    /// `(needle, result)`: the first needle contained in the GROQ text wins.
    responses: Arc<Vec<(&'static str, Value)>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    mutations: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn handle_query(
    State(fake): State<FakeStore>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let groq = params.get("query").cloned().unwrap_or_default();
    fake.auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    fake.queries.lock().unwrap().push(params);

    let result = fake
        .responses
        .iter()
        .find(|(needle, _)| groq.contains(needle))
        .map(|(_, result)| result.clone())
        .unwrap_or_else(|| json!([]));
    Json(json!({ "ms": 1, "query": groq, "result": result }))
}

async fn handle_mutate(State(fake): State<FakeStore>, Json(body): Json<Value>) -> Json<Value> {
    let results: Vec<Value> = body["mutations"]
        .as_array()
        .map(|ms| {
            ms.iter()
                .map(|m| {
                    let id = m["patch"]["id"]
                        .as_str()
                        .or_else(|| m["create"]["_id"].as_str())
                        .unwrap_or("generated");
                    json!({ "id": id, "operation": "update" })
                })
                .collect()
        })
        .unwrap_or_default();
    fake.mutations.lock().unwrap().push(body);
    Json(json!({ "transactionId": "tx-1", "results": results }))
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Starts the fake store and returns its base URL.
async fn spawn_fake(fake: FakeStore) -> String {
    let app = Router::new()
        .route("/v2024-01-01/data/query/production", get(handle_query))
        .route("/v2024-01-01/data/mutate/production", post(handle_mutate))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

fn store_config(api_host: &str) -> StoreConfig {
    let toml = format!(
        r#"
project_id = "abc123"
dataset = "production"
api_host = "{}"
timeout_secs = 2
"#,
        api_host
    );
    toml::from_str(&toml).unwrap()
}

fn fake_with(responses: Vec<(&'static str, Value)>) -> FakeStore {
    FakeStore {
        responses: Arc::new(responses),
        ..FakeStore::default()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_products_query_round_trip() {
    let fake = fake_with(vec![(
        "_type == \"product\"",
        json!([{
            "_id": "p1",
            "title": "Solar Pump",
            "slug": "solar-pump",
            "features": null,
            "images": [{ "asset": { "_ref": "image-abc-800x600-jpg" } }],
            "collection": { "_id": "c1", "title": "Pumps", "slug": "pumps" }
        }]),
    )]);
    let host = spawn_fake(fake.clone()).await;
    let store = Arc::new(HttpContentStore::new(&store_config(&host)).unwrap());
    let site = SiteContent::new(store);

    let products = site.products(Some(" pump "), Some("pumps,solar")).await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Solar Pump");
    assert!(products[0].features.is_empty());
    assert_eq!(products[0].collection.as_ref().unwrap().title, "Pumps");

    let queries = fake.queries.lock().unwrap();
    let sent = &queries[0];
    assert!(sent["query"].contains("title match $search"));
    assert!(sent["query"].contains("collection->slug.current in [$category0, $category1]"));
    // Parameters are JSON-encoded.
    assert_eq!(sent["$search"], "\"pump*\"");
    assert_eq!(sent["$category0"], "\"pumps\"");
    assert_eq!(sent["$category1"], "\"solar\"");
}

#[tokio::test]
async fn test_single_document_null_is_none() {
    let fake = fake_with(vec![("slug.current == $slug", Value::Null)]);
    let host = spawn_fake(fake.clone()).await;
    let site = SiteContent::new(Arc::new(HttpContentStore::new(&store_config(&host)).unwrap()));

    assert!(site.product_by_slug("missing").await.is_none());
    let queries = fake.queries.lock().unwrap();
    assert_eq!(queries[0]["$slug"], "\"missing\"");
    assert!(queries[0]["query"].contains("[0]"));
}

#[tokio::test]
async fn test_error_status_is_reported_by_store_and_swallowed_by_content() {
    let host = spawn_fake(FakeStore::default()).await;
    let mut config = store_config(&host);
    config.dataset = "staging".to_string();
    let store = Arc::new(HttpContentStore::new(&config).unwrap());

    let query = showroom::content::product_listing(None, None);
    let err = store.fetch(&query).await.unwrap_err();
    assert!(err.to_string().contains("404"), "unexpected error: {}", err);

    let site = SiteContent::new(store);
    assert!(site.products(None, None).await.is_empty());
    assert!(site.post_by_slug("hello").await.is_none());
}

#[tokio::test]
async fn test_unreachable_store_renders_empty_home() {
    let port = find_free_port();
    let config = store_config(&format!("http://127.0.0.1:{}", port));
    let site = SiteContent::new(Arc::new(HttpContentStore::new(&config).unwrap()));

    let home = site.home().await;
    assert!(home.featured_collections.is_empty());
    assert!(home.latest_posts.is_empty());
    assert!(home.upcoming_events.is_empty());
    assert!(home.clients.is_empty());
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let var = "SHOWROOM_TEST_STORE_TOKEN";
    std::env::set_var(var, "sk-test");
    let fake = FakeStore::default();
    let host = spawn_fake(fake.clone()).await;
    let mut config = store_config(&host);
    config.token_env = Some(var.to_string());
    let store = HttpContentStore::new(&config).unwrap();

    store
        .fetch(&showroom::content::post_listing(None, None))
        .await
        .unwrap();
    let auth = fake.auth.lock().unwrap();
    assert_eq!(auth[0].as_deref(), Some("Bearer sk-test"));
}

#[tokio::test]
async fn test_create_posts_mutation_body() {
    let fake = FakeStore::default();
    let host = spawn_fake(fake.clone()).await;
    let store = HttpContentStore::new(&store_config(&host)).unwrap();

    let outcome = store
        .mutate(vec![
            Mutation::Create(json!({ "_id": "contactSubmission.1", "_type": "contactSubmission" })),
            Mutation::Delete { id: "old".into() },
        ])
        .await
        .unwrap();
    assert_eq!(outcome.transaction_id, "tx-1");

    let bodies = fake.mutations.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0]["mutations"],
        json!([
            { "create": { "_id": "contactSubmission.1", "_type": "contactSubmission" } },
            { "delete": { "id": "old" } }
        ])
    );
}

#[tokio::test]
async fn test_backfill_migration_commits_one_transaction() {
    let fake = fake_with(vec![(
        "_type == \"product\"",
        json!([
            { "_id": "a", "_createdAt": "2024-01-01T00:00:00Z", "order": 2 },
            { "_id": "b", "_createdAt": "2024-01-02T00:00:00Z" },
            { "_id": "c", "_createdAt": "2024-01-03T00:00:00Z" }
        ]),
    )]);
    let host = spawn_fake(fake.clone()).await;
    let store = HttpContentStore::new(&store_config(&host)).unwrap();
    let migration = Migration::BackfillOrder {
        doc_type: "product".into(),
    };

    let report = run_migration(&store, &migration, false).await.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.planned, 2);
    assert_eq!(report.transaction_id.as_deref(), Some("tx-1"));

    let bodies = fake.mutations.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0]["mutations"],
        json!([
            { "patch": { "id": "b", "set": { "order": 3 } } },
            { "patch": { "id": "c", "set": { "order": 4 } } }
        ])
    );
}

#[tokio::test]
async fn test_dry_run_migration_writes_nothing() {
    let fake = fake_with(vec![(
        "contactSubmission",
        json!([{ "_id": "s1" }, { "_id": "s2", "status": null }]),
    )]);
    let host = spawn_fake(fake.clone()).await;
    let store = HttpContentStore::new(&store_config(&host)).unwrap();

    let report = run_migration(&store, &Migration::DefaultContactStatus, true)
        .await
        .unwrap();
    assert_eq!(report.planned, 2);
    assert!(report.dry_run);
    assert!(report.transaction_id.is_none());
    assert!(fake.mutations.lock().unwrap().is_empty());
}
