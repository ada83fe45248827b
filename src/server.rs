//! Public website HTTP server.
//!
//! Every page is a read-only rendering of store content. Reads are
//! fail-soft (see [`crate::content`]), so a store outage produces pages with
//! empty states rather than 5xx responses. The only write is the contact
//! endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Home page |
//! | `GET`  | `/products` | Product grid (`?search=&category=a,b`) |
//! | `GET`  | `/products/{slug}` | Product detail |
//! | `GET`  | `/projects` | Installations |
//! | `GET`  | `/blog` | Posts (`?search=&category=`) |
//! | `GET`  | `/blog/{slug}` | Post detail |
//! | `GET`  | `/events` | Events and achievements |
//! | `GET`  | `/events/{slug}` | Event detail |
//! | `GET`  | `/team` | Directors, team and certifications |
//! | `GET`  | `/contact` | Contact form |
//! | `GET`  | `/api/products` | Product list as JSON |
//! | `POST` | `/api/contact` | Submit the contact form (JSON or form-encoded) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Request-level errors use the same JSON shape everywhere:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::contact::{submit_contact, ContactForm, FailureKind};
use crate::content::SiteContent;
use crate::image::ImageResolver;
use crate::models::Product;
use crate::notify::{create_mailer, Mailer};
use crate::render::{self, EmptyState, SeoMeta};
use crate::store::{ContentStore, HttpContentStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    content: SiteContent,
    images: Arc<ImageResolver>,
    mailer: Arc<dyn Mailer>,
}

/// Starts the server against the configured HTTP content store and mailer.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(HttpContentStore::new(&config.store)?);
    let mailer = create_mailer(config)?;
    run_server_with_store(config, store, mailer).await
}

/// Starts the server with an explicit store and mailer.
///
/// Used by [`run_server`] and by tests that substitute in-memory backends.
pub async fn run_server_with_store(
    config: &Config,
    store: Arc<dyn ContentStore>,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config, store, mailer);

    tracing::info!("site listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router.
pub fn router(config: &Config, store: Arc<dyn ContentStore>, mailer: Arc<dyn Mailer>) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        content: SiteContent::new(store),
        images: Arc::new(ImageResolver::new(&config.store, &config.images)),
        mailer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_home))
        .route("/products", get(handle_products))
        .route("/products/{slug}", get(handle_product))
        .route("/projects", get(handle_projects))
        .route("/blog", get(handle_blog))
        .route("/blog/{slug}", get(handle_post))
        .route("/events", get(handle_events))
        .route("/events/{slug}", get(handle_event))
        .route("/team", get(handle_team))
        .route("/contact", get(handle_contact_page))
        .route("/api/products", get(handle_api_products))
        .route("/api/contact", post(handle_contact_submit))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ Page helpers ============

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    search: Option<String>,
    category: Option<String>,
}

impl ListParams {
    fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl AppState {
    fn page(&self, path: &str, meta: SeoMeta, body: &str) -> Html<String> {
        let meta = meta.canonical(self.config.base_url.as_deref(), path);
        Html(render::page(&self.config.site_name, &meta, body))
    }

    fn not_found(&self, what: &str) -> Response {
        let body = format!(
            r#"<section class="not-found"><h1>{} not found</h1><p><a href="/">Back to home</a></p></section>"#,
            render::escape(what)
        );
        let html = render::page(&self.config.site_name, &SeoMeta::new("Not found"), &body);
        (StatusCode::NOT_FOUND, Html(html)).into_response()
    }

    fn og_image(&self, image: Option<&crate::models::ImageRef>) -> Option<String> {
        self.images.resolve(image, 1200, 630).url().map(str::to_string)
    }
}

fn section(title: &str, inner: &str) -> String {
    format!(
        r#"<section><h2>{}</h2>{}</section>"#,
        render::escape(title),
        inner
    )
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Pages ============

async fn handle_home(State(state): State<AppState>) -> Html<String> {
    let home = state.content.home().await;
    let images = &state.images;

    let mut body = format!(
        r#"<section class="hero"><h1>{}</h1></section>"#,
        render::escape(&state.config.site_name)
    );
    body.push_str(&section(
        "Our collections",
        &render::grid(
            &home.featured_collections,
            images,
            &EmptyState::new("Collections coming soon", "Browse all products in the meantime."),
        ),
    ));
    body.push_str(&section(
        "Latest news",
        &render::grid(&home.latest_posts, images, &EmptyState::posts()),
    ));
    if !home.upcoming_events.is_empty() {
        body.push_str(&section(
            "Upcoming events",
            &render::grid(&home.upcoming_events, images, &EmptyState::events()),
        ));
    }
    if !home.clients.is_empty() {
        body.push_str(&section(
            "Trusted by",
            &render::grid(&home.clients, images, &EmptyState::new("", "")),
        ));
    }

    let og = state.og_image(home.featured_collections.first().and_then(|c| c.image.as_ref()));
    state.page("/", SeoMeta::new("").image(og), &body)
}

async fn handle_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Html<String> {
    let (products, collections) = tokio::join!(
        state.content.products(params.search(), params.category()),
        state.content.collections(),
    );

    let body = format!(
        "<h1>Products</h1>{}{}{}",
        render::search_form("/products", params.search(), params.category()),
        render::category_filter(
            "/products",
            &render::collection_links(&collections),
            params.category()
        ),
        render::grid(&products, &state.images, &EmptyState::products())
    );
    let meta = SeoMeta::new("Products").description(Some("Browse our full product range."));
    state.page("/products", meta, &body)
}

async fn handle_product(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(product) = state.content.product_by_slug(&slug).await else {
        return state.not_found("Product");
    };
    let meta = SeoMeta::new(product.title.clone())
        .description(product.description.as_deref())
        .image(state.og_image(product.cover()));
    let body = render::product_detail(&product, &state.images);
    state
        .page(&format!("/products/{}", slug), meta, &body)
        .into_response()
}

async fn handle_projects(State(state): State<AppState>) -> Html<String> {
    let installations = state.content.installations().await;
    let body = format!(
        "<h1>Projects</h1>{}",
        render::grid(&installations, &state.images, &EmptyState::projects())
    );
    let meta = SeoMeta::new("Projects").description(Some("A selection of our completed installations."));
    state.page("/projects", meta, &body)
}

async fn handle_blog(State(state): State<AppState>, Query(params): Query<ListParams>) -> Html<String> {
    let (posts, categories) = tokio::join!(
        state.content.posts(params.search(), params.category()),
        state.content.post_categories(),
    );
    let body = format!(
        "<h1>Blog</h1>{}{}{}",
        render::search_form("/blog", params.search(), params.category()),
        render::category_filter("/blog", &render::category_links(&categories), params.category()),
        render::grid(&posts, &state.images, &EmptyState::posts())
    );
    let meta = SeoMeta::new("Blog").description(Some("News, guides and updates."));
    state.page("/blog", meta, &body)
}

async fn handle_post(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(post) = state.content.post_by_slug(&slug).await else {
        return state.not_found("Article");
    };
    let meta = SeoMeta::new(post.title.clone())
        .description(post.excerpt.as_deref())
        .image(state.og_image(post.main_image.as_ref()));
    let body = render::post_detail(&post, &state.images);
    state.page(&format!("/blog/{}", slug), meta, &body).into_response()
}

async fn handle_events(State(state): State<AppState>) -> Html<String> {
    let (events, achievements) =
        tokio::join!(state.content.events(), state.content.achievements());
    let mut body = format!(
        "<h1>Events</h1>{}",
        render::grid(&events, &state.images, &EmptyState::events())
    );
    if !achievements.is_empty() {
        body.push_str(&section(
            "Achievements",
            &render::grid(&achievements, &state.images, &EmptyState::new("", "")),
        ));
    }
    state.page("/events", SeoMeta::new("Events"), &body)
}

async fn handle_event(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(event) = state.content.event_by_slug(&slug).await else {
        return state.not_found("Event");
    };
    let meta = SeoMeta::new(event.title.clone())
        .description(event.description.as_deref())
        .image(state.og_image(event.image.as_ref()));
    let body = render::event_detail(&event, &state.images);
    state.page(&format!("/events/{}", slug), meta, &body).into_response()
}

async fn handle_team(State(state): State<AppState>) -> Html<String> {
    let (directors, members, certifications) = tokio::join!(
        state.content.directors(),
        state.content.team_members(),
        state.content.certifications(),
    );
    let staff: Vec<_> = members.into_iter().filter(|m| !m.is_director).collect();

    let mut body = String::from("<h1>Our team</h1>");
    if !directors.is_empty() {
        body.push_str(&section(
            "Directors",
            &render::grid(&directors, &state.images, &EmptyState::team()),
        ));
    }
    body.push_str(&section(
        "Team",
        &render::grid(&staff, &state.images, &EmptyState::team()),
    ));
    if !certifications.is_empty() {
        body.push_str(&section(
            "Certifications",
            &render::grid(&certifications, &state.images, &EmptyState::new("", "")),
        ));
    }
    state.page("/team", SeoMeta::new("Team"), &body)
}

async fn handle_contact_page(State(state): State<AppState>) -> Html<String> {
    let body = format!("<h1>Contact us</h1>{}", render::contact_form());
    let meta = SeoMeta::new("Contact").description(Some("Get in touch with our team."));
    state.page("/contact", meta, &body)
}

// ============ API ============

#[derive(Serialize)]
struct ProductListResponse {
    products: Vec<Product>,
}

async fn handle_api_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<ProductListResponse> {
    let products = state
        .content
        .products(params.search(), params.category())
        .await;
    Json(ProductListResponse { products })
}

/// Handler for `POST /api/contact`.
///
/// Accepts JSON or form-encoded bodies. Returns `200` with the outcome on
/// success, `400` for validation failures and `502` when the store write
/// fails; the body is always a `SubmissionOutcome`.
async fn handle_contact_submit(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, AppError> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let form: ContactForm = if is_json {
        let Json(form) = Json::<ContactForm>::from_request(req, &())
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        form
    } else {
        let Form(form) = Form::<ContactForm>::from_request(req, &())
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        form
    };

    let outcome = submit_contact(
        state.content.store().as_ref(),
        state.mailer.as_ref(),
        &state.config.contact,
        &state.config.site_name,
        form,
    )
    .await;

    let status = match outcome.failure {
        None => StatusCode::OK,
        Some(FailureKind::Invalid) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Store) => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(outcome)).into_response())
}
