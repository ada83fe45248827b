//! # Showroom
//!
//! A brochure site for a product catalog, blog, events, projects and team,
//! backed by a hosted content store.
//!
//! Showroom assembles GROQ queries from typed filters, fetches content over
//! the store's HTTP API, resolves image references to CDN URLs and renders
//! server-side HTML pages. Reads are fail-soft: a store outage renders empty
//! sections instead of error pages. Contact form submissions are validated,
//! written back to the store and optionally announced by mail.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │   query     │──▶│   content   │──▶│   render     │
//! │ GROQ+params │   │ fail-soft   │   │ cards, pages │
//! └─────────────┘   └──────┬──────┘   └──────┬───────┘
//!                          │                 │
//!                   ┌──────▼──────┐   ┌──────▼───────┐
//!                   │    store    │   │    server    │
//!                   │ HTTP client │◀──│ axum routes  │
//!                   └─────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! showroom serve                         # start the site
//! showroom products --search pump        # query the catalog
//! showroom groq product --category solar # print an assembled query
//! showroom migrate backfill-order product --dry-run
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Content document types |
//! | [`schema`] | Document schemas and validation |
//! | [`query`] | GROQ filter and query assembly |
//! | [`store`] | Content store client and mutations |
//! | [`content`] | Fail-soft fetch actions |
//! | [`image`] | Image reference to CDN URL resolution |
//! | [`render`] | HTML cards, grids, empty states and pages |
//! | [`contact`] | Contact form validation and submission |
//! | [`notify`] | Outbound mail for submissions |
//! | [`migrate`] | One-off content migrations |
//! | [`server`] | HTTP site server |

pub mod config;
pub mod contact;
pub mod content;
pub mod image;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod query;
pub mod render;
pub mod schema;
pub mod server;
pub mod store;
