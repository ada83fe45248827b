//! # Showroom CLI (`showroom`)
//!
//! The `showroom` binary serves the site and provides maintenance commands
//! for content: catalog queries, query previews, image URL resolution,
//! schema validation and one-off migrations.
//!
//! ## Usage
//!
//! ```bash
//! showroom --config ./config/site.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `showroom serve` | Start the HTTP site server |
//! | `showroom products` | Fetch and list catalog products |
//! | `showroom groq <type>` | Print the assembled listing query and its params |
//! | `showroom image <ref>` | Resolve an image asset reference to a CDN URL |
//! | `showroom schema list` | List document schemas |
//! | `showroom schema show <name>` | Print a schema as JSON |
//! | `showroom schema validate <name> <file>` | Validate documents from a JSON file |
//! | `showroom migrate backfill-order <type>` | Assign missing `order` values |
//! | `showroom migrate contact-status` | Default missing submission statuses to `new` |
//!
//! ## Examples
//!
//! ```bash
//! # Products in either of two collections matching "pump"
//! showroom products --search pump --category solar,water
//!
//! # Preview the query the blog page sends
//! showroom groq post --category news
//!
//! # See what a migration would change without writing
//! showroom migrate backfill-order product --dry-run
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use showroom::config;
use showroom::content;
use showroom::image::ImageResolver;
use showroom::migrate::{self, Migration};
use showroom::models::ImageRef;
use showroom::schema;
use showroom::server;
use showroom::store::HttpContentStore;

/// Showroom: a content-store backed brochure site.
///
/// Commands that talk to the content store read a TOML configuration file
/// given by `--config`.
#[derive(Parser)]
#[command(
    name = "showroom",
    about = "Showroom: a content-store backed brochure site",
    version,
    long_about = "Showroom serves a product catalog, blog, events, projects and team pages \
    from a hosted content store, and provides commands for querying, validating and \
    migrating that content."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/site.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP site server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,

    /// Fetch and list catalog products.
    Products {
        /// Prefix search over title, description and features.
        #[arg(long)]
        search: Option<String>,

        /// Collection slug, or a comma-separated list of slugs.
        #[arg(long)]
        category: Option<String>,
    },

    /// Print the listing query for `product` or `post` without sending it.
    Groq {
        /// Document type.
        doc_type: String,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Resolve an image asset reference (`image-<id>-<W>x<H>-<fmt>`) to a URL.
    Image {
        reference: String,

        #[arg(long, default_value_t = 800)]
        width: u32,

        #[arg(long, default_value_t = 600)]
        height: u32,
    },

    /// Inspect document schemas and validate documents against them.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },

    /// Run a one-off content migration as a single transaction.
    Migrate {
        #[command(subcommand)]
        migration: MigrateAction,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// List all document schemas.
    List,
    /// Print a schema as JSON.
    Show { name: String },
    /// Validate a JSON file holding one document or an array of documents.
    Validate { name: String, file: PathBuf },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Give documents of a type without an `order` consecutive values
    /// after the current maximum.
    BackfillOrder {
        doc_type: String,

        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Set `status = "new"` on contact submissions that have none.
    ContactStatus {
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Groq {
            doc_type,
            search,
            category,
        } => {
            return content::run_groq(doc_type, search.as_deref(), category.as_deref());
        }
        Commands::Schema { action } => {
            return run_schema(action);
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg.logging.level);

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Products { search, category } => {
            content::run_products(&cfg, search.as_deref(), category.as_deref()).await?;
        }
        Commands::Image {
            reference,
            width,
            height,
        } => {
            let resolver = ImageResolver::new(&cfg.store, &cfg.images);
            let image = ImageRef::from_ref(reference);
            match resolver.resolve(Some(&image), width, height).url() {
                Some(url) => println!("{}", url),
                None => anyhow::bail!(
                    "unresolvable image reference (placeholder: {})",
                    resolver.placeholder()
                ),
            }
        }
        Commands::Migrate { migration } => {
            let store = HttpContentStore::new(&cfg.store)?;
            let (migration, dry_run) = match migration {
                MigrateAction::BackfillOrder { doc_type, dry_run } => {
                    (Migration::BackfillOrder { doc_type }, dry_run)
                }
                MigrateAction::ContactStatus { dry_run } => {
                    (Migration::DefaultContactStatus, dry_run)
                }
            };
            migrate::run_migration_cli(&store, &migration, dry_run).await?;
        }
        Commands::Groq { .. } | Commands::Schema { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn run_schema(action: &SchemaAction) -> anyhow::Result<()> {
    match action {
        SchemaAction::List => {
            schema::run_schema_list();
            Ok(())
        }
        SchemaAction::Show { name } => schema::run_schema_show(name),
        SchemaAction::Validate { name, file } => {
            schema::run_schema_validate(name, file)
        }
    }
}
