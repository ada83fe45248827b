use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::{Filter, GroqQuery, SortKey, PUBLISHED_ONLY};
use crate::store::{ContentStore, Mutation, Transaction};

/// One-off content migrations. Each run is a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migration {
    /// Give documents without an `order` consecutive orders after the
    /// current maximum, in creation order.
    BackfillOrder { doc_type: String },
    /// Mark contact submissions that have no status as `new`.
    DefaultContactStatus,
}

impl Migration {
    pub fn name(&self) -> String {
        match self {
            Migration::BackfillOrder { doc_type } => format!("backfill-order:{}", doc_type),
            Migration::DefaultContactStatus => "contact-status".to_string(),
        }
    }

    fn query(&self) -> GroqQuery {
        match self {
            Migration::BackfillOrder { doc_type } => GroqQuery::new(doc_type.as_str())
                .filter(Filter::new().condition(PUBLISHED_ONLY))
                .order(&[SortKey::asc("_createdAt"), SortKey::asc("_id")])
                .projection("_id, _createdAt, order"),
            Migration::DefaultContactStatus => GroqQuery::new("contactSubmission")
                .filter(Filter::new().condition("!defined(status)"))
                .order(&[SortKey::asc("_createdAt")])
                .projection("_id, status"),
        }
    }
}

/// Mutations that `migration` would apply to `docs`.
///
/// `docs` must be in the order returned by the migration's query.
pub fn plan(migration: &Migration, docs: &[Value]) -> Vec<Mutation> {
    match migration {
        Migration::BackfillOrder { .. } => {
            let mut next = docs
                .iter()
                .filter_map(|d| d["order"].as_u64())
                .max()
                .map_or(0, |m| m + 1);
            docs.iter()
                .filter(|d| d["order"].is_null())
                .filter_map(|d| d["_id"].as_str())
                .map(|id| {
                    let mut set = Map::new();
                    set.insert("order".into(), Value::from(next));
                    next += 1;
                    Mutation::set(id, set)
                })
                .collect()
        }
        Migration::DefaultContactStatus => docs
            .iter()
            .filter(|d| d["status"].is_null())
            .filter_map(|d| d["_id"].as_str())
            .map(|id| {
                let mut set = Map::new();
                set.insert("status".into(), Value::from("new"));
                Mutation::set(id, set)
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub migration: String,
    pub scanned: usize,
    pub planned: usize,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Fetches, plans and commits `migration` as one transaction.
pub async fn run_migration(
    store: &dyn ContentStore,
    migration: &Migration,
    dry_run: bool,
) -> Result<MigrationReport> {
    let docs = match store.fetch(&migration.query()).await? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => anyhow::bail!("migration query returned a non-array result: {}", other),
    };

    let tx: Transaction = plan(migration, &docs).into_iter().collect();
    let mut report = MigrationReport {
        migration: migration.name(),
        scanned: docs.len(),
        planned: tx.len(),
        dry_run,
        transaction_id: None,
    };

    if dry_run || tx.is_empty() {
        return Ok(report);
    }

    let outcome = tx.commit(store).await?;
    tracing::info!(
        migration = %report.migration,
        transaction = %outcome.transaction_id,
        patched = report.planned,
        "migration committed"
    );
    report.transaction_id = Some(outcome.transaction_id);
    Ok(report)
}

pub async fn run_migration_cli(
    store: &dyn ContentStore,
    migration: &Migration,
    dry_run: bool,
) -> Result<()> {
    let report = run_migration(store, migration, dry_run).await?;
    println!("{}", report.migration);
    println!("  scanned: {}", report.scanned);
    println!("  planned: {}", report.planned);
    match report.transaction_id {
        Some(ref tx) => println!("  committed: {}", tx),
        None if report.dry_run => println!("  dry run, nothing written"),
        None => println!("  nothing to do"),
    }
    Ok(())
}
