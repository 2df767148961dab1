//! Wiring of the dataset generator: configuration in, generated rows out.

pub mod config;

use std::{collections::BTreeMap, sync::Arc};

use bank_datagen_engine::{
    CsvSink, DatagenEngine, FakerFactSource, GenerationPlan, GenerationReport, RandomFactSource,
    sink,
};
use bank_datagen_store::{AuditStore, BankStore, MemoryStore};

use self::config::{Config, OutputKind};

/// What a run wrote.
#[derive(Debug)]
pub struct Outcome {
    /// What the engine generated.
    pub report: GenerationReport,

    /// Rows written per CSV table; empty when writing to PostgreSQL.
    pub exported: BTreeMap<&'static str, usize>,
}

/// Generates one dataset as configured, into PostgreSQL or into CSV files.
pub async fn generate(config: Config) -> anyhow::Result<Outcome> {
    let facts: Arc<dyn RandomFactSource> =
        Arc::new(FakerFactSource::builder().maybe_seed(config.generation.seed).build());

    let plan = GenerationPlan::builder()
        .customers(config.generation.customers)
        .customer_updates(config.generation.customer_updates)
        .transactions(config.generation.transactions)
        .build();

    match config.output.kind {
        OutputKind::Postgres => {
            let store = bank_datagen_store::establish_pool(
                config.db.db_url.clone(),
                config.db.max_conn,
                config.db.tls_mode(),
            )
            .await
            .map(BankStore::new)?;

            let report = run(facts, store, &config, plan).await?;

            Ok(Outcome { report, exported: BTreeMap::new() })
        },
        OutputKind::Csv => {
            let store =
                config.generation.seed.map_or_else(MemoryStore::new, MemoryStore::with_seed);

            let report = run(facts, store.clone(), &config, plan).await?;

            let mut sink = CsvSink::new(&config.output.csv_dir)?;
            let exported = sink::export_dataset(&mut sink, &store.snapshot()?)?;

            for (table, count) in &exported {
                tracing::info!(table, count, dir = %sink.dir().display(), "exported table");
            }

            Ok(Outcome { report, exported })
        },
    }
}

async fn run<S>(
    facts: Arc<dyn RandomFactSource>,
    store: S,
    config: &Config,
    plan: GenerationPlan,
) -> anyhow::Result<GenerationReport>
where
    S: AuditStore + Clone,
{
    let engine = DatagenEngine::builder()
        .facts(facts)
        .store(store)
        .maybe_epoch_floor(config.generation.epoch_floor)
        .build();

    let report = engine.run(plan).await?;

    if !report.failed_customers().is_empty() {
        tracing::warn!(
            failed = report.failed_customers().len(),
            "some customers were left without accounts"
        );
    }

    Ok(report)
}
