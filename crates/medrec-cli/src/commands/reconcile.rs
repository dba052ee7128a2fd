//! `medrec reconcile` command implementation
//!
//! Runs one reconciliation batch against the configured record store, media
//! root, and remote store. Ctrl-C cancels cooperatively: in-flight uploads
//! finish, queued units are not started, and the partial summary is printed.

use std::sync::Arc;

use colored::Colorize;
use medrec_core::{
    EngineConfig, LocalResolver, PgRecordStore, ReconcileEngine, RecordStore, RemoteStore,
    S3RemoteStore,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::{progress, summary};

/// Run a reconciliation batch. Returns whether the batch was clean.
pub async fn run(
    config: AppConfig,
    dry_run: bool,
    limit: Option<usize>,
    folder: String,
    concurrency: usize,
) -> Result<bool> {
    let mut engine_config = EngineConfig::new(config.trusted_host.clone());
    engine_config.folder = folder;
    engine_config.fields = config.fields.clone();
    engine_config.dry_run = dry_run;
    engine_config.concurrency = concurrency;
    engine_config.limit = limit;

    if dry_run {
        println!(
            "{} Dry run: nothing will be uploaded or written",
            "→".cyan()
        );
    }

    let records: Arc<dyn RecordStore> =
        Arc::new(PgRecordStore::connect(&config.database_url, config.table.clone()).await?);
    let remote: Arc<dyn RemoteStore> = Arc::new(S3RemoteStore::new(config.remote.clone()));
    let resolver = LocalResolver::new(&config.media_root);

    let engine = ReconcileEngine::new(engine_config, remote, records, resolver);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, finishing in-flight units...");
            signal_cancel.cancel();
        }
    });

    let spinner = progress::create_spinner("Reconciling media references...");
    let batch = engine.run(cancel).await?;
    spinner.finish_and_clear();

    summary::print_summary(&batch);

    if batch.is_clean() {
        println!("\n{} Reconciliation complete", "✓".green().bold());
    } else {
        println!(
            "\n{} Reconciliation finished with failures, see details above",
            "✗".red().bold()
        );
    }

    info!(
        total = batch.total,
        uploaded = batch.uploaded,
        clean = batch.is_clean(),
        "Reconcile command finished"
    );

    Ok(batch.is_clean())
}
