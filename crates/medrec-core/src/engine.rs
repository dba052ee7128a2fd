//! Reconciliation engine
//!
//! Orchestrates classification, local resolution, upload, and record
//! normalization for a batch of asset fields. The per-field decision is a
//! strict function of the classification plus local/remote existence; there
//! is no hidden state across fields, which is what makes repeated runs
//! idempotent. Nothing is cached across runs — every invocation re-classifies
//! from the current persisted value.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::records::{AssetField, RecordStore, RecordStoreError};
use crate::reference::{classify, derive_identifier, AssetReference, ClassifierConfig};
use crate::report::{BatchSummary, Outcome, Reporter, SkipReason, UnitOutcome};
use crate::resolver::{LocalResolver, Resolved};
use crate::store::{canonical_key, PreUploadHook, RemoteStore, RemoteStoreError};

/// Engine configuration; passed in explicitly, no ambient state
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// CDN hostname treated as already-canonical
    pub trusted_host: String,
    /// Remote folder uploads land in
    pub folder: String,
    /// Record columns holding asset references
    pub fields: Vec<String>,
    /// Classify and check existence, but never upload or save
    pub dry_run: bool,
    /// Worker pool size; kept small to respect remote rate limits
    pub concurrency: usize,
    /// Cap on the number of records listed
    pub limit: Option<usize>,
    /// Attempts per remote call before a transient error becomes an outcome
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl EngineConfig {
    pub fn new(trusted_host: impl Into<String>) -> Self {
        Self {
            trusted_host: trusted_host.into(),
            folder: "properties".to_string(),
            fields: vec![
                "cover".to_string(),
                "gallery1".to_string(),
                "gallery2".to_string(),
            ],
            dry_run: false,
            concurrency: 4,
            limit: None,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// Batch-level failures; per-unit failures are outcomes, not errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("failed to list asset fields: {0}")]
    Records(#[from] RecordStoreError),
}

/// Everything a worker needs to process one unit
#[derive(Clone)]
struct UnitContext {
    config: Arc<EngineConfig>,
    classifier: ClassifierConfig,
    remote: Arc<dyn RemoteStore>,
    records: Arc<dyn RecordStore>,
    resolver: LocalResolver,
    hook: Option<Arc<dyn PreUploadHook>>,
}

/// Media reconciliation engine
pub struct ReconcileEngine {
    ctx: UnitContext,
}

impl ReconcileEngine {
    pub fn new(
        config: EngineConfig,
        remote: Arc<dyn RemoteStore>,
        records: Arc<dyn RecordStore>,
        resolver: LocalResolver,
    ) -> Self {
        let classifier = ClassifierConfig::new(config.trusted_host.clone());
        Self {
            ctx: UnitContext {
                config: Arc::new(config),
                classifier,
                remote,
                records,
                resolver,
                hook: None,
            },
        }
    }

    /// Install a pre-upload side filter (resize, re-encode).
    pub fn with_hook(mut self, hook: Arc<dyn PreUploadHook>) -> Self {
        self.ctx.hook = Some(hook);
        self
    }

    /// Run one reconciliation batch.
    ///
    /// Units execute on a bounded worker pool. Cancellation is cooperative:
    /// in-flight units finish, queued units are never started. A permanent
    /// remote failure cancels the token itself and lands in
    /// [`BatchSummary::aborted`]; all other failures stay per-unit.
    pub async fn run(&self, cancel: CancellationToken) -> Result<BatchSummary, ReconcileError> {
        let config = &self.ctx.config;
        let units = self
            .ctx
            .records
            .list_asset_fields(&config.fields, config.limit)
            .await?;

        info!(
            units = units.len(),
            dry_run = config.dry_run,
            concurrency = config.concurrency,
            "Starting reconciliation batch"
        );

        let mut reporter = Reporter::new();
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let mut join_set: JoinSet<(UnitOutcome, Option<String>)> = JoinSet::new();

        for unit in units {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let ctx = self.ctx.clone();
            let cancel = cancel.clone();
            join_set.spawn(async move {
                let _permit = permit;
                process_unit(ctx, unit, cancel).await
            });

            // Fold in whatever already finished so the reporter stays current.
            while let Some(result) = join_set.try_join_next() {
                record_result(&mut reporter, result);
            }
        }

        while let Some(result) = join_set.join_next().await {
            record_result(&mut reporter, result);
        }

        let summary = reporter.finish();
        info!(
            total = summary.total,
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            failed = summary.upload_failed + summary.save_failed,
            aborted = summary.aborted.is_some(),
            "Reconciliation batch finished"
        );
        Ok(summary)
    }
}

fn record_result(
    reporter: &mut Reporter,
    result: Result<(UnitOutcome, Option<String>), tokio::task::JoinError>,
) {
    match result {
        Ok((unit, abort)) => {
            if let Some(cause) = abort {
                reporter.abort(cause);
            }
            reporter.record(unit.record_key, unit.field, unit.outcome);
        }
        Err(join_error) => {
            error!(error = %join_error, "Reconciliation worker panicked");
        }
    }
}

/// Process one (record, field) unit. The `Err` side of `decide` carries a
/// permanent remote failure, which cancels the rest of the batch.
async fn process_unit(
    ctx: UnitContext,
    unit: AssetField,
    cancel: CancellationToken,
) -> (UnitOutcome, Option<String>) {
    match decide(&ctx, &unit).await {
        Ok(outcome) => {
            debug!(
                record_key = %unit.record_key,
                field = %unit.field,
                kind = outcome.kind(),
                "Unit processed"
            );
            (
                UnitOutcome {
                    record_key: unit.record_key,
                    field: unit.field,
                    outcome,
                },
                None,
            )
        }
        Err(cause) => {
            error!(
                record_key = %unit.record_key,
                field = %unit.field,
                cause = %cause,
                "Permanent remote store failure, stopping batch"
            );
            cancel.cancel();
            (
                UnitOutcome {
                    record_key: unit.record_key,
                    field: unit.field,
                    outcome: Outcome::UploadFailed {
                        cause: cause.clone(),
                    },
                },
                Some(cause),
            )
        }
    }
}

/// The per-field decision table.
async fn decide(ctx: &UnitContext, unit: &AssetField) -> Result<Outcome, String> {
    match classify(&unit.raw, &ctx.classifier) {
        AssetReference::Empty => Ok(skip(SkipReason::Empty)),

        AssetReference::RemoteUrl { trusted: true, .. } => Ok(skip(SkipReason::AlreadyCanonical)),

        AssetReference::RemoteUrl {
            url,
            trusted: false,
        } => normalize_foreign_url(ctx, unit, &url).await,

        AssetReference::RemoteIdentifier(identifier) => {
            check_remote_identifier(ctx, &identifier).await
        }

        AssetReference::LocalPath(rel) => migrate_local(ctx, unit, &rel).await,

        AssetReference::Unresolvable(raw) => {
            warn!(
                record_key = %unit.record_key,
                field = %unit.field,
                raw = %raw,
                "Unrecognized media reference left untouched"
            );
            Ok(skip(SkipReason::UnrecognizedFormat))
        }
    }
}

fn skip(reason: SkipReason) -> Outcome {
    Outcome::Skipped { reason }
}

/// A URL on a foreign host is treated as already-hosted: derive the
/// identifier, confirm the remote store actually has it, then rewrite the
/// stored form without re-uploading. An absent identifier means the
/// already-hosted assumption was wrong, so the URL is left untouched and
/// reported.
async fn normalize_foreign_url(
    ctx: &UnitContext,
    unit: &AssetField,
    url: &str,
) -> Result<Outcome, String> {
    let Some(identifier) = derive_identifier(url) else {
        warn!(
            record_key = %unit.record_key,
            field = %unit.field,
            url = %url,
            "Could not derive identifier from URL"
        );
        return Ok(skip(SkipReason::UnrecognizedFormat));
    };

    match exists_with_retry(ctx, &identifier).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                record_key = %unit.record_key,
                field = %unit.field,
                identifier = %identifier,
                "Derived identifier absent from remote store, leaving URL untouched"
            );
            return Ok(Outcome::UploadFailed {
                cause: format!("derived identifier '{identifier}' absent from remote store"),
            });
        }
        Err(RemoteStoreError::Transient(cause)) => {
            return Ok(Outcome::UploadFailed { cause });
        }
        Err(RemoteStoreError::Permanent(cause)) => return Err(cause),
    }

    info!(
        record_key = %unit.record_key,
        field = %unit.field,
        identifier = %identifier,
        "Rewriting foreign-host URL to its identifier, no re-upload"
    );

    if ctx.config.dry_run {
        return Ok(Outcome::UploadedAndNormalized { identifier });
    }

    match ctx
        .records
        .update_field(&unit.record_key, &unit.field, &identifier)
        .await
    {
        Ok(()) => Ok(Outcome::UploadedAndNormalized { identifier }),
        Err(err) => Ok(Outcome::SaveFailed {
            cause: err.to_string(),
        }),
    }
}

/// Retry-wrapped remote existence check.
async fn exists_with_retry(
    ctx: &UnitContext,
    identifier: &str,
) -> Result<bool, RemoteStoreError> {
    let remote = ctx.remote.clone();
    let identifier = identifier.to_string();
    with_retry(&ctx.config, "exists", move || {
        let remote = remote.clone();
        let identifier = identifier.clone();
        async move { remote.exists(&identifier).await }
    })
    .await
}

/// A bare identifier is ambiguous, so confirm it against the remote store
/// before trusting it.
async fn check_remote_identifier(ctx: &UnitContext, identifier: &str) -> Result<Outcome, String> {
    match exists_with_retry(ctx, identifier).await {
        Ok(true) => Ok(skip(SkipReason::AlreadyMigrated)),
        Ok(false) => {
            warn!(identifier = %identifier, "Identifier absent from remote store");
            Ok(Outcome::UploadFailed {
                cause: "stale identifier, no local fallback".to_string(),
            })
        }
        Err(RemoteStoreError::Transient(cause)) => Ok(Outcome::UploadFailed { cause }),
        Err(RemoteStoreError::Permanent(cause)) => Err(cause),
    }
}

/// Upload a local file and normalize the stored value to the returned
/// identifier. The record is written only after the remote store confirms
/// success, and at most once per run.
async fn migrate_local(
    ctx: &UnitContext,
    unit: &AssetField,
    rel: &str,
) -> Result<Outcome, String> {
    // Historical data mixes hosted identifiers with genuine local paths in
    // the same shape, and a foreign-URL rewrite stores exactly this form.
    // Confirm against the remote store before uploading anything, so a
    // second run over an already-hosted value never re-uploads.
    match exists_with_retry(ctx, rel).await {
        Ok(true) => {
            debug!(
                record_key = %unit.record_key,
                field = %unit.field,
                identifier = %rel,
                "Stored value already hosted remotely, skipping upload"
            );
            return Ok(skip(SkipReason::AlreadyMigrated));
        }
        Ok(false) => {}
        Err(RemoteStoreError::Transient(cause)) => {
            return Ok(Outcome::UploadFailed { cause });
        }
        Err(RemoteStoreError::Permanent(cause)) => return Err(cause),
    }

    let abs = match ctx.resolver.resolve(rel) {
        Resolved::Found(abs) => abs,
        Resolved::NotFound { expected } => {
            return Ok(Outcome::MissingLocalFile {
                expected_path: expected.display().to_string(),
            });
        }
    };

    let bytes = match tokio::fs::read(&abs).await {
        Ok(bytes) => bytes,
        Err(err) => {
            // Race between existence check and read; same as not-found.
            warn!(path = %abs.display(), error = %err, "File vanished before read");
            return Ok(Outcome::MissingLocalFile {
                expected_path: abs.display().to_string(),
            });
        }
    };

    let name = rel.rsplit('/').next().unwrap_or(rel);
    let bytes = match &ctx.hook {
        Some(hook) => match hook.apply(bytes, name) {
            Ok(bytes) => bytes,
            Err(err) => {
                return Ok(Outcome::UploadFailed {
                    cause: format!("pre-upload hook failed: {err}"),
                });
            }
        },
        None => bytes,
    };

    if ctx.config.dry_run {
        let identifier = canonical_key(&ctx.config.folder, name, &bytes);
        info!(
            record_key = %unit.record_key,
            field = %unit.field,
            identifier = %identifier,
            "Dry run: would upload and normalize"
        );
        return Ok(Outcome::UploadedAndNormalized { identifier });
    }

    let uploaded = {
        let remote = ctx.remote.clone();
        let folder = ctx.config.folder.clone();
        let name = name.to_string();
        with_retry(&ctx.config, "upload", move || {
            let remote = remote.clone();
            let bytes = bytes.clone();
            let folder = folder.clone();
            let name = name.clone();
            async move { remote.upload(bytes, &folder, &name).await }
        })
        .await
    };

    let object = match uploaded {
        Ok(object) => object,
        Err(RemoteStoreError::Transient(cause)) => {
            return Ok(Outcome::UploadFailed { cause });
        }
        Err(RemoteStoreError::Permanent(cause)) => return Err(cause),
    };

    match ctx
        .records
        .update_field(&unit.record_key, &unit.field, &object.identifier)
        .await
    {
        Ok(()) => {
            info!(
                record_key = %unit.record_key,
                field = %unit.field,
                identifier = %object.identifier,
                "Uploaded and normalized"
            );
            Ok(Outcome::UploadedAndNormalized {
                identifier: object.identifier,
            })
        }
        Err(err) => {
            // The upload already succeeded. Logging the identifier makes the
            // save retryable on the next run even though the old local path
            // is gone from the record's history.
            error!(
                record_key = %unit.record_key,
                field = %unit.field,
                identifier = %object.identifier,
                error = %err,
                "Record save failed after successful upload"
            );
            Ok(Outcome::SaveFailed {
                cause: format!("{} (uploaded identifier: {})", err, object.identifier),
            })
        }
    }
}

/// Retry a remote call with bounded exponential backoff. Transient errors
/// are retried up to `max_attempts`; permanent errors return immediately.
async fn with_retry<T, F, Fut>(
    config: &EngineConfig,
    op: &str,
    mut call: F,
) -> Result<T, RemoteStoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, RemoteStoreError>>,
{
    let mut delay = config.retry_base_delay;
    let mut attempt = 1u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(RemoteStoreError::Permanent(cause)) => {
                return Err(RemoteStoreError::Permanent(cause));
            }
            Err(RemoteStoreError::Transient(cause)) => {
                if attempt >= config.max_attempts {
                    return Err(RemoteStoreError::Transient(format!(
                        "{op} failed after {attempt} attempts: {cause}"
                    )));
                }
                warn!(
                    op = %op,
                    attempt = attempt,
                    error = %cause,
                    "Transient remote store error, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}
