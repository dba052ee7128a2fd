//! medrec Core Library
//!
//! Media asset reconciliation: converge every stored image reference toward
//! one canonical content-addressed remote identifier.
//!
//! # Overview
//!
//! - **Classifier** ([`reference`]): parse a raw stored value into a typed
//!   [`AssetReference`] without touching disk or network
//! - **Local Resolver** ([`resolver`]): media-root-relative existence checks
//!   and byte reads, traversal-safe
//! - **Remote Store** ([`store`], [`s3`]): upload/existence contract plus the
//!   S3-compatible implementation
//! - **Record Store** ([`records`]): list asset fields and write back
//!   normalized values, one row and one column at a time
//! - **Engine** ([`engine`]): the per-field decision table, bounded worker
//!   pool, retries, and cooperative cancellation
//! - **Reporter** ([`report`]): outcome aggregation into a [`BatchSummary`]

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod engine;
pub mod records;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod s3;
pub mod store;

// Re-export commonly used types
pub use engine::{EngineConfig, ReconcileEngine, ReconcileError};
pub use records::{AssetField, PgRecordStore, RecordStore, RecordStoreError, RecordTable};
pub use reference::{classify, derive_identifier, AssetReference, ClassifierConfig};
pub use report::{BatchSummary, Outcome, Reporter, SkipReason, UnitOutcome};
pub use resolver::{LocalResolver, Resolved};
pub use s3::{RemoteStoreConfig, S3RemoteStore};
pub use store::{canonical_key, PreUploadHook, RemoteObject, RemoteStore, RemoteStoreError};
