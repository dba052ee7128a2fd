//! CLI configuration
//!
//! Connection settings come from the environment (optionally via `.env`);
//! per-run knobs come from command-line flags.

use std::env;
use std::path::PathBuf;

use medrec_core::{RecordTable, RemoteStoreConfig};

use crate::error::{CliError, Result};

/// Default trusted CDN host when `MEDREC_TRUSTED_HOST` is unset
pub const DEFAULT_TRUSTED_HOST: &str = "cdn.example.com";

/// Everything the commands need that does not come from flags
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Root directory local references resolve under
    pub media_root: PathBuf,
    /// CDN hostname treated as already-canonical
    pub trusted_host: String,
    /// Record columns holding asset references
    pub fields: Vec<String>,
    /// Table and key column the references live in
    pub table: RecordTable,
    /// Remote object store connection settings
    pub remote: RemoteStoreConfig,
}

impl AppConfig {
    /// Load from the environment.
    ///
    /// Required: `DATABASE_URL`, `MEDREC_MEDIA_ROOT`. Optional with
    /// defaults: `MEDREC_TRUSTED_HOST`, `MEDREC_FIELDS` (comma-separated),
    /// `MEDREC_RECORD_TABLE`, `MEDREC_KEY_COLUMN`, and the `MEDREC_S3_*`
    /// settings.
    pub fn load() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| CliError::config("DATABASE_URL is not set"))?;

        let media_root = env::var("MEDREC_MEDIA_ROOT")
            .map(PathBuf::from)
            .map_err(|_| CliError::config("MEDREC_MEDIA_ROOT is not set"))?;

        let trusted_host = env::var("MEDREC_TRUSTED_HOST")
            .unwrap_or_else(|_| DEFAULT_TRUSTED_HOST.to_string());

        let fields = parse_fields(
            &env::var("MEDREC_FIELDS").unwrap_or_else(|_| "cover,gallery1,gallery2".to_string()),
        )?;

        let table = RecordTable::new(
            env::var("MEDREC_RECORD_TABLE").unwrap_or_else(|_| "listings_property".to_string()),
            env::var("MEDREC_KEY_COLUMN").unwrap_or_else(|_| "id".to_string()),
            fields.clone(),
        );

        let remote = RemoteStoreConfig::from_env()?;

        Ok(Self {
            database_url,
            media_root,
            trusted_host,
            fields,
            table,
            remote,
        })
    }
}

fn parse_fields(raw: &str) -> Result<Vec<String>> {
    let fields: Vec<String> = raw
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() {
        return Err(CliError::config(
            "MEDREC_FIELDS must name at least one column",
        ));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_splits_and_trims() {
        let fields = parse_fields("cover, gallery1 ,gallery2").unwrap();
        assert_eq!(fields, vec!["cover", "gallery1", "gallery2"]);
    }

    #[test]
    fn test_parse_fields_rejects_empty() {
        assert!(parse_fields("").is_err());
        assert!(parse_fields(" , ,").is_err());
    }
}
