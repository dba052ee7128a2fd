//! Record store contract and Postgres implementation
//!
//! The engine reads (record, field, raw value) triples from the record store
//! and writes back normalized values one row and one column at a time. No
//! cross-unit transaction is required; every update is a single-row,
//! single-field write.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use thiserror::Error;
use tracing::{debug, instrument};

/// One record field observed at read time. Ephemeral, constructed per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetField {
    /// Opaque record key
    pub record_key: String,
    /// Field (column) name
    pub field: String,
    /// Raw stored value, possibly empty
    pub raw: String,
}

/// Record store failures
#[derive(Error, Debug)]
pub enum RecordStoreError {
    #[error("record store query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("field '{0}' is not a configured asset column")]
    UnknownField(String),

    #[error("invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("record '{key}' not found for update")]
    NotFound { key: String },
}

/// External collaborator contract for the store holding listing metadata
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every (record, field) pair for the given field names, ordered by
    /// record key so a re-run scans in the same order. `limit` bounds the
    /// number of records (not fields).
    async fn list_asset_fields(
        &self,
        fields: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<AssetField>, RecordStoreError>;

    /// Update one field of one record to the new value.
    async fn update_field(
        &self,
        record_key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RecordStoreError>;
}

/// Which table and columns hold the asset references
#[derive(Debug, Clone)]
pub struct RecordTable {
    pub table: String,
    pub key_column: String,
    /// Columns that may be read and written; anything else is rejected
    pub asset_columns: Vec<String>,
}

impl RecordTable {
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        asset_columns: Vec<String>,
    ) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            asset_columns,
        }
    }

    /// Reject anything that could not be a plain SQL identifier before it is
    /// ever interpolated into a statement.
    fn validate(&self) -> Result<(), RecordStoreError> {
        for ident in std::iter::once(&self.table)
            .chain(std::iter::once(&self.key_column))
            .chain(self.asset_columns.iter())
        {
            if !is_sql_identifier(ident) {
                return Err(RecordStoreError::InvalidIdentifier(ident.clone()));
            }
        }
        Ok(())
    }

    fn ensure_asset_column(&self, field: &str) -> Result<(), RecordStoreError> {
        if self.asset_columns.iter().any(|c| c == field) {
            Ok(())
        } else {
            Err(RecordStoreError::UnknownField(field.to_string()))
        }
    }
}

fn is_sql_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// [`RecordStore`] backed by a Postgres table
pub struct PgRecordStore {
    pool: PgPool,
    table: RecordTable,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, table: RecordTable) -> Result<Self, RecordStoreError> {
        table.validate()?;
        Ok(Self { pool, table })
    }

    pub async fn connect(
        database_url: &str,
        table: RecordTable,
    ) -> Result<Self, RecordStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        Self::new(pool, table)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self))]
    async fn list_asset_fields(
        &self,
        fields: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<AssetField>, RecordStoreError> {
        for field in fields {
            self.table.ensure_asset_column(field)?;
        }

        let mut sql = format!(
            "SELECT {key}::text AS record_key, {cols} FROM {table} ORDER BY {key}",
            key = self.table.key_column,
            cols = fields.join(", "),
            table = self.table.table,
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        debug!(sql = %sql, "Listing asset fields");

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut result = Vec::with_capacity(rows.len() * fields.len());
        for row in rows {
            let record_key: String = row.try_get("record_key")?;
            for field in fields {
                let raw: Option<String> = row.try_get(field.as_str())?;
                result.push(AssetField {
                    record_key: record_key.clone(),
                    field: field.clone(),
                    raw: raw.unwrap_or_default(),
                });
            }
        }

        Ok(result)
    }

    #[instrument(skip(self, value))]
    async fn update_field(
        &self,
        record_key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RecordStoreError> {
        self.table.ensure_asset_column(field)?;

        let sql = format!(
            "UPDATE {table} SET {field} = $1 WHERE {key}::text = $2",
            table = self.table.table,
            field = field,
            key = self.table.key_column,
        );

        let result = sqlx::query(&sql)
            .bind(value)
            .bind(record_key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RecordStoreError::NotFound {
                key: record_key.to_string(),
            });
        }

        debug!(record_key = %record_key, field = %field, "Field updated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table() -> RecordTable {
        RecordTable::new(
            "listings_property",
            "id",
            vec![
                "cover".to_string(),
                "gallery1".to_string(),
                "gallery2".to_string(),
            ],
        )
    }

    #[test]
    fn test_validate_accepts_plain_identifiers() {
        assert!(table().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_injection() {
        let bad = RecordTable::new("listings; DROP TABLE x", "id", vec!["cover".to_string()]);
        assert!(matches!(
            bad.validate(),
            Err(RecordStoreError::InvalidIdentifier(_))
        ));

        let bad = RecordTable::new("listings", "id", vec!["cover = ''; --".to_string()]);
        assert!(matches!(
            bad.validate(),
            Err(RecordStoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_validate_rejects_leading_digit() {
        let bad = RecordTable::new("1listings", "id", vec!["cover".to_string()]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let table = table();
        assert!(table.ensure_asset_column("cover").is_ok());
        assert!(matches!(
            table.ensure_asset_column("title"),
            Err(RecordStoreError::UnknownField(_))
        ));
    }
}
