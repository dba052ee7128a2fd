//! `medrec audit` command implementation
//!
//! Read-only scan: classifies every stored reference and checks local file
//! existence. Nothing is uploaded and no record is written, so it is safe to
//! run against production at any time.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use medrec_core::{
    classify, AssetReference, ClassifierConfig, LocalResolver, PgRecordStore, RecordStore,
    Resolved,
};

use crate::config::AppConfig;
use crate::error::Result;
use crate::progress;

#[derive(Debug, Default)]
struct AuditCounts {
    empty: usize,
    trusted_url: usize,
    foreign_url: usize,
    remote_identifier: usize,
    local_present: usize,
    local_missing: usize,
    unresolvable: usize,
}

/// Scan and classify stored references. Always clean; failures here are
/// findings, not errors.
pub async fn run(config: AppConfig, limit: Option<usize>, examples: usize) -> Result<bool> {
    let records = PgRecordStore::connect(&config.database_url, config.table.clone()).await?;
    let units = records.list_asset_fields(&config.fields, limit).await?;

    let classifier = ClassifierConfig::new(config.trusted_host.clone());
    let resolver = LocalResolver::new(&config.media_root);

    let mut counts = AuditCounts::default();
    let mut missing_examples: Vec<(String, String, String)> = Vec::new();
    let mut unresolvable_examples: Vec<(String, String, String)> = Vec::new();

    let pb = progress::create_progress_bar(units.len() as u64, "Auditing media references");
    for unit in &units {
        match classify(&unit.raw, &classifier) {
            AssetReference::Empty => counts.empty += 1,
            AssetReference::RemoteUrl { trusted: true, .. } => counts.trusted_url += 1,
            AssetReference::RemoteUrl { trusted: false, .. } => counts.foreign_url += 1,
            AssetReference::RemoteIdentifier(_) => counts.remote_identifier += 1,
            AssetReference::LocalPath(rel) => match resolver.resolve(&rel) {
                Resolved::Found(_) => counts.local_present += 1,
                Resolved::NotFound { expected } => {
                    counts.local_missing += 1;
                    if missing_examples.len() < examples {
                        missing_examples.push((
                            unit.record_key.clone(),
                            unit.field.clone(),
                            expected.display().to_string(),
                        ));
                    }
                }
            },
            AssetReference::Unresolvable(raw) => {
                counts.unresolvable += 1;
                if unresolvable_examples.len() < examples {
                    unresolvable_examples.push((
                        unit.record_key.clone(),
                        unit.field.clone(),
                        raw,
                    ));
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("{}", counts_table(&counts, units.len()));

    if !missing_examples.is_empty() {
        println!("\n{} Missing local files:", "?".yellow().bold());
        for (key, field, expected) in &missing_examples {
            println!("  {}.{}: expected '{}'", key, field, expected);
        }
        if counts.local_missing > missing_examples.len() {
            println!(
                "  ... and {} more",
                counts.local_missing - missing_examples.len()
            );
        }
    }

    if !unresolvable_examples.is_empty() {
        println!("\n{} Unrecognized references:", "✗".red().bold());
        for (key, field, raw) in &unresolvable_examples {
            println!("  {}.{}: '{}'", key, field, raw);
        }
        if counts.unresolvable > unresolvable_examples.len() {
            println!(
                "  ... and {} more",
                counts.unresolvable - unresolvable_examples.len()
            );
        }
    }

    Ok(true)
}

fn counts_table(counts: &AuditCounts, total: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category", "Count"]);

    table.add_row(vec!["total".to_string(), total.to_string()]);
    table.add_row(vec!["empty".to_string(), counts.empty.to_string()]);
    table.add_row(vec![
        "trusted URL".to_string(),
        counts.trusted_url.to_string(),
    ]);
    table.add_row(vec![
        "foreign URL".to_string(),
        counts.foreign_url.to_string(),
    ]);
    table.add_row(vec![
        "remote identifier".to_string(),
        counts.remote_identifier.to_string(),
    ]);
    table.add_row(vec![
        "local file present".to_string(),
        counts.local_present.to_string(),
    ]);
    table.add_row(vec![
        "local file missing".to_string(),
        counts.local_missing.to_string(),
    ]);
    table.add_row(vec![
        "unrecognized".to_string(),
        counts.unresolvable.to_string(),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_table_lists_every_category() {
        let counts = AuditCounts {
            empty: 1,
            trusted_url: 2,
            foreign_url: 3,
            remote_identifier: 4,
            local_present: 5,
            local_missing: 6,
            unresolvable: 7,
        };
        let rendered = counts_table(&counts, 28).to_string();
        for label in [
            "total",
            "empty",
            "trusted URL",
            "foreign URL",
            "remote identifier",
            "local file present",
            "local file missing",
            "unrecognized",
        ] {
            assert!(rendered.contains(label), "missing label: {label}");
        }
    }
}
