//! Terminal rendering of batch summaries

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use medrec_core::{BatchSummary, Outcome};

/// Build the counts table for a finished batch.
pub fn counts_table(summary: &BatchSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Outcome", "Count"]);

    table.add_row(vec!["total".to_string(), summary.total.to_string()]);
    table.add_row(vec!["uploaded".to_string(), summary.uploaded.to_string()]);
    for (reason, count) in &summary.skip_reasons {
        table.add_row(vec![format!("skipped ({reason})"), count.to_string()]);
    }
    table.add_row(vec![
        "missing local".to_string(),
        summary.missing_local.to_string(),
    ]);
    table.add_row(vec![
        "upload failed".to_string(),
        summary.upload_failed.to_string(),
    ]);
    table.add_row(vec![
        "save failed".to_string(),
        summary.save_failed.to_string(),
    ]);
    table
}

/// One-line description of a non-skip outcome.
pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Skipped { reason } => format!("skipped ({reason})"),
        Outcome::UploadedAndNormalized { identifier } => {
            format!("uploaded and normalized to '{identifier}'")
        }
        Outcome::MissingLocalFile { expected_path } => {
            format!("local file missing, expected '{expected_path}'")
        }
        Outcome::UploadFailed { cause } => format!("upload failed: {cause}"),
        Outcome::SaveFailed { cause } => format!("record save failed: {cause}"),
    }
}

/// Print the counts table and every non-skip outcome.
pub fn print_summary(summary: &BatchSummary) {
    println!("{}", counts_table(summary));

    for detail in &summary.details {
        let glyph = match &detail.outcome {
            Outcome::Skipped { .. } => continue,
            Outcome::UploadedAndNormalized { .. } => "✓".green(),
            Outcome::MissingLocalFile { .. } => "?".yellow(),
            Outcome::UploadFailed { .. } | Outcome::SaveFailed { .. } => "✗".red(),
        };
        println!(
            "{} {}.{}: {}",
            glyph,
            detail.record_key,
            detail.field,
            describe(&detail.outcome)
        );
    }

    if let Some(cause) = &summary.aborted {
        println!();
        println!("{} Batch aborted early: {}", "✗".red().bold(), cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrec_core::{Reporter, SkipReason};

    fn sample_summary() -> BatchSummary {
        let mut reporter = Reporter::new();
        reporter.record(
            "1".into(),
            "cover".into(),
            Outcome::Skipped {
                reason: SkipReason::Empty,
            },
        );
        reporter.record(
            "2".into(),
            "cover".into(),
            Outcome::UploadedAndNormalized {
                identifier: "properties/house-abc123.jpg".into(),
            },
        );
        reporter.record(
            "3".into(),
            "gallery1".into(),
            Outcome::MissingLocalFile {
                expected_path: "/media/properties/gone.jpg".into(),
            },
        );
        reporter.finish()
    }

    #[test]
    fn test_counts_table_lists_every_kind() {
        let rendered = counts_table(&sample_summary()).to_string();
        assert!(rendered.contains("total"));
        assert!(rendered.contains("uploaded"));
        assert!(rendered.contains("skipped (empty)"));
        assert!(rendered.contains("missing local"));
    }

    #[test]
    fn test_describe_names_the_identifier() {
        let desc = describe(&Outcome::UploadedAndNormalized {
            identifier: "properties/house-abc123.jpg".into(),
        });
        assert!(desc.contains("properties/house-abc123.jpg"));
    }

    #[test]
    fn test_describe_names_the_expected_path() {
        let desc = describe(&Outcome::MissingLocalFile {
            expected_path: "/media/properties/gone.jpg".into(),
        });
        assert!(desc.contains("/media/properties/gone.jpg"));
    }
}
