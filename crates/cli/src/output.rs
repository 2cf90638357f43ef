//! Human-readable and line-oriented output.

use serde_json::{Value, json};
use std::fmt;
use thaw_core::{ChunkRef, ReconciliationReport};

/// Plain-text rendering of a reconciliation report.
pub struct TextReport<'a>(pub &'a ReconciliationReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        write!(f, "Restore reconciliation")?;
        if report.dry_run {
            write!(f, " (dry run)")?;
        }
        if report.cancelled {
            write!(f, " (cancelled, partial results)")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "  total:          {} files, {}",
            report.totals.total_files,
            format_bytes(report.totals.total_size_bytes)
        )?;
        writeln!(
            f,
            "  needs restore:  {} files, {}",
            report.totals.restore_candidate_count,
            format_bytes(report.totals.restore_candidate_size_bytes)
        )?;
        writeln!(f, "  probe failures: {}", report.totals.probe_failures)?;

        if !report.tenants.is_empty() {
            writeln!(f, "Tenants:")?;
            for stats in &report.tenants {
                writeln!(
                    f,
                    "  {}: {} files, {}; {} need restore, {}; {} probe failures",
                    stats.tenant,
                    stats.totals.total_files,
                    format_bytes(stats.totals.total_size_bytes),
                    stats.totals.restore_candidate_count,
                    format_bytes(stats.totals.restore_candidate_size_bytes),
                    stats.totals.probe_failures
                )?;
            }
        }

        if !report.dry_run {
            writeln!(
                f,
                "Restores: {} requested, {} failed",
                report.dispatch_succeeded(),
                report.dispatch_failed()
            )?;
            for outcome in report.dispatch_outcomes.iter().filter(|o| !o.succeeded) {
                writeln!(
                    f,
                    "  FAILED {}: {}",
                    outcome.key,
                    outcome.error.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
        Ok(())
    }
}

/// JSON line describing one chunk reference and its storage key.
pub fn chunk_line(chunk: &ChunkRef) -> Value {
    json!({
        "tenant": chunk.tenant,
        "fingerprint": format!("{:016x}", chunk.fingerprint),
        "from": chunk.from,
        "through": chunk.through,
        "checksum": format!("{:x}", chunk.checksum),
        "key": chunk.storage_key(),
    })
}

/// Format bytes as a human-readable size.
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    const TIB: u64 = GIB * 1024;

    if bytes >= TIB {
        format!("{:.2} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_core::{DispatchOutcome, ObjectState};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(1_048_576), "1.00 MiB");
    }

    #[test]
    fn test_text_report_lists_failures() {
        let chunk = ChunkRef::new("acme", 0xabcd, 0, 1, 0x12).unwrap();
        let mut report = ReconciliationReport::new(["acme"]);
        report.record_probe(
            "acme",
            &ObjectState {
                size_bytes: 2048,
                storage_class: "DEEP_ARCHIVE".to_string(),
                restore_pending: false,
                needs_restore: true,
            },
            false,
        );
        report.record_dispatch(DispatchOutcome::failure(chunk.storage_key(), "access denied"));

        let text = TextReport(&report).to_string();
        assert!(text.contains("total:          1 files, 2.00 KiB"));
        assert!(text.contains("acme: 1 files"));
        assert!(text.contains("Restores: 0 requested, 1 failed"));
        assert!(text.contains("FAILED acme/000000000000abcd/0:1:12: access denied"));
    }

    #[test]
    fn test_text_report_dry_run_omits_restores() {
        let mut report = ReconciliationReport::new(["acme"]);
        report.dry_run = true;
        let text = TextReport(&report).to_string();
        assert!(text.starts_with("Restore reconciliation (dry run)"));
        assert!(!text.contains("Restores:"));
    }

    #[test]
    fn test_chunk_line() {
        let chunk = ChunkRef::new("acme", 0xabcd, 1704067200000, 1704070800000, 0x1234).unwrap();
        let line = chunk_line(&chunk);
        assert_eq!(line["fingerprint"], "000000000000abcd");
        assert_eq!(line["checksum"], "1234");
        assert_eq!(
            line["key"],
            "acme/000000000000abcd/18cc251f400:18cc288e280:1234"
        );
    }
}
