//! Push-log rendering for the blobgate CLI.
//!
//! Human-readable formatting over the core `PushLog`, used by the `log` and
//! `status` subcommands.

use anyhow::Result;
use blobgate_core::{PushLog, PushLogEntry};
use std::io::Write;
use std::path::Path;

/// Format a push-log entry for human-readable display.
pub fn format_entry(entry: &PushLogEntry) -> String {
    let date = chrono::DateTime::from_timestamp(entry.timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| entry.timestamp.to_string());

    let status = if entry.passed { "OK" } else { "BLOCKED" };
    let rev_short = entry.local_rev.get(..10).unwrap_or(&entry.local_rev);

    format!(
        "[{}] {} @{} | {} stored, {} uploaded, {} failed, {} missing | {}ms | {}{}",
        date,
        entry.remote_ref,
        rev_short,
        entry.summary.already_remote,
        entry.summary.uploaded,
        entry.summary.upload_failed,
        entry.summary.missing_locally,
        entry.duration_ms,
        status,
        entry
            .error
            .as_ref()
            .map(|e| format!(" ({})", e))
            .unwrap_or_default(),
    )
}

/// Print push-log entries for a repository, optionally filtered to one ref.
pub fn print_push_log(
    git_dir: &Path,
    ref_filter: Option<&str>,
    writer: &mut dyn Write,
) -> Result<()> {
    let log = PushLog::new(git_dir);
    let entries = match ref_filter {
        Some(r) => log.for_ref(r)?,
        None => log.all()?,
    };

    if entries.is_empty() {
        writeln!(writer, "No push log entries found.")?;
        return Ok(());
    }

    writeln!(writer, "Push Log ({} entries):", entries.len())?;
    writeln!(writer, "{}", "-".repeat(80))?;
    for entry in &entries {
        writeln!(writer, "  {}", format_entry(entry))?;
    }
    writeln!(writer, "{}", "-".repeat(80))?;

    let total_uploaded: u64 = entries.iter().map(|e| e.summary.uploaded).sum();
    let total_checked: u64 = entries.iter().map(|e| e.summary.total()).sum();
    let passes = entries.iter().filter(|e| e.passed).count();

    writeln!(
        writer,
        "Summary: {} pushes ({} allowed), {} objects checked, {} uploaded",
        entries.len(),
        passes,
        total_checked,
        total_uploaded,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobgate_core::RunSummary;
    use tempfile::TempDir;

    fn entry(passed: bool) -> PushLogEntry {
        PushLogEntry {
            remote_ref: "refs/heads/main".to_string(),
            local_rev: "abcdef0123456789".to_string(),
            timestamp: 1_700_000_000,
            summary: RunSummary {
                already_remote: 1,
                uploaded: 2,
                upload_failed: 0,
                missing_locally: if passed { 0 } else { 1 },
            },
            duration_ms: 17,
            passed,
            error: None,
        }
    }

    #[test]
    fn test_format_entry_passed() {
        let text = format_entry(&entry(true));
        assert!(text.contains("refs/heads/main @abcdef0123"));
        assert!(text.ends_with("OK"));
    }

    #[test]
    fn test_format_entry_blocked() {
        let text = format_entry(&entry(false));
        assert!(text.contains("1 missing"));
        assert!(text.ends_with("BLOCKED"));
    }

    #[test]
    fn test_print_push_log_empty() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        print_push_log(tmp.path(), None, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "No push log entries found.\n"
        );
    }

    #[test]
    fn test_print_push_log_totals() {
        let tmp = TempDir::new().unwrap();
        let log = PushLog::new(tmp.path());
        log.append(&entry(true)).unwrap();
        let mut blocked = entry(false);
        blocked.timestamp += 1;
        log.append(&blocked).unwrap();

        let mut out = Vec::new();
        print_push_log(tmp.path(), None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Push Log (2 entries):"));
        assert!(text.contains("2 pushes (1 allowed)"));
    }
}
