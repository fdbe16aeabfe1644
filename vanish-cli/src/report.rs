//! Plain-text output of the query commands and batch summaries.

use std::fmt::{self, Write};
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use vanish_core::audit::AuditSummary;
use vanish_core::engine::query;
use vanish_core::engine::workflow::RequestKind;
use vanish_core::{CacheEntry, CacheStats, Phase, Workflow, format_count, format_size};

const LIST_DATE: &str = "%Y-%m-%d %H:%M";
const FULL_DATE: &str = "%Y-%m-%d %H:%M:%S";

fn local(ts: DateTime<Utc>) -> DateTime<Local> {
    ts.with_timezone(&Local)
}

/// `--list`: one line per entry, newest first.
pub fn write_list(
    out: &mut impl Write,
    entries: &[CacheEntry],
    retention_days: u32,
    now: DateTime<Utc>,
) -> fmt::Result {
    if entries.is_empty() {
        return writeln!(out, "No cached files found.");
    }

    writeln!(out, "Cached Files ({} items):", entries.len())?;
    writeln!(out, "{}", "=".repeat(80))?;
    for entry in entries {
        let kind = if entry.is_directory { "DIR " } else { "FILE" };
        let remaining = match query::expires_at(entry, retention_days) {
            Some(_) => format!("{} days left", query::days_left(entry, retention_days, now)),
            None => "never expires".to_string(),
        };
        writeln!(
            out,
            "{} | {} | {:>8} | {} | {} | {}",
            kind,
            local(entry.delete_time).format(LIST_DATE),
            format_size(entry.size_bytes),
            query::expiry_status(entry, retention_days, now).as_str(),
            remaining,
            entry.original_path.display(),
        )?;
    }
    Ok(())
}

/// `--info <pattern>`: full details of every match.
pub fn write_info(
    out: &mut impl Write,
    pattern: &str,
    entries: &[CacheEntry],
    retention_days: u32,
    now: DateTime<Utc>,
) -> fmt::Result {
    if entries.is_empty() {
        return writeln!(
            out,
            "No cached item matches \"{pattern}\". Try \"vx --list\" to see every cached item."
        );
    }

    writeln!(out, "Found {} matching item(s) in the cache:", entries.len())?;
    writeln!(out, "{}", "=".repeat(60))?;

    for entry in entries {
        writeln!(out)?;
        writeln!(out, "ID: {}", entry.id)?;
        writeln!(out, "Original Path: {}", entry.original_path.display())?;
        writeln!(out, "Cache Path: {}", entry.cache_path.display())?;
        writeln!(out, "Deleted: {}", local(entry.delete_time).format(FULL_DATE))?;
        writeln!(
            out,
            "Type: {}",
            if entry.is_directory { "Directory" } else { "File" }
        )?;
        writeln!(out, "Size: {}", format_size(entry.size_bytes))?;
        if entry.file_count > 0 {
            writeln!(out, "Files Inside: {}", format_count(entry.file_count))?;
        }
        if entry.protected {
            writeln!(out, "Protected: yes")?;
        }

        let days_left = query::days_left(entry, retention_days, now);
        match query::expires_at(entry, retention_days) {
            None => writeln!(out, "Expires: never")?,
            Some(at) if days_left > 0 => writeln!(
                out,
                "Expires: {} ({} days left)",
                local(at).format(FULL_DATE),
                days_left
            )?,
            Some(_) => writeln!(out, "Status: EXPIRED (can be purged)")?,
        }
        writeln!(out, "Restore with: vx --restore {}", entry.id)?;
    }
    Ok(())
}

/// `--stats`
pub fn write_stats(out: &mut impl Write, stats: &CacheStats, cache_dir: &Path) -> fmt::Result {
    if stats.total_items == 0 {
        return writeln!(out, "Cache is empty.");
    }

    writeln!(out, "Vanish Cache Statistics")?;
    writeln!(out, "=======================")?;
    writeln!(out, "Cache Directory: {}", cache_dir.display())?;
    writeln!(out, "Total Items: {}", stats.total_items)?;
    writeln!(out, "  Files: {}", stats.files)?;
    writeln!(out, "  Directories: {}", stats.directories)?;
    writeln!(out, "Total Size: {}", format_size(stats.total_size))?;
    writeln!(out, "Retention Period: {} days", stats.retention_days)?;
    writeln!(out, "Expired Items: {}", stats.expired)?;

    if stats.expired > 0 {
        writeln!(out)?;
        writeln!(
            out,
            "Run 'vx --purge {}' to clean up expired items.",
            stats.retention_days
        )?;
    }
    Ok(())
}

/// `--log-stats`
pub fn write_log_stats(out: &mut impl Write, summary: &AuditSummary) -> fmt::Result {
    if summary.total_operations == 0 {
        return writeln!(out, "No operations recorded.");
    }

    writeln!(out, "Vanish Operation Log")?;
    writeln!(out, "====================")?;
    writeln!(out, "Total Operations: {}", format_count(summary.total_operations as u64))?;
    for (operation, count) in &summary.by_operation {
        writeln!(out, "  {operation}: {count}")?;
    }
    writeln!(out, "Total Size: {}", format_size(summary.total_size))?;
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        writeln!(out, "First: {}", first.format(FULL_DATE))?;
        writeln!(out, "Last: {}", last.format(FULL_DATE))?;
    }
    Ok(())
}

/// Plain-text confirmation prompt body for non-interactive runs.
pub fn write_confirmation(out: &mut impl Write, workflow: &Workflow, retention_days: u32) -> fmt::Result {
    if workflow.kind() == RequestKind::Restore {
        writeln!(out, "Restore the following items?")?;
        for entry in workflow.candidates() {
            writeln!(
                out,
                "  {} (deleted: {})",
                entry.original_path.display(),
                local(entry.delete_time).format(LIST_DATE)
            )?;
        }
        return writeln!(out, "Total items to restore: {}", workflow.candidates().len());
    }

    writeln!(out, "Move the following items to the cache?")?;
    let mut total = 0;
    for target in workflow.targets() {
        total += target.size();
        let mut notes = Vec::new();
        if target.verdict.protected {
            notes.push("protected".to_string());
        }
        if target.verdict.large {
            notes.push("large".to_string());
        }
        if target.is_directory {
            notes.push(format!("{} items", format_count(target.file_count())));
        }
        write!(out, "  {} ({}", target.path.display(), format_size(target.size()))?;
        for note in notes {
            write!(out, ", {note}")?;
        }
        writeln!(out, ")")?;
    }
    writeln!(
        out,
        "Total: {} | Recoverable for {} days",
        format_size(total),
        retention_days
    )
}

/// Verb for a finished request, e.g. "Moved".
fn past_tense(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Delete => "Moved",
        RequestKind::Restore => "Restored",
        RequestKind::Clear => "Cleared",
        RequestKind::Purge => "Purged",
    }
}

/// Short headline for a terminal workflow, shared by the TUI and plain output.
pub fn headline(workflow: &Workflow) -> String {
    let report = workflow.report();
    match workflow.phase() {
        Phase::Error => workflow.message().unwrap_or("Operation failed").to_string(),
        Phase::Cancelled => "Operation cancelled".to_string(),
        _ => match workflow.kind() {
            RequestKind::Clear => "Cache cleared".to_string(),
            RequestKind::Purge => format!("Purged {} item(s)", report.purged),
            kind => format!(
                "{} {} of {} item(s) ({})",
                past_tense(kind),
                report.succeeded(),
                workflow.total(),
                format_size(report.bytes_processed)
            ),
        },
    }
}

/// Everything worth printing once a workflow has ended.
pub fn write_summary(out: &mut impl Write, workflow: &Workflow, retention_days: u32) -> fmt::Result {
    let report = workflow.report();
    writeln!(out, "{}", headline(workflow))?;

    for failure in &report.failures {
        writeln!(out, "  {}", failure.message)?;
    }
    if !report.skipped.is_empty() {
        writeln!(out, "  skipped: {} item(s)", report.skipped.len())?;
    }

    if workflow.phase() == Phase::Done && workflow.kind() == RequestKind::Delete {
        if report.succeeded() > 0 {
            writeln!(out, "Recoverable for {retention_days} days with vx --restore")?;
        }
        if report.purged > 0 {
            writeln!(out, "Removed {} expired item(s)", report.purged)?;
        }
    }
    Ok(())
}
