//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Generated 14 of 15 quotes in 42.3s
//!     gratitude      3
//!     mindfulness    3
//!     morning        3
//!     motivation     2
//!     positivity     3
//! Failed
//!     weather "Clouds are just the sky thinkin..."
//!         invalid quote: unknown category: "weather"
//! ```
//!
//! ## Freeze
//!
//! ```text
//! Home → index.html
//! Categories → 5 pages
//! Quotes → 128 pages
//! Pages
//!     about.html
//! Sitemap → 128 urls
//! Static → 131 files
//! Site frozen at build/
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::freeze::FreezeReport;
use crate::pipeline::RunSummary;
use std::path::PathBuf;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let seconds = summary.elapsed().num_milliseconds() as f64 / 1000.0;

    if summary.received == 0 {
        lines.push(format!(
            "No quotes received (requested {})",
            summary.requested
        ));
        return lines;
    }

    lines.push(format!(
        "Generated {} of {} quotes in {:.1}s",
        summary.succeeded, summary.received, seconds
    ));
    if summary.received < summary.requested {
        lines.push(format!(
            "{}Provider returned {} of {} requested",
            indent(1),
            summary.received,
            summary.requested
        ));
    }
    for (category, count) in &summary.per_category {
        lines.push(format!("{}{:<14} {}", indent(1), category.as_str(), count));
    }

    if !summary.failures.is_empty() {
        lines.push("Failed".to_string());
        for failure in &summary.failures {
            let category = if failure.category.is_empty() {
                "(none)"
            } else {
                failure.category.as_str()
            };
            lines.push(format!("{}{} {:?}", indent(1), category, failure.text_prefix));
            lines.push(format!("{}{}", indent(2), failure.reason));
        }
    }
    lines
}

pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Freeze
// ============================================================================

pub fn format_freeze_report(report: &FreezeReport) -> Vec<String> {
    let mut lines = vec![
        "Home \u{2192} index.html".to_string(),
        format!("Categories \u{2192} {} pages", report.category_pages),
        format!("Quotes \u{2192} {} pages", report.quote_pages),
    ];
    if report.skipped > 0 {
        lines.push(format!("{}{} unreadable quotes skipped", indent(1), report.skipped));
    }
    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
        for page in &report.pages {
            lines.push(format!("{}{}", indent(1), page));
        }
    }
    lines.push(format!("Sitemap \u{2192} {} urls", report.sitemap_urls));
    lines.push(format!("Static \u{2192} {} files", report.static_files));
    lines.push(format!("Site frozen at {}", report.output_dir.display()));
    lines
}

pub fn print_freeze_report(report: &FreezeReport) {
    for line in format_freeze_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// What `check` found about the environment a run would use.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub config_path: PathBuf,
    pub config_found: bool,
    pub provider: String,
    pub api_key_env: String,
    pub api_key_set: bool,
    pub categories: Vec<String>,
    /// Configured font paths and whether each one loads.
    pub fonts: Vec<(PathBuf, bool)>,
    pub background_dir: PathBuf,
    pub background_files: usize,
    pub database: PathBuf,
}

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mark = |ok: bool| if ok { "ok" } else { "missing" };
    let mut lines = Vec::new();

    lines.push("Config".to_string());
    let config_state = if report.config_found {
        "loaded"
    } else {
        "not found, using defaults"
    };
    lines.push(format!(
        "{}{} ({})",
        indent(1),
        report.config_path.display(),
        config_state
    ));

    lines.push("Provider".to_string());
    lines.push(format!("{}{}", indent(1), report.provider));
    lines.push(format!(
        "{}{}: {}",
        indent(1),
        report.api_key_env,
        mark(report.api_key_set)
    ));

    lines.push("Categories".to_string());
    lines.push(format!("{}{}", indent(1), report.categories.join(", ")));

    lines.push("Fonts".to_string());
    for (path, loads) in &report.fonts {
        lines.push(format!("{}{}: {}", indent(1), path.display(), mark(*loads)));
    }
    if !report.fonts.iter().any(|(_, loads)| *loads) {
        lines.push(format!("{}built-in bitmap font will be used", indent(1)));
    }

    lines.push("Backgrounds".to_string());
    if report.background_files == 0 {
        lines.push(format!(
            "{}{}: no images, solid color will be used",
            indent(1),
            report.background_dir.display()
        ));
    } else {
        lines.push(format!(
            "{}{}: {} images",
            indent(1),
            report.background_dir.display(),
            report.background_files
        ));
    }

    lines.push("Database".to_string());
    lines.push(format!("{}{}", indent(1), report.database.display()));
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}
