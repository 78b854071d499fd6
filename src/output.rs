use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Global output format setting
static OUTPUT_JSON: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_json_output(json: bool) {
    OUTPUT_JSON.store(json, Ordering::Relaxed);
}

pub fn is_json_output() -> bool {
    OUTPUT_JSON.load(Ordering::Relaxed)
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a table or JSON depending on output mode
pub fn print_table<T, R, F>(items: &[T], to_row: F)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
    } else {
        display(item);
    }
}

/// Print a message (simple object in JSON mode, nothing when quiet)
pub fn print_message(message: &str) {
    if is_json_output() {
        println!("{}", serde_json::json!({ "message": message }));
    } else if !is_quiet() {
        println!("{message}");
    }
}

/// Format a work item state with color
pub fn state_colored(state: &str) -> String {
    let lower = state.to_lowercase();
    if lower.contains("done") || lower.contains("closed") || lower.contains("resolved") {
        state.green().to_string()
    } else if lower.contains("active") || lower.contains("progress") || lower.contains("committed") {
        state.blue().to_string()
    } else if lower.contains("removed") || lower.contains("blocked") {
        state.red().to_string()
    } else if lower == "new" || lower.contains("proposed") {
        state.bright_black().to_string()
    } else {
        state.to_string()
    }
}

/// Local `YYYY-MM-DD HH:MM`, or `-` when unknown
pub fn format_date(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(dt) => {
            let local: DateTime<Local> = dt.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "-".to_string(),
    }
}

/// Effort in days without a trailing `.0`
pub fn format_days(days: f64) -> String {
    if days.fract() == 0.0 {
        format!("{days:.0}")
    } else {
        format!("{days:.1}")
    }
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Überweisung abschließen", 10), "Überwei...");
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(6.0), "6");
        assert_eq!(format_days(2.5), "2.5");
    }

    #[test]
    fn test_format_date_unknown() {
        assert_eq!(format_date(None), "-");
    }
}
