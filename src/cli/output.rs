//! Shared CLI output helpers for consistent operator-facing text.

use std::fmt::Display;

use owo_colors::{OwoColorize, Stream};
use tabled::{Table, Tabled};

const RULE_WIDTH: usize = 56;

/// Print the tool name and version.
pub fn header() {
    println!(
        "{} {}",
        "tradedb".if_supports_color(Stream::Stdout, |t| t.bold()),
        env!("CARGO_PKG_VERSION").if_supports_color(Stream::Stdout, |t| t.dimmed())
    );
}

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.bold()));
    println!("{}", "─".repeat(RULE_WIDTH));
}

/// Print a simple key/value line.
pub fn key_value(label: &str, value: impl Display) {
    let label = format!("{label:<14}");
    println!(
        "{} {value}",
        label.if_supports_color(Stream::Stdout, |t| t.dimmed())
    );
}

/// Print a successful status line.
pub fn ok(message: &str) {
    println!("{} {message}", "✓".if_supports_color(Stream::Stdout, |t| t.green()));
}

/// Print a warning status line.
pub fn warn(message: &str) {
    println!("{} {message}", "⚠".if_supports_color(Stream::Stdout, |t| t.yellow()));
}

/// Print an error status line.
pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".if_supports_color(Stream::Stderr, |t| t.red()));
}

/// Print a single-line note.
pub fn note(message: &str) {
    println!("{message}");
}

/// Format a value in cyan.
pub fn highlight(value: impl Display) -> String {
    value
        .if_supports_color(Stream::Stdout, |t| t.cyan())
        .to_string()
}

/// Print rows as an indented table.
pub fn table<T: Tabled>(rows: Vec<T>) {
    let rendered = Table::new(rows).to_string();
    for line in rendered.lines() {
        println!("  {line}");
    }
}
