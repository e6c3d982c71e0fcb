//! CLI output formatting utilities.
//!
//! Colored status lines for terminal output, plus JSON output for scripting.

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Kind of a one-line status message. Warnings go to stderr, everything else
/// to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Success,
  Warning,
  Info,
}

impl Status {
  pub fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Warning => "⚠",
      Status::Info => "•",
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Warning => Stream::Stderr,
      Status::Success | Status::Info => Stream::Stdout,
    }
  }

  /// The symbol and message as one line, colored when the target stream
  /// supports it. Only warnings color the message too.
  pub fn line(self, message: &str) -> String {
    let stream = self.stream();
    let symbol = self.symbol();
    match self {
      Status::Success => format!("{} {}", symbol.if_supports_color(stream, |s| s.green()), message),
      Status::Info => format!("{} {}", symbol.if_supports_color(stream, |s| s.blue()), message),
      Status::Warning => format!(
        "{} {}",
        symbol.if_supports_color(stream, |s| s.yellow()),
        message.if_supports_color(stream, |s| s.yellow())
      ),
    }
  }
}

/// Width labels of [`print_stat`] are padded to, so values line up.
const STAT_LABEL_WIDTH: usize = 8;

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;

  if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn print_status(status: Status, message: &str) {
  let line = status.line(message);
  match status.stream() {
    Stream::Stderr => eprintln!("{}", line),
    _ => println!("{}", line),
  }
}

pub fn stat_line(label: &str, value: &str) -> String {
  let padded = format!("{:<width$}", format!("{}:", label), width = STAT_LABEL_WIDTH + 1);
  format!("  {} {}", padded.if_supports_color(Stream::Stdout, |s| s.dimmed()), value)
}

pub fn print_stat(label: &str, value: &str) {
  println!("{}", stat_line(label, value));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
