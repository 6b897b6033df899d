//! Diagnostic records and reporters.
//!
//! One record is emitted per accepted edit. Reporters are write-only sinks;
//! nothing in the pipeline reads a diagnostic back.

use crate::rules::RuleKind;
use crate::text;
use colored::Colorize;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A diagnostic tied to a position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    /// 1-based byte column
    pub column: usize,
    pub severity: Severity,
    pub rule: RuleKind,
    pub code: &'static str,
    pub message: &'static str,
}

impl DiagnosticRecord {
    /// Build the warning for an accepted `rule` edit reported at byte
    /// `offset` of `source`.
    pub fn for_rule(file: &Path, source: &[u8], offset: usize, rule: RuleKind) -> Self {
        let (line, column) = text::line_col(source, offset);
        Self {
            file: file.to_path_buf(),
            line,
            column,
            severity: Severity::Warning,
            rule,
            code: rule.code(),
            message: rule.message(),
        }
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity,
            self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// `file:line:col: warning: message`
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Sink for diagnostics.
pub trait Reporter {
    fn report(&mut self, record: &DiagnosticRecord);

    /// Report a non-diagnostic problem (e.g. a failed write) to the user.
    fn warn(&mut self, message: &str);
}

/// Writes diagnostics to a stream (stderr by default).
pub struct StreamReporter<W: Write> {
    out: W,
    format: MessageFormat,
    color: bool,
}

impl StreamReporter<io::Stderr> {
    pub fn stderr(format: MessageFormat, color: bool) -> Self {
        Self::new(io::stderr(), format, color)
    }
}

impl<W: Write> StreamReporter<W> {
    pub fn new(out: W, format: MessageFormat, color: bool) -> Self {
        Self { out, format, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&self, record: &DiagnosticRecord) -> String {
        match self.format {
            MessageFormat::Json => {
                serde_json::to_string(record).unwrap_or_else(|_| record.to_string())
            }
            MessageFormat::Human if self.color => format!(
                "{}: {}: {}",
                format!(
                    "{}:{}:{}",
                    record.file.display(),
                    record.line,
                    record.column
                )
                .bold(),
                "warning".yellow().bold(),
                record.message.bold()
            ),
            MessageFormat::Human => record.to_string(),
        }
    }
}

impl<W: Write> Reporter for StreamReporter<W> {
    fn report(&mut self, record: &DiagnosticRecord) {
        let line = self.render(record);
        // A broken diagnostics stream must not stop the rewrite.
        let _ = writeln!(self.out, "{line}");
    }

    fn warn(&mut self, message: &str) {
        let line = match self.format {
            MessageFormat::Json => serde_json::json!({
                "severity": "warning",
                "message": message,
            })
            .to_string(),
            MessageFormat::Human if self.color => {
                format!("{}: {}", "warning".yellow().bold(), message)
            }
            MessageFormat::Human => format!("warning: {message}"),
        };
        let _ = writeln!(self.out, "{line}");
    }
}

/// Keeps diagnostics in memory, for library callers and tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub records: Vec<DiagnosticRecord>,
    pub warnings: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn report(&mut self, record: &DiagnosticRecord) {
        self.records.push(record.clone());
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}
