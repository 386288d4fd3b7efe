//! Compiler diagnostics as solc's standard-JSON interface reports them.
//!
//! The driver's type inference works by pattern-matching these messages, so
//! the model keeps solc's own vocabulary: a `category` such as `TypeError`
//! or `Warning` (solc's `type` field) next to the coarse `severity`.

use serde::{Deserialize, Serialize};

/// Warnings that are noise in a REPL where almost every statement is a
/// stateful one-off. Matched by substring, mirroring the messages solc emits.
pub const IGNORED_WARNINGS: &[&str] = &[
    "Statement has no effect.",
    "Function state mutability can be restricted to ",
    "Unused local variable.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Byte range into one of the submitted source files. solc uses `-1` for
/// "unknown", which is why the fields are signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: String,
    pub start: i64,
    pub end: i64,
}

/// A single compiler diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// solc's fine-grained kind: `TypeError`, `ParserError`, `Warning`, ...
    #[serde(rename = "type")]
    pub category: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            severity: Severity::Error,
            message: message.into(),
            formatted_message: None,
            source_location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            category: "Warning".to_string(),
            severity: Severity::Warning,
            message: message.into(),
            formatted_message: None,
            source_location: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether this warning is on the REPL ignore-list.
    pub fn is_ignorable(&self) -> bool {
        self.severity != Severity::Error
            && IGNORED_WARNINGS
                .iter()
                .any(|needle| self.message.contains(needle))
    }

    /// Byte span into the synthesized source, when solc attributed one.
    fn span(&self) -> Option<(usize, usize)> {
        let loc = self.source_location.as_ref()?;
        if loc.start < 0 || loc.end < loc.start {
            return None;
        }
        Some((loc.start as usize, loc.end as usize))
    }

    /// Render the diagnostic to stderr using ariadne, against the source
    /// that was submitted to the compiler. Falls back to a plain line when
    /// solc attached no usable location.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let (kind, color) = match self.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Info => (ReportKind::Advice, Color::Blue),
        };

        let Some((start, end)) = self.span() else {
            eprintln!("{}: {}", self.category, self.message);
            return;
        };
        let end = end.min(source.len());
        let start = start.min(end);

        let report = Report::build(kind, filename, start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.category)
                    .with_color(color),
            );

        let _ = report.finish().eprint((filename, Source::from(source)));
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
