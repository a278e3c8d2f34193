//! Diagnostics shared by every pipeline stage.
//!
//! Each file gets its own [`Diagnostics`] sink. Stages append to it; the
//! driver reads it once the file is done and suppresses output when any
//! entry is [`Severity::Fatal`].

use serde::Serialize;
use std::fmt;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Translation proceeds, but the user should look at the output.
    Warning,
    /// The file is not emitted.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Fatal => write!(f, "error"),
        }
    }
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lex,
    Parse,
    Lower,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Lower => "lower",
            Stage::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// A single problem found while translating a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{line}: {severity}[{stage}]: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn fatal(stage: Stage, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            stage,
            message: message.into(),
            line,
        }
    }

    pub fn warning(stage: Stage, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            message: message.into(),
            line,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

/// Append-only sink for one file's diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn fatal(&mut self, stage: Stage, line: usize, message: impl Into<String>) {
        self.push(Diagnostic::fatal(stage, line, message));
    }

    pub fn warning(&mut self, stage: Stage, line: usize, message: impl Into<String>) {
        self.push(Diagnostic::warning(stage, line, message));
    }

    /// True when at least one fatal diagnostic was recorded.
    pub fn has_fatal(&self) -> bool {
        self.items.iter().any(Diagnostic::is_fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_fatal()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.len() - self.fatal_count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let d = Diagnostic::fatal(Stage::Lower, 12, "loop bound draws a random number");
        assert_eq!(
            d.to_string(),
            "12: error[lower]: loop bound draws a random number"
        );
    }

    #[test]
    fn test_sink_counts() {
        let mut sink = Diagnostics::new();
        assert!(!sink.has_fatal());
        sink.warning(Stage::Lower, 1, "dynamic index");
        sink.warning(Stage::Lower, 2, "dynamic index");
        assert!(!sink.has_fatal());
        sink.fatal(Stage::Parse, 3, "unexpected token");
        assert!(sink.has_fatal());
        assert_eq!(sink.fatal_count(), 1);
        assert_eq!(sink.warning_count(), 2);
        assert_eq!(sink.len(), 3);
    }
}
