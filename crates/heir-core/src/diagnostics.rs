//! Diagnostics shared by every stage of the pipeline.
//!
//! The lexer, parser, binder, generator and every virtual machine instance
//! append to one [`DiagnosticBag`]. Nothing in the pipeline stops on a
//! diagnostic; callers inspect the bag once a stage (or the whole pipeline)
//! is done.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A span in the source code (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns a span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Resolves the start of the span to a 1-based `(line, column)` pair.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let mut line = 1;
        let mut column = 1;
        for (index, ch) in source.char_indices() {
            if index >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The program is wrong; results should not be trusted.
    Error,
    /// Suspicious but not necessarily wrong.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// H001
    UnexpectedCharacter,
    /// H002
    UnterminatedString,
    /// H002B
    UnterminatedChar,
    /// H003
    MalformedNumber,
    /// H004
    ExpectedToken,
    /// H005
    UnexpectedToken,
    /// H006
    InvalidAssignment,
    /// H007
    TypeMismatch,
    /// H008
    UnresolvedName,
    /// H009
    ArgumentCount,
    /// H010
    NoMatchingOperator,
    /// H011
    UnsupportedOperator,
    /// H012
    InvalidCoercion,
    /// H013
    NotCallable,
    /// H014
    NotIndexable,
    /// H015
    UnbalancedScope,
    /// H016
    CallDepthExceeded,
    /// H017
    StepLimitExceeded,
    /// H001C
    InvalidJumpTarget,
    /// H001D
    MalformedInstruction,
    /// HDEV
    StackCorruption,
}

impl DiagnosticCode {
    /// Returns the stable textual code.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnexpectedCharacter => "H001",
            DiagnosticCode::UnterminatedString => "H002",
            DiagnosticCode::UnterminatedChar => "H002B",
            DiagnosticCode::MalformedNumber => "H003",
            DiagnosticCode::ExpectedToken => "H004",
            DiagnosticCode::UnexpectedToken => "H005",
            DiagnosticCode::InvalidAssignment => "H006",
            DiagnosticCode::TypeMismatch => "H007",
            DiagnosticCode::UnresolvedName => "H008",
            DiagnosticCode::ArgumentCount => "H009",
            DiagnosticCode::NoMatchingOperator => "H010",
            DiagnosticCode::UnsupportedOperator => "H011",
            DiagnosticCode::InvalidCoercion => "H012",
            DiagnosticCode::NotCallable => "H013",
            DiagnosticCode::NotIndexable => "H014",
            DiagnosticCode::UnbalancedScope => "H015",
            DiagnosticCode::CallDepthExceeded => "H016",
            DiagnosticCode::StepLimitExceeded => "H017",
            DiagnosticCode::InvalidJumpTarget => "H001C",
            DiagnosticCode::MalformedInstruction => "H001D",
            DiagnosticCode::StackCorruption => "HDEV",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Stable code
    pub code: DiagnosticCode,
    /// Severity
    pub severity: Severity,
    /// Human readable message
    pub message: String,
    /// Source location the diagnostic is anchored to
    pub span: Span,
}

impl Diagnostic {
    /// Returns true if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Formats the diagnostic with a `line:column` location taken from `source`.
    pub fn render(&self, source: &str) -> String {
        let (line, column) = self.span.line_col(source);
        format!(
            "{}[{}] {}:{}: {}",
            self.severity, self.code, line, column, self.message
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// The shared, append-only diagnostics sink.
///
/// Cloning a bag returns another handle to the same collector.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl DiagnosticBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = diagnostic.code.as_str(),
            severity = %diagnostic.severity,
            start = diagnostic.span.start,
            "{}",
            diagnostic.message
        );
        self.entries.borrow_mut().push(diagnostic);
    }

    /// Reports an error.
    pub fn error(&self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
        });
    }

    /// Reports a warning.
    pub fn warning(&self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic {
            code,
            severity: Severity::Warning,
            message: message.into(),
            span,
        });
    }

    /// Number of diagnostics collected so far.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns true if at least one error has been reported.
    pub fn has_errors(&self) -> bool {
        self.entries.borrow().iter().any(Diagnostic::is_error)
    }

    /// Returns true if a diagnostic with `code` has been reported.
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.entries.borrow().iter().any(|d| d.code == code)
    }

    /// Copies the current contents out of the bag.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Drains the bag.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let bag = DiagnosticBag::new();
        let handle = bag.clone();
        handle.error(DiagnosticCode::UnexpectedToken, "boom", Span::new(0, 1));

        assert_eq!(bag.len(), 1);
        assert!(bag.has_errors());
        assert!(bag.contains(DiagnosticCode::UnexpectedToken));
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let bag = DiagnosticBag::new();
        bag.warning(DiagnosticCode::UnbalancedScope, "meh", Span::default());
        assert!(!bag.has_errors());
        assert_eq!(bag.take().len(), 1);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_render_line_col() {
        let source = "let a = 1\nlet b = @";
        let diagnostic = Diagnostic {
            code: DiagnosticCode::UnexpectedCharacter,
            severity: Severity::Error,
            message: "Unexpected character '@'".into(),
            span: Span::new(18, 19),
        };
        assert_eq!(
            diagnostic.render(source),
            "error[H001] 2:9: Unexpected character '@'"
        );
        assert_eq!(
            diagnostic.to_string(),
            "error[H001]: Unexpected character '@'"
        );
    }
}
