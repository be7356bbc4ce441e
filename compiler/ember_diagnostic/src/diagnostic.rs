use std::fmt;

use ember_ir::Span;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// Stable codes for the backend's error taxonomy.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// A construct's low-level type could not be determined.
    TypeInference,
    /// A template requested a helper key no configuration registered.
    UnregisteredDependency,
    /// A call resolver matched but received an unexpected argument count.
    UnsupportedArity,
    /// Single ownership of a heap value could not be proven.
    MemoryAliasing,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TypeInference => "E0101",
            ErrorCode::UnregisteredDependency => "E0201",
            ErrorCode::UnsupportedArity => "E0301",
            ErrorCode::MemoryAliasing => "E0401",
        }
    }

    /// Whether a diagnostic with this code aborts the whole compilation.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::UnregisteredDependency)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic message with location and optional notes.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn note(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Note,
            code,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    /// Attach an explanatory note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} ({:?})",
            self.severity, self.code, self.message, self.span
        )?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_code_and_notes() {
        let diag = Diagnostic::error(
            ErrorCode::TypeInference,
            "cannot unify branch types",
            Span::new(3, 9),
        )
        .with_note("then-branch is a string, else-branch is a number");

        let text = diag.to_string();
        assert!(text.contains("E0101"));
        assert!(text.contains("cannot unify branch types"));
        assert!(text.contains("then-branch is a string"));
    }

    #[test]
    fn only_unregistered_dependency_is_fatal() {
        assert!(ErrorCode::UnregisteredDependency.is_fatal());
        assert!(!ErrorCode::TypeInference.is_fatal());
        assert!(!ErrorCode::UnsupportedArity.is_fatal());
        assert!(!ErrorCode::MemoryAliasing.is_fatal());
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Note.to_string(), "note");
    }
}
