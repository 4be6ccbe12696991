//! Diagnostic values and the fixed elaboration message templates.

use std::fmt;

use vero_ir::Span;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
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

/// A single diagnostic: code, severity, message, primary span.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    /// *"Cannot use heap-accessing construct (\<usage\>) here"* — the
    /// construct touches the heap but no heap binding exists at all.
    pub fn cannot_use_heap_construct(usage: &str, span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0901,
            format!("Cannot use heap-accessing construct ({usage}) here"),
            span,
        )
    }

    /// *"Cannot \<usage\> without a reads clause"*.
    pub fn missing_reads_clause(usage: &str, span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0902,
            format!("Cannot {usage} without a reads clause"),
            span,
        )
    }

    /// *"Cannot \<usage\> without a modifies clause"*.
    pub fn missing_modifies_clause(usage: &str, span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0903,
            format!("Cannot {usage} without a modifies clause"),
            span,
        )
    }

    /// *"Can't modify heap in read-only context"*.
    pub fn modify_in_read_only_context(span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0904,
            "Can't modify heap in read-only context",
            span,
        )
    }

    /// A heap class stores a function value in a field; the encoding
    /// cannot thread the heap through first-class functions.
    pub fn function_valued_field(class: &str, field: &str, span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0905,
            format!("Field `{field}` of heap class `{class}` has a function type, which is not supported"),
            span,
        )
    }

    /// The class hierarchy contains a parent cycle.
    pub fn class_hierarchy_cycle(class: &str, span: Span) -> Self {
        Diagnostic::error(
            ErrorCode::E0906,
            format!("Cycle in the class hierarchy involving `{class}`"),
            span,
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] at {}: {}",
            self.severity, self.code, self.span, self.message
        )
    }
}
