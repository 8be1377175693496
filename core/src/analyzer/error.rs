use crate::api::{Diagnostic, Severity};
use crate::parser::{ParseError, ParseErrorKind, Span};

/// Compile error with the offending location.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub source: String,
    pub span: Span,
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(f, "{}: {}", diagnostic.severity, diagnostic.message)?;

        if let Some(ref code) = diagnostic.code {
            write!(f, " [{}]", code)?;
        }

        if let Some(ref help) = diagnostic.help {
            write!(f, "\nhelp: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Specific kinds of compile errors
#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    /// The source text is not well formed.
    Parse(ParseErrorKind),
    /// Identifier that is neither declared, an input, an import nor a class.
    UnresolvedSymbol { name: String },
    /// Member access that cannot be resolved on the receiver's type.
    UnresolvedMember { receiver: String, member: String },
    /// A value of one type cannot be stored where another is required.
    IllegalCoercion { from: String, to: String },
    /// No method of that name accepts the given arguments.
    NoSuchMethod {
        receiver: String,
        name: String,
        args: Vec<String>,
    },
    /// Several overloads are equally specific.
    AmbiguousOverload {
        receiver: String,
        name: String,
        candidates: Vec<String>,
    },
    /// Operator applied to operands it is not defined for.
    InvalidOperands {
        op: String,
        left: String,
        right: String,
    },
    /// Type name that names no known class.
    UnknownType { name: String },
    /// Expression on the left of an assignment that cannot be written.
    NotAssignable { what: String },
    /// Cannot index into a non-indexable type
    NotIndexable { ty: String },
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, source: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            source: source.into(),
            span,
        }
    }

    /// The identifier or member the error is about, when there is one.
    pub fn subject(&self) -> Option<&str> {
        match &self.kind {
            CompileErrorKind::UnresolvedSymbol { name } => Some(name),
            CompileErrorKind::UnresolvedMember { member, .. } => Some(member),
            CompileErrorKind::NoSuchMethod { name, .. }
            | CompileErrorKind::AmbiguousOverload { name, .. } => Some(name),
            CompileErrorKind::UnknownType { name } => Some(name),
            _ => None,
        }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            CompileErrorKind::Parse(kind) => {
                return ParseError::new(kind.clone(), self.source.clone(), self.span.clone())
                    .to_diagnostic();
            }
            CompileErrorKind::UnresolvedSymbol { name } => (
                format!("Unresolved identifier '{}'", name),
                "E001",
                Some("Declare it, or register it as an input of the expression"),
            ),
            CompileErrorKind::UnresolvedMember { receiver, member } => (
                format!("Cannot resolve member '{}' of {}", member, receiver),
                "E002",
                None,
            ),
            CompileErrorKind::IllegalCoercion { from, to } => (
                format!("Cannot convert {} to {}", from, to),
                "E003",
                Some("Register a conversion handler for the target type or convert explicitly"),
            ),
            CompileErrorKind::NoSuchMethod {
                receiver,
                name,
                args,
            } => (
                format!(
                    "No method {}.{}({}) accepts these arguments",
                    receiver,
                    name,
                    args.join(", ")
                ),
                "E004",
                Some("Check the number and types of the arguments"),
            ),
            CompileErrorKind::AmbiguousOverload {
                receiver,
                name,
                candidates,
            } => (
                format!(
                    "Ambiguous call to {}.{}: candidates are {}",
                    receiver,
                    name,
                    candidates.join(", ")
                ),
                "E005",
                Some("Cast the arguments to select one overload"),
            ),
            CompileErrorKind::InvalidOperands { op, left, right } => (
                format!("Operator '{}' cannot be applied to {} and {}", op, left, right),
                "E006",
                None,
            ),
            CompileErrorKind::UnknownType { name } => (
                format!("Unknown type '{}'", name),
                "E007",
                Some("Import the class or register it with the engine"),
            ),
            CompileErrorKind::NotAssignable { what } => (
                format!("Cannot assign to {}", what),
                "E008",
                None,
            ),
            CompileErrorKind::NotIndexable { ty } => (
                format!("Cannot index into non-indexable type '{}'", ty),
                "E009",
                Some("Only lists, arrays and maps can be indexed"),
            ),
        };

        Diagnostic {
            severity: Severity::Error,
            message,
            span: self.span.clone(),
            related: Vec::new(),
            help: help.map(|s| s.to_string()),
            code: Some(code.to_string()),
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        Self {
            kind: CompileErrorKind::Parse(err.kind),
            source: err.source,
            span: err.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_to_diagnostic() {
        let error = CompileError::new(
            CompileErrorKind::UnresolvedSymbol {
                name: "foo".to_string(),
            },
            "foo.bar",
            Span(0..3),
        );

        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.message, "Unresolved identifier 'foo'");
        assert_eq!(diagnostic.code, Some("E001".to_string()));
        assert_eq!(error.subject(), Some("foo"));
    }

    #[test]
    fn test_parse_errors_keep_their_codes() {
        let error = CompileError::from(ParseError::new(
            ParseErrorKind::MaxDepthExceeded { max_depth: 3 },
            "((1))".to_string(),
            Span(0..1),
        ));
        assert_eq!(error.to_diagnostic().code, Some("P004".to_string()));
        assert!(error.to_string().starts_with("error: Expression nesting depth"));
    }
}
