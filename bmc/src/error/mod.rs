//! Error types and reporting

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error
#[derive(Debug, Error)]
pub enum CompileError {
    /// Lexical or syntactic error with a source position
    #[error("parse error at {line}:{column}: {message}")]
    Parser {
        message: String,
        line: usize,
        column: usize,
        span: Span,
    },

    /// Malformed AST or HIR reached a lowering stage
    #[error("lowering error: {message}")]
    Lowering { message: String },

    /// Method call on a holder that has no such method
    #[error("{holder} has no method {name}")]
    UnknownMethod { holder: String, name: String },

    /// Language not recognized by the toolchain registry
    #[error("unknown language `{name}`")]
    UnknownLanguage { name: String },

    /// A recognized call was given arguments it cannot accept
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// An opaque instruction survived to emission
    #[error("IR was not fully reduced before emission: {instruction}")]
    UnreducedIr { instruction: String },

    /// Filesystem failure
    #[error("IO error: {message}")]
    Io { message: String },

    /// The pass pipeline exceeded its iteration cap
    #[error("pass pipeline failed to reach a fixed point after {rounds} rounds")]
    PassDivergence { rounds: usize },

    /// An `error()` call in the build description
    #[error("{message}")]
    User { message: String },
}

impl CompileError {
    pub fn parser(message: impl Into<String>, line: usize, column: usize, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            line,
            column,
            span,
        }
    }

    pub fn lowering(message: impl Into<String>) -> Self {
        Self::Lowering {
            message: message.into(),
        }
    }

    pub fn unknown_method(holder: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownMethod {
            holder: holder.into(),
            name: name.into(),
        }
    }

    pub fn unknown_language(name: impl Into<String>) -> Self {
        Self::UnknownLanguage { name: name.into() }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn unreduced(instruction: impl Into<String>) -> Self {
        Self::UnreducedIr {
            instruction: instruction.into(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Source span of the error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parser { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parser { .. }
            | Self::Lowering { .. }
            | Self::UnknownMethod { .. }
            | Self::InvalidArguments { .. }
            | Self::User { .. } => 1,
            Self::UnknownLanguage { .. } => 2,
            Self::Io { .. } => 3,
            Self::UnreducedIr { .. } | Self::PassDivergence { .. } => 4,
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message("parse error")
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.to_string())
                    .with_color(Color::Red),
            )
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(error.to_string())
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CompileError::parser("x", 1, 1, Span::default()).exit_code(),
            1
        );
        assert_eq!(CompileError::lowering("x").exit_code(), 1);
        assert_eq!(CompileError::unknown_language("rust").exit_code(), 2);
        assert_eq!(
            CompileError::from(std::io::Error::other("boom")).exit_code(),
            3
        );
        assert_eq!(CompileError::unreduced("foo()").exit_code(), 4);
        assert_eq!(CompileError::PassDivergence { rounds: 1000 }.exit_code(), 4);
    }

    #[test]
    fn test_unknown_method_message() {
        let err = CompileError::unknown_method("host_machine", "kernel_version");
        assert_eq!(err.to_string(), "host_machine has no method kernel_version");
    }
}
