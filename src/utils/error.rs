//! Error handling for koic

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ==================== Lexer / Parser Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },

    #[error("Unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("Expected identifier")]
    ExpectedIdent { span: Span },

    #[error("Expected type")]
    ExpectedType { span: Span },

    #[error("Expected expression")]
    ExpectedExpr { span: Span },

    // ==================== Resolution Errors ====================

    #[error("Unresolved call: no declaration matches {prototype}")]
    UnresolvedCall { prototype: String },

    #[error("Ambiguous overload for {prototype}: candidates {}", candidates.join(", "))]
    AmbiguousOverload {
        prototype: String,
        candidates: Vec<String>,
    },

    #[error("Duplicate declaration: {prototype} is declared more than once")]
    DuplicatePrototype { prototype: String },

    #[error("Generated name {name} is shared by {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("In {decl}: {source}")]
    InDeclaration {
        decl: String,
        #[source]
        source: Box<Error>,
    },

    // ==================== Module Errors ====================

    #[error("Module not found: {name} (looked for {path})")]
    ModuleNotFound { name: String, path: String },

    #[error("Circular import: {chain}")]
    CircularImport { chain: String },

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::UnexpectedChar { span, .. } => Some(*span),
            Self::UnterminatedString { span } => Some(*span),
            Self::ExpectedIdent { span } => Some(*span),
            Self::ExpectedType { span } => Some(*span),
            Self::ExpectedExpr { span } => Some(*span),
            Self::InDeclaration { source, .. } => source.span(),
            Self::UnresolvedCall { .. }
            | Self::AmbiguousOverload { .. }
            | Self::DuplicatePrototype { .. }
            | Self::NameCollision { .. }
            | Self::ModuleNotFound { .. }
            | Self::CircularImport { .. }
            | Self::Io(_) => None,
        }
    }

    /// Attach the prototype of the declaration being compiled.
    /// An error that already names its declaration is left untouched.
    pub fn in_declaration(self, decl: impl Into<String>) -> Self {
        match self {
            Self::InDeclaration { .. } => self,
            other => Self::InDeclaration {
                decl: decl.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with declaration context peeled off
    pub fn root(&self) -> &Error {
        match self {
            Self::InDeclaration { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
