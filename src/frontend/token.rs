//! Token definitions for koi

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// and
    And,
    /// break
    Break,
    /// const
    Const,
    /// continue
    Continue,
    /// else
    Else,
    /// extern
    Extern,
    /// false
    False,
    /// for
    For,
    /// func
    Func,
    /// if
    If,
    /// import
    Import,
    /// in
    In,
    /// is
    Is,
    /// map
    Map,
    /// mut
    Mut,
    /// new
    New,
    /// not
    Not,
    /// or
    Or,
    /// return
    Return,
    /// true
    True,
    /// type
    Type,

    // ============ Identifiers and Literals ============
    /// Identifier (variable, function, label or type name)
    Ident(String),
    /// Numeric literal, kept as written so `3.0` stays a float
    Number(String),
    /// String literal, escapes already processed
    StringLit(String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// .
    Dot,
    /// ..
    DotDot,
    /// |
    Pipe,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// :
    Colon,
    /// ;
    Semicolon,
    /// Line break outside parentheses and brackets
    Newline,

    // ============ Special ============
    /// End of file
    Eof,
    /// String literal missing its closing quote
    UnterminatedString,
    /// Unknown/invalid character
    Unknown(char),
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "and" => Some(TokenKind::And),
            "break" => Some(TokenKind::Break),
            "const" => Some(TokenKind::Const),
            "continue" => Some(TokenKind::Continue),
            "else" => Some(TokenKind::Else),
            "extern" => Some(TokenKind::Extern),
            "false" => Some(TokenKind::False),
            "for" => Some(TokenKind::For),
            "func" => Some(TokenKind::Func),
            "if" => Some(TokenKind::If),
            "import" => Some(TokenKind::Import),
            "in" => Some(TokenKind::In),
            "is" => Some(TokenKind::Is),
            "map" => Some(TokenKind::Map),
            "mut" => Some(TokenKind::Mut),
            "new" => Some(TokenKind::New),
            "not" => Some(TokenKind::Not),
            "or" => Some(TokenKind::Or),
            "return" => Some(TokenKind::Return),
            "true" => Some(TokenKind::True),
            "type" => Some(TokenKind::Type),
            _ => None,
        }
    }

    /// Get the precedence of a binary operator (for Pratt parsing)
    /// Returns None if not a binary operator
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            TokenKind::Or => Some(1),
            TokenKind::And => Some(2),
            TokenKind::EqEq | TokenKind::Ne => Some(3),
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(4),
            // `x is circle` binds tighter than comparisons
            TokenKind::Is => Some(5),
            TokenKind::Plus | TokenKind::Minus => Some(6),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(7),
            _ => None,
        }
    }
}
