//! Frontend module - Lexer, Parser, and semantic analysis

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod module;
pub mod resolver;
pub mod semantic;
