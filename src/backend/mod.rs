//! Backend module - Code generation

pub mod codegen;

// Go Backend
pub mod go;

pub use codegen::{CodeGen, CompileUnit};
pub use go::GoCodeGen;
