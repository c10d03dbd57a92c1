//! Code Generation trait - Backend abstraction

use crate::frontend::ast::Program;
use crate::frontend::resolver::SignatureTable;
use crate::frontend::semantic::ProgramEnv;
use crate::utils::Result;

/// Everything a backend reads: the merged program, its declarations and
/// the type environments built for it
#[derive(Clone, Copy)]
pub struct CompileUnit<'a> {
    pub program: &'a Program,
    pub table: &'a SignatureTable,
    pub env: &'a ProgramEnv,
}

/// Code generation backend trait
pub trait CodeGen {
    /// Generate target source text
    fn generate(&mut self, unit: CompileUnit<'_>) -> Result<String>;

    /// Get the backend name
    fn name(&self) -> &str;
}
