//! Type system module

pub mod type_system;
pub mod signature;

pub use type_system::{SingleType, Type};
pub use signature::{FuncArg, FunctionSignature, Owner};
