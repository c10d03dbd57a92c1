//! Go Backend - Generate Go source from a typed koi program
//!
//! Every koi value becomes a `KoiValue` (see [`runtime`]); the generated file
//! carries the runtime as its prelude so it builds with `go run` alone.

mod go_codegen;
pub mod runtime;

pub use go_codegen::GoCodeGen;
