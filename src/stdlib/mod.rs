//! Standard library: runtime packages and the builtin koi library

pub mod builtins;
