//! Built-in Functions Registry
//!
//! Two kinds of library code ship with the compiler:
//!
//! - runtime packages (`io`, `math`) whose members are Go functions in the
//!   emitted prelude and never pass through the koi front end;
//! - the builtin koi library, `extern` declarations that give primitive
//!   owners (`Array`, `String`) their methods. It is parsed before any user
//!   code so its declarations come first.

use std::collections::HashMap;

use crate::frontend::ast::Program;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::utils::Result;

/// Source of the builtin koi library
pub const BUILTIN_LIBRARY: &str = r#"
extern func Array.length() int
extern func Array.append(value int) []int
extern func Array.append(value float) []float
extern func Array.append(value string) []string
extern func Array.append(value bool) []bool
extern func String.length() int
"#;

/// Member of a runtime package
#[derive(Debug, Clone)]
pub struct RuntimeFunc {
    pub package: String,
    pub member: String,
    /// Number of values the member takes
    pub arity: usize,
    /// Go function to generate
    pub go_name: String,
}

/// Registry of runtime packages and their members
pub struct BuiltinRegistry {
    packages: HashMap<String, HashMap<String, RuntimeFunc>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            packages: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    fn register_all(&mut self) {
        // I/O Functions
        self.register("io", "printLine", 1);
        self.register("io", "print", 1);

        // Math
        self.register("math", "sin", 1);
        self.register("math", "cos", 1);
        self.register("math", "sqrt", 1);
    }

    fn register(&mut self, package: &str, member: &str, arity: usize) {
        let func = RuntimeFunc {
            package: package.to_string(),
            member: member.to_string(),
            arity,
            go_name: format!("Koi_{}_{}", package, member),
        };
        self.packages
            .entry(package.to_string())
            .or_default()
            .insert(member.to_string(), func);
    }

    /// Check if an import name is served by the runtime
    pub fn is_runtime_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Get a runtime member by package and name
    pub fn get(&self, package: &str, member: &str) -> Option<&RuntimeFunc> {
        self.packages.get(package).and_then(|members| members.get(member))
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the builtin koi library
pub fn builtin_library() -> Result<Program> {
    let lexer = Lexer::new(BUILTIN_LIBRARY, 0);
    let mut parser = Parser::new(lexer);
    parser.parse_program()
}
