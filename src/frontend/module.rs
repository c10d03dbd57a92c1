//! Module System for koi
//!
//! Resolves `import` declarations against a library root. `import name`
//! loads `<root>/<name>/<name>.koi`; the module's own imports are loaded
//! first, so declarations end up ordered builtin library, then imports
//! depth-first, then the importing file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::frontend::ast::Program;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::stdlib::builtins::{builtin_library, BuiltinRegistry};
use crate::utils::{Error, Result};

/// A source file seen by the loader, indexed by its file id
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
}

/// Module loader for import resolution
pub struct ModuleLoader {
    /// Directory holding one sub-directory per koi package
    lib_root: PathBuf,
    /// Runtime packages never hit the file system
    registry: BuiltinRegistry,
    /// Every file read so far; span file ids index into this
    files: Vec<SourceFile>,
    /// Packages already merged into the program
    loaded: HashSet<String>,
    /// Packages currently being loaded (for circular import detection)
    loading_stack: Vec<String>,
}

impl ModuleLoader {
    pub fn new(lib_root: impl Into<PathBuf>) -> Self {
        Self {
            lib_root: lib_root.into(),
            registry: BuiltinRegistry::new(),
            files: Vec::new(),
            loaded: HashSet::new(),
            loading_stack: Vec::new(),
        }
    }

    /// Path a package is expected at
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.lib_root.join(name).join(format!("{}.koi", name))
    }

    /// Load the entry file's source and everything it imports into one
    /// program; `path` names the file in diagnostics
    pub fn load_source(&mut self, path: &Path, source: &str) -> Result<Program> {
        let mut program = builtin_library()?;
        let main = self.parse_file(path, source.to_string())?;
        for import in &main.imports {
            self.load_module(&import.name, &mut program)?;
        }
        program.extend(main);
        Ok(program)
    }

    /// Load a package (and its imports) into `program`
    fn load_module(&mut self, name: &str, program: &mut Program) -> Result<()> {
        if self.registry.is_runtime_package(name) || self.loaded.contains(name) {
            return Ok(());
        }

        // Check for circular imports
        if self.loading_stack.iter().any(|m| m == name) {
            return Err(Error::CircularImport {
                chain: format!("{} -> {}", self.loading_stack.join(" -> "), name),
            });
        }

        let path = self.module_path(name);
        let source = fs::read_to_string(&path).map_err(|_| Error::ModuleNotFound {
            name: name.to_string(),
            path: path.display().to_string(),
        })?;
        debug!("Loading module {} from {}", name, path.display());

        self.loading_stack.push(name.to_string());
        let mut module = self.parse_file(&path, source)?;
        for import in &module.imports {
            self.load_module(&import.name, program)?;
        }
        self.loading_stack.pop();

        module.set_package(name);
        program.extend(module);
        self.loaded.insert(name.to_string());
        Ok(())
    }

    fn parse_file(&mut self, path: &Path, source: String) -> Result<Program> {
        // file id 0 is the builtin library
        let file_id = self.files.len() + 1;
        let lexer = Lexer::new(&source, file_id);
        self.files.push(SourceFile {
            path: path.to_path_buf(),
            source,
        });
        let mut parser = Parser::new(lexer);
        parser.parse_program()
    }

    /// Source file for a span's file id
    pub fn file(&self, file_id: usize) -> Option<&SourceFile> {
        file_id.checked_sub(1).and_then(|i| self.files.get(i))
    }
}
