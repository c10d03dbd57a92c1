//! Compilation pipeline
//!
//! source → module loader → signature table → type environments → Go text

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::backend::{CodeGen, CompileUnit, GoCodeGen};
use crate::feedback::ErrorReport;
use crate::frontend::ast::Program;
use crate::frontend::module::ModuleLoader;
use crate::frontend::resolver::SignatureTable;
use crate::frontend::semantic::{ProgramEnv, TypeEnvBuilder};
use crate::stdlib::builtins::BUILTIN_LIBRARY;
use crate::utils::{Error, Result};

/// How the fatal diagnostic is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ErrorFormat {
    #[default]
    Human,
    Json,
}

/// Compiler configuration
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Directory holding `<name>/<name>.koi` for every importable package
    pub lib_root: PathBuf,
    /// Go file to write
    pub output: PathBuf,
    pub error_format: ErrorFormat,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            lib_root: PathBuf::from("lib"),
            output: PathBuf::from("build/main.go"),
            error_format: ErrorFormat::Human,
        }
    }
}

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct Compiled {
    pub go: String,
    pub function_count: usize,
    pub type_count: usize,
}

/// A typed program ready for code generation
struct Analyzed {
    program: Program,
    table: SignatureTable,
    env: ProgramEnv,
}

pub struct Compiler {
    options: CompileOptions,
    loader: ModuleLoader,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let loader = ModuleLoader::new(options.lib_root.clone());
        Self { options, loader }
    }

    /// Compile a file to Go source text
    pub fn compile_file(&mut self, path: &Path) -> Result<Compiled> {
        let source = fs::read_to_string(path)?;
        self.compile_source(path, &source)
    }

    /// Compile in-memory source; `path` is used for diagnostics only
    pub fn compile_source(&mut self, path: &Path, source: &str) -> Result<Compiled> {
        let analyzed = self.analyze(path, source)?;

        let mut backend = GoCodeGen::new();
        let go = backend.generate(CompileUnit {
            program: &analyzed.program,
            table: &analyzed.table,
            env: &analyzed.env,
        })?;
        info!("{} backend produced {} lines", backend.name(), go.lines().count());

        Ok(Compiled {
            go,
            function_count: analyzed.program.functions.iter().filter(|f| !f.sig.is_extern).count(),
            type_count: analyzed.program.types.len(),
        })
    }

    /// Run everything up to code generation
    pub fn check_file(&mut self, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path)?;
        self.analyze(path, &source).map(|_| ())
    }

    fn analyze(&mut self, path: &Path, source: &str) -> Result<Analyzed> {
        info!("Compiling {}", path.display());
        let mut program = self.loader.load_source(path, source)?;
        debug!(
            "Merged program: {} functions, {} types, {} globals",
            program.functions.len(),
            program.types.len(),
            program.globals.len()
        );

        let table = SignatureTable::new(&program)?;
        let env = TypeEnvBuilder::new(&table, &program).build_program(&mut program)?;
        Ok(Analyzed { program, table, env })
    }

    /// Write generated Go to the configured output path
    pub fn write_output(&self, go: &str) -> Result<()> {
        if let Some(dir) = self.options.output.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(&self.options.output, go)?;
        info!("Wrote {}", self.options.output.display());
        Ok(())
    }

    /// Structured report for an error, located in whichever file it came from
    pub fn report(&self, error: &Error, input: &Path) -> ErrorReport {
        let input_name = input.display().to_string();
        match error.span().map(|s| s.file_id) {
            Some(0) => ErrorReport::from_error(error, "<builtin>", Some(BUILTIN_LIBRARY)),
            Some(id) => match self.loader.file(id) {
                Some(file) => ErrorReport::from_error(error, &file.path.display().to_string(), Some(&file.source)),
                None => ErrorReport::from_error(error, &input_name, None),
            },
            None => ErrorReport::from_error(error, &input_name, None),
        }
    }

    /// Render an error in the configured format
    pub fn render_error(&self, error: &Error, input: &Path) -> String {
        let report = self.report(error, input);
        match self.options.error_format {
            ErrorFormat::Human => report.render_human(),
            ErrorFormat::Json => report.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> Compiler {
        Compiler::new(CompileOptions::default())
    }

    #[test]
    fn test_compile_source() {
        let source = "import io\nfunc main() {\n io.printLine(\"hello\")\n}\n";
        let compiled = compiler().compile_source(Path::new("hello.koi"), source).unwrap();
        assert_eq!(compiled.function_count, 1);
        assert!(compiled.go.contains("\tKoi_io_printLine(Koi_String(\"hello\"))\n"));
    }

    #[test]
    fn test_parse_error_report() {
        let mut compiler = compiler();
        let err = compiler
            .compile_source(Path::new("bad.koi"), "func main() {\n  x = $\n}\n")
            .unwrap_err();
        let report = compiler.report(&err, Path::new("bad.koi"));
        let location = report.location.unwrap();
        assert_eq!(location.file, "bad.koi");
        assert_eq!((location.line, location.column), (2, 7));
    }

    #[test]
    fn test_resolution_error_report() {
        let options = CompileOptions {
            error_format: ErrorFormat::Json,
            ..CompileOptions::default()
        };
        let mut compiler = Compiler::new(options);
        let err = compiler
            .compile_source(Path::new("main.koi"), "func main() {\n missing()\n}\n")
            .unwrap_err();
        let json = compiler.render_error(&err, Path::new("main.koi"));
        assert!(json.contains("\"code\": \"E0101\""));
        assert!(json.contains("\"declaration\": \"main()\""));
    }

    #[test]
    fn test_check_rejects_unresolved_statement_call() {
        let dir = std::env::temp_dir().join(format!("koic-check-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("main.koi");
        fs::write(&path, "func main() {\n nothing(x: 1)\n}\n").unwrap();

        let err = compiler().check_file(&path).unwrap_err();
        assert!(matches!(err.root(), Error::UnresolvedCall { .. }));

        fs::write(&path, "func helper(x int) {\n}\nfunc main() {\n helper(x: 1)\n}\n").unwrap();
        assert!(compiler().check_file(&path).is_ok());
    }

    #[test]
    fn test_write_output() {
        let dir = std::env::temp_dir().join(format!("koic-output-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let options = CompileOptions {
            output: dir.join("build").join("main.go"),
            ..CompileOptions::default()
        };
        let compiler = Compiler::new(options);
        compiler.write_output("package main\n").unwrap();
        assert_eq!(fs::read_to_string(dir.join("build").join("main.go")).unwrap(), "package main\n");
    }
}
