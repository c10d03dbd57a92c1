//! koic - koi to Go compiler
//!
//! Entry point for the compiler CLI.

mod backend;
mod compiler;
mod feedback;
mod frontend;
mod stdlib;
mod types;
mod utils;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use compiler::{CompileOptions, Compiler, ErrorFormat};

/// koi Compiler
#[derive(Parser, Debug)]
#[command(name = "koic")]
#[command(version = "0.1.0")]
#[command(about = "koi compiler - translates koi programs to Go")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file (.koi)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output Go file
    #[arg(short, long, value_name = "FILE", default_value = "build/main.go")]
    output: PathBuf,

    /// Directory holding importable packages (`<name>/<name>.koi`)
    #[arg(long, value_name = "DIR", default_value = "lib")]
    lib_root: PathBuf,

    /// Diagnostic format
    #[arg(long, value_enum, default_value_t = ErrorFormat::Human)]
    error_format: ErrorFormat,

    /// Print the generated Go instead of writing it
    #[arg(long)]
    emit_stdout: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a source file
    Build {
        /// Input source file
        input: PathBuf,
    },
    /// Check a source file for errors
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Build { input }) => compile_file(input, &cli),
        Some(Commands::Check { input }) => check_file(input, &cli),
        Some(Commands::Version) => {
            println!("koic 0.1.0");
            println!("koi to Go compiler");
            Ok(())
        }
        None => match &cli.input {
            Some(input) => compile_file(input, &cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: koic <FILE> or koic build <FILE>");
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn options(cli: &Cli) -> CompileOptions {
    CompileOptions {
        lib_root: cli.lib_root.clone(),
        output: cli.output.clone(),
        error_format: cli.error_format,
    }
}

/// Print a compiler diagnostic and exit
fn fail(compiler: &Compiler, error: &utils::Error, input: &Path) -> ! {
    eprintln!("{}", compiler.render_error(error, input));
    process::exit(1);
}

/// Compile a source file (.koi)
fn compile_file(input: &Path, cli: &Cli) -> anyhow::Result<()> {
    let mut compiler = Compiler::new(options(cli));
    let quiet = cli.emit_stdout || cli.error_format == ErrorFormat::Json;

    if !quiet {
        println!("koi Compiler v0.1.0");
        println!("Compiling: {}", input.display());
    }

    let compiled = match compiler.compile_file(input) {
        Ok(compiled) => compiled,
        Err(e) => fail(&compiler, &e, input),
    };

    if cli.emit_stdout {
        print!("{}", compiled.go);
        return Ok(());
    }

    compiler
        .write_output(&compiled.go)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    if !quiet {
        println!("  [✓] Resolved {} functions, {} types", compiled.function_count, compiled.type_count);
        println!("  [✓] Generated Go: {}", cli.output.display());
    }
    Ok(())
}

/// Check a source file without writing output
fn check_file(input: &Path, cli: &Cli) -> anyhow::Result<()> {
    let mut compiler = Compiler::new(options(cli));
    match compiler.check_file(input) {
        Ok(()) => {
            if cli.error_format == ErrorFormat::Human {
                println!("  [✓] {} OK", input.display());
            }
            Ok(())
        }
        Err(e) => fail(&compiler, &e, input),
    }
}
