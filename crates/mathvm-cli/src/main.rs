//! `mvm`: translate and execute MathVM programs
//!
//! Reads a source file (or an inline script via `-e`), translates it to
//! bytecode, and executes the result. Translation errors report the
//! offending line and column; both translation and runtime failures exit
//! non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use mathvm_runtime::{bytecode, translate, BytecodeInterpreter};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// MathVM bytecode translator and interpreter
#[derive(Parser)]
#[command(name = "mvm", version, about)]
struct Cli {
    /// Path to the source file
    #[arg(value_name = "FILE", required_unless_present = "expr")]
    file: Option<PathBuf>,

    /// Inline program text instead of a file
    #[arg(short = 'e', long = "expr", value_name = "SCRIPT")]
    expr: Option<String>,

    /// Print the disassembled bytecode instead of executing
    #[arg(long)]
    disasm: bool,

    /// Report translation errors as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&format!("{:#}", error));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (source, name) = match &cli.expr {
        Some(script) => (script.clone(), "<script>".to_string()),
        None => {
            let path = cli.file.as_ref().expect("clap enforces FILE without -e");
            let source = fs::read_to_string(path)
                .with_context(|| format!("Could not load program '{}'", path.display()))?;
            (source, path.display().to_string())
        }
    };

    let code = match translate(&source) {
        Ok(code) => code,
        Err(error) => {
            if cli.json {
                println!("{}", error.to_json_string(&source));
            } else {
                eprint!("{}", error.to_human_string(&name, &source));
            }
            anyhow::bail!("Cannot translate program");
        }
    };

    if cli.disasm {
        print!("{}", bytecode::disassemble(&code));
        return Ok(());
    }

    let mut interpreter = BytecodeInterpreter::new(code);
    interpreter
        .run()
        .map_err(|error| anyhow::anyhow!("{}", error))
}

/// Print a final error line, with a colored prefix on TTYs
fn report_error(message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    let _ = stderr.set_color(&spec);
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {}", message);
}
