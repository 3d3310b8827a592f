use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "x")]
#[command(version = "0.1.0")]
#[command(about = "X language JIT compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a program. Input is a JSON-serialized
    /// `x_ast::Program` — see `x_ast::builder` for constructing one,
    /// since the lexer/parser are out of scope for this workspace.
    Run {
        /// Input program file.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Pretty-print the parsed AST to stderr before running it.
        #[arg(long)]
        ast: bool,

        /// Print the lowered LLVM IR to stderr before executing it.
        #[arg(long)]
        emit_ir: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, ast, emit_ir } => run(&input, ast, emit_ir),
    }
}

fn run(input: &PathBuf, dump_ast: bool, emit_ir: bool) -> Result<()> {
    let mut program = x_driver::program_from_file(input).with_context(|| format!("loading {}", input.display()))?;

    if dump_ast {
        let json = serde_json::to_string_pretty(&program).context("serializing AST")?;
        eprintln!("{json}");
    }

    let opts = x_driver::RunOptions { emit_ir };
    if let Err(e) = x_driver::run(&mut program, &opts) {
        eprintln!("{} {e}", "error:".red().bold());
        anyhow::bail!(e);
    }
    Ok(())
}
