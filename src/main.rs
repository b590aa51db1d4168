use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use aoc::compiler::{compile, CompileOptions};
use aoc::linker::Linker;

/// Compiler for the AO smart-contract language.
#[derive(Parser)]
#[command(name = "aoc", version, about)]
struct Args {
    /// Print the parsed AST
    #[arg(long)]
    ast: bool,

    /// Print the parsed AST as JSON
    #[arg(long)]
    ast_json: bool,

    /// Print the generated IR
    #[arg(long, alias = "llvm-ir")]
    emit_ir: bool,

    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source file (.ao)
    file: PathBuf,
}

fn run(args: &Args) -> Result<(), String> {
    if args.file.extension().and_then(|e| e.to_str()) != Some("ao") {
        return Err(format!(
            "File '{}' has invalid extension. Required extension: '.ao'",
            args.file.display()
        ));
    }

    let source = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("File '{}' could not be read: {}", args.file.display(), e))?;

    let mut cursor = aoc::tokenize(&source).map_err(|e| e.display_with_source(&source))?;
    let root = aoc::parse(&mut cursor).map_err(|e| e.display_with_source(&source))?;

    if args.ast {
        print!("{}", aoc::ast::printer::print(&root));
    }
    if args.ast_json {
        let rendered = serde_json::to_string_pretty(&root)
            .map_err(|e| format!("Failed to serialize the AST: {}", e))?;
        println!("{}", rendered);
    }

    let compiled = compile(&root, CompileOptions::production())
        .map_err(|e| e.display_with_source(&source))?;

    if args.emit_ir {
        print!("{}", compiled.module);
    }

    if let Some(output) = &args.output {
        Linker::default()
            .link(&compiled, output)
            .map_err(|e| e.message)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
