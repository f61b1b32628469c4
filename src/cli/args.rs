// src/cli/args.rs

use clap::Parser;
use std::path::PathBuf;

/// LCC compiler driver, Glint front half.
#[derive(Parser, Debug)]
#[command(name = "lcc")]
#[command(about = "LCC compiler driver (Glint front end)", long_about = None)]
pub struct Cli {
    /// Write the analysed module's metadata here (`.o`/`.obj` wraps it in an
    /// ELF object's .glint_metadata section, anything else is a raw .gmeta)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the typed AST after analysis
    #[arg(long)]
    pub ast: bool,

    /// Stop after parsing
    #[arg(long)]
    pub syntax_only: bool,

    /// Add a directory to the module metadata search path (repeatable;
    /// searched in order)
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Input files: .int is parsed as Glint, .laye as Laye
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,
}
