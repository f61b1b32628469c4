// src/bin/lcc.rs

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lcc::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // -v raises the default level; LCC_LOG overrides everything.
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("LCC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    lcc::run(&cli)
}
