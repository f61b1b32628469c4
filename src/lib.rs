//! Driver pipeline: read sources, parse, analyse, then dump the AST or
//! write module metadata. Exit codes: 0 success, 1 diagnostics, 17 internal
//! compiler error, 18 fatal error.

pub mod cli;

use std::path::Path;
use std::process::ExitCode;

use miette::{NamedSource, Report};

use glint_frontend::{AstPrinter, Context, Module, Parser};
use glint_sema::FatalError;

use crate::cli::Cli;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_ICE: u8 = 17;
pub const EXIT_FATAL: u8 = 18;

pub fn run(cli: &Cli) -> ExitCode {
    let mut worst = EXIT_OK;
    for input in &cli.inputs {
        let code = compile_one(cli, input);
        worst = worst.max(code);
        // A structural failure aborts the whole run.
        if code >= EXIT_ICE {
            return ExitCode::from(code);
        }
    }
    ExitCode::from(worst)
}

fn compile_one(cli: &Cli, input: &Path) -> u8 {
    match input.extension().and_then(|e| e.to_str()) {
        Some("int") => compile_glint(cli, input),
        Some("laye") => {
            eprintln!(
                "error: {}: the Laye front end is not part of this build",
                input.display()
            );
            EXIT_ERROR
        }
        _ => {
            eprintln!(
                "fatal: {}: unrecognized input file extension",
                input.display()
            );
            EXIT_FATAL
        }
    }
}

fn compile_glint(cli: &Cli, input: &Path) -> u8 {
    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("fatal: cannot read {}: {e}", input.display());
            return EXIT_FATAL;
        }
    };

    let mut ctx = Context::new();
    ctx.add_file(input.display().to_string(), source.clone());
    for dir in &cli.include_dirs {
        ctx.add_include_directory(dir);
    }

    let module_name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module");

    tracing::info!(file = %input.display(), "parsing");
    let mut module = match Parser::new(module_name, &source).parse_module() {
        Ok(module) => module,
        Err(error) => {
            render(&source, input, Report::new(error));
            return EXIT_ERROR;
        }
    };

    if cli.syntax_only {
        if cli.ast {
            print!("{}", AstPrinter::new(&module).print_module());
        }
        return EXIT_OK;
    }

    tracing::info!(module = module_name, "analysing");
    let result = match glint_sema::analyse(&ctx, &mut module) {
        Ok(result) => result,
        Err(FatalError::Ice(ice)) => {
            render(&source, input, Report::new(ice));
            return EXIT_ICE;
        }
        Err(fatal) => {
            render(&source, input, Report::new(fatal));
            return EXIT_FATAL;
        }
    };

    for warning in &result.warnings {
        render(&source, input, Report::new(warning.warning.clone()));
    }
    for error in &result.errors {
        render(&source, input, Report::new(error.error.clone()));
    }

    if cli.ast {
        print!("{}", AstPrinter::new(&module).print_module());
    }

    if !result.is_clean() {
        return EXIT_ERROR;
    }

    if let Some(output) = &cli.output
        && let Some(code) = write_metadata(&module, output)
    {
        return code;
    }

    EXIT_OK
}

/// Serialise the analysed module; object extensions get the blob embedded
/// in an ELF section, everything else is a raw gmeta blob.
fn write_metadata(module: &Module, output: &Path) -> Option<u8> {
    let blob = match glint_sema::metadata::serialise(module) {
        Ok(blob) => blob,
        Err(e) => {
            eprintln!("internal compiler error: serialising module metadata: {e}");
            return Some(EXIT_ICE);
        }
    };

    let bytes = match output.extension().and_then(|e| e.to_str()) {
        Some("o") | Some("obj") => {
            glint_sema::elf::object_with_section(glint_sema::METADATA_SECTION_NAME, &blob)
        }
        _ => blob,
    };

    if let Err(e) = std::fs::write(output, bytes) {
        eprintln!("fatal: cannot write {}: {e}", output.display());
        return Some(EXIT_FATAL);
    }
    None
}

fn render(source: &str, input: &Path, report: Report) {
    let report = report.with_source_code(NamedSource::new(
        input.display().to_string(),
        source.to_string(),
    ));
    eprintln!("{report:?}");
}
