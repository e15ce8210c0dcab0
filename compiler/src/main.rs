mod cli;

use std::fs;
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Emit};
use compiler::{CodegenOptions, NativeBackend};
use compiler_core::{CancellationToken, Compilation, CompileOptions, CompilerSession};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        eprintln!("error: {error:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;

    let mut codegen = CodegenOptions::from_env();
    codegen.opt_level = cli.opt_level.into();
    if let Some(linker) = &cli.linker {
        codegen.linker = linker.clone();
    }
    let backend = NativeBackend::new(codegen);

    let session = CompilerSession::new(CompileOptions {
        generate_executable: cli.generates_executable(),
        output_path: cli.output.clone(),
        optimize: !cli.no_opt,
    });
    let compilation = session.compile_source(&source, &backend, &CancellationToken::new());

    for warning in compilation.diagnostics.warnings() {
        eprintln!("warning: {warning}");
    }
    if let Some(emit) = cli.emit {
        print!("{}", render(&compilation, emit));
    }
    if !compilation.succeeded() {
        for error in compilation.diagnostics.errors() {
            eprintln!("{error}");
        }
        bail!("compilation failed with {} error(s)", compilation.diagnostics.error_count());
    }
    if let Some(path) = &compilation.executable {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn render(compilation: &Compilation, emit: Emit) -> String {
    match emit {
        Emit::Tokens => compilation.token_lines().iter().map(|node| node.render()).collect(),
        Emit::Tree => compilation.parse_tree_view().map(|node| node.render()).unwrap_or_default(),
        Emit::Namespaces => compilation.namespace_view().map(|node| node.render()).unwrap_or_default(),
        Emit::Ast => compilation.ast_view().iter().map(|node| node.render()).collect(),
    }
}
