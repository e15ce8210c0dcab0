//! Command-line interface for `tlc`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use compiler::OptLevel;

/// Compile a toy-language program to a native executable
#[derive(Parser, Debug)]
#[command(name = "tlc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source file to compile
    pub input: PathBuf,

    /// Path of the executable to write
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Skip AST optimization
    #[arg(long)]
    pub no_opt: bool,

    /// Stop after semantic checks; no executable is written
    #[arg(long)]
    pub check: bool,

    /// Print an intermediate representation instead of linking
    #[arg(long, value_enum)]
    pub emit: Option<Emit>,

    /// Cranelift optimization level
    #[arg(long, value_enum, default_value_t = CliOptLevel::Speed)]
    pub opt_level: CliOptLevel,

    /// C compiler driver used for linking (defaults to $TL_LINKER or `cc`)
    #[arg(long)]
    pub linker: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    Tokens,
    Tree,
    Namespaces,
    Ast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliOptLevel {
    None,
    Speed,
    SpeedAndSize,
}

impl From<CliOptLevel> for OptLevel {
    fn from(level: CliOptLevel) -> Self {
        match level {
            CliOptLevel::None => OptLevel::None,
            CliOptLevel::Speed => OptLevel::Speed,
            CliOptLevel::SpeedAndSize => OptLevel::SpeedAndSize,
        }
    }
}

impl Cli {
    /// Executables are only produced when nothing asked to stop early.
    pub fn generates_executable(&self) -> bool {
        !self.check && self.emit.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["tlc", "prog.tl"]);
        assert_eq!(cli.output, PathBuf::from("output"));
        assert!(cli.generates_executable());
        assert_eq!(cli.opt_level, CliOptLevel::Speed);
    }

    #[test]
    fn emit_stops_before_linking() {
        let cli = Cli::parse_from(["tlc", "prog.tl", "--emit", "namespaces", "--no-opt"]);
        assert_eq!(cli.emit, Some(Emit::Namespaces));
        assert!(cli.no_opt);
        assert!(!cli.generates_executable());
    }
}
