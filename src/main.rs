use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;

use plc_il::{
  disassemble_program, parse_operand, Compilation, CompileError, Memory, MemoryMap, Program,
  ProgramFormatError, RuntimeError, Value, Vm
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Instruction List assembler and virtual machine")]
struct Opts {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Assemble a source file into a binary program (4 bytes per instruction, little-endian)
  Assemble {
    /// Instruction List source file
    source: PathBuf,
    /// Output binary file; defaults to the source path with a `.bin` extension
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the assembled listing
    #[arg(long)]
    listing: bool,
  },
  /// Print the listing of a binary program
  Disassemble {
    /// Binary program file
    binary: PathBuf,
  },
  /// Assemble a source file and run it, then print the memory
  Run {
    /// Instruction List source file
    source: PathBuf,
    /// Preset a memory cell before running, e.g. `--set %i0/0=1` or `--set %mf2=-40`
    #[arg(long = "set", value_name = "OPERAND=VALUE")]
    presets: Vec<String>,
    /// Stop after this many instructions
    #[arg(long)]
    limit: Option<u64>,
  },
}

#[derive(Debug, Error)]
enum CliError {
  #[error("{}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },
  #[error("{}: {source}", path.display())]
  Compile { path: PathBuf, source: CompileError },
  #[error("{}: {source}", path.display())]
  Format { path: PathBuf, source: ProgramFormatError },
  #[error("runtime error: {0}")]
  Runtime(#[from] RuntimeError),
  #[error("bad preset `{preset}`: {reason}")]
  Preset { preset: String, reason: String },
}

fn read_source(path: &PathBuf) -> Result<Compilation, CliError> {
  let text = fs::read_to_string(path).map_err(|source| CliError::Io { path: path.clone(), source })?;
  Compilation::compile(&text).map_err(|source| CliError::Compile { path: path.clone(), source })
}

/// Parses `%<operand>=<integer>`.
fn parse_preset(preset: &str, memory: &mut MemoryMap) -> Result<(), CliError> {
  let bad = |reason: String| CliError::Preset { preset: preset.to_string(), reason };

  let (operand, value) = preset.split_once('=').ok_or_else(|| bad("expected `=`".to_string()))?;
  let (kind, address) = parse_operand(operand).map_err(|e| bad(e.to_string()))?;
  let value: i64 = value.trim().parse().map_err(|e: std::num::ParseIntError| bad(e.to_string()))?;

  memory.write(kind, address, Value::Int(value));
  Ok(())
}

fn assemble(source: PathBuf, output: Option<PathBuf>, listing: bool) -> Result<(), CliError> {
  let compilation = read_source(&source)?;
  let output = output.unwrap_or_else(|| source.with_extension("bin"));

  if listing {
    print!("{}", disassemble_program(&compilation.program, Some(&compilation.labels)));
  }

  fs::write(&output, compilation.program.to_bytes())
    .map_err(|source| CliError::Io { path: output.clone(), source })?;
  println!("{} instructions written to {}", compilation.program.len(), output.display());
  Ok(())
}

fn disassemble(binary: PathBuf) -> Result<(), CliError> {
  let bytes = fs::read(&binary).map_err(|source| CliError::Io { path: binary.clone(), source })?;
  let program = Program::from_bytes(&bytes).map_err(|source| CliError::Format { path: binary, source })?;
  print!("{}", disassemble_program(&program, None));
  Ok(())
}

/// Returns whether the run was cancelled by the step limit.
fn run(source: PathBuf, presets: Vec<String>, limit: Option<u64>) -> Result<bool, CliError> {
  let compilation = read_source(&source)?;

  let mut memory = MemoryMap::new();
  for preset in presets.iter() {
    parse_preset(preset, &mut memory)?;
  }

  let mut vm = Vm::new(&compilation.program);
  if let Some(limit) = limit {
    vm = vm.with_step_limit(limit);
  }

  let cancelled =
    match vm.run(&mut memory) {
      Ok(())                                => false,
      Err(error) if error.is_cancellation() => {
        eprintln!("{}", error);
        true
      }
      Err(error)                            => return Err(error.into())
    };

  print!("{}", memory);
  Ok(cancelled)
}

fn main() -> ExitCode {
  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let opts = Opts::parse();

  let result =
    match opts.command {
      Command::Assemble { source, output, listing } => assemble(source, output, listing).map(|_| false),
      Command::Disassemble { binary }               => disassemble(binary).map(|_| false),
      Command::Run { source, presets, limit }       => run(source, presets, limit),
    };

  match result {
    Ok(false) => ExitCode::SUCCESS,
    // Stopped by the step limit.
    Ok(true)  => ExitCode::from(2),
    Err(error) => {
      eprintln!("error: {}", error);
      ExitCode::FAILURE
    }
  }
}
