//! Errors reported by the assembler, the VM, and the binary program loader.

use thiserror::Error;

/// Reasons assembly fails. Every variant carries the 1-based line of the source text on which
/// assembly stopped.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CompileError {
  /// The mnemonic, stripped of its modifiers, is not in the opcode table.
  #[error("line {line}: unknown instruction `{mnemonic}`")]
  UnknownInstruction { line: usize, mnemonic: String },
  /// A jump or call operand names no collected label and is not a target index.
  #[error("line {line}: label `{label}` not found")]
  UnresolvedLabel { line: usize, label: String },
  /// The operand has no `%` marker.
  #[error("line {line}: operand `{operand}` is missing its `%` marker")]
  MissingOperandMarker { line: usize, operand: String },
  /// The text after `%` does not start with an operand code.
  #[error("line {line}: unknown operand kind in `{operand}`")]
  UnknownOperandKind { line: usize, operand: String },
  /// The address part of the operand or the jump target is not well formed.
  #[error("line {line}: malformed operand `{operand}`")]
  MalformedOperand { line: usize, operand: String },
}

impl CompileError {
  pub fn line(&self) -> usize {
    match self {
      | CompileError::UnknownInstruction   { line, .. }
      | CompileError::UnresolvedLabel      { line, .. }
      | CompileError::MissingOperandMarker { line, .. }
      | CompileError::UnknownOperandKind   { line, .. }
      | CompileError::MalformedOperand     { line, .. } => *line
    }
  }
}

/// Reasons an execution run ends abnormally. `pc` is the index of the instruction that failed.
/// The run never continues past any of these.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RuntimeError {
  #[error("division by zero at {pc}")]
  DivisionByZero { pc: usize },
  #[error("illegal opcode 0x{opcode:02x} at {pc}")]
  IllegalOpcode { pc: usize, opcode: u8 },
  #[error("illegal operand kind {kind} at {pc}")]
  IllegalOperand { pc: usize, kind: u8 },
  #[error("`)` without an open bracket at {pc}")]
  UnbalancedBracket { pc: usize },
  #[error("program counter {pc} ran past the end of the program")]
  ProgramOverrun { pc: usize },
  /// The step limit was reached before the program halted.
  #[error("cancelled after {executed} instructions")]
  Cancelled { executed: u64 },
}

impl RuntimeError {
  /// `Cancelled` is a requested stop rather than a fault in the program.
  pub fn is_cancellation(&self) -> bool {
    matches!(self, RuntimeError::Cancelled { .. })
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ProgramFormatError {
  #[error("program blob of {length} bytes is not a whole number of 4 byte words")]
  TruncatedWord { length: usize },
}
