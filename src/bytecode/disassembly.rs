//! Renders bytecode back to assembly, one word at a time or as a numbered listing.

use std::fmt::Write;

use super::{decode_instruction, Argument, Program, Word};
use crate::symboltable::LabelTable;

/// Renders one instruction word as canonical assembly. Never fails: reserved opcodes render as
/// their placeholder mnemonic and unknown operand kinds as `%?<ordinal>:<address>`.
pub fn disassemble(word: Word) -> String {
  decode_instruction(word).to_string()
}

/**
  Renders a whole program, one `[index] instruction` line per word. When `labels` is given,
  jump and call targets are annotated with the label bound to them.
*/
pub fn disassemble_program(program: &Program, labels: Option<&LabelTable>) -> String {
  let mut listing = String::new();

  for (pc, word) in program.iter().enumerate() {
    let instruction = decode_instruction(*word);
    let label =
      match (instruction.argument, labels) {
        (Argument::Target(target), Some(labels)) => labels.get_label(target),
        _                                        => None
      };

    // Writing to a `String` cannot fail.
    let _ = match label {
      Some(name) => writeln!(listing, "[{:04}] {:<24}; {}", pc, instruction.to_string(), name),
      None       => writeln!(listing, "[{:04}] {}", pc, instruction)
    };
  }

  listing
}
