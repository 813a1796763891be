/*!

  The VM uses a 32 bit word per instruction. Every instruction is exactly one word, and a
  program is a flat, zero-indexed sequence of words. The layout of a word, most significant
  bit first, is:

  ```text
         [        TARGET (25)          ]
                      [   WORD (16)    ]
  [IIIIICNP][RWGOOOOO][BBBBBBBB][TTTTTTTT]
  ```

    I: opcode, an index into the 32 entry `Operation` table
    C: conditional (jumps, calls and returns)
    N: negate the instruction
    P: push, i.e. open a bracketed sub-expression
    R: return flag (reserved)
    W: 1 for a 16 bit word address, 0 for a byte/bit address
    G: negate the argument
    O: operand kind, an index into the 17 entry `OperandKind` table
    B: byte address
    T: bit address

  Jumps and calls reuse the low 25 bits as the absolute index of their target instruction,
  so for those opcodes the P, R, W, G, O, B, and T fields do not exist.

  As in the rest of the crate, an enum is only used for the opcode and the operand kind,
  never for the packed word itself. Labels do not appear in the bytecode. They are
  symbolic names for instruction indices that exist only during assembly.

*/

mod assembly;
mod binary;
mod disassembly;
mod instruction;

pub use assembly::{assemble, assemble_one, parse_operand, Compilation};
pub use binary::{decode_instruction, encode_instruction, Program, Word};
pub use disassembly::{disassemble, disassemble_program};
pub use instruction::{Argument, Instruction, Modifiers};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::IntoEnumIterator;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is its 5 bit opcode, so the order the opcodes are
  listed below is significant. The text form of each variant is its canonical uppercase
  mnemonic. Opcodes `0x17` through `0x1F` are placeholders that assemble but are rejected
  by the VM.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(to_string = "NOP")] Nop,  // 0x00
  #[strum(to_string = "LD")]  Ld,   // 0x01  accumulator := (negated) operand
  #[strum(to_string = "ST")]  St,   // 0x02  operand := (negated) accumulator
  #[strum(to_string = "S")]   S,    // 0x03  set the operand if the accumulator is true
  #[strum(to_string = "R")]   R,    // 0x04  reset the operand if the accumulator is true
  #[strum(to_string = "AND")] And,  // 0x05
  #[strum(to_string = "OR")]  Or,   // 0x06
  #[strum(to_string = "XOR")] Xor,  // 0x07
  #[strum(to_string = "NOT")] Not,  // 0x08
  #[strum(to_string = "ADD")] Add,  // 0x09
  #[strum(to_string = "SUB")] Sub,  // 0x0a
  #[strum(to_string = "MUL")] Mul,  // 0x0b
  #[strum(to_string = "DIV")] Div,  // 0x0c
  #[strum(to_string = "GT")]  Gt,   // 0x0d
  #[strum(to_string = "GE")]  Ge,   // 0x0e
  #[strum(to_string = "EQ")]  Eq,   // 0x0f
  #[strum(to_string = "NE")]  Ne,   // 0x10
  #[strum(to_string = "LE")]  Le,   // 0x11
  #[strum(to_string = "LT")]  Lt,   // 0x12
  #[strum(to_string = "JMP")] Jmp,  // 0x13
  #[strum(to_string = "CAL")] Cal,  // 0x14
  #[strum(to_string = ")")]   Pop,  // 0x15  close the innermost bracket
  #[strum(to_string = "RET")] Ret,  // 0x16  return, or halt with an empty call stack
  // Reserved //
  N17,
  N18,
  N19,
  N1A,
  N1B,
  N1C,
  N1D,
  N1E,
  N1F,
}

/// The first reserved opcode. Everything from here to `0x1F` is a placeholder.
pub const FIRST_RESERVED_OPCODE: u8 = 0x17;

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Decodes a 5 bit opcode. Total over `0..32`; higher bits are ignored.
  pub fn from_code(code: u8) -> Operation {
    match Operation::try_from(code & 0x1F) {
      Ok(operation) => operation,
      // Every 5 bit value names a variant.
      Err(_) => Operation::N1F
    }
  }

  /// Jumps and calls carry an absolute target instead of an operand.
  pub fn is_jump(&self) -> bool {
    matches!(self, Operation::Jmp | Operation::Cal)
  }

  pub fn is_reserved(&self) -> bool {
    self.code() >= FIRST_RESERVED_OPCODE
  }

  /// Operations that combine the accumulator with an operand and can therefore open a
  /// bracket.
  pub fn is_binary(&self) -> bool {
    matches!(
      self,
      | Operation::And | Operation::Or  | Operation::Xor
      | Operation::Add | Operation::Sub | Operation::Mul | Operation::Div
      | Operation::Gt  | Operation::Ge  | Operation::Eq
      | Operation::Ne  | Operation::Le  | Operation::Lt
    )
  }

  pub fn is_comparison(&self) -> bool {
    matches!(
      self,
      Operation::Gt | Operation::Ge | Operation::Eq | Operation::Ne | Operation::Le | Operation::Lt
    )
  }

  /// Operations whose text form has no operand.
  pub fn is_operandless(&self) -> bool {
    matches!(self, Operation::Nop | Operation::Not | Operation::Pop | Operation::Ret)
      || self.is_reserved()
  }
}

/**
  The address spaces an operand can select. The text form of each variant is the code that
  follows `%` in assembly. Codes are case sensitive, and several are prefixes of others
  (`i`/`if`, `q`/`qf`, `Q`/`QF`, `m`/`mf`, `M`/`MF`); see `OperandKind::match_prefix` for
  the disambiguation order.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumIter,  TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,        PartialEq,        Ord,           PartialOrd, Debug, Hash
)]
#[repr(u8)]
pub enum OperandKind {
  #[strum(to_string = "i")]  Input,          // 0x00
  #[strum(to_string = "if")] RealInput,      // 0x01
  #[strum(to_string = "f")]  Falling,        // 0x02
  #[strum(to_string = "r")]  Rising,         // 0x03
  #[strum(to_string = "m")]  Memory,         // 0x04
  #[strum(to_string = "mf")] RealMemory,     // 0x05
  #[strum(to_string = "c")]  Command,        // 0x06
  #[strum(to_string = "b")]  BlinkOut,       // 0x07
  #[strum(to_string = "t")]  Timeout,        // 0x08
  #[strum(to_string = "q")]  Output,         // 0x09
  #[strum(to_string = "qf")] RealOutput,     // 0x0a
  #[strum(to_string = "Q")]  Contact,        // 0x0b
  #[strum(to_string = "QF")] RealContact,    // 0x0c
  #[strum(to_string = "T")]  Start,          // 0x0d
  #[strum(to_string = "M")]  PulseIn,        // 0x0e
  #[strum(to_string = "MF")] RealMemoryIn,   // 0x0f
  #[strum(to_string = "W")]  Write,          // 0x10
}

lazy_static! {
  /// Operand codes ordered longest first. The sort is stable, so codes of equal length keep
  /// their table order.
  static ref CODES_LONGEST_FIRST: Vec<(&'static str, OperandKind)> = {
    let mut codes: Vec<(&'static str, OperandKind)> =
      OperandKind::iter().map(|kind| (kind.code(), kind)).collect();
    codes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    codes
  };
}

impl OperandKind {
  pub fn ordinal(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn code(&self) -> &'static str {
    (*self).into()
  }

  /**
    Matches the start of `text` against the operand codes and returns the kind together with
    the unmatched remainder of `text`.

    The longest code is tried first, so `if3` is a `RealInput` at word 3 and never an `Input`
    followed by the garbage `f3`.
  */
  pub fn match_prefix(text: &str) -> Option<(OperandKind, &str)> {
    CODES_LONGEST_FIRST
      .iter()
      .find(|(code, _)| text.starts_with(*code))
      .map(|(code, kind)| (*kind, &text[code.len()..]))
  }
}
