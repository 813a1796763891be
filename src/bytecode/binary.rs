/*!
  This module is responsible for the encoding and decoding of binary instructions, and for the
  flat binary form of a whole program.
*/

use std::fmt::{Display, Formatter};
use std::ops::Deref;

use super::{Argument, Instruction, Modifiers, Operation};
use crate::address::Address;
use crate::error::ProgramFormatError;

// If you change this you must also change `encode_instruction` and `decode_instruction`.
pub type Word = u32;

const OPCODE_SHIFT       : u32  = 27;
const COND_BIT           : Word = 0x0400_0000;
const NEGATE_INS_BIT     : Word = 0x0200_0000;
const PUSH_BIT           : Word = 0x0100_0000;
const RETURN_BIT         : Word = 0x0080_0000;
const WORD_BIT           : Word = 0x0040_0000;
const NEGATE_ARG_BIT     : Word = 0x0020_0000;
const OPERAND_SHIFT      : u32  = 16;
const OPERAND_MASK       : Word = 0x1F;
const TARGET_MASK        : Word = 0x01FF_FFFF;

/// The largest jump or call target that fits in an instruction.
pub const MAX_TARGET: Word = TARGET_MASK;

fn flag(word: Word, bit: Word) -> bool {
  word & bit != 0
}

/**
  Decodes a word. Every one of the 2^32 words decodes to some `Instruction`; it is the
  caller's responsibility to reject reserved opcodes and operand ordinals outside the
  operand table.
*/
pub fn decode_instruction(word: Word) -> Instruction {
  let operation = Operation::from_code((word >> OPCODE_SHIFT) as u8);

  if operation.is_jump() {
    // [OpCode:5][C][N][Target:25]
    return Instruction {
      operation,
      modifiers: Modifiers {
        conditional        : flag(word, COND_BIT),
        negate_instruction : flag(word, NEGATE_INS_BIT),
        ..Modifiers::default()
      },
      argument: Argument::Target(word & TARGET_MASK)
    };
  }

  // [OpCode:5][C][N][P][R][W][G][Operand:5][Byte:8][Bit:8]
  let address =
    match flag(word, WORD_BIT) {
      true  => Address::Word((word & 0xFFFF) as u16),
      false => Address::Bit {
        byte : ((word >> 8) & 0xFF) as u8,
        bit  : (word & 0xFF) as u8
      }
    };

  Instruction {
    operation,
    modifiers: Modifiers {
      conditional        : flag(word, COND_BIT),
      negate_instruction : flag(word, NEGATE_INS_BIT),
      push               : flag(word, PUSH_BIT),
      ret                : flag(word, RETURN_BIT),
      negate_argument    : flag(word, NEGATE_ARG_BIT),
    },
    argument: Argument::Operand {
      kind: ((word >> OPERAND_SHIFT) & OPERAND_MASK) as u8,
      address
    }
  }
}

/**
  Encodes the instruction into bytecode. It is the caller's responsibility to use the
  `Argument` variant matching the opcode, and to keep the operand ordinal below 32 and jump
  targets within `MAX_TARGET`. Out of range values are truncated to their fields.

  For jumps and calls only the `C` and `N` flags are encoded, since the other flag bits are
  part of the target field.
*/
pub fn encode_instruction(instruction: &Instruction) -> Word {
  let modifiers = &instruction.modifiers;
  let mut word: Word = (instruction.operation.code() as Word) << OPCODE_SHIFT;

  if modifiers.conditional {
    word |= COND_BIT;
  }
  if modifiers.negate_instruction {
    word |= NEGATE_INS_BIT;
  }

  match instruction.argument {

    Argument::Target(target) => {
      word |= target & TARGET_MASK;
    }

    Argument::Operand { kind, address } => {
      if modifiers.push {
        word |= PUSH_BIT;
      }
      if modifiers.ret {
        word |= RETURN_BIT;
      }
      if modifiers.negate_argument {
        word |= NEGATE_ARG_BIT;
      }
      word |= ((kind as Word) & OPERAND_MASK) << OPERAND_SHIFT;
      match address {
        Address::Word(value) => {
          word |= WORD_BIT | value as Word;
        }
        Address::Bit { byte, bit } => {
          word |= ((byte as Word) << 8) | bit as Word;
        }
      }
    }

  }

  word
}

/// An assembled program: an ordered, zero-indexed sequence of instruction words. Immutable
/// once built.
#[derive(Clone, Default, Debug, Eq, PartialEq, Hash)]
pub struct Program {
  code: Vec<Word>
}

impl Program {
  pub fn new(code: Vec<Word>) -> Program {
    Program { code }
  }

  pub fn words(&self) -> &[Word] {
    &self.code
  }

  /// Decodes every word of the program.
  pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
    self.code.iter().map(|word| decode_instruction(*word))
  }

  /// The flat binary form: 4 bytes per instruction, little-endian.
  pub fn to_bytes(&self) -> Vec<u8> {
    self.code.iter().flat_map(|word| word.to_le_bytes()).collect()
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Program, ProgramFormatError> {
    if bytes.len() % 4 != 0 {
      return Err(ProgramFormatError::TruncatedWord { length: bytes.len() });
    }
    let code =
      bytes
        .chunks_exact(4)
        .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok(Program { code })
  }
}

impl From<Vec<Word>> for Program {
  fn from(code: Vec<Word>) -> Self {
    Program::new(code)
  }
}

impl FromIterator<Instruction> for Program {
  fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
    Program::new(iter.into_iter().map(|i| encode_instruction(&i)).collect())
  }
}

impl Deref for Program {
  type Target = [Word];

  fn deref(&self) -> &[Word] {
    &self.code
  }
}

impl Display for Program {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for (pc, word) in self.code.iter().enumerate() {
      writeln!(f, "[{:04}] 0x{:08x}  {}", pc, word, decode_instruction(*word))?;
    }
    Ok(())
  }
}
