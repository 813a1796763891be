use std::fmt::{Display, Formatter};

use super::{OperandKind, Operation, Word};
use crate::address::Address;

/// The single bit flags of an instruction word other than `W`, which is implied by the
/// `Address` variant.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash)]
pub struct Modifiers {
  /// `?` in assembly.
  pub conditional        : bool,
  /// `!` after the mnemonic.
  pub negate_instruction : bool,
  /// `(` after the mnemonic. Only exists for non-jump instructions.
  pub push               : bool,
  /// Reserved. Only exists for non-jump instructions.
  pub ret                : bool,
  /// `!` before the `%` of the operand. Only exists for non-jump instructions.
  pub negate_argument    : bool,
}

/// The argument field of an instruction. Which variant applies is determined by the opcode.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Argument {
  /// [Target:25]
  Target(Word),
  /// [W:1][G:1][Operand:5][Byte:8][Bit:8] or [W:1][G:1][Operand:5][Word:16]
  ///
  /// `kind` is the raw 5 bit operand ordinal, which may lie outside the operand table for
  /// words that were not produced by the assembler.
  Operand {
    kind    : u8,
    address : Address
  },
}

impl Argument {
  pub fn operand(kind: OperandKind, address: Address) -> Argument {
    Argument::Operand { kind: kind.ordinal(), address }
  }

  /// The all-zero operand, `%i0/0`, used when the source line has no operand.
  pub fn empty() -> Argument {
    Argument::Operand { kind: 0, address: Address::default() }
  }

  pub fn operand_kind(&self) -> Option<OperandKind> {
    match self {
      Argument::Operand { kind, .. } => OperandKind::try_from(*kind).ok(),
      Argument::Target(_)            => None
    }
  }
}

/// Holds the unencoded components of an instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub operation : Operation,
  pub modifiers : Modifiers,
  pub argument  : Argument,
}

impl Instruction {
  pub fn new(operation: Operation, modifiers: Modifiers, argument: Argument) -> Instruction {
    Instruction { operation, modifiers, argument }
  }

  /// A jump or call to an absolute instruction index.
  pub fn jump(operation: Operation, target: Word) -> Instruction {
    Instruction {
      operation,
      modifiers : Modifiers::default(),
      argument  : Argument::Target(target)
    }
  }

  /// An instruction that operates on `%<kind><address>`.
  pub fn with_operand(operation: Operation, kind: OperandKind, address: Address) -> Instruction {
    Instruction {
      operation,
      modifiers : Modifiers::default(),
      argument  : Argument::operand(kind, address)
    }
  }

  /// An instruction with no operand in its text form.
  pub fn nullary(operation: Operation) -> Instruction {
    Instruction {
      operation,
      modifiers : Modifiers::default(),
      argument  : Argument::empty()
    }
  }

  /// Whether the text form can omit the operand without losing information.
  fn has_silent_operand(&self) -> bool {
    self.operation.is_operandless()
      && !self.modifiers.negate_argument
      && self.argument == Argument::empty()
  }
}

/**
  The canonical assembly text of an instruction: the mnemonic, the flag suffixes in the
  fixed order `!?(`, a space, then the jump target or the operand.
*/
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.operation)?;
    if self.modifiers.negate_instruction {
      write!(f, "!")?;
    }
    if self.modifiers.conditional {
      write!(f, "?")?;
    }
    if self.modifiers.push {
      write!(f, "(")?;
    }

    if self.has_silent_operand() {
      return Ok(());
    }

    match &self.argument {

      Argument::Target(target) => {
        write!(f, " {}", target)
      }

      Argument::Operand { kind, address } => {
        write!(f, " ")?;
        if self.modifiers.negate_argument {
          write!(f, "!")?;
        }
        match OperandKind::try_from(*kind) {
          Ok(operand_kind) => write!(f, "%{}{}", operand_kind, address),
          Err(_)           => write!(f, "%?{}:{}", kind, address)
        }
      }

    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_operand_forms(){
    let ld = Instruction::with_operand(Operation::Ld, OperandKind::Input, Address::bit(0, 1));
    assert_eq!(ld.to_string(), "LD %i0/1");

    let st = Instruction::with_operand(Operation::St, OperandKind::RealOutput, Address::Word(12));
    assert_eq!(st.to_string(), "ST %qf12");

    let mut and = Instruction::with_operand(Operation::And, OperandKind::Memory, Address::bit(3, 7));
    and.modifiers.push = true;
    and.modifiers.negate_instruction = true;
    and.modifiers.negate_argument = true;
    assert_eq!(and.to_string(), "AND!( !%m3/7");
  }

  #[test]
  fn display_jumps(){
    let mut jmp = Instruction::jump(Operation::Jmp, 42);
    jmp.modifiers.conditional = true;
    jmp.modifiers.negate_instruction = true;
    assert_eq!(jmp.to_string(), "JMP!? 42");
    assert_eq!(Instruction::jump(Operation::Cal, 0).to_string(), "CAL 0");
  }

  #[test]
  fn display_operandless(){
    assert_eq!(Instruction::nullary(Operation::Not).to_string(), "NOT");
    assert_eq!(Instruction::nullary(Operation::Pop).to_string(), ")");
    assert_eq!(Instruction::nullary(Operation::Ret).to_string(), "RET");
    // An operand-taking instruction always shows its operand.
    assert_eq!(Instruction::nullary(Operation::Ld).to_string(), "LD %i0/0");
  }

  #[test]
  fn display_unknown_operand_kind(){
    let instruction = Instruction::new(
      Operation::Ld,
      Modifiers::default(),
      Argument::Operand { kind: 20, address: Address::Word(3) }
    );
    assert_eq!(instruction.argument.operand_kind(), None);
    assert_eq!(instruction.to_string(), "LD %?20:3");
  }

}
