//! An `Either` type that holds an operand address, either a discrete `byte/bit` pair or a
//! 16 bit word, with some convenience functions.

use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Address {
  /// A discrete point, written `byte/bit` in assembly.
  Bit { byte: u8, bit: u8 },
  /// An analog value or timer, written as a single decimal in assembly.
  Word(u16),
}

impl Address {
  /// The state of the `W` flag for this address.
  pub fn is_word(&self) -> bool {
    matches!(self, Address::Word(_))
  }

  pub fn bit(byte: u8, bit: u8) -> Address {
    Address::Bit { byte, bit }
  }
}

impl Default for Address {
  fn default() -> Self {
    Address::Bit { byte: 0, bit: 0 }
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Address::Bit { byte, bit } => {
        write!(f, "{}/{}", byte, bit)
      },
      Address::Word(value) => {
        write!(f, "{}", value)
      }
    }
  }
}
