/*!
  The addressable memory space the VM reads operands from and writes results to. The storage
  itself belongs to the surrounding runtime; the VM only sees it through the `Memory` trait,
  keyed by operand kind and address.
*/

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::address::Address;
use crate::bytecode::OperandKind;
use crate::value::Value;

pub trait Memory {
  fn read(&self, kind: OperandKind, address: Address) -> Value;
  fn write(&mut self, kind: OperandKind, address: Address, value: Value);
}

/**
  A sparse in-process memory. Cells that were never written read as `Bool(false)` at a
  `byte/bit` address and `Int(0)` at a word address. Writes are coerced the same way: a
  `byte/bit` cell stores the truth of the value, a word cell its numeric view.
*/
#[derive(Clone, Default, Debug, Eq, PartialEq)]
pub struct MemoryMap {
  cells: BTreeMap<(OperandKind, Address), Value>
}

impl MemoryMap {
  pub fn new() -> MemoryMap {
    MemoryMap { cells: BTreeMap::new() }
  }

  /// Like `write`, for presetting inputs.
  pub fn set(&mut self, kind: OperandKind, address: Address, value: impl Into<Value>) {
    self.write(kind, address, value.into());
  }

  /// Cells that have been written, in (kind, address) order.
  pub fn iter(&self) -> impl Iterator<Item = (OperandKind, Address, Value)> + '_ {
    self.cells.iter().map(|((kind, address), value)| (*kind, *address, *value))
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }
}

impl Memory for MemoryMap {
  fn read(&self, kind: OperandKind, address: Address) -> Value {
    match self.cells.get(&(kind, address)) {
      Some(value) => *value,
      None if address.is_word() => Value::Int(0),
      None => Value::Bool(false)
    }
  }

  fn write(&mut self, kind: OperandKind, address: Address, value: Value) {
    let stored =
      match address {
        Address::Bit { .. } => Value::Bool(value.is_true()),
        Address::Word(_)    => Value::Int(value.as_int())
      };
    self.cells.insert((kind, address), stored);
  }
}

impl Display for MemoryMap {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();

    table.set_format(*TableFormat::consts::FORMAT_CLEAN);
    table.set_titles(row![ubr->"Operand", ubl->"Value"]);

    for (kind, address, value) in self.iter() {
      table.add_row(row![r->format!("%{}{} =", kind, address), value.to_string()]);
    }

    write!(f, "{}", table)
  }
}
