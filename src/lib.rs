/*!
  An assembler, disassembler and virtual machine for a PLC Instruction List language.

  Source text is assembled in two passes into a `Program` of 32 bit instruction words. The
  `Vm` runs a program against an accumulator and a caller supplied `Memory`. See
  `bytecode` for the instruction word layout.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod bytecode;
pub mod error;
pub mod memory;
pub mod symboltable;
pub mod value;
pub mod vm;

pub use address::Address;
pub use bytecode::{
  assemble, assemble_one, decode_instruction, disassemble, disassemble_program,
  encode_instruction, parse_operand, Compilation, Instruction, OperandKind, Operation, Program,
  Word
};
pub use error::{CompileError, ProgramFormatError, RuntimeError};
pub use memory::{Memory, MemoryMap};
pub use symboltable::LabelTable;
pub use value::Value;
pub use vm::{execute, Status, Vm};
