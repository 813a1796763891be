/*!
  The virtual machine that runs assembled programs.

  The machine state is small: a program counter into the (borrowed, immutable) program, an
  accumulator, a stack of open brackets and a stack of return addresses. Operands live in a
  `Memory` owned by the caller, which the VM only reads and writes through the trait.

  Execution ends successfully at a `RET` with an empty call stack. Running off the end of the
  program, dividing by zero, and the other conditions in `RuntimeError` end it with an
  error, leaving the state exactly as it was before the failing instruction.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::address::Address;
use crate::bytecode::{decode_instruction, Argument, Instruction, OperandKind, Operation, Program};
use crate::error::RuntimeError;
use crate::memory::Memory;
use crate::value::Value;

/// An open bracket: the operation waiting for the bracketed sub-expression, and the
/// accumulator from before the bracket was opened.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
  pub operation   : Operation,
  pub negate      : bool,
  pub accumulator : Value,
}

impl Display for Frame {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.negate {
      true  => write!(f, "{}! {}", self.operation, self.accumulator),
      false => write!(f, "{} {}", self.operation, self.accumulator)
    }
  }
}

/// What became of the machine after a step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
  Running,
  Halted
}

pub struct Vm<'p> {
  program     : &'p Program,
  pc          : usize,       // Program counter, an index into `program`
  accumulator : Value,
  brackets    : Vec<Frame>,  // Open brackets, innermost last
  calls       : Vec<usize>,  // Return addresses, innermost last
  executed    : u64,         // Instructions completed so far
  step_limit  : Option<u64>,
  halted      : bool,
}

impl<'p> Vm<'p> {

  pub fn new(program: &'p Program) -> Vm<'p> {
    Vm {
      program,
      pc          : 0,
      accumulator : Value::default(),
      brackets    : vec![],
      calls       : vec![],
      executed    : 0,
      step_limit  : None,
      halted      : false,
    }
  }

  /// Bounds the number of instructions the machine will execute. Asking for more yields
  /// `RuntimeError::Cancelled`.
  pub fn with_step_limit(mut self, limit: u64) -> Vm<'p> {
    self.step_limit = Some(limit);
    self
  }

  // region Accessors

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn accumulator(&self) -> Value {
    self.accumulator
  }

  pub fn executed(&self) -> u64 {
    self.executed
  }

  pub fn is_halted(&self) -> bool {
    self.halted
  }

  /// Open brackets, outermost first.
  pub fn brackets(&self) -> &[Frame] {
    &self.brackets
  }

  /// Return addresses, outermost first.
  pub fn call_stack(&self) -> &[usize] {
    &self.calls
  }

  // endregion

  /// Runs until the program halts or fails.
  pub fn run<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<(), RuntimeError> {
    #[cfg(feature = "trace_computation")]
    println!("{}", self);

    while self.step(memory)? == Status::Running {
      #[cfg(feature = "trace_computation")]
      println!("{}", self);
    }

    Ok(())
  }

  /**
    Executes the instruction at `pc`. On error nothing about the machine changes, so `pc`
    still indexes the failing instruction. Stepping a halted machine does nothing.
  */
  pub fn step<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<Status, RuntimeError> {
    if self.halted {
      return Ok(Status::Halted);
    }
    if let Some(limit) = self.step_limit {
      if self.executed >= limit {
        return Err(RuntimeError::Cancelled { executed: self.executed });
      }
    }

    let pc = self.pc;
    let word = *self.program.get(pc).ok_or(RuntimeError::ProgramOverrun { pc })?;
    let instruction = decode_instruction(word);

    #[cfg(feature = "trace_computation")]
    println!("[{:04}] {}", pc, instruction);

    let next = self.dispatch(&instruction, memory)?;
    self.executed += 1;

    match next {
      Some(pc) => {
        self.pc = pc;
        Ok(Status::Running)
      }
      None => {
        self.halted = true;
        Ok(Status::Halted)
      }
    }
  }

  /// Executes one instruction and returns the next `pc`, or `None` to halt.
  fn dispatch<M: Memory + ?Sized>(&mut self, instruction: &Instruction, memory: &mut M)
    -> Result<Option<usize>, RuntimeError>
  {
    let pc = self.pc;
    let modifiers = &instruction.modifiers;

    match instruction.operation {

      Operation::Nop => {}

      Operation::Ld => {
        let (kind, address) = self.operand(instruction)?;
        let negate = modifiers.negate_argument ^ modifiers.negate_instruction;
        self.accumulator = memory.read(kind, address).negate_if(negate);
      }

      Operation::St => {
        let (kind, address) = self.operand(instruction)?;
        let negate = modifiers.negate_argument ^ modifiers.negate_instruction;
        memory.write(kind, address, self.accumulator.negate_if(negate));
      }

      Operation::S | Operation::R => {
        let (kind, address) = self.operand(instruction)?;
        if self.accumulator.is_true() {
          memory.write(kind, address, Value::Bool(instruction.operation == Operation::S));
        }
      }

      Operation::Not => {
        self.accumulator = self.accumulator.negate();
      }

      operation if operation.is_binary() => {
        let (kind, address) = self.operand(instruction)?;
        let operand = memory.read(kind, address).negate_if(modifiers.negate_argument);

        match modifiers.push {
          true => {
            self.brackets.push(Frame {
              operation,
              negate      : modifiers.negate_instruction,
              accumulator : self.accumulator
            });
            self.accumulator = operand;
          }
          false => {
            self.accumulator =
              combine(operation, modifiers.negate_instruction, self.accumulator, operand, pc)?;
          }
        }
      }

      Operation::Pop => {
        let frame = *self.brackets.last().ok_or(RuntimeError::UnbalancedBracket { pc })?;
        self.accumulator =
          combine(frame.operation, frame.negate, frame.accumulator, self.accumulator, pc)?;
        self.brackets.pop();
      }

      Operation::Jmp => {
        if self.condition_holds(instruction) {
          return Ok(Some(self.target(instruction)));
        }
      }

      Operation::Cal => {
        if self.condition_holds(instruction) {
          self.calls.push(pc + 1);
          return Ok(Some(self.target(instruction)));
        }
      }

      Operation::Ret => {
        if self.condition_holds(instruction) {
          return Ok(self.calls.pop());
        }
      }

      operation => {
        return Err(RuntimeError::IllegalOpcode { pc, opcode: operation.code() });
      }

    } // end match on operation

    Ok(Some(pc + 1))
  }

  // region Operand helpers

  fn operand(&self, instruction: &Instruction) -> Result<(OperandKind, Address), RuntimeError> {
    match instruction.argument {
      Argument::Operand { kind, address } => {
        match OperandKind::try_from(kind) {
          Ok(operand_kind) => Ok((operand_kind, address)),
          Err(_)           => Err(RuntimeError::IllegalOperand { pc: self.pc, kind })
        }
      }
      // Decoding only produces targets for jumps and calls.
      Argument::Target(_) => {
        Err(RuntimeError::IllegalOpcode { pc: self.pc, opcode: instruction.operation.code() })
      }
    }
  }

  fn target(&self, instruction: &Instruction) -> usize {
    match instruction.argument {
      Argument::Target(target) => target as usize,
      Argument::Operand { .. } => self.pc + 1
    }
  }

  /// Unconditional jumps, calls and returns are always taken. Conditional ones are taken when
  /// the accumulator is true, or false if the instruction is negated.
  fn condition_holds(&self, instruction: &Instruction) -> bool {
    match instruction.modifiers.conditional {
      true  => self.accumulator.is_true() != instruction.modifiers.negate_instruction,
      false => true
    }
  }

  // endregion

  // region Display methods

  fn make_stack_table<T>(name: &str, items: &[T]) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Depth", ubl->"Contents"]);

    for (i, item) in items.iter().enumerate().rev() {
      table.add_row(row![r->format!("{}[{}] =", name, i), format!("{}", item)]);
    }
    table
  }

  // endregion
}

/**
  Applies a binary operation. A negated logic operation (`ANDN`, `ORN`, `XORN`) negates its
  right hand side; a negated comparison negates its result. Arithmetic ignores the flag.
*/
fn combine(operation: Operation, negate: bool, lhs: Value, rhs: Value, pc: usize)
  -> Result<Value, RuntimeError>
{
  let logic = matches!(operation, Operation::And | Operation::Or | Operation::Xor);
  let rhs = rhs.negate_if(negate && logic);

  match lhs.combine(operation, rhs) {
    Some(result) => Ok(result.negate_if(negate && operation.is_comparison())),
    None         => Err(RuntimeError::DivisionByZero { pc })
  }
}

/// Runs `program` from the start against `memory` until it halts or fails.
pub fn execute<M: Memory + ?Sized>(program: &Program, memory: &mut M) -> Result<(), RuntimeError> {
  Vm::new(program).run(memory)
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Vm<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let bracket_table = Vm::make_stack_table("B", &self.brackets);
    let call_table    = Vm::make_stack_table("C", &self.calls);

    let mut combined_table = table!([bracket_table, call_table]);

    combined_table.set_titles(row![ub->"Brackets", ub->"Calls"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.halted {
      true  => "Halted.",
      false => "Running."
    };

    write!(
      f,
      "PC: {:04}\tAccumulator: {}\tExecuted: {}\t{}\n{}",
      self.pc, self.accumulator, self.executed, status, combined_table
    )
  }
}
