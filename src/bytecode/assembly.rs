/*!
  The human readable textual form of bytecode is called assembly. This module turns Instruction
  List assembly into a `Program` in two passes over the source lines.

  The grammar of a line is
  ```text
  <line>     ::= [ <label> ':' ] [ <mnemonic> [ <operand> ] ] [ ';' <comment> ]
  <mnemonic> ::= <name> with any of the modifiers '!' '?' '(' mixed in
  <operand>  ::= [ '!' ] '%' <code> ( <byte> '/' <bit> | <word> )     for all but JMP/CAL
               | <label> | <target>                                   for JMP/CAL
  ```
  A line containing only whitespace is blank. Blank lines produce nothing and are not counted.
  Every other line produces exactly one instruction, so a line holding only a label or only a
  comment assembles to `NOP`.

  The first pass binds each label to the 1-based count of non-blank lines up to and including
  the labeled line. The second pass encodes every line, resolving jump and call operands
  against the collected labels. Assembly stops at the first error.
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  character::complete::{
    char as one_char,
    u16 as word_p,
    u32 as target_p,
    u8 as byte_p
  },
  combinator::{all_consuming, map},
  sequence::separated_pair,
  IResult
};

use super::binary::MAX_TARGET;
use super::{encode_instruction, Argument, Instruction, Modifiers, OperandKind, Operation, Program, Word};
use crate::address::Address;
use crate::error::CompileError;
use crate::symboltable::LabelTable;

/// A non-blank line of source text.
struct SourceLine<'a> {
  /// 1-based line number in the source text, counting blank lines.
  number : usize,
  text   : &'a str
}

/// Why an operand failed to parse, before the line number is known.
#[derive(Debug, Eq, PartialEq)]
enum OperandError {
  MissingMarker,
  UnknownKind,
  Malformed
}

impl OperandError {
  fn at(self, line: usize, operand: &str) -> CompileError {
    let operand = operand.to_string();
    match self {
      OperandError::MissingMarker => CompileError::MissingOperandMarker { line, operand },
      OperandError::UnknownKind   => CompileError::UnknownOperandKind { line, operand },
      OperandError::Malformed     => CompileError::MalformedOperand { line, operand },
    }
  }
}

/// A `Compilation` is the result of `Compilation::compile(source)`: the program and the labels
/// collected while building it. The labels are only diagnostic; the program never refers to
/// them.
#[derive(Clone, Debug)]
pub struct Compilation {
  pub program : Program,
  pub labels  : LabelTable,
}

impl Compilation {

  pub fn compile(text: &str) -> Result<Compilation, CompileError> {
    let lines: Vec<SourceLine> = source_lines(text).collect();

    // First pass: localize labels.
    let labels = collect_labels(&lines);

    #[cfg(feature = "trace_computation")]
    println!("labels:\n{}", labels);

    // Second pass: compile.
    let mut code: Vec<Word> = Vec::with_capacity(lines.len());
    for line in lines.iter() {
      let instruction = parse_line(line, &labels)?;
      let word = encode_instruction(&instruction);

      #[cfg(feature = "trace_computation")]
      println!("  [{:04}] {:<30} 0x{:08x}  {}", code.len(), line.text.trim(), word, instruction);

      code.push(word);
    }

    Ok(Compilation {
      program: Program::new(code),
      labels
    })
  }

}

/// Assembles Instruction List source text into a program.
pub fn assemble(text: &str) -> Result<Program, CompileError> {
  Compilation::compile(text).map(|compilation| compilation.program)
}

/**
  Assembles a single line. Jumps can only refer to a label defined on the same line or to a
  decimal target. A blank line assembles to `NOP`.
*/
pub fn assemble_one(line: &str) -> Result<Word, CompileError> {
  let program = assemble(line)?;
  Ok(program.words().first().copied().unwrap_or_default())
}

/**
  Parses a bare operand such as `%i0/1` or `%qf3` into its kind and address. Useful for hosts
  that address memory with the same notation as the assembler. The line number of any error
  is 1.
*/
pub fn parse_operand(text: &str) -> Result<(OperandKind, Address), CompileError> {
  let text = text.trim();
  parse_marked_operand(text).map_err(|e| e.at(1, text))
}

fn source_lines(text: &str) -> impl Iterator<Item = SourceLine<'_>> {
  text
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(index, line)| SourceLine { number: index + 1, text: line })
}

/// Splits `line` into its label, if any, and the code that follows, with the comment removed.
fn split_label(line: &str) -> (Option<&str>, &str) {
  let code =
    match line.split_once(';') {
      Some((code, _comment)) => code,
      None                   => line
    };

  match code.split_once(':') {
    Some((name, rest)) => {
      let name = name.trim();
      match !name.is_empty() && !name.contains(char::is_whitespace) {
        true  => (Some(name), rest),
        false => (None, code)
      }
    }
    None => (None, code)
  }
}

fn collect_labels(lines: &[SourceLine]) -> LabelTable {
  let mut labels = LabelTable::new();

  for (index, line) in lines.iter().enumerate() {
    if let (Some(name), _) = split_label(line.text) {
      let bound_to = (index + 1) as Word;
      if let Err((_name, _line)) = labels.insert(name, bound_to) {
        #[cfg(feature = "trace_computation")]
        println!("  duplicate label ({}) on line {} ignored", _name, line.number);
      }
    }
  }

  labels
}

fn parse_line(line: &SourceLine, labels: &LabelTable) -> Result<Instruction, CompileError> {
  let (_label, code) = split_label(line.text);
  let mut tokens = code.split_whitespace();

  let mnemonic =
    match tokens.next() {
      Some(mnemonic) => mnemonic,
      None           => return Ok(Instruction::nullary(Operation::Nop))
    };
  let operand = tokens.next().unwrap_or("");
  if let Some(extra) = tokens.next() {
    return Err(OperandError::Malformed.at(line.number, extra));
  }

  let (operation, mut modifiers) = parse_mnemonic(mnemonic).ok_or_else(|| {
    CompileError::UnknownInstruction { line: line.number, mnemonic: mnemonic.to_string() }
  })?;

  if operation.is_jump() {
    // The push flag shares its bit with the target.
    modifiers.push = false;
    let target = resolve_target(operand, labels, line.number)?;
    return Ok(Instruction::new(operation, modifiers, Argument::Target(target)));
  }

  // An operand of a single character or less is no operand at all.
  if operand.chars().count() <= 1 {
    return Ok(Instruction::new(operation, modifiers, Argument::empty()));
  }

  let (negate_argument, marked) =
    match operand.strip_prefix('!') {
      Some(rest) => (true, rest),
      None       => (false, operand)
    };
  let (kind, address) = parse_marked_operand(marked).map_err(|e| e.at(line.number, operand))?;
  modifiers.negate_argument = negate_argument;

  Ok(Instruction::new(operation, modifiers, Argument::operand(kind, address)))
}

/// Strips the modifier characters out of the mnemonic and looks up what remains.
fn parse_mnemonic(token: &str) -> Option<(Operation, Modifiers)> {
  let upper = token.to_uppercase();
  let modifiers = Modifiers {
    negate_instruction : upper.contains('!'),
    push               : upper.contains('('),
    conditional        : upper.contains('?'),
    ..Modifiers::default()
  };
  let name = upper.replace(['!', '(', '?'], " ");

  Operation::from_str(name.trim()).ok().map(|operation| (operation, modifiers))
}

/// Parses `%<code><address>`.
fn parse_marked_operand(text: &str) -> Result<(OperandKind, Address), OperandError> {
  let (before, after) = text.split_once('%').ok_or(OperandError::MissingMarker)?;
  if !before.is_empty() {
    return Err(OperandError::Malformed);
  }
  let (kind, address_text) = OperandKind::match_prefix(after).ok_or(OperandError::UnknownKind)?;

  match all_consuming(address)(address_text) {
    Ok((_, address)) => Ok((kind, address)),
    Err(_)           => Err(OperandError::Malformed)
  }
}

/// `<byte>/<bit>` or `<word>`.
fn address(input: &str) -> IResult<&str, Address> {
  alt((
    map(separated_pair(byte_p, one_char('/'), byte_p), |(byte, bit)| Address::Bit { byte, bit }),
    map(word_p, Address::Word),
  ))(input)
}

fn resolve_target(operand: &str, labels: &LabelTable, line: usize) -> Result<Word, CompileError> {
  let operand = operand.trim();

  if !operand.is_empty() {
    if let Some((_name, target)) = labels.resolve(operand) {
      return Ok(target);
    }
  }

  let parsed: IResult<&str, u32> = all_consuming(target_p)(operand);
  match parsed {

    Ok((_, target)) if target <= MAX_TARGET => Ok(target),

    _ if !operand.is_empty() && operand.chars().all(|c| c.is_ascii_digit()) => {
      Err(CompileError::MalformedOperand { line, operand: operand.to_string() })
    }

    _ => Err(CompileError::UnresolvedLabel { line, label: operand.to_string() })

  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{decode_instruction, disassemble};

  fn single(line: &str) -> Instruction {
    decode_instruction(assemble_one(line).unwrap())
  }

  #[test]
  fn operand_forms(){
    assert_eq!(
      single("LD %i0/1"),
      Instruction::with_operand(Operation::Ld, OperandKind::Input, Address::bit(0, 1))
    );
    assert_eq!(
      single("  st   %qf12  "),
      Instruction::with_operand(Operation::St, OperandKind::RealOutput, Address::Word(12))
    );

    let and = single("AND!( !%M2/3");
    assert_eq!(and.operation, Operation::And);
    assert!(and.modifiers.negate_instruction);
    assert!(and.modifiers.push);
    assert!(and.modifiers.negate_argument);
    assert!(!and.modifiers.conditional);
    assert_eq!(and.argument, Argument::operand(OperandKind::PulseIn, Address::bit(2, 3)));
  }

  #[test]
  fn labels_and_comments_are_stripped(){
    let program = assemble("start: LD %i0/0 ; read the switch\n ST %q0/0;drive the lamp").unwrap();
    assert_eq!(program.len(), 2);
    assert_eq!(disassemble(program[0]), "LD %i0/0");
    assert_eq!(disassemble(program[1]), "ST %q0/0");
  }

  #[test]
  fn label_and_comment_only_lines_are_nops(){
    let program = assemble("loop:\n; nothing\nLD %i0/0").unwrap();
    assert_eq!(program.len(), 3);
    assert_eq!(decode_instruction(program[0]).operation, Operation::Nop);
    assert_eq!(decode_instruction(program[1]).operation, Operation::Nop);
  }

  #[test]
  fn lenient_missing_operand(){
    assert_eq!(single("NOT"), Instruction::nullary(Operation::Not));
    assert_eq!(single("S"), Instruction::nullary(Operation::S));
    assert_eq!(single("R !"), Instruction::nullary(Operation::R));
    assert_eq!(single(")"), Instruction::nullary(Operation::Pop));
  }

  #[test]
  fn forward_and_backward_labels(){
    let forward = "JMP end\nLD %i0/0\nLD %i0/1\nLD %i0/2\nend: ST %q0/0";
    let program = assemble(forward).unwrap();
    assert_eq!(decode_instruction(program[0]).argument, Argument::Target(5));

    let backward = "LD %i0/0\nLD %i0/1\nLD %i0/2\nST %q0/0\nend: JMP end";
    let program = assemble(backward).unwrap();
    assert_eq!(decode_instruction(program[4]).argument, Argument::Target(5));

    let compilation = Compilation::compile("a: NOP\nb: NOP\nJMP b\nJMP a").unwrap();
    assert_eq!(decode_instruction(compilation.program[2]).argument, Argument::Target(2));
    assert_eq!(decode_instruction(compilation.program[3]).argument, Argument::Target(1));
    assert_eq!(compilation.labels.get_line("b"), Some(2));
  }

  #[test]
  fn blank_lines_are_neutral(){
    let dense  = "top: LD %i0/0\nAND %i0/1\nJMP? done\nST %q0/0\ndone: JMP top";
    let sparse = "\n\ntop: LD %i0/0\n   \nAND %i0/1\n\t\nJMP? done\n\nST %q0/0\n\n\ndone: JMP top\n\n";
    assert_eq!(assemble(dense).unwrap(), assemble(sparse).unwrap());

    let labels = Compilation::compile(sparse).unwrap().labels;
    assert_eq!(labels.get_line("top"), Some(1));
    assert_eq!(labels.get_line("done"), Some(5));
  }

  #[test]
  fn duplicate_labels_keep_first_binding(){
    let program = assemble("x: NOP\nx: NOP\nJMP x").unwrap();
    assert_eq!(decode_instruction(program[2]).argument, Argument::Target(1));
  }

  #[test]
  fn decimal_jump_targets(){
    assert_eq!(single("JMP 7").argument, Argument::Target(7));
    assert_eq!(single("CAL?! 12").argument, Argument::Target(12));
    assert!(matches!(
      assemble_one("JMP 99999999999"),
      Err(CompileError::MalformedOperand { line: 1, .. })
    ));
    assert!(matches!(
      assemble_one("JMP 33554432"),
      Err(CompileError::MalformedOperand { line: 1, .. })
    ));
  }

  #[test]
  fn unknown_instruction(){
    assert_eq!(
      assemble("FOO %i0/0"),
      Err(CompileError::UnknownInstruction { line: 1, mnemonic: "FOO".to_string() })
    );
    let error = assemble("LD %i0/0\n\nST %q0/0\nfoo! %i0/0\nBAR").unwrap_err();
    assert_eq!(error.line(), 4);
    assert!(matches!(error, CompileError::UnknownInstruction { .. }));
  }

  #[test]
  fn unresolved_label(){
    assert_eq!(
      assemble("JMP nowhere"),
      Err(CompileError::UnresolvedLabel { line: 1, label: "nowhere".to_string() })
    );
    assert!(matches!(assemble("JMP"), Err(CompileError::UnresolvedLabel { line: 1, .. })));
  }

  #[test]
  fn operand_errors(){
    assert!(matches!(assemble("LD i0/0"),     Err(CompileError::MissingOperandMarker { line: 1, .. })));
    assert!(matches!(assemble("LD %x0/0"),    Err(CompileError::UnknownOperandKind { line: 1, .. })));
    assert!(matches!(assemble("LD %i0/"),     Err(CompileError::MalformedOperand { line: 1, .. })));
    assert!(matches!(assemble("LD %i256/0"),  Err(CompileError::MalformedOperand { line: 1, .. })));
    assert!(matches!(assemble("LD %i70000"),  Err(CompileError::MalformedOperand { line: 1, .. })));
    assert!(matches!(assemble("LD %i"),       Err(CompileError::MalformedOperand { line: 1, .. })));
    assert!(matches!(assemble("LD x%i0/0"),   Err(CompileError::MalformedOperand { line: 1, .. })));
    assert!(matches!(assemble("LD %i0/0 %i"), Err(CompileError::MalformedOperand { line: 1, .. })));
  }

  #[test]
  fn stops_at_first_error(){
    let error = assemble("LD %i0/0\nLD %z0/0\nFOO").unwrap_err();
    assert_eq!(error, CompileError::UnknownOperandKind { line: 2, operand: "%z0/0".to_string() });
  }

  #[test]
  fn bare_operands(){
    assert_eq!(parse_operand("%i0/1"), Ok((OperandKind::Input, Address::bit(0, 1))));
    assert_eq!(parse_operand(" %MF7 "), Ok((OperandKind::RealMemoryIn, Address::Word(7))));
    assert!(parse_operand("i0/1").is_err());
  }

  #[test]
  fn assembler_disassembler_duality(){
    let lines = [
      "LD %i0/0",
      "LD! %if3",
      "ST !%q1/7",
      "S %m0/2",
      "R %M4/1",
      "AND( %i0/1",
      "OR!( !%Q2/2",
      "XOR %b0/0",
      "NOT",
      "ADD %mf10",
      "SUB %c1",
      "MUL %t2",
      "DIV( %W5",
      "GT %r0/0",
      "GE %f0/1",
      "EQ %QF9",
      "NE %T3",
      "LE %MF4",
      "LT %qf65535",
      ")",
      "RET",
      "RET!?",
      "JMP 12",
      "JMP!? 3",
      "CAL? 0",
      "NOP",
    ];
    for line in lines.iter() {
      assert_eq!(disassemble(assemble_one(line).unwrap()), *line);
    }

    // Modifier order and case are canonicalized.
    assert_eq!(disassemble(assemble_one("and(! %i0/1").unwrap()), "AND!( %i0/1");
    assert_eq!(disassemble(assemble_one("jmp?! 4").unwrap()), "JMP!? 4");
  }

}
