use std::fmt::{Display, Formatter};

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::bytecode::Word;

/**
  A label table is a mapping between label names and the instruction index they are bound to.
  It is a convenience wrapper around a BiMap, which also remembers the order in which labels
  were collected, since substring resolution is first-match in collection order.

  A name is bound at most once. Each line carries at most one label, so an index is also bound
  at most once.
*/
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
  table : BiMap<DefaultAtom, Word>,
  order : Vec<DefaultAtom>
}

impl LabelTable {

  pub fn new() -> LabelTable {
    LabelTable {
      table : BiMap::new(),
      order : Vec::new()
    }
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// The index bound to exactly `name`.
  pub fn get_line(&self, name: &str) -> Option<Word> {
    self.table.get_by_left(&DefaultAtom::from(name)).copied()
  }

  /// The label bound to `line`, if any.
  pub fn get_label(&self, line: Word) -> Option<&str> {
    self.table.get_by_right(&line).map(|atom| &**atom)
  }

  /// Binds `name` to `line`. The first binding of a name wins; a rebinding is rejected and
  /// the rejected pair returned.
  pub fn insert(&mut self, name: &str, line: Word) -> Result<(), (DefaultAtom, Word)> {
    let atom = DefaultAtom::from(name);
    self.table.insert_no_overwrite(atom.clone(), line)?;
    self.order.push(atom);
    Ok(())
  }

  /**
    Finds the label a jump operand refers to. An exact name match is preferred. Otherwise the
    first label, in collection order, whose name occurs anywhere in `operand` is used.
  */
  pub fn resolve(&self, operand: &str) -> Option<(&str, Word)> {
    self.iter()
        .find(|(name, _)| *name == operand)
        .or_else(|| self.iter().find(|(name, _)| operand.contains(*name)))
  }

  /// Labels in collection order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, Word)> + '_ {
    self.order.iter().filter_map(move |atom| {
      self.table.get_by_left(atom).map(|line| (&**atom, *line))
    })
  }
}

impl Display for LabelTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for (name, line) in self.iter() {
      writeln!(f, "  [{:04}] ({})", line, name)?;
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_binding_wins(){
    let mut labels = LabelTable::new();
    assert!(labels.insert("loop", 3).is_ok());
    assert!(labels.insert("loop", 7).is_err());
    assert_eq!(labels.get_line("loop"), Some(3));
    assert_eq!(labels.get_label(3), Some("loop"));
    assert_eq!(labels.get_label(7), None);
    assert_eq!(labels.len(), 1);
  }

  #[test]
  fn exact_match_before_substring(){
    let mut labels = LabelTable::new();
    labels.insert("a", 1).unwrap();
    labels.insert("abc", 2).unwrap();
    assert_eq!(labels.resolve("abc"), Some(("abc", 2)));
    // No exact match: first collected label contained in the operand.
    assert_eq!(labels.resolve("xabcx"), Some(("a", 1)));
    assert_eq!(labels.resolve("zzz"), None);
  }

  #[test]
  fn collection_order(){
    let mut labels = LabelTable::new();
    labels.insert("second", 9).unwrap();
    labels.insert("first", 2).unwrap();
    let names: Vec<&str> = labels.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["second", "first"]);
    assert_eq!(labels.to_string(), "  [0009] (second)\n  [0002] (first)\n");
  }

}
