//! Symbol table: one canonical entry per distinct lexeme.
//!
//! The tokenizer interns every lexeme it closes, declarations bind a type to
//! identifiers, and the analyzer adds its temporaries. Entries are never
//! removed during a compilation; `clear` resets the table between runs.

use std::collections::HashMap;

use crate::tokenizer::TokenClass;
use crate::ty::Type;

/// Handle to an entry of a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub class: TokenClass,
  pub ty: Option<Type>,
  pub has_value: bool,
}

impl Symbol {
  fn new(name: &str, class: TokenClass) -> Self {
    Self {
      name: name.to_string(),
      class,
      ty: None,
      has_value: false,
    }
  }
}

/// Insertion-ordered symbol table keyed by exact lexeme text.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
  entries: Vec<Symbol>,
  index: HashMap<String, SymbolId>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the entry for `lexeme`, inserting it with `class` on first
  /// sighting. Later sightings keep the class recorded the first time.
  pub fn intern(&mut self, lexeme: &str, class: TokenClass) -> (SymbolId, TokenClass) {
    if let Some(&id) = self.index.get(lexeme) {
      return (id, self.entries[id.0].class);
    }
    let id = SymbolId(self.entries.len());
    self.entries.push(Symbol::new(lexeme, class));
    self.index.insert(lexeme.to_string(), id);
    (id, class)
  }

  pub fn lookup(&self, name: &str) -> Option<&Symbol> {
    self.index.get(name).map(|id| &self.entries[id.0])
  }

  pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
    let id = *self.index.get(name)?;
    Some(&mut self.entries[id.0])
  }

  pub fn get(&self, id: SymbolId) -> &Symbol {
    &self.entries[id.0]
  }

  pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
    &mut self.entries[id.0]
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  /// Declared type of `name`, if it exists and has been declared.
  pub fn type_of(&self, name: &str) -> Option<Type> {
    self.lookup(name).and_then(|symbol| symbol.ty)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.index.clear();
  }
}
