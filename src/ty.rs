use std::fmt;

/// Declared type of a variable. The language has no other types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
  Bool,
}

impl Type {
  /// Map a declaration keyword onto its type, case-insensitively.
  pub fn from_keyword(keyword: &str) -> Option<Self> {
    if keyword.eq_ignore_ascii_case("int") {
      Some(Self::Int)
    } else if keyword.eq_ignore_ascii_case("bool") {
      Some(Self::Bool)
    } else {
      None
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int => f.write_str("int"),
      Self::Bool => f.write_str("bool"),
    }
  }
}
