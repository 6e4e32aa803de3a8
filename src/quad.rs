//! Three-address code: quadruples and their textual form.

use std::fmt;

use crate::backpatch::LabelId;
use crate::parser::{ArithOp, RelOp};

/// Placeholder for an operand a quadruple does not use.
pub const UNUSED: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  Arith(ArithOp),
  /// `=`: copy an integer value.
  Assign,
  /// `:=`: store a boolean outcome.
  BoolAssign,
  Jump,
  JumpNonZero,
  JumpIf(RelOp),
  Read,
  Write,
  Quit,
}

impl Op {
  pub fn is_jump(&self) -> bool {
    matches!(self, Self::Jump | Self::JumpNonZero | Self::JumpIf(_))
  }
}

impl fmt::Display for Op {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Arith(op) => f.write_str(op.symbol()),
      Self::Assign => f.write_str("="),
      Self::BoolAssign => f.write_str(":="),
      Self::Jump => f.write_str("j"),
      Self::JumpNonZero => f.write_str("jnz"),
      Self::JumpIf(op) => f.write_str(op.jump_mnemonic()),
      Self::Read => f.write_str("read"),
      Self::Write => f.write_str("write"),
      Self::Quit => f.write_str("quit"),
    }
  }
}

/// The `result` slot. Jumps start out `Pending` or `Hole` and are patched
/// to `Jump` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Unused,
  Name(String),
  Jump(usize),
  /// Waiting on a boolean label's backpatch list.
  Pending(LabelId),
  /// Waiting on its enclosing statement to finish.
  Hole,
}

impl Target {
  pub fn is_resolved(&self) -> bool {
    !matches!(self, Self::Pending(_) | Self::Hole)
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unused => f.write_str(UNUSED),
      Self::Name(name) => f.write_str(name),
      Self::Jump(index) => write!(f, "{index}"),
      Self::Pending(label) => write!(f, "{label}"),
      Self::Hole => f.write_str("?"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quadruple {
  pub op: Op,
  pub arg1: String,
  pub arg2: String,
  pub result: Target,
}

impl Quadruple {
  pub fn new(op: Op, arg1: impl Into<String>, arg2: impl Into<String>, result: Target) -> Self {
    Self {
      op,
      arg1: arg1.into(),
      arg2: arg2.into(),
      result,
    }
  }

  /// Resolved jump destination, if this is a patched jump.
  pub fn jump_target(&self) -> Option<usize> {
    match (self.op.is_jump(), &self.result) {
      (true, Target::Jump(index)) => Some(*index),
      _ => None,
    }
  }
}

impl fmt::Display for Quadruple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "({}, {}, {}, {})",
      self.op, self.arg1, self.arg2, self.result
    )
  }
}

/// Render `quads` one per line as `<index>: (<op>, <arg1>, <arg2>, <result>)`.
pub fn listing(quads: &[Quadruple]) -> String {
  let mut out = String::new();
  for (index, quad) in quads.iter().enumerate() {
    out.push_str(&format!("{index}: {quad}\n"));
  }
  out
}
