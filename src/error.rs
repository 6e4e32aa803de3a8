//! Error types shared across the compilation pipeline.
//!
//! Each stage owns one error enum and fails fast with the first problem it
//! finds. `CompileError` wraps them so callers can tell which stage gave up
//! while `?` keeps working across stage boundaries.

use snafu::Snafu;

use crate::ty::Type;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(context(false), display("lexical error: {source}"))]
  Lexical { source: LexicalError },

  #[snafu(context(false), display("syntax error: {source}"))]
  Syntax { source: SyntaxError },

  #[snafu(context(false), display("semantic error: {source}"))]
  Semantic { source: SemanticError },
}

impl CompileError {
  /// Short name of the stage that produced this error.
  pub fn stage(&self) -> &'static str {
    match self {
      Self::Lexical { .. } => "lexical",
      Self::Syntax { .. } => "syntax",
      Self::Semantic { .. } => "semantic",
    }
  }
}

/// Failures raised while cleaning or classifying source bytes.
///
/// Cleaning errors carry an offset into the raw source; classification
/// errors carry the offset of the offending lexeme in the cleaned buffer.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum LexicalError {
  #[snafu(display("identifier's length greater than 8: {lexeme} at byte {offset}"))]
  IdentifierTooLong { lexeme: String, offset: usize },

  #[snafu(display("number's length greater than 8: {lexeme} at byte {offset}"))]
  NumberTooLong { lexeme: String, offset: usize },

  #[snafu(display("number starts with zero: {lexeme} at byte {offset}"))]
  NumberStartsWithZero { lexeme: String, offset: usize },

  #[snafu(display("invalid operator: {lexeme} at byte {offset}"))]
  InvalidOperator { lexeme: String, offset: usize },

  #[snafu(display("invalid character: {} at byte {offset}", describe_byte(*byte)))]
  InvalidCharacter { byte: u8, offset: usize },

  #[snafu(display("carriage return not followed by a newline at byte {offset}"))]
  StrayCarriageReturn { offset: usize },

  #[snafu(display("block comment opened at byte {offset} is never closed"))]
  UnterminatedComment { offset: usize },
}

/// Grammar violations. `index` is the position in the token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SyntaxError {
  #[snafu(display("expected {expected}, but got \"{found}\" at token {index}"))]
  UnexpectedToken {
    index: usize,
    expected: String,
    found: String,
  },

  #[snafu(display("expected {expected}, but reached end of input at token {index}"))]
  UnexpectedEnd { index: usize, expected: String },

  #[snafu(display("unexpected token \"{found}\" after end of program at token {index}"))]
  TrailingInput { index: usize, found: String },
}

impl SyntaxError {
  /// Token index the parser had reached when it failed.
  pub fn index(&self) -> usize {
    match self {
      Self::UnexpectedToken { index, .. }
      | Self::UnexpectedEnd { index, .. }
      | Self::TrailingInput { index, .. } => *index,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SemanticError {
  #[snafu(display("{name} has been declared"))]
  DuplicateDeclaration { name: String },

  #[snafu(display("{name} is not declared"))]
  UndeclaredIdentifier { name: String },

  #[snafu(display("{name} has type {found}, expected {expected}"))]
  TypeMismatch {
    name: String,
    expected: Type,
    found: Type,
  },

  #[snafu(display("jump at quadruple {index} was never backpatched"))]
  UnresolvedJump { index: usize },
}

fn describe_byte(byte: u8) -> String {
  if byte.is_ascii_graphic() {
    format!("'{}'", byte as char)
  } else {
    format!("0x{byte:02x}")
  }
}
