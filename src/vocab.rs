//! Lexical vocabulary supplied by the embedding application.
//!
//! The tokenizer never hard-codes which words are keywords or which bytes
//! start an operator; it asks a `Vocabulary`. `Vocabulary::default()` is the
//! standard language, and the `with_*` methods swap one set at a time.

const KEYWORDS: &[&str] = &[
  "int", "bool", "if", "then", "else", "while", "do", "read", "write",
];

const OPERATOR_CHARS: &[u8] = b"+-*/=<>!&|:";

const SEPARATOR_CHARS: &[u8] = b"{}();,";

const OPERATORS: &[&str] = &[
  "+", "-", "*", "/", "=", "<", ">", "!", "==", "!=", ">=", "<=", "&&", "||", ":=",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
  keywords: Vec<String>,
  operator_chars: Vec<u8>,
  separator_chars: Vec<u8>,
  operators: Vec<String>,
}

impl Default for Vocabulary {
  fn default() -> Self {
    Self {
      keywords: KEYWORDS.iter().map(|s| s.to_string()).collect(),
      operator_chars: OPERATOR_CHARS.to_vec(),
      separator_chars: SEPARATOR_CHARS.to_vec(),
      operators: OPERATORS.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl Vocabulary {
  pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.keywords = keywords.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_operator_chars(mut self, chars: impl AsRef<[u8]>) -> Self {
    self.operator_chars = chars.as_ref().to_vec();
    self
  }

  pub fn with_separator_chars(mut self, chars: impl AsRef<[u8]>) -> Self {
    self.separator_chars = chars.as_ref().to_vec();
    self
  }

  pub fn with_operators<I, S>(mut self, operators: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.operators = operators.into_iter().map(Into::into).collect();
    self
  }

  pub fn is_keyword(&self, word: &str) -> bool {
    self
      .keywords
      .iter()
      .any(|keyword| keyword.eq_ignore_ascii_case(word))
  }

  pub fn is_operator_char(&self, byte: u8) -> bool {
    self.operator_chars.contains(&byte)
  }

  pub fn is_separator_char(&self, byte: u8) -> bool {
    self.separator_chars.contains(&byte)
  }

  pub fn is_valid_operator(&self, lexeme: &str) -> bool {
    self
      .operators
      .iter()
      .any(|op| op.eq_ignore_ascii_case(lexeme))
  }
}

/// `true`/`false` in any letter case.
pub fn is_bool_literal(word: &str) -> bool {
  word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_vocabulary_knows_the_language() {
    let vocab = Vocabulary::default();
    assert!(vocab.is_keyword("WHILE"));
    assert!(!vocab.is_keyword("loop"));
    assert!(vocab.is_operator_char(b':'));
    assert!(vocab.is_separator_char(b';'));
    assert!(vocab.is_valid_operator(":="));
    assert!(!vocab.is_valid_operator("=!"));
  }

  #[test]
  fn builders_replace_one_set() {
    let vocab = Vocabulary::default().with_keywords(["loop"]);
    assert!(vocab.is_keyword("loop"));
    assert!(!vocab.is_keyword("while"));
    assert!(vocab.is_valid_operator("&&"));
  }

  #[test]
  fn operator_tables_are_configurable() {
    let vocab = Vocabulary::default()
      .with_operator_chars(b"+-^")
      .with_separator_chars(b"[];")
      .with_operators(["+", "-", "^", "+^"]);
    assert!(vocab.is_operator_char(b'^'));
    assert!(!vocab.is_operator_char(b'*'));
    assert!(vocab.is_separator_char(b'['));
    assert!(!vocab.is_separator_char(b'{'));
    assert!(vocab.is_valid_operator("+^"));
    assert!(!vocab.is_valid_operator(":="));
  }

  #[test]
  fn bool_literals_ignore_case() {
    assert!(is_bool_literal("TRUE"));
    assert!(is_bool_literal("False"));
    assert!(!is_bool_literal("truth"));
  }
}
