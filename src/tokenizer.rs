//! Lexical analysis: turns raw source bytes into a vector of tokens.
//!
//! Two passes run back to back. [`clean`] strips comments and squeezes
//! whitespace, then a small DFA walks the cleaned buffer and closes one
//! token at a time. Every closed lexeme is interned in the symbol table, so
//! two sightings of the same text always share one entry and one class.

use std::fmt;

use tracing::{debug, trace};

use crate::error::LexicalError;
use crate::symbol::{SymbolId, SymbolTable};
use crate::vocab::{Vocabulary, is_bool_literal};

/// Longest identifier or number the language accepts.
pub const MAX_LEXEME_LEN: usize = 8;

/// Classes of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
  Identifier,
  IntConst,
  BoolConst,
  Keyword,
  Operator,
  Separator,
}

impl fmt::Display for TokenClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Identifier => "Identifier",
      Self::IntConst => "IntConst",
      Self::BoolConst => "BoolConst",
      Self::Keyword => "Keyword",
      Self::Operator => "Operator",
      Self::Separator => "Separator",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub class: TokenClass,
  pub value: String,
  pub symbol: SymbolId,
}

impl Token {
  pub fn is(&self, class: TokenClass, value: &str) -> bool {
    self.class == class && self.value.eq_ignore_ascii_case(value)
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({},'{}')", self.class, self.value)
  }
}

/// Tokens rendered five per line as `(Class,'value')`, comma separated. When
/// `error` is given it follows on its own line as `error: <message>`, so a
/// failed run still shows how far the scan got.
pub fn token_listing(tokens: &[Token], error: Option<&LexicalError>) -> String {
  let mut out = String::new();
  for (i, token) in tokens.iter().enumerate() {
    if i != 0 {
      out.push(',');
      if i % 5 == 0 {
        out.push('\n');
      }
    }
    out.push_str(&token.to_string());
  }
  if !tokens.is_empty() {
    out.push('\n');
  }
  if let Some(err) = error {
    out.push_str(&format!("error: {err}\n"));
  }
  out
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(token) => token.value.clone(),
    None => "EOF".to_string(),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Init,
  InIdentifier,
  InNumber,
  InSeparator,
  InOperator,
}

/// Classifies a cleaned buffer, interning every lexeme it closes.
///
/// Tokens closed before a failure stay available through
/// [`Tokenizer::into_tokens`].
pub struct Tokenizer<'a> {
  vocab: &'a Vocabulary,
  symbols: &'a mut SymbolTable,
  tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
  pub fn new(vocab: &'a Vocabulary, symbols: &'a mut SymbolTable) -> Self {
    Self {
      vocab,
      symbols,
      tokens: Vec::new(),
    }
  }

  pub fn into_tokens(self) -> Vec<Token> {
    self.tokens
  }

  /// Clean `source` and classify it. Stops at the first lexical error.
  pub fn tokenize(&mut self, source: &[u8]) -> Result<(), LexicalError> {
    let cleaned = clean(source)?;
    trace!(bytes = cleaned.len(), "cleaned source");
    let result = self.scan(&cleaned);
    debug!(
      tokens = self.tokens.len(),
      symbols = self.symbols.len(),
      ok = result.is_ok(),
      "tokenized"
    );
    result
  }

  fn scan(&mut self, bytes: &[u8]) -> Result<(), LexicalError> {
    let mut state = State::Init;
    let mut lexeme = String::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() || state != State::Init {
      // A virtual trailing space closes whatever token is still open.
      let b = bytes.get(i).copied().unwrap_or(b' ');
      match state {
        State::Init => {
          if b.is_ascii_alphabetic() {
            state = State::InIdentifier;
          } else if b.is_ascii_digit() {
            state = State::InNumber;
          } else if self.vocab.is_separator_char(b) {
            state = State::InSeparator;
          } else if self.vocab.is_operator_char(b) {
            state = State::InOperator;
          } else if b == b' ' || b == b'\n' {
            i += 1;
            continue;
          } else {
            return Err(LexicalError::InvalidCharacter { byte: b, offset: i });
          }
          start = i;
          lexeme.push(b as char);
          i += 1;
        }
        State::InIdentifier => {
          if b.is_ascii_alphanumeric() || b == b'_' {
            lexeme.push(b as char);
            i += 1;
          } else {
            self.close_identifier(&lexeme, start)?;
            lexeme.clear();
            state = State::Init;
          }
        }
        State::InNumber => {
          if b.is_ascii_digit() {
            lexeme.push(b as char);
            i += 1;
          } else {
            self.close_number(&lexeme, start)?;
            lexeme.clear();
            state = State::Init;
          }
        }
        State::InSeparator => {
          self.emit(&lexeme, TokenClass::Separator);
          lexeme.clear();
          state = State::Init;
        }
        State::InOperator => {
          if self.vocab.is_operator_char(b) {
            lexeme.push(b as char);
            i += 1;
          } else {
            if !self.vocab.is_valid_operator(&lexeme) {
              return Err(LexicalError::InvalidOperator {
                lexeme,
                offset: start,
              });
            }
            self.emit(&lexeme, TokenClass::Operator);
            lexeme.clear();
            state = State::Init;
          }
        }
      }
    }

    Ok(())
  }

  fn close_identifier(&mut self, lexeme: &str, offset: usize) -> Result<(), LexicalError> {
    if lexeme.len() > MAX_LEXEME_LEN {
      return Err(LexicalError::IdentifierTooLong {
        lexeme: lexeme.to_string(),
        offset,
      });
    }
    let class = if self.vocab.is_keyword(lexeme) {
      TokenClass::Keyword
    } else if is_bool_literal(lexeme) {
      TokenClass::BoolConst
    } else {
      TokenClass::Identifier
    };
    self.emit(lexeme, class);
    Ok(())
  }

  fn close_number(&mut self, lexeme: &str, offset: usize) -> Result<(), LexicalError> {
    if lexeme.len() > 1 && lexeme.starts_with('0') {
      return Err(LexicalError::NumberStartsWithZero {
        lexeme: lexeme.to_string(),
        offset,
      });
    }
    if lexeme.len() > MAX_LEXEME_LEN {
      return Err(LexicalError::NumberTooLong {
        lexeme: lexeme.to_string(),
        offset,
      });
    }
    self.emit(lexeme, TokenClass::IntConst);
    Ok(())
  }

  fn emit(&mut self, lexeme: &str, class: TokenClass) {
    let (symbol, class) = self.symbols.intern(lexeme, class);
    trace!(%class, lexeme, "token");
    self.tokens.push(Token {
      class,
      value: lexeme.to_string(),
      symbol,
    });
  }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
  Code,
  LineComment,
  BlockComment { start: usize },
}

/// Strip comments, normalise line endings and squeeze whitespace.
///
/// Lines keep their order but blank lines disappear, and runs of spaces
/// (tabs included) shrink to one space that never starts or ends a line.
pub fn clean(source: &[u8]) -> Result<Vec<u8>, LexicalError> {
  let mut out = Vec::with_capacity(source.len());
  let mut mode = Mode::Code;
  let mut i = 0;

  while i < source.len() {
    let b = source[i];
    if b == b'\r' {
      if source.get(i + 1) != Some(&b'\n') {
        return Err(LexicalError::StrayCarriageReturn { offset: i });
      }
      i += 1;
      continue;
    }

    match mode {
      Mode::Code => match b {
        b'\n' => end_line(&mut out),
        b' ' | b'\t' => push_space(&mut out),
        b'/' if source.get(i + 1) == Some(&b'/') => {
          mode = Mode::LineComment;
          i += 1;
        }
        b'/' if source.get(i + 1) == Some(&b'*') => {
          mode = Mode::BlockComment { start: i };
          i += 1;
        }
        _ => out.push(b),
      },
      Mode::LineComment => {
        if b == b'\n' {
          mode = Mode::Code;
          end_line(&mut out);
        }
      }
      Mode::BlockComment { .. } => {
        if b == b'*' && source.get(i + 1) == Some(&b'/') {
          mode = Mode::Code;
          push_space(&mut out);
          i += 1;
        }
      }
    }
    i += 1;
  }

  if let Mode::BlockComment { start } = mode {
    return Err(LexicalError::UnterminatedComment { offset: start });
  }
  while matches!(out.last(), Some(b' ' | b'\n')) {
    out.pop();
  }
  Ok(out)
}

fn push_space(out: &mut Vec<u8>) {
  if matches!(out.last(), Some(&b) if b != b' ' && b != b'\n') {
    out.push(b' ');
  }
}

fn end_line(out: &mut Vec<u8>) {
  while out.last() == Some(&b' ') {
    out.pop();
  }
  if matches!(out.last(), Some(&b) if b != b'\n') {
    out.push(b'\n');
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lex(source: &str) -> (Vec<Token>, Result<(), LexicalError>, SymbolTable) {
    let vocab = Vocabulary::default();
    let mut symbols = SymbolTable::new();
    let mut tokenizer = Tokenizer::new(&vocab, &mut symbols);
    let result = tokenizer.tokenize(source.as_bytes());
    let tokens = tokenizer.into_tokens();
    (tokens, result, symbols)
  }

  fn classes(tokens: &[Token]) -> Vec<TokenClass> {
    tokens.iter().map(|token| token.class).collect()
  }

  #[test]
  fn clean_strips_comments_and_blank_lines() {
    let source = b"{  int   a; // note\n\n   \n /* block\n comment */ a = 1 ;\n}\n";
    let cleaned = clean(source).expect("clean");
    assert_eq!(cleaned, b"{ int a;\na = 1 ;\n}".to_vec());
  }

  #[test]
  fn clean_keeps_division() {
    assert_eq!(clean(b"a / b").expect("clean"), b"a / b".to_vec());
  }

  #[test]
  fn clean_normalises_crlf() {
    assert_eq!(clean(b"a\r\n\r\nb").expect("clean"), b"a\nb".to_vec());
  }

  #[test]
  fn clean_rejects_stray_carriage_return() {
    assert_eq!(
      clean(b"a\rb"),
      Err(LexicalError::StrayCarriageReturn { offset: 1 })
    );
  }

  #[test]
  fn clean_rejects_unterminated_block_comment() {
    assert_eq!(
      clean(b"a /* never closed"),
      Err(LexicalError::UnterminatedComment { offset: 2 })
    );
  }

  #[test]
  fn classifies_each_token_class() {
    let (tokens, result, _) = lex("{ int x; x = 10; b := TRUE; }");
    result.expect("tokenize");
    assert_eq!(
      classes(&tokens),
      vec![
        TokenClass::Separator,
        TokenClass::Keyword,
        TokenClass::Identifier,
        TokenClass::Separator,
        TokenClass::Identifier,
        TokenClass::Operator,
        TokenClass::IntConst,
        TokenClass::Separator,
        TokenClass::Identifier,
        TokenClass::Operator,
        TokenClass::BoolConst,
        TokenClass::Separator,
        TokenClass::Separator,
      ]
    );
  }

  #[test]
  fn identifiers_up_to_eight_chars_stay_identifiers() {
    for word in ["a", "x_1", "abcdefgh", "While_", "t0_"] {
      let (tokens, result, _) = lex(word);
      result.expect("tokenize");
      assert_eq!(classes(&tokens), vec![TokenClass::Identifier], "{word}");
    }
    for word in ["WHILE", "Int", "tRuE"] {
      let (tokens, _, _) = lex(word);
      assert_ne!(tokens[0].class, TokenClass::Identifier, "{word}");
    }
  }

  #[test]
  fn identifier_longer_than_eight_fails() {
    let (tokens, result, _) = lex("ok abcdefghi");
    assert_eq!(tokens.len(), 1);
    assert_eq!(
      result,
      Err(LexicalError::IdentifierTooLong {
        lexeme: "abcdefghi".to_string(),
        offset: 3,
      })
    );
  }

  #[test]
  fn repeated_lexemes_share_one_symbol() {
    let (tokens, result, symbols) = lex("a a a b");
    result.expect("tokenize");
    assert_eq!(tokens[0].symbol, tokens[1].symbol);
    assert_eq!(tokens[1].symbol, tokens[2].symbol);
    assert_ne!(tokens[0].symbol, tokens[3].symbol);
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols.get(tokens[3].symbol).name, "b");
  }

  #[test]
  fn zero_is_a_number_but_double_zero_is_not() {
    let (tokens, result, _) = lex("0");
    result.expect("tokenize");
    assert_eq!(classes(&tokens), vec![TokenClass::IntConst]);

    let (_, result, _) = lex("00");
    assert_eq!(
      result,
      Err(LexicalError::NumberStartsWithZero {
        lexeme: "00".to_string(),
        offset: 0,
      })
    );
  }

  #[test]
  fn numbers_longer_than_eight_digits_fail() {
    let (_, result, _) = lex("123456789");
    assert_eq!(
      result,
      Err(LexicalError::NumberTooLong {
        lexeme: "123456789".to_string(),
        offset: 0,
      })
    );
  }

  #[test]
  fn multi_char_operators_are_single_tokens() {
    let (tokens, result, _) = lex("a>=b&&c!=d||e:=f");
    result.expect("tokenize");
    let ops: Vec<&str> = tokens
      .iter()
      .filter(|token| token.class == TokenClass::Operator)
      .map(|token| token.value.as_str())
      .collect();
    assert_eq!(ops, vec![">=", "&&", "!=", "||", ":="]);
  }

  #[test]
  fn unknown_operator_sequence_fails() {
    let (tokens, result, _) = lex("a <> b");
    assert_eq!(tokens.len(), 1);
    assert_eq!(
      result,
      Err(LexicalError::InvalidOperator {
        lexeme: "<>".to_string(),
        offset: 2,
      })
    );
  }

  #[test]
  fn invalid_character_is_named() {
    let (tokens, result, _) = lex("a # b");
    assert_eq!(tokens.len(), 1);
    assert_eq!(
      result,
      Err(LexicalError::InvalidCharacter {
        byte: b'#',
        offset: 2
      })
    );
  }

  #[test]
  fn error_offset_points_into_cleaned_source() {
    let (tokens, result, _) = lex("x = 1; // first\n\ny  =  #;");
    assert_eq!(tokens.len(), 6);
    let err = result.expect_err("must fail");
    assert_eq!(
      err,
      LexicalError::InvalidCharacter {
        byte: b'#',
        offset: 11
      }
    );
    assert_eq!(err.to_string(), "invalid character: '#' at byte 11");
  }

  #[test]
  fn token_listing_wraps_every_five_tokens() {
    let (tokens, result, _) = lex("{ int a, b; }");
    result.expect("tokenize");
    assert_eq!(
      token_listing(&tokens, None),
      "(Separator,'{'),(Keyword,'int'),(Identifier,'a'),(Separator,','),(Identifier,'b'),\n\
       (Separator,';'),(Separator,'}')\n"
    );
  }

  #[test]
  fn token_listing_appends_the_error() {
    let (tokens, result, _) = lex("a <> b");
    let err = result.expect_err("must fail");
    assert_eq!(
      token_listing(&tokens, Some(&err)),
      "(Identifier,'a')\nerror: invalid operator: <> at byte 2\n"
    );
    assert_eq!(
      token_listing(&[], Some(&err)),
      "error: invalid operator: <> at byte 2\n"
    );
  }

  #[test]
  fn custom_vocabulary_changes_classification() {
    let vocab = Vocabulary::default().with_keywords(["loop"]);
    let mut symbols = SymbolTable::new();
    let mut tokenizer = Tokenizer::new(&vocab, &mut symbols);
    tokenizer.tokenize(b"loop while").expect("tokenize");
    assert_eq!(
      classes(&tokenizer.into_tokens()),
      vec![TokenClass::Keyword, TokenClass::Identifier]
    );
  }
}
