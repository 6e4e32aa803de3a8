//! Crate root: wires together the compilation pipeline.
//!
//! Source text flows through three stages, each of which stops the run on
//! its first error:
//! - `tokenizer` cleans the text and splits it into classified tokens,
//!   interning every lexeme in the shared symbol table.
//! - `parser` checks the token stream against the grammar by backtracking
//!   recursive descent and returns a typed parse tree.
//! - `semantic` type-checks the tree and emits quadruples, backpatching the
//!   jumps of short-circuit boolean expressions.
//!
//! `error` collects the per-stage error types and `quad` defines the output.

pub mod backpatch;
pub mod error;
pub mod parser;
pub mod quad;
pub mod semantic;
pub mod symbol;
pub mod tokenizer;
pub mod ty;
pub mod vocab;

use tracing::{debug, info};

pub use error::{CompileError, CompileResult};
pub use quad::{Quadruple, listing};
pub use symbol::SymbolTable;
pub use tokenizer::{Token, token_listing};
pub use vocab::Vocabulary;

use error::LexicalError;
use semantic::AnalysisContext;
use tokenizer::Tokenizer;

/// One compilation session: the vocabulary it lexes with and everything the
/// last run produced.
///
/// Each call to [`CompilationUnit::compile`] starts from empty state, so a
/// unit can be reused and compiling the same text twice yields the same
/// quadruples. After a failure the tokens and quadruples produced before the
/// error stay readable.
#[derive(Debug, Default)]
pub struct CompilationUnit {
  vocabulary: Vocabulary,
  symbols: SymbolTable,
  tokens: Vec<Token>,
  quads: Vec<Quadruple>,
}

impl CompilationUnit {
  pub fn new(vocabulary: Vocabulary) -> Self {
    Self {
      vocabulary,
      ..Self::default()
    }
  }

  /// Run only the lexical stage over `source`.
  ///
  /// On failure the tokens closed before the error stay in
  /// [`CompilationUnit::tokens`].
  pub fn tokenize(&mut self, source: &str) -> Result<&[Token], LexicalError> {
    self.symbols.clear();
    self.tokens.clear();
    self.quads.clear();

    let mut tokenizer = Tokenizer::new(&self.vocabulary, &mut self.symbols);
    let lexed = tokenizer.tokenize(source.as_bytes());
    self.tokens = tokenizer.into_tokens();
    lexed?;
    debug!(tokens = self.tokens.len(), "tokenized");
    Ok(&self.tokens)
  }

  /// Run every stage over `source`.
  pub fn compile(&mut self, source: &str) -> CompileResult<&[Quadruple]> {
    self.tokenize(source)?;

    let program = parser::parse(&self.tokens)?;

    let mut ctx = AnalysisContext::new(&mut self.symbols);
    let analyzed = ctx.analyze(&program);
    self.quads = ctx.into_quadruples();
    analyzed?;

    info!(
      quads = self.quads.len(),
      symbols = self.symbols.len(),
      "compiled"
    );
    Ok(&self.quads)
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  /// Quadruples of the last run; partial if that run failed.
  pub fn quadruples(&self) -> &[Quadruple] {
    &self.quads
  }
}

/// Compile a source string with the default vocabulary.
pub fn compile(source: &str) -> CompileResult<Vec<Quadruple>> {
  let mut unit = CompilationUnit::default();
  unit.compile(source)?;
  Ok(unit.quads)
}
