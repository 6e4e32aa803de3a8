//! Recursive-descent parser producing a typed parse tree.
//!
//! Every production is one function and every function restores the cursor
//! when it fails, so callers can try the longer alternative first and fall
//! back to the shorter one without bookkeeping of their own. Leaves borrow
//! the tokens they were built from.
//!
//! ```text
//! EXPR  := TERM EXPR1           EXPR1 := ('+'|'-') TERM EXPR1 | ε
//! TERM  := NEGA TERM1           TERM1 := ('*'|'/') NEGA TERM1 | ε
//! NEGA  := '-' FACTOR | FACTOR  FACTOR := id | number | '(' EXPR ')'
//! BOOL  := JOIN '||' BOOL | JOIN
//! JOIN  := NOT '&&' JOIN | NOT
//! NOT   := '!' REL | '!' ATOM | REL | ATOM
//! ATOM  := id | boolconst | number
//! REL   := EXPR ROP EXPR
//! PROG  := '{' DECLS STMTS '}'
//! ```

use tracing::debug;

use crate::error::SyntaxError;
use crate::tokenizer::{Token, TokenClass, describe_token};
use crate::ty::Type;

pub type ParseResult<T> = Result<T, SyntaxError>;

/// A terminal of the tree: the token and its position in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf<'t> {
  pub token: &'t Token,
  pub index: usize,
}

impl<'t> Leaf<'t> {
  pub fn text(&self) -> &'t str {
    &self.token.value
  }

  pub fn class(&self) -> TokenClass {
    self.token.class
  }
}

/// Arithmetic operators of `EXPR1` and `TERM1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl ArithOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
    }
  }
}

/// Relational operators accepted by `ROP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
  Gt,
  Ge,
  Lt,
  Le,
  Eq,
  Ne,
}

impl RelOp {
  pub fn from_symbol(symbol: &str) -> Option<Self> {
    let op = match symbol {
      ">" => Self::Gt,
      ">=" => Self::Ge,
      "<" => Self::Lt,
      "<=" => Self::Le,
      "==" => Self::Eq,
      "!=" => Self::Ne,
      _ => return None,
    };
    Some(op)
  }

  /// Mnemonic of the conditional jump taken when the comparison holds.
  pub fn jump_mnemonic(&self) -> &'static str {
    match self {
      Self::Gt => "jgt",
      Self::Ge => "jge",
      Self::Lt => "jlt",
      Self::Le => "jle",
      Self::Eq => "jeq",
      Self::Ne => "jne",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program<'t> {
  pub decls: Vec<Decl<'t>>,
  pub stmts: Vec<Stmt<'t>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl<'t> {
  pub ty: Type,
  pub names: Vec<Leaf<'t>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'t> {
  Assign {
    target: Leaf<'t>,
    value: Expr<'t>,
  },
  BoolAssign {
    target: Leaf<'t>,
    value: BoolExpr<'t>,
  },
  If {
    cond: Leaf<'t>,
    then_branch: Box<Stmt<'t>>,
    else_branch: Option<Box<Stmt<'t>>>,
  },
  While {
    cond: Leaf<'t>,
    body: Box<Stmt<'t>>,
  },
  Block(Vec<Stmt<'t>>),
  Read(Leaf<'t>),
  Write(Leaf<'t>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr<'t> {
  pub term: Term<'t>,
  pub tail: ExprTail<'t>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprTail<'t> {
  Empty,
  Op {
    op: ArithOp,
    term: Term<'t>,
    rest: Box<ExprTail<'t>>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term<'t> {
  pub nega: Nega<'t>,
  pub tail: TermTail<'t>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermTail<'t> {
  Empty,
  Op {
    op: ArithOp,
    nega: Nega<'t>,
    rest: Box<TermTail<'t>>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nega<'t> {
  pub negated: bool,
  pub factor: Factor<'t>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Factor<'t> {
  Id(Leaf<'t>),
  Number(Leaf<'t>),
  Paren(Box<Expr<'t>>),
}

/// `BOOL`: an OR-chain of `JOIN`s.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolExpr<'t> {
  pub join: Join<'t>,
  pub or_else: Option<Box<BoolExpr<'t>>>,
}

/// `JOIN`: an AND-chain of `NOT`s.
#[derive(Debug, Clone, PartialEq)]
pub struct Join<'t> {
  pub not: Not<'t>,
  pub and_then: Option<Box<Join<'t>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Not<'t> {
  pub negated: bool,
  pub operand: BoolOperand<'t>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolOperand<'t> {
  Rel(Rel<'t>),
  /// A bare identifier or literal standing in for a comparison.
  Atom(Leaf<'t>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rel<'t> {
  pub lhs: Expr<'t>,
  pub op: RelOp,
  pub rhs: Expr<'t>,
}

/// Parse a whole program from the token stream.
///
/// On failure the error describes the furthest token any alternative
/// reached, which is where the input stopped making sense.
pub fn parse(tokens: &[Token]) -> ParseResult<Program<'_>> {
  let mut stream = TokenStream::new(tokens);

  let program = match parse_prog(&mut stream) {
    Ok(program) => program,
    Err(err) => return Err(stream.furthest_error(err)),
  };

  if let Some(token) = stream.peek() {
    return Err(SyntaxError::TrailingInput {
      index: stream.pos,
      found: describe_token(Some(token)),
    });
  }

  debug!(
    decls = program.decls.len(),
    stmts = program.stmts.len(),
    "parsed program"
  );
  Ok(program)
}

/// Parse a standalone arithmetic expression spanning all of `tokens`.
pub fn parse_expression(tokens: &[Token]) -> ParseResult<Expr<'_>> {
  parse_whole(tokens, parse_expr)
}

/// Parse a standalone boolean expression spanning all of `tokens`.
pub fn parse_bool_expression(tokens: &[Token]) -> ParseResult<BoolExpr<'_>> {
  parse_whole(tokens, parse_bool)
}

fn parse_whole<'t, T>(
  tokens: &'t [Token],
  production: fn(&mut TokenStream<'t>) -> ParseResult<T>,
) -> ParseResult<T> {
  let mut stream = TokenStream::new(tokens);
  let node = match production(&mut stream) {
    Ok(node) => node,
    Err(err) => return Err(stream.furthest_error(err)),
  };
  if let Some(token) = stream.peek() {
    return Err(stream.furthest_error(SyntaxError::TrailingInput {
      index: stream.pos,
      found: describe_token(Some(token)),
    }));
  }
  Ok(node)
}

// EXPR := TERM EXPR1
fn parse_expr<'t>(s: &mut TokenStream<'t>) -> ParseResult<Expr<'t>> {
  s.attempt(|s| {
    let term = parse_term(s)?;
    let tail = parse_expr_tail(s);
    Ok(Expr { term, tail })
  })
}

// EXPR1 := ('+'|'-') TERM EXPR1 | ε
fn parse_expr_tail<'t>(s: &mut TokenStream<'t>) -> ExprTail<'t> {
  s.optional(|s| {
    let Some(op) = s.operator(&[("+", ArithOp::Add), ("-", ArithOp::Sub)]) else {
      return Err(s.error("\"+\" or \"-\""));
    };
    let term = parse_term(s)?;
    let rest = parse_expr_tail(s);
    Ok(ExprTail::Op {
      op,
      term,
      rest: Box::new(rest),
    })
  })
  .unwrap_or(ExprTail::Empty)
}

// TERM := NEGA TERM1
fn parse_term<'t>(s: &mut TokenStream<'t>) -> ParseResult<Term<'t>> {
  s.attempt(|s| {
    let nega = parse_nega(s)?;
    let tail = parse_term_tail(s);
    Ok(Term { nega, tail })
  })
}

// TERM1 := ('*'|'/') NEGA TERM1 | ε
fn parse_term_tail<'t>(s: &mut TokenStream<'t>) -> TermTail<'t> {
  s.optional(|s| {
    let Some(op) = s.operator(&[("*", ArithOp::Mul), ("/", ArithOp::Div)]) else {
      return Err(s.error("\"*\" or \"/\""));
    };
    let nega = parse_nega(s)?;
    let rest = parse_term_tail(s);
    Ok(TermTail::Op {
      op,
      nega,
      rest: Box::new(rest),
    })
  })
  .unwrap_or(TermTail::Empty)
}

// NEGA := '-' FACTOR | FACTOR
fn parse_nega<'t>(s: &mut TokenStream<'t>) -> ParseResult<Nega<'t>> {
  let negated = s.optional(|s| {
    s.skip(TokenClass::Operator, "-")?;
    parse_factor(s)
  });
  if let Some(factor) = negated {
    return Ok(Nega {
      negated: true,
      factor,
    });
  }
  let factor = parse_factor(s)?;
  Ok(Nega {
    negated: false,
    factor,
  })
}

// FACTOR := id | number | '(' EXPR ')'
fn parse_factor<'t>(s: &mut TokenStream<'t>) -> ParseResult<Factor<'t>> {
  s.attempt(|s| {
    if let Some(leaf) = s.equal_class(TokenClass::Identifier) {
      return Ok(Factor::Id(leaf));
    }
    if let Some(leaf) = s.equal_class(TokenClass::IntConst) {
      return Ok(Factor::Number(leaf));
    }
    if s.equal(TokenClass::Separator, "(").is_some() {
      let expr = parse_expr(s)?;
      s.skip(TokenClass::Separator, ")")?;
      return Ok(Factor::Paren(Box::new(expr)));
    }
    Err(s.error("an identifier, a number or \"(\""))
  })
}

// BOOL := JOIN '||' BOOL | JOIN
fn parse_bool<'t>(s: &mut TokenStream<'t>) -> ParseResult<BoolExpr<'t>> {
  s.attempt(|s| {
    let join = parse_join(s)?;
    let or_else = s.optional(|s| {
      if s.equal(TokenClass::Operator, "||").is_none() {
        return Err(s.error("\"||\""));
      }
      parse_bool(s)
    });
    Ok(BoolExpr {
      join,
      or_else: or_else.map(Box::new),
    })
  })
}

// JOIN := NOT '&&' JOIN | NOT
fn parse_join<'t>(s: &mut TokenStream<'t>) -> ParseResult<Join<'t>> {
  s.attempt(|s| {
    let not = parse_not(s)?;
    let and_then = s.optional(|s| {
      if s.equal(TokenClass::Operator, "&&").is_none() {
        return Err(s.error("\"&&\""));
      }
      parse_join(s)
    });
    Ok(Join {
      not,
      and_then: and_then.map(Box::new),
    })
  })
}

// NOT := '!' REL | '!' ATOM | REL | ATOM
fn parse_not<'t>(s: &mut TokenStream<'t>) -> ParseResult<Not<'t>> {
  let negated = s.optional(|s| {
    if s.equal(TokenClass::Operator, "!").is_none() {
      return Err(s.error("\"!\""));
    }
    parse_bool_operand(s)
  });
  if let Some(operand) = negated {
    return Ok(Not {
      negated: true,
      operand,
    });
  }
  let operand = parse_bool_operand(s)?;
  Ok(Not {
    negated: false,
    operand,
  })
}

fn parse_bool_operand<'t>(s: &mut TokenStream<'t>) -> ParseResult<BoolOperand<'t>> {
  if let Some(rel) = s.optional(parse_rel) {
    return Ok(BoolOperand::Rel(rel));
  }
  parse_atom(s).map(BoolOperand::Atom)
}

// ATOM := id | boolconst | number
fn parse_atom<'t>(s: &mut TokenStream<'t>) -> ParseResult<Leaf<'t>> {
  s.attempt(|s| {
    for class in [
      TokenClass::Identifier,
      TokenClass::BoolConst,
      TokenClass::IntConst,
    ] {
      if let Some(leaf) = s.equal_class(class) {
        return Ok(leaf);
      }
    }
    Err(s.error("a comparison, an identifier or a literal"))
  })
}

// REL := EXPR ROP EXPR
fn parse_rel<'t>(s: &mut TokenStream<'t>) -> ParseResult<Rel<'t>> {
  s.attempt(|s| {
    let lhs = parse_expr(s)?;
    let op = parse_rop(s)?;
    let rhs = parse_expr(s)?;
    Ok(Rel { lhs, op, rhs })
  })
}

// ROP := '>' | '>=' | '<' | '<=' | '==' | '!='
fn parse_rop(s: &mut TokenStream<'_>) -> ParseResult<RelOp> {
  if let Some(token) = s.peek()
    && token.class == TokenClass::Operator
    && let Some(op) = RelOp::from_symbol(&token.value)
  {
    s.pos += 1;
    return Ok(op);
  }
  Err(s.error("a relational operator"))
}

// PROG := '{' DECLS STMTS '}'
fn parse_prog<'t>(s: &mut TokenStream<'t>) -> ParseResult<Program<'t>> {
  s.attempt(|s| {
    s.skip(TokenClass::Separator, "{")?;
    let decls = parse_decls(s);
    let stmts = parse_stmts(s);
    s.skip(TokenClass::Separator, "}")?;
    Ok(Program { decls, stmts })
  })
}

// DECLS := DECL DECLS | ε
fn parse_decls<'t>(s: &mut TokenStream<'t>) -> Vec<Decl<'t>> {
  let mut decls = Vec::new();
  while let Ok(decl) = parse_decl(s) {
    decls.push(decl);
  }
  decls
}

// DECL := ('int'|'bool') NAMES ';'
fn parse_decl<'t>(s: &mut TokenStream<'t>) -> ParseResult<Decl<'t>> {
  s.attempt(|s| {
    let ty = match s.peek() {
      Some(token) if token.class == TokenClass::Keyword => Type::from_keyword(&token.value),
      _ => None,
    };
    let Some(ty) = ty else {
      return Err(s.error("\"int\" or \"bool\""));
    };
    s.pos += 1;
    let names = parse_names(s)?;
    s.skip(TokenClass::Separator, ";")?;
    Ok(Decl { ty, names })
  })
}

// NAMES := NAME ',' NAMES | NAME
fn parse_names<'t>(s: &mut TokenStream<'t>) -> ParseResult<Vec<Leaf<'t>>> {
  s.attempt(|s| {
    let mut names = vec![parse_name(s)?];
    let rest = s.optional(|s| {
      if s.equal(TokenClass::Separator, ",").is_none() {
        return Err(s.error("\",\""));
      }
      parse_names(s)
    });
    if let Some(rest) = rest {
      names.extend(rest);
    }
    Ok(names)
  })
}

// NAME := id
fn parse_name<'t>(s: &mut TokenStream<'t>) -> ParseResult<Leaf<'t>> {
  s.expect_class(TokenClass::Identifier, "an identifier")
}

// STMTS := STMT STMTS | ε
fn parse_stmts<'t>(s: &mut TokenStream<'t>) -> Vec<Stmt<'t>> {
  let mut stmts = Vec::new();
  while let Ok(stmt) = parse_stmt(s) {
    stmts.push(stmt);
  }
  stmts
}

fn parse_stmt<'t>(s: &mut TokenStream<'t>) -> ParseResult<Stmt<'t>> {
  s.attempt(|s| {
    let Some(token) = s.peek() else {
      return Err(s.error("a statement"));
    };
    match token.class {
      TokenClass::Identifier => parse_assignment(s),
      TokenClass::Keyword if token.is(TokenClass::Keyword, "if") => parse_if(s),
      TokenClass::Keyword if token.is(TokenClass::Keyword, "while") => parse_while(s),
      TokenClass::Keyword if token.is(TokenClass::Keyword, "read") => {
        s.pos += 1;
        let id = s.expect_class(TokenClass::Identifier, "an identifier")?;
        s.skip(TokenClass::Separator, ";")?;
        Ok(Stmt::Read(id))
      }
      TokenClass::Keyword if token.is(TokenClass::Keyword, "write") => {
        s.pos += 1;
        let id = s.expect_class(TokenClass::Identifier, "an identifier")?;
        s.skip(TokenClass::Separator, ";")?;
        Ok(Stmt::Write(id))
      }
      TokenClass::Separator if token.is(TokenClass::Separator, "{") => {
        s.pos += 1;
        let stmts = parse_stmts(s);
        s.skip(TokenClass::Separator, "}")?;
        Ok(Stmt::Block(stmts))
      }
      _ => Err(s.error("a statement")),
    }
  })
}

// STMT := id '=' EXPR ';' | id ':=' BOOL ';'
fn parse_assignment<'t>(s: &mut TokenStream<'t>) -> ParseResult<Stmt<'t>> {
  let target = s.expect_class(TokenClass::Identifier, "an identifier")?;
  if s.equal(TokenClass::Operator, "=").is_some() {
    let value = parse_expr(s)?;
    s.skip(TokenClass::Separator, ";")?;
    return Ok(Stmt::Assign { target, value });
  }
  if s.equal(TokenClass::Operator, ":=").is_some() {
    let value = parse_bool(s)?;
    s.skip(TokenClass::Separator, ";")?;
    return Ok(Stmt::BoolAssign { target, value });
  }
  Err(s.error("\"=\" or \":=\""))
}

// STMT := 'if' id 'then' STMT ['else' STMT]
fn parse_if<'t>(s: &mut TokenStream<'t>) -> ParseResult<Stmt<'t>> {
  s.skip(TokenClass::Keyword, "if")?;
  let cond = s.expect_class(TokenClass::Identifier, "an identifier")?;
  s.skip(TokenClass::Keyword, "then")?;
  let then_branch = parse_stmt(s)?;
  let else_branch = s.optional(|s| {
    if s.equal(TokenClass::Keyword, "else").is_none() {
      return Err(s.error("\"else\""));
    }
    parse_stmt(s)
  });
  Ok(Stmt::If {
    cond,
    then_branch: Box::new(then_branch),
    else_branch: else_branch.map(Box::new),
  })
}

// STMT := 'while' id 'do' STMT
fn parse_while<'t>(s: &mut TokenStream<'t>) -> ParseResult<Stmt<'t>> {
  s.skip(TokenClass::Keyword, "while")?;
  let cond = s.expect_class(TokenClass::Identifier, "an identifier")?;
  s.skip(TokenClass::Keyword, "do")?;
  let body = parse_stmt(s)?;
  Ok(Stmt::While {
    cond,
    body: Box::new(body),
  })
}

/// Cursor over the token slice with explicit save/restore.
struct TokenStream<'t> {
  tokens: &'t [Token],
  pos: usize,
  furthest: Option<SyntaxError>,
}

impl<'t> TokenStream<'t> {
  fn new(tokens: &'t [Token]) -> Self {
    Self {
      tokens,
      pos: 0,
      furthest: None,
    }
  }

  fn peek(&self) -> Option<&'t Token> {
    self.tokens.get(self.pos)
  }

  /// Run `production`; if it fails, put the cursor back where it was.
  fn attempt<T>(&mut self, production: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
    let saved = self.pos;
    let result = production(self);
    if result.is_err() {
      self.pos = saved;
    }
    result
  }

  fn optional<T>(&mut self, production: impl FnOnce(&mut Self) -> ParseResult<T>) -> Option<T> {
    self.attempt(production).ok()
  }

  fn leaf(&mut self) -> Option<Leaf<'t>> {
    let token = self.peek()?;
    let leaf = Leaf {
      token,
      index: self.pos,
    };
    self.pos += 1;
    Some(leaf)
  }

  /// Consume the current token if it has the given class and value.
  fn equal(&mut self, class: TokenClass, value: &str) -> Option<Leaf<'t>> {
    match self.peek() {
      Some(token) if token.is(class, value) => self.leaf(),
      _ => None,
    }
  }

  fn equal_class(&mut self, class: TokenClass) -> Option<Leaf<'t>> {
    match self.peek() {
      Some(token) if token.class == class => self.leaf(),
      _ => None,
    }
  }

  /// Consume an operator token found in `table`, returning its mapping.
  fn operator<T: Copy>(&mut self, table: &[(&str, T)]) -> Option<T> {
    let token = self.peek().filter(|token| token.class == TokenClass::Operator)?;
    let (_, op) = table.iter().find(|(symbol, _)| *symbol == token.value)?;
    self.pos += 1;
    Some(*op)
  }

  fn skip(&mut self, class: TokenClass, value: &str) -> ParseResult<Leaf<'t>> {
    match self.equal(class, value) {
      Some(leaf) => Ok(leaf),
      None => Err(self.error(format!("\"{value}\""))),
    }
  }

  fn expect_class(&mut self, class: TokenClass, expected: &str) -> ParseResult<Leaf<'t>> {
    match self.equal_class(class) {
      Some(leaf) => Ok(leaf),
      None => Err(self.error(expected)),
    }
  }

  /// Build an error at the cursor and remember it if it is the furthest yet.
  fn error(&mut self, expected: impl Into<String>) -> SyntaxError {
    let expected = expected.into();
    let err = match self.peek() {
      Some(token) => SyntaxError::UnexpectedToken {
        index: self.pos,
        expected,
        found: describe_token(Some(token)),
      },
      None => SyntaxError::UnexpectedEnd {
        index: self.pos,
        expected,
      },
    };
    if self
      .furthest
      .as_ref()
      .is_none_or(|furthest| err.index() >= furthest.index())
    {
      self.furthest = Some(err.clone());
    }
    err
  }

  fn furthest_error(&mut self, fallback: SyntaxError) -> SyntaxError {
    match self.furthest.take() {
      Some(furthest) if furthest.index() >= fallback.index() => furthest,
      _ => fallback,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::SymbolTable;
  use crate::tokenizer::Tokenizer;
  use crate::vocab::Vocabulary;

  fn tokens(source: &str) -> Vec<Token> {
    let vocab = Vocabulary::default();
    let mut symbols = SymbolTable::new();
    let mut tokenizer = Tokenizer::new(&vocab, &mut symbols);
    tokenizer.tokenize(source.as_bytes()).expect("tokenize");
    tokenizer.into_tokens()
  }

  fn factor_text<'a>(nega: &'a Nega<'_>) -> &'a str {
    match &nega.factor {
      Factor::Id(leaf) | Factor::Number(leaf) => leaf.text(),
      Factor::Paren(_) => "(..)",
    }
  }

  #[test]
  fn expression_keeps_precedence_shape() {
    let toks = tokens("1+2*3");
    let expr = parse_expression(&toks).expect("parse");

    assert_eq!(factor_text(&expr.term.nega), "1");
    assert_eq!(expr.term.tail, TermTail::Empty);
    let ExprTail::Op { op, term, rest } = &expr.tail else {
      panic!("expected an addition tail");
    };
    assert_eq!(*op, ArithOp::Add);
    assert_eq!(**rest, ExprTail::Empty);
    assert_eq!(factor_text(&term.nega), "2");
    let TermTail::Op { op, nega, .. } = &term.tail else {
      panic!("expected a multiplication tail");
    };
    assert_eq!(*op, ArithOp::Mul);
    assert_eq!(factor_text(nega), "3");
  }

  #[test]
  fn unary_minus_binds_to_factor() {
    let toks = tokens("- a * ( b )");
    let expr = parse_expression(&toks).expect("parse");
    assert!(expr.term.nega.negated);
    let TermTail::Op { nega, .. } = &expr.term.tail else {
      panic!("expected a multiplication tail");
    };
    assert!(matches!(nega.factor, Factor::Paren(_)));
  }

  #[test]
  fn bool_chains_nest_to_the_right() {
    let toks = tokens("a < b && !c || d == 1");
    let expr = parse_bool_expression(&toks).expect("parse");

    assert!(matches!(expr.join.not.operand, BoolOperand::Rel(_)));
    let and_then = expr.join.and_then.as_ref().expect("and chain");
    assert!(and_then.not.negated);
    assert!(matches!(and_then.not.operand, BoolOperand::Atom(leaf) if leaf.text() == "c"));
    let or_else = expr.or_else.as_ref().expect("or chain");
    let BoolOperand::Rel(rel) = &or_else.join.not.operand else {
      panic!("expected a comparison");
    };
    assert_eq!(rel.op, RelOp::Eq);
  }

  #[test]
  fn negated_comparison_is_preferred_over_atom() {
    let toks = tokens("!a > 1");
    let expr = parse_bool_expression(&toks).expect("parse");
    assert!(expr.join.not.negated);
    assert!(matches!(expr.join.not.operand, BoolOperand::Rel(_)));
  }

  #[test]
  fn program_with_declarations_and_statements() {
    let toks = tokens("{ int a, b; bool c; a = 1; c := a < b; read a; write b; }");
    let program = parse(&toks).expect("parse");

    assert_eq!(program.decls.len(), 2);
    assert_eq!(program.decls[0].ty, Type::Int);
    let names: Vec<&str> = program.decls[0].names.iter().map(|n| n.text()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(program.decls[1].ty, Type::Bool);
    assert_eq!(program.stmts.len(), 4);
    assert!(matches!(program.stmts[1], Stmt::BoolAssign { .. }));
    assert!(matches!(program.stmts[3], Stmt::Write(leaf) if leaf.text() == "b"));
  }

  #[test]
  fn empty_program_is_valid() {
    let toks = tokens("{ }");
    let program = parse(&toks).expect("parse");
    assert!(program.decls.is_empty());
    assert!(program.stmts.is_empty());
  }

  #[test]
  fn if_without_else_leaves_next_statement_alone() {
    let toks = tokens("{ if b then write b; read b; }");
    let program = parse(&toks).expect("parse");
    assert_eq!(program.stmts.len(), 2);
    assert!(matches!(
      &program.stmts[0],
      Stmt::If {
        else_branch: None,
        ..
      }
    ));
    assert!(matches!(program.stmts[1], Stmt::Read(_)));
  }

  #[test]
  fn dangling_else_binds_to_innermost_if() {
    let toks = tokens("{ if a then if b then read x; else read y; }");
    let program = parse(&toks).expect("parse");
    assert_eq!(program.stmts.len(), 1);
    let Stmt::If {
      then_branch,
      else_branch,
      ..
    } = &program.stmts[0]
    else {
      panic!("expected if");
    };
    assert!(else_branch.is_none());
    assert!(matches!(
      **then_branch,
      Stmt::If {
        else_branch: Some(_),
        ..
      }
    ));
  }

  #[test]
  fn while_with_block_body() {
    let toks = tokens("{ while b do { read x; write x; } }");
    let program = parse(&toks).expect("parse");
    let Stmt::While { cond, body } = &program.stmts[0] else {
      panic!("expected while");
    };
    assert_eq!(cond.text(), "b");
    assert!(matches!(&**body, Stmt::Block(stmts) if stmts.len() == 2));
  }

  #[test]
  fn failed_production_restores_cursor() {
    let toks = tokens("a + ;");
    let mut stream = TokenStream::new(&toks);
    stream.pos = 0;
    assert!(parse_rel(&mut stream).is_err());
    assert_eq!(stream.pos, 0);
    assert!(parse_stmt(&mut stream).is_err());
    assert_eq!(stream.pos, 0);
  }

  #[test]
  fn missing_semicolon_reports_furthest_token() {
    let toks = tokens("{ int x; x = 1 }");
    let err = parse(&toks).expect_err("must fail");
    assert_eq!(
      err,
      SyntaxError::UnexpectedToken {
        index: 7,
        expected: "\";\"".to_string(),
        found: "}".to_string(),
      }
    );
  }

  #[test]
  fn premature_end_of_input() {
    let toks = tokens("{ int x; x = ");
    let err = parse(&toks).expect_err("must fail");
    assert!(matches!(err, SyntaxError::UnexpectedEnd { index: 6, .. }));
  }

  #[test]
  fn missed_lookahead_is_the_latest_error_at_its_index() {
    let toks = tokens("a b");
    let err = parse_bool_expression(&toks).expect_err("must fail");
    assert_eq!(
      err,
      SyntaxError::UnexpectedToken {
        index: 1,
        expected: "\"||\"".to_string(),
        found: "b".to_string(),
      }
    );
  }

  #[test]
  fn tokens_after_program_are_rejected() {
    let toks = tokens("{ } x");
    let err = parse(&toks).expect_err("must fail");
    assert_eq!(
      err,
      SyntaxError::TrailingInput {
        index: 2,
        found: "x".to_string(),
      }
    );
  }
}
