//! Syntax-directed translation: type checking and quadruple emission in one
//! walk over the parse tree.
//!
//! Arithmetic synthesizes an [`Operand`] bottom-up while the left operand of
//! an `EXPR1`/`TERM1` chain is inherited top-down. Boolean expressions are
//! compiled to control flow: every `BOOL`, `JOIN`, `NOT` and `REL` instance
//! synthesizes a [`LabelPair`] whose backpatch lists are merged upward and
//! resolved once the destination index is known.

use std::fmt;

use tracing::{debug, warn};

use crate::backpatch::{LabelAllocator, LabelKind, LabelPair};
use crate::error::SemanticError;
use crate::parser::{
  ArithOp, BoolExpr, BoolOperand, Decl, Expr, ExprTail, Factor, Join, Leaf, Nega, Not, Program,
  Rel, Stmt, Term, TermTail,
};
use crate::quad::{Op, Quadruple, Target, UNUSED};
use crate::symbol::SymbolTable;
use crate::tokenizer::TokenClass;
use crate::ty::Type;

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Pseudo-location `read`/`write` transfer through.
const MEMORY: &str = "mem";

/// What an arithmetic node synthesizes: a named location or a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Addr(String),
  Value(String),
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Addr(name) => f.write_str(name),
      Self::Value(literal) => f.write_str(literal),
    }
  }
}

/// State of one analysis run: the symbol table it types, the quadruples it
/// emits, the live backpatch labels and the temporary counter.
pub struct AnalysisContext<'a> {
  symbols: &'a mut SymbolTable,
  quads: Vec<Quadruple>,
  labels: LabelAllocator,
  temps: usize,
}

impl<'a> AnalysisContext<'a> {
  pub fn new(symbols: &'a mut SymbolTable) -> Self {
    Self {
      symbols,
      quads: Vec::new(),
      labels: LabelAllocator::new(),
      temps: 0,
    }
  }

  /// Quadruples emitted so far. After a failure this is the partial output.
  pub fn quadruples(&self) -> &[Quadruple] {
    &self.quads
  }

  pub fn into_quadruples(self) -> Vec<Quadruple> {
    self.quads
  }

  /// Translate a whole program and terminate it with `quit`.
  pub fn analyze(&mut self, program: &Program<'_>) -> SemanticResult<()> {
    for decl in &program.decls {
      self.declare(decl)?;
    }
    for stmt in &program.stmts {
      self.statement(stmt)?;
    }
    self.emit(Op::Quit, UNUSED, UNUSED, Target::Unused);

    if let Some(index) = self.quads.iter().position(|quad| !quad.result.is_resolved()) {
      return Err(SemanticError::UnresolvedJump { index });
    }
    debug!(
      quads = self.quads.len(),
      temps = self.temps,
      "analysis finished"
    );
    Ok(())
  }

  fn declare(&mut self, decl: &Decl<'_>) -> SemanticResult<()> {
    for name in &decl.names {
      let (id, _) = self.symbols.intern(name.text(), TokenClass::Identifier);
      let symbol = self.symbols.get_mut(id);
      if symbol.ty.is_some() {
        return Err(SemanticError::DuplicateDeclaration {
          name: name.text().to_string(),
        });
      }
      symbol.ty = Some(decl.ty);
    }
    Ok(())
  }

  fn statement(&mut self, stmt: &Stmt<'_>) -> SemanticResult<()> {
    match stmt {
      Stmt::Assign { target, value } => {
        self.expect_type(target.text(), Type::Int)?;
        let source = self.expression(value)?;
        self.emit(Op::Assign, source.to_string(), UNUSED, name(target.text()));
        self.mark_valued(target.text());
      }
      Stmt::BoolAssign { target, value } => self.bool_assign(*target, value)?,
      Stmt::If {
        cond,
        then_branch,
        else_branch,
      } => {
        let fallthrough = self.guard(*cond)?;
        self.statement(then_branch)?;
        match else_branch {
          None => self.patch(fallthrough, self.next_index()),
          Some(else_branch) => {
            let skip = self.emit(Op::Jump, UNUSED, UNUSED, Target::Hole);
            self.patch(fallthrough, self.next_index());
            self.statement(else_branch)?;
            self.patch(skip, self.next_index());
          }
        }
      }
      Stmt::While { cond, body } => {
        let start = self.next_index();
        let fallthrough = self.guard(*cond)?;
        self.statement(body)?;
        self.emit(Op::Jump, UNUSED, UNUSED, Target::Jump(start));
        self.patch(fallthrough, self.next_index());
      }
      Stmt::Block(stmts) => {
        for stmt in stmts {
          self.statement(stmt)?;
        }
      }
      Stmt::Read(id) => {
        self.expect_declared(id.text())?;
        self.emit(Op::Read, id.text(), UNUSED, name(MEMORY));
        self.mark_valued(id.text());
      }
      Stmt::Write(id) => {
        self.expect_declared(id.text())?;
        self.note_use(id.text());
        self.emit(Op::Write, id.text(), UNUSED, name(MEMORY));
      }
    }
    Ok(())
  }

  /// Emit `(jnz, cond, _, start+2)` and an unpatched `(j, _, _, ?)`,
  /// returning the index of the latter.
  fn guard(&mut self, cond: Leaf<'_>) -> SemanticResult<usize> {
    self.expect_type(cond.text(), Type::Bool)?;
    let start = self.next_index();
    self.emit(Op::JumpNonZero, cond.text(), UNUSED, Target::Jump(start + 2));
    Ok(self.emit(Op::Jump, UNUSED, UNUSED, Target::Hole))
  }

  // id := BOOL ;
  fn bool_assign(&mut self, target: Leaf<'_>, value: &BoolExpr<'_>) -> SemanticResult<()> {
    self.expect_type(target.text(), Type::Bool)?;
    let outcome = self.bool_expr(value)?;

    let on_true = self.emit(Op::BoolAssign, "1", UNUSED, name(target.text()));
    self.labels.resolve(&mut self.quads, outcome.truthy, on_true);
    let after = self.next_index() + 2;
    self.emit(Op::Jump, UNUSED, UNUSED, Target::Jump(after));
    let on_false = self.emit(Op::BoolAssign, "0", UNUSED, name(target.text()));
    self.labels.resolve(&mut self.quads, outcome.falsy, on_false);
    self.mark_valued(target.text());

    for label in self.labels.open_labels() {
      if let Some(&index) = self.labels.backpatch_list(label).first() {
        return Err(SemanticError::UnresolvedJump { index });
      }
    }
    self.labels.release();
    Ok(())
  }

  /// Translate an arithmetic expression, returning where its value lives.
  pub fn expression(&mut self, expr: &Expr<'_>) -> SemanticResult<Operand> {
    let lhs = self.term(&expr.term)?;
    self.expr_tail(lhs, &expr.tail)
  }

  // EXPR1: `inherited` is everything to the left of this operator.
  fn expr_tail(&mut self, inherited: Operand, tail: &ExprTail<'_>) -> SemanticResult<Operand> {
    match tail {
      ExprTail::Empty => Ok(inherited),
      ExprTail::Op { op, term, rest } => {
        let rhs = self.term(term)?;
        let partial = self.binary(*op, inherited, rhs);
        self.expr_tail(partial, rest)
      }
    }
  }

  fn term(&mut self, term: &Term<'_>) -> SemanticResult<Operand> {
    let lhs = self.nega(&term.nega)?;
    self.term_tail(lhs, &term.tail)
  }

  fn term_tail(&mut self, inherited: Operand, tail: &TermTail<'_>) -> SemanticResult<Operand> {
    match tail {
      TermTail::Empty => Ok(inherited),
      TermTail::Op { op, nega, rest } => {
        let rhs = self.nega(nega)?;
        let partial = self.binary(*op, inherited, rhs);
        self.term_tail(partial, rest)
      }
    }
  }

  fn nega(&mut self, nega: &Nega<'_>) -> SemanticResult<Operand> {
    let operand = self.factor(&nega.factor)?;
    if !nega.negated {
      return Ok(operand);
    }
    match operand {
      Operand::Value(literal) => Ok(Operand::Value(negate_literal(&literal))),
      Operand::Addr(addr) => {
        let temp = self.new_temp();
        self.emit(Op::Arith(ArithOp::Mul), addr, "-1", name(&temp));
        Ok(Operand::Addr(temp))
      }
    }
  }

  fn factor(&mut self, factor: &Factor<'_>) -> SemanticResult<Operand> {
    match factor {
      Factor::Id(id) => {
        self.expect_type(id.text(), Type::Int)?;
        self.note_use(id.text());
        Ok(Operand::Addr(id.text().to_string()))
      }
      Factor::Number(number) => Ok(Operand::Value(number.text().to_string())),
      Factor::Paren(expr) => self.expression(expr),
    }
  }

  fn binary(&mut self, op: ArithOp, lhs: Operand, rhs: Operand) -> Operand {
    let temp = self.new_temp();
    self.emit(
      Op::Arith(op),
      lhs.to_string(),
      rhs.to_string(),
      name(&temp),
    );
    Operand::Addr(temp)
  }

  // BOOL := JOIN '||' BOOL | JOIN
  fn bool_expr(&mut self, node: &BoolExpr<'_>) -> SemanticResult<LabelPair> {
    let outcome = self.labels.pair(LabelKind::Bool);
    let join = self.join(&node.join)?;
    match &node.or_else {
      Some(rest) => {
        // Left side false: try the right side.
        let right_start = self.next_index();
        self.labels.resolve(&mut self.quads, join.falsy, right_start);
        self
          .labels
          .merge(&mut self.quads, join.truthy, outcome.truthy);
        let right = self.bool_expr(rest)?;
        self.merge_pair(right, outcome);
      }
      None => self.merge_pair(join, outcome),
    }
    Ok(outcome)
  }

  // JOIN := NOT '&&' JOIN | NOT
  fn join(&mut self, node: &Join<'_>) -> SemanticResult<LabelPair> {
    let outcome = self.labels.pair(LabelKind::Join);
    let not = self.not(&node.not)?;
    match &node.and_then {
      Some(rest) => {
        // Left side true: evaluate the right side.
        let right_start = self.next_index();
        self.labels.resolve(&mut self.quads, not.truthy, right_start);
        self.labels.merge(&mut self.quads, not.falsy, outcome.falsy);
        let right = self.join(rest)?;
        self.merge_pair(right, outcome);
      }
      None => self.merge_pair(not, outcome),
    }
    Ok(outcome)
  }

  // NOT := '!' REL | '!' ATOM | REL | ATOM
  fn not(&mut self, node: &Not<'_>) -> SemanticResult<LabelPair> {
    let outcome = self.labels.pair(LabelKind::Not);
    let operand = match &node.operand {
      BoolOperand::Rel(rel) => self.rel(rel)?,
      BoolOperand::Atom(leaf) => self.atom(*leaf)?,
    };
    let operand = if node.negated {
      operand.swapped()
    } else {
      operand
    };
    self.merge_pair(operand, outcome);
    Ok(outcome)
  }

  // REL := EXPR ROP EXPR
  fn rel(&mut self, rel: &Rel<'_>) -> SemanticResult<LabelPair> {
    let outcome = self.labels.pair(LabelKind::Rel);
    let lhs = self.expression(&rel.lhs)?;
    let rhs = self.expression(&rel.rhs)?;
    self.branch(Op::JumpIf(rel.op), lhs.to_string(), rhs.to_string(), outcome);
    Ok(outcome)
  }

  /// A bare identifier or literal tested for truth with `jnz`.
  fn atom(&mut self, leaf: Leaf<'_>) -> SemanticResult<LabelPair> {
    let operand = match leaf.class() {
      TokenClass::BoolConst if leaf.text().eq_ignore_ascii_case("true") => "1".to_string(),
      TokenClass::BoolConst => "0".to_string(),
      TokenClass::IntConst => {
        return Err(SemanticError::TypeMismatch {
          name: leaf.text().to_string(),
          expected: Type::Bool,
          found: Type::Int,
        });
      }
      _ => {
        self.expect_type(leaf.text(), Type::Bool)?;
        leaf.text().to_string()
      }
    };
    let outcome = self.labels.pair(LabelKind::Rel);
    self.branch(Op::JumpNonZero, operand, UNUSED.to_string(), outcome);
    Ok(outcome)
  }

  /// Emit the conditional jump to `outcome.truthy` and the unconditional
  /// jump to `outcome.falsy`, recording both for backpatching.
  fn branch(&mut self, op: Op, arg1: String, arg2: String, outcome: LabelPair) {
    let on_true = self.emit(op, arg1, arg2, Target::Pending(outcome.truthy));
    self.labels.record(outcome.truthy, on_true);
    let on_false = self.emit(Op::Jump, UNUSED, UNUSED, Target::Pending(outcome.falsy));
    self.labels.record(outcome.falsy, on_false);
  }

  fn merge_pair(&mut self, from: LabelPair, into: LabelPair) {
    self.labels.merge(&mut self.quads, from.truthy, into.truthy);
    self.labels.merge(&mut self.quads, from.falsy, into.falsy);
  }

  fn expect_declared(&self, name: &str) -> SemanticResult<Type> {
    self
      .symbols
      .type_of(name)
      .ok_or_else(|| SemanticError::UndeclaredIdentifier {
        name: name.to_string(),
      })
  }

  fn expect_type(&self, name: &str, expected: Type) -> SemanticResult<()> {
    let found = self.expect_declared(name)?;
    if found != expected {
      return Err(SemanticError::TypeMismatch {
        name: name.to_string(),
        expected,
        found,
      });
    }
    Ok(())
  }

  /// Warn about a use that no earlier quadruple gave a value to.
  fn note_use(&self, name: &str) {
    if self
      .symbols
      .lookup(name)
      .is_some_and(|symbol| !symbol.has_value)
    {
      warn!(name, "used before any assignment");
    }
  }

  fn mark_valued(&mut self, name: &str) {
    if let Some(symbol) = self.symbols.lookup_mut(name) {
      symbol.has_value = true;
    }
  }

  /// Allocate the next free `t<N>`, skipping names the program already uses.
  fn new_temp(&mut self) -> String {
    loop {
      self.temps += 1;
      let temp = format!("t{}", self.temps);
      if self.symbols.contains(&temp) {
        continue;
      }
      let (id, _) = self.symbols.intern(&temp, TokenClass::Identifier);
      let symbol = self.symbols.get_mut(id);
      symbol.ty = Some(Type::Int);
      symbol.has_value = true;
      return temp;
    }
  }

  fn next_index(&self) -> usize {
    self.quads.len()
  }

  fn emit(
    &mut self,
    op: Op,
    arg1: impl Into<String>,
    arg2: impl Into<String>,
    result: Target,
  ) -> usize {
    self.quads.push(Quadruple::new(op, arg1, arg2, result));
    self.quads.len() - 1
  }

  fn patch(&mut self, index: usize, target: usize) {
    debug_assert_eq!(self.quads[index].result, Target::Hole);
    self.quads[index].result = Target::Jump(target);
  }
}

fn name(text: &str) -> Target {
  Target::Name(text.to_string())
}

fn negate_literal(literal: &str) -> String {
  match literal.strip_prefix('-') {
    Some(positive) => positive.to_string(),
    None if literal == "0" => literal.to_string(),
    None => format!("-{literal}"),
  }
}
