//! Backpatch lists for short-circuit boolean translation.
//!
//! Each `BOOL`, `JOIN`, `NOT` and `REL` instance receives a true label and a
//! false label. A label collects the indices of jumps that must eventually
//! land wherever its outcome leads; those jumps carry the label handle in
//! their result slot until the label is merged into a parent or resolved to
//! a concrete index.

use std::fmt;

use tracing::trace;

use crate::quad::{Quadruple, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
  Bool,
  Join,
  Not,
  Rel,
}

impl LabelKind {
  fn slot(self) -> usize {
    match self {
      Self::Bool => 0,
      Self::Join => 1,
      Self::Not => 2,
      Self::Rel => 3,
    }
  }

  fn name(self) -> &'static str {
    match self {
      Self::Bool => "BOOL",
      Self::Join => "JOIN",
      Self::Not => "NOT",
      Self::Rel => "REL",
    }
  }
}

/// Opaque handle to one label. Renders as e.g. `REL-3-true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId {
  slot: usize,
  kind: LabelKind,
  instance: usize,
  polarity: bool,
}

impl fmt::Display for LabelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}-{}-{}",
      self.kind.name(),
      self.instance,
      self.polarity
    )
  }
}

/// The true and false labels of one nonterminal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPair {
  pub truthy: LabelId,
  pub falsy: LabelId,
}

impl LabelPair {
  /// The same lists with outcomes exchanged, as `!` needs.
  pub fn swapped(self) -> Self {
    Self {
      truthy: self.falsy,
      falsy: self.truthy,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelState {
  Open,
  Merged,
  Resolved(usize),
}

#[derive(Debug, Clone)]
struct Label {
  id: LabelId,
  backpatch: Vec<usize>,
  state: LabelState,
}

/// Hands out labels and moves backpatch entries between them.
///
/// Instance counters only ever grow within one analysis run, so label names
/// stay unique even after `release` drops settled labels.
#[derive(Debug, Default)]
pub struct LabelAllocator {
  labels: Vec<Label>,
  counters: [usize; 4],
}

impl LabelAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pair(&mut self, kind: LabelKind) -> LabelPair {
    self.counters[kind.slot()] += 1;
    let instance = self.counters[kind.slot()];
    LabelPair {
      truthy: self.push(kind, instance, true),
      falsy: self.push(kind, instance, false),
    }
  }

  fn push(&mut self, kind: LabelKind, instance: usize, polarity: bool) -> LabelId {
    let id = LabelId {
      slot: self.labels.len(),
      kind,
      instance,
      polarity,
    };
    self.labels.push(Label {
      id,
      backpatch: Vec::new(),
      state: LabelState::Open,
    });
    id
  }

  /// Note that quadruple `index` jumps wherever `label` eventually leads.
  pub fn record(&mut self, label: LabelId, index: usize) {
    self.labels[label.slot].backpatch.push(index);
  }

  pub fn backpatch_list(&self, label: LabelId) -> &[usize] {
    &self.labels[label.slot].backpatch
  }

  /// Move every entry of `from` onto `into`, rewriting the pending handle
  /// stored in those quadruples.
  pub fn merge(&mut self, code: &mut [Quadruple], from: LabelId, into: LabelId) {
    let entries = self.take(from, LabelState::Merged);
    trace!(%from, %into, entries = entries.len(), "merge label");
    for &index in &entries {
      code[index].result = Target::Pending(into);
    }
    self.labels[into.slot].backpatch.extend(entries);
  }

  /// Point every jump waiting on `label` at quadruple `target`.
  pub fn resolve(&mut self, code: &mut [Quadruple], label: LabelId, target: usize) {
    let entries = self.take(label, LabelState::Resolved(target));
    trace!(%label, target, entries = entries.len(), "resolve label");
    for &index in &entries {
      code[index].result = Target::Jump(target);
    }
  }

  fn take(&mut self, label: LabelId, state: LabelState) -> Vec<usize> {
    let slot = &mut self.labels[label.slot];
    debug_assert_eq!(slot.state, LabelState::Open, "label {label} settled twice");
    slot.state = state;
    std::mem::take(&mut slot.backpatch)
  }

  /// Labels that were neither merged nor resolved.
  pub fn open_labels(&self) -> impl Iterator<Item = LabelId> + '_ {
    self
      .labels
      .iter()
      .filter(|label| label.state == LabelState::Open)
      .map(|label| label.id)
  }

  /// Forget every label. Counters keep running.
  pub fn release(&mut self) {
    self.labels.clear();
  }
}
