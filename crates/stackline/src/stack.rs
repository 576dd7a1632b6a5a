//! Per-anchor value stacks.
//!
//! [`StackManager`] owns the committed stacks, keyed by anchor coordinate.
//! During a tick every mutation goes through [`StagedStacks`], which clones a
//! stack the first time it is written and leaves the committed state
//! untouched until [`StackManager::commit`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StackError};
use crate::grid::{Coordinate, Grid, Value};

/// A LIFO stack of values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Removes the top value.
    ///
    /// # Errors
    ///
    /// [`StackError::Underflow`] on an empty stack.
    pub fn pop(&mut self) -> Result<Value, StackError> {
        self.values.pop().ok_or(StackError::Underflow {
            needed: 1,
            available: 0,
        })
    }

    /// Top value, if any.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Removes the top `n` values, returned deepest first.
    ///
    /// # Errors
    ///
    /// [`StackError::Underflow`] if fewer than `n` values are present; the
    /// stack is left unchanged.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, StackError> {
        let available = self.values.len();
        if available < n {
            return Err(StackError::Underflow {
                needed: n,
                available,
            });
        }
        Ok(self.values.split_off(available - n))
    }

    /// Like [`Stack::pop_n`], but missing values are replaced by `fill`.
    /// The fill takes the place of the deepest operands. Returns the values
    /// and the number substituted.
    pub fn pop_n_padded(&mut self, n: usize, fill: Value) -> (Vec<Value>, usize) {
        let taken = n.min(self.values.len());
        let missing = n - taken;
        let mut out = vec![fill; missing];
        out.extend(self.values.drain(self.values.len() - taken..));
        (out, missing)
    }

    /// Duplicates the top value.
    ///
    /// # Errors
    ///
    /// [`StackError::Underflow`] on an empty stack.
    pub fn dup(&mut self) -> Result<(), StackError> {
        let top = *self.peek().ok_or(StackError::Underflow {
            needed: 1,
            available: 0,
        })?;
        self.values.push(top);
        Ok(())
    }

    /// Exchanges the two top values.
    ///
    /// # Errors
    ///
    /// [`StackError::Underflow`] with fewer than two values.
    pub fn swap(&mut self) -> Result<(), StackError> {
        let len = self.values.len();
        if len < 2 {
            return Err(StackError::Underflow {
                needed: 2,
                available: len,
            });
        }
        self.values.swap(len - 1, len - 2);
        Ok(())
    }

    /// Values from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        self.values.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl FromIterator<Value> for Stack {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Committed stacks, one per stack anchor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StackEntry>", into = "Vec<StackEntry>")]
pub struct StackManager {
    stacks: BTreeMap<Coordinate, Stack>,
}

/// Serialized form of one stack; JSON object keys cannot be coordinates.
#[derive(Clone, Serialize, Deserialize)]
struct StackEntry {
    anchor: Coordinate,
    values: Stack,
}

impl From<Vec<StackEntry>> for StackManager {
    fn from(entries: Vec<StackEntry>) -> Self {
        Self {
            stacks: entries.into_iter().map(|e| (e.anchor, e.values)).collect(),
        }
    }
}

impl From<StackManager> for Vec<StackEntry> {
    fn from(manager: StackManager) -> Self {
        manager
            .stacks
            .into_iter()
            .map(|(anchor, values)| StackEntry { anchor, values })
            .collect()
    }
}

impl StackManager {
    /// One empty stack per anchor on `grid`.
    #[must_use]
    pub fn for_grid(grid: &Grid) -> Self {
        Self {
            stacks: grid.anchors().map(|(at, _)| (at, Stack::new())).collect(),
        }
    }

    /// Stack owned by the anchor at `anchor`.
    #[inline]
    #[must_use]
    pub fn get(&self, anchor: Coordinate) -> Option<&Stack> {
        self.stacks.get(&anchor)
    }

    /// Stacks in row-major anchor order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Stack)> + '_ {
        self.stacks.iter().map(|(at, s)| (*at, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Total number of values across all stacks.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stacks.values().map(Stack::len).sum()
    }

    /// Replaces the stack at `anchor`. Used to seed stacks before a run.
    pub fn insert(&mut self, anchor: Coordinate, stack: Stack) -> Option<Stack> {
        self.stacks.insert(anchor, stack)
    }

    /// Checks that the stacks correspond one-to-one with the anchors of `grid`.
    ///
    /// # Errors
    ///
    /// [`EngineError::OrphanStack`] or [`EngineError::MissingStack`], at the
    /// first offending coordinate in row-major order.
    pub fn validate_against(&self, grid: &Grid) -> Result<(), EngineError> {
        let mut anchors = grid.anchors().map(|(at, _)| at).peekable();
        let mut stacks = self.stacks.keys().copied().peekable();
        loop {
            match (anchors.peek().copied(), stacks.peek().copied()) {
                (None, None) => return Ok(()),
                (Some(a), Some(s)) if a == s => {
                    anchors.next();
                    stacks.next();
                }
                (Some(a), Some(s)) if s < a => return Err(EngineError::OrphanStack(s)),
                (None, Some(s)) => return Err(EngineError::OrphanStack(s)),
                (Some(a), _) => return Err(EngineError::MissingStack(a)),
            }
        }
    }

    /// Starts a copy-on-write view for one tick.
    #[must_use]
    pub fn stage(&self) -> StagedStacks<'_> {
        StagedStacks {
            committed: self,
            staged: BTreeMap::new(),
        }
    }

    /// Replaces committed stacks with the staged ones.
    pub fn commit(&mut self, changes: BTreeMap<Coordinate, Stack>) {
        for (anchor, stack) in changes {
            self.stacks.insert(anchor, stack);
        }
    }
}

/// Copy-on-write stacks for one tick.
#[derive(Debug)]
pub struct StagedStacks<'a> {
    committed: &'a StackManager,
    staged: BTreeMap<Coordinate, Stack>,
}

impl StagedStacks<'_> {
    /// Current (possibly staged) view of the stack at `anchor`.
    #[must_use]
    pub fn view(&self, anchor: Coordinate) -> Option<&Stack> {
        self.staged
            .get(&anchor)
            .or_else(|| self.committed.get(anchor))
    }

    /// Mutable staged stack at `anchor`, cloned from the committed one on
    /// first access. `None` if no stack exists at `anchor`.
    pub fn get_mut(&mut self, anchor: Coordinate) -> Option<&mut Stack> {
        if !self.staged.contains_key(&anchor) {
            let committed = self.committed.get(anchor)?.clone();
            self.staged.insert(anchor, committed);
        }
        self.staged.get_mut(&anchor)
    }

    /// Anchors touched so far.
    pub fn touched(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.staged.keys().copied()
    }

    /// The staged stacks, ready for [`StackManager::commit`].
    #[must_use]
    pub fn into_changes(self) -> BTreeMap<Coordinate, Stack> {
        self.staged
    }
}
