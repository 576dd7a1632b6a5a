//! Persisted run state.
//!
//! `(grid, tick, stacks)` is everything a run needs to continue; resuming
//! from a [`RunState`] replays bit-for-bit what the original run would have
//! done. A completed run also records why it halted, so resuming it stays
//! completed.

use serde::{Deserialize, Serialize};

use crate::engine::HaltReason;
use crate::error::EngineError;
use crate::grid::Grid;
use crate::stack::StackManager;

/// Complete state of a run between ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub grid: Grid,
    pub tick: u64,
    pub stacks: StackManager,
    /// Set once the run has completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<HaltReason>,
}

impl RunState {
    /// Fresh state at tick 0 with one empty stack per anchor.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        let stacks = StackManager::for_grid(&grid);
        Self {
            grid,
            tick: 0,
            stacks,
            halted: None,
        }
    }

    /// Checks that stacks and anchors correspond one-to-one.
    ///
    /// # Errors
    ///
    /// [`EngineError::OrphanStack`] or [`EngineError::MissingStack`].
    pub fn validate(&self) -> Result<(), EngineError> {
        self.stacks.validate_against(&self.grid)
    }
}
