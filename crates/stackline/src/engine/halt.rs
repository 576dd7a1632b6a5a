//! Halt detection, checked once per committed tick.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a run completed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HaltReason {
    /// A `Halt` instruction fired.
    Halted,
    /// No signal head is left on the grid.
    Quiescent,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Halted => f.write_str("halt instruction"),
            HaltReason::Quiescent => f.write_str("no signals left"),
        }
    }
}

/// Result of inspecting a committed tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Detection {
    Continue,
    Completed(HaltReason),
    BudgetExceeded,
}

/// Checks, in order: a fired halt, an empty grid, the tick budget.
#[must_use]
pub const fn detect(halt_fired: bool, heads: usize, tick: u64, limit: Option<u64>) -> Detection {
    if halt_fired {
        return Detection::Completed(HaltReason::Halted);
    }
    if heads == 0 {
        return Detection::Completed(HaltReason::Quiescent);
    }
    match limit {
        Some(limit) if tick >= limit => Detection::BudgetExceeded,
        _ => Detection::Continue,
    }
}
