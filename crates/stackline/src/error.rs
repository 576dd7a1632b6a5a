//! Error types.
//!
//! Only malformed input is an error. Stack underflow during a run and
//! absorbed signals are recovered locally and surface through
//! [`crate::diagnostics`]; a tick budget running out is a
//! [`crate::TerminalOutcome`].

use thiserror::Error;

use crate::grid::{AnchorId, Coordinate};
use crate::registry::Opcode;

/// Why a grid failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGridReason {
    /// Rows or columns are zero, or `rows * cols` overflows.
    #[error("grid dimensions {rows}x{cols} are not usable")]
    BadDimensions {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },
    /// The cell buffer does not hold exactly `rows * cols` cells.
    #[error("expected {expected} cells, got {actual}")]
    CellCount {
        /// `rows * cols`.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },
    /// Two stack anchors share an id.
    #[error("stack anchor id {0} is already used")]
    DuplicateAnchor(AnchorId),
    /// An instruction is wired to an anchor id that is not on the grid.
    #[error("instruction is wired to unknown stack anchor {0}")]
    UnknownAnchor(AnchorId),
    /// A stack instruction has no anchor to bind to.
    #[error("{0:?} needs a stack but the grid has no stack anchor")]
    NoStackAnchor(Opcode),
    /// `Load`/`Store` without an orthogonally adjacent literal cell.
    #[error("{0:?} needs an adjacent literal cell")]
    NoLiteralSlot(Opcode),
    /// An opcode that needs an operand has none.
    #[error("{0:?} requires an operand")]
    MissingOperand(Opcode),
    /// An opcode that takes no operand was given one.
    #[error("{0:?} does not take an operand")]
    UnexpectedOperand(Opcode),
    /// A layout symbol has no meaning.
    #[error("unknown layout symbol {0:?}")]
    UnknownSymbol(char),
    /// A builder override targets a coordinate outside the grid.
    #[error("coordinate is outside the grid")]
    OutOfBounds,
}

/// A grid rejected before any tick runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid grid at {at}: {reason}")]
pub struct InvalidGrid {
    /// Offending coordinate (`0:0` for whole-grid problems).
    pub at: Coordinate,
    /// What is wrong.
    pub reason: InvalidGridReason,
}

impl InvalidGrid {
    /// Creates an error at `at`.
    #[must_use]
    pub fn new(at: Coordinate, reason: InvalidGridReason) -> Self {
        Self { at, reason }
    }

    /// Whole-grid error, reported at the origin.
    #[must_use]
    pub fn whole(reason: InvalidGridReason) -> Self {
        Self::new(Coordinate::default(), reason)
    }
}

/// Direct misuse of the stack API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    /// The stack holds fewer values than the operation needs.
    #[error("stack underflow: needed {needed}, had {available}")]
    Underflow {
        /// Values the operation needs.
        needed: usize,
        /// Values present.
        available: usize,
    },
}

/// Errors raised when building or resuming an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The grid failed validation.
    #[error(transparent)]
    InvalidGrid(#[from] InvalidGrid),
    /// A persisted stack has no matching anchor on the grid.
    #[error("persisted stack at {0} has no stack anchor")]
    OrphanStack(Coordinate),
    /// An anchor on the grid has no persisted stack.
    #[error("stack anchor at {0} has no persisted stack")]
    MissingStack(Coordinate),
}
