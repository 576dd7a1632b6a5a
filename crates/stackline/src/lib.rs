//! Stackline - a stack language running on a Wireworld-style automaton
//!
//! A stackline program is a two-dimensional grid. Signals travel along
//! wires, one cell per tick; when a signal lands on an instruction cell the
//! instruction runs against a stack owned by a nearby stack anchor and then
//! sends the signal on.
//!
//! # Execution Model
//!
//! ```text
//! State = Grid (cells) + tick counter + one stack per anchor
//! Tick  = every cell computes its next state from the previous tick only
//! Run   = ticks until a Halt fires, no signal is left, or the budget runs out
//! ```
//!
//! Ticks are double-buffered: the next grid is written into a second buffer
//! and swapped in atomically, so cells can be evaluated in any order (or in
//! parallel with the `parallel` feature) without changing the result.
//!
//! # Cells
//!
//! | Cell | Symbol | Next tick |
//! |------|--------|-----------|
//! | Empty | `' '` | Empty |
//! | Conductor: wire | `-` `\|` `+` | Head if a signal enters along its axis |
//! | Conductor: diode | `▲` `▶` `▼` `◀` | Head if a signal enters, never from ahead |
//! | Conductor: resistor | `↑` `→` `↓` `←` | Head if a signal enters |
//! | SignalHead | `>` `<` `^` `v` | Tail, or Charged on a resistor |
//! | Charged | `*` | Tail; the signal leaves in the resistor's direction |
//! | SignalTail | `~` | the conductor underneath |
//! | Instruction | see [`registry`] | unchanged; fires when a signal lands |
//! | Literal | `"` | unchanged unless a `Store` writes it |
//! | StackAnchor | `$` | unchanged |
//! | Barrier | `#` | unchanged |
//!
//! # Determinism
//!
//! Every tie is broken by row-major [`Coordinate`] order: the lowest source
//! wins a contested cell (the others are absorbed and counted), and landings
//! sharing a stack execute in ascending instruction order. Two runs of the
//! same grid are identical tick for tick.
//!
//! # Example
//!
//! ```
//! use stackline::{Coordinate, Engine, EngineConfig, GridBuilder, Value};
//!
//! // push 5, push 3, add
//! let grid = GridBuilder::from_rows(&["$>5-3-A"]).build().unwrap();
//! let mut engine = Engine::new(grid, EngineConfig::default());
//! assert!(engine.run(Some(100)).is_completed());
//!
//! let stack = engine.stacks().get(Coordinate::new(0, 0)).unwrap();
//! assert_eq!(stack.as_slice(), &[Value::Int(8)]);
//! ```

// Error types
pub mod error;

// Grid substrate (coord, cell, substrate, binding, layout, mutation)
pub mod grid;

// Opcode table
pub mod registry;

// Per-anchor stacks
pub mod stack;

// Engine configuration
pub mod config;

// Absorption and underflow records
pub mod diagnostics;

// Tick engine (propagate, arbitrate, dispatch, halt)
pub mod engine;

// Persisted run state
pub mod snapshot;

pub use config::{EngineConfig, ExcitationRule, UnderflowPolicy};
pub use diagnostics::{Absorption, Diagnostics, TickReport, Underflow};
pub use engine::{
    CancelToken, Engine, HaltReason, Phase, TerminalOutcome, TickOutcome, TickStatus,
};
pub use error::{EngineError, InvalidGrid, InvalidGridReason, StackError};
pub use grid::{
    AnchorId, Cell, CellWrite, Conductor, Coordinate, Direction, Grid, GridBuilder, Instruction,
    Orientation, Value, WrapMode,
};
pub use registry::{Opcode, Registry, SignalPolicy};
pub use snapshot::RunState;
pub use stack::{Stack, StackManager};

/// Prelude module for convenient imports.
///
/// ```
/// use stackline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{EngineConfig, ExcitationRule, UnderflowPolicy};
    pub use crate::engine::{CancelToken, Engine, HaltReason, TerminalOutcome, TickStatus};
    pub use crate::grid::{
        Cell, Conductor, Coordinate, Direction, Grid, GridBuilder, Instruction, Value, WrapMode,
    };
    pub use crate::registry::Opcode;
    pub use crate::snapshot::RunState;
}
