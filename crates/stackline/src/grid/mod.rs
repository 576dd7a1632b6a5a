//! The grid substrate.
//!
//! - [`substrate::Grid`]: bounded or toroidal cell array with cached bindings
//! - [`cell::Cell`]: cell kinds, [`cell::Value`] and [`cell::Instruction`]
//! - [`conductor::Conductor`]: wires, diodes and resistors
//! - [`coord::Coordinate`] / [`coord::Direction`]: row-major addresses and headings
//! - [`layout::GridBuilder`]: symbol layouts and validated construction
//! - [`mutation::CellWrite`]: deferred writes applied at commit

pub mod binding;
pub mod cell;
pub mod conductor;
pub mod coord;
pub mod layout;
pub mod mutation;
pub mod substrate;

pub use binding::Bindings;
pub use cell::{AnchorId, Cell, Instruction, Value};
pub use conductor::{Conductor, Orientation};
pub use coord::{Coordinate, Direction};
pub use layout::GridBuilder;
pub use mutation::CellWrite;
pub use substrate::{Grid, WrapMode};
