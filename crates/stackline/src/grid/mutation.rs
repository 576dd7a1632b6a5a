use core::fmt;

use super::cell::Value;
use super::coord::Coordinate;

/// A literal slot overwrite, as performed by `Store`, applied to the
/// committed grid after the buffer swap.
///
/// Writes are collected while a tick is being computed and applied in
/// order, so a later write to the same slot wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellWrite {
    pub at: Coordinate,
    pub value: Value,
}

impl CellWrite {
    #[must_use]
    pub const fn literal(at: Coordinate, value: Value) -> Self {
        Self { at, value }
    }
}

impl fmt::Display for CellWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {:?}", self.at, self.value)
    }
}
