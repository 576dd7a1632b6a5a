//! Instruction bindings, resolved once when a grid is validated.
//!
//! Anchors, literals and instructions never change kind during a run, so a
//! binding computed at construction stays valid for the grid's lifetime.

use std::collections::BTreeMap;

use super::cell::{AnchorId, Cell};
use super::coord::{Coordinate, Direction};
use super::substrate::{Grid, WrapMode};
use crate::error::{InvalidGrid, InvalidGridReason};
use crate::registry::Registry;

/// Cached instruction → stack anchor and instruction → literal slot maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    anchors: BTreeMap<Coordinate, AnchorId>,
    stacks: BTreeMap<Coordinate, Coordinate>,
    literals: BTreeMap<Coordinate, Coordinate>,
}

impl Bindings {
    /// Resolves every instruction on `grid`, failing on the first
    /// (row-major) instruction that cannot be bound.
    pub(crate) fn resolve(grid: &Grid) -> Result<Self, InvalidGrid> {
        let registry = Registry::global();
        let mut anchors = BTreeMap::new();
        let mut by_id: BTreeMap<AnchorId, Coordinate> = BTreeMap::new();

        for (at, cell) in grid.iter() {
            if let Cell::StackAnchor(id) = *cell {
                if by_id.insert(id, at).is_some() {
                    return Err(InvalidGrid::new(at, InvalidGridReason::DuplicateAnchor(id)));
                }
                anchors.insert(at, id);
            }
        }

        let mut stacks = BTreeMap::new();
        let mut literals = BTreeMap::new();

        for (at, cell) in grid.iter() {
            let Cell::Instruction(instr) = cell else {
                continue;
            };
            let spec = registry.spec(instr.opcode);

            match (spec.operand, instr.operand.is_some()) {
                (true, false) => {
                    return Err(InvalidGrid::new(
                        at,
                        InvalidGridReason::MissingOperand(instr.opcode),
                    ))
                }
                (false, true) => {
                    return Err(InvalidGrid::new(
                        at,
                        InvalidGridReason::UnexpectedOperand(instr.opcode),
                    ))
                }
                _ => {}
            }

            if let Some(id) = instr.anchor {
                let anchor = by_id
                    .get(&id)
                    .copied()
                    .ok_or_else(|| InvalidGrid::new(at, InvalidGridReason::UnknownAnchor(id)))?;
                stacks.insert(at, anchor);
            } else if spec.uses_stack() {
                let anchor = nearest_anchor(grid, at, anchors.keys().copied()).ok_or_else(|| {
                    InvalidGrid::new(at, InvalidGridReason::NoStackAnchor(instr.opcode))
                })?;
                stacks.insert(at, anchor);
            }

            if spec.literal {
                let slot = Direction::ALL
                    .iter()
                    .filter_map(|&dir| grid.step(at, dir))
                    .find(|&n| matches!(grid.get(n), Cell::Literal(_)))
                    .ok_or_else(|| {
                        InvalidGrid::new(at, InvalidGridReason::NoLiteralSlot(instr.opcode))
                    })?;
                literals.insert(at, slot);
            }
        }

        Ok(Self {
            anchors,
            stacks,
            literals,
        })
    }

    /// Anchor coordinate bound to the instruction at `instruction`.
    #[inline]
    #[must_use]
    pub fn stack_of(&self, instruction: Coordinate) -> Option<Coordinate> {
        self.stacks.get(&instruction).copied()
    }

    /// Literal cell bound to the instruction at `instruction`.
    #[inline]
    #[must_use]
    pub fn literal_of(&self, instruction: Coordinate) -> Option<Coordinate> {
        self.literals.get(&instruction).copied()
    }

    /// All stack anchors as `(coordinate, id)` in row-major order.
    pub fn anchors(&self) -> impl Iterator<Item = (Coordinate, AnchorId)> + '_ {
        self.anchors.iter().map(|(at, id)| (*at, *id))
    }

    /// Number of stack anchors.
    #[inline]
    #[must_use]
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

/// Nearest anchor by Manhattan distance (toroidal when the grid wraps),
/// ties broken by row-major anchor coordinate.
fn nearest_anchor(
    grid: &Grid,
    from: Coordinate,
    anchors: impl Iterator<Item = Coordinate>,
) -> Option<Coordinate> {
    anchors.min_by_key(|&anchor| (distance(grid, from, anchor), anchor))
}

fn distance(grid: &Grid, a: Coordinate, b: Coordinate) -> usize {
    let (rows, cols) = grid.dimensions();
    let dr = a.row.abs_diff(b.row);
    let dc = a.col.abs_diff(b.col);
    match grid.wrap_mode() {
        WrapMode::Bounded => dr + dc,
        WrapMode::Toroidal => dr.min(rows - dr) + dc.min(cols - dc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridBuilder, Instruction};
    use crate::registry::Opcode;

    #[test]
    fn test_nearest_anchor_prefers_row_major_on_tie() {
        // Anchors at equal distance above and below the instruction.
        let grid = GridBuilder::from_rows(&["$ ", " A", "$ "]).build().unwrap();
        assert_eq!(grid.stack_binding(Coordinate::new(1, 1)), Some(Coordinate::new(0, 0)));
    }

    #[test]
    fn test_explicit_anchor_wins_over_nearest() {
        let grid = GridBuilder::from_rows(&["$A   $"])
            .set((0, 1), Instruction::new(Opcode::Add).wired_to(1))
            .build()
            .unwrap();
        assert_eq!(grid.stack_binding(Coordinate::new(0, 1)), Some(Coordinate::new(0, 5)));
    }

    #[test]
    fn test_toroidal_distance() {
        // The instruction sits at the right edge; the anchor at column 0 is
        // 7 away on a bounded grid but only 1 away once the row wraps.
        let rows = ["$   $  A"];
        let bounded = GridBuilder::from_rows(&rows).build().unwrap();
        assert_eq!(bounded.stack_binding(Coordinate::new(0, 7)), Some(Coordinate::new(0, 4)));

        let toroidal = GridBuilder::from_rows(&rows)
            .wrap(WrapMode::Toroidal)
            .build()
            .unwrap();
        assert_eq!(toroidal.stack_binding(Coordinate::new(0, 7)), Some(Coordinate::new(0, 0)));
    }

    #[test]
    fn test_missing_anchor_is_rejected() {
        let err = GridBuilder::from_rows(&["-A-"]).build().unwrap_err();
        assert_eq!(err.at, Coordinate::new(0, 1));
        assert_eq!(err.reason, InvalidGridReason::NoStackAnchor(Opcode::Add));
    }

    #[test]
    fn test_unknown_explicit_anchor_is_rejected() {
        let err = GridBuilder::from_rows(&["$="])
            .set((0, 1), Instruction::new(Opcode::Pass).wired_to(9))
            .build()
            .unwrap_err();
        assert_eq!(err.reason, InvalidGridReason::UnknownAnchor(9));
    }

    #[test]
    fn test_duplicate_anchor_is_rejected() {
        let err = GridBuilder::from_rows(&["$ $"])
            .set((0, 2), Cell::StackAnchor(0))
            .build()
            .unwrap_err();
        assert_eq!(err.at, Coordinate::new(0, 2));
        assert_eq!(err.reason, InvalidGridReason::DuplicateAnchor(0));
    }

    #[test]
    fn test_literal_slot_direction_order() {
        // Literals to the right and below; Right comes before Down.
        let grid = GridBuilder::from_rows(&["$L\"", " \" "]).build().unwrap();
        assert_eq!(grid.literal_slot(Coordinate::new(0, 1)), Some(Coordinate::new(0, 2)));

        let err = GridBuilder::from_rows(&["$K-"]).build().unwrap_err();
        assert_eq!(err.reason, InvalidGridReason::NoLiteralSlot(Opcode::Store));
    }

    #[test]
    fn test_operand_validation() {
        let err = GridBuilder::from_rows(&["$P"]).build().unwrap_err();
        assert_eq!(err.reason, InvalidGridReason::MissingOperand(Opcode::Push));

        let err = GridBuilder::from_rows(&["$A"])
            .set(
                (0, 1),
                Instruction {
                    opcode: Opcode::Add,
                    operand: Some(crate::Value::Int(1)),
                    anchor: None,
                },
            )
            .build()
            .unwrap_err();
        assert_eq!(err.reason, InvalidGridReason::UnexpectedOperand(Opcode::Add));
    }
}
