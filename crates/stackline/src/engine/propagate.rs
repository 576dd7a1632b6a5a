//! Signal propagation: the Wireworld-derived substrate rule.
//!
//! Every function here is a pure function of one coordinate's neighbourhood
//! in the committed grid, so cells can be evaluated in any order.

use super::arbitrate::{arbitrate, Proposal};
use crate::config::ExcitationRule;
use crate::diagnostics::Absorption;
use crate::grid::{Cell, Conductor, Coordinate, Grid};

/// Head moves offered into `target`, sorted by source.
///
/// A neighbour proposes when its signal leaves towards `target` (see
/// [`Cell::emits`]) and `target` accepts a signal moving that way. On tiny
/// toroidal grids the same head can border a target twice; only the first
/// direction (in [`crate::Direction::ALL`] order) counts.
pub fn proposals_into(grid: &Grid, target: Coordinate) -> Vec<Proposal> {
    let cell = grid.get(target);
    let mut out: Vec<Proposal> = Vec::new();
    for (dir, source, neighbour) in grid.neighbors(target) {
        let travel = dir.opposite();
        if !neighbour.emits(travel)
            || !cell.accepts_signal(travel)
            || out.iter().any(|p| p.source == source)
        {
            continue;
        }
        out.push(Proposal {
            source,
            heading: travel,
        });
    }
    out.sort_by_key(|p| p.source);
    out
}

/// Decay rule for cells that do not take part in arbitration.
///
/// A head on a resistor charges it for one tick before the tail follows.
#[inline]
#[must_use]
pub const fn decay(cell: Cell) -> Cell {
    match cell {
        Cell::SignalHead(_, Conductor::Resistor(dir)) => Cell::Charged(dir),
        Cell::SignalHead(_, conductor) => Cell::SignalTail(conductor),
        Cell::Charged(dir) => Cell::SignalTail(Conductor::Resistor(dir)),
        Cell::SignalTail(conductor) => Cell::Conductor(conductor),
        other => other,
    }
}

/// Next state of the cell at `at`, given the instruction emissions aimed
/// at it. Losing proposals are appended to `absorbed`.
pub fn next_cell(
    grid: &Grid,
    at: Coordinate,
    emissions: &[Proposal],
    rule: ExcitationRule,
    tick: u64,
    absorbed: &mut Vec<Absorption>,
) -> Cell {
    let cell = *grid.get(at);
    let Cell::Conductor(conductor) = cell else {
        return decay(cell);
    };

    let mut proposals = proposals_into(grid, at);
    proposals.extend_from_slice(emissions);
    let verdict = arbitrate(rule, proposals);
    absorbed.extend(verdict.absorptions(tick, at));
    match verdict.winner {
        Some(winner) => Cell::SignalHead(winner.heading, conductor),
        None => cell,
    }
}
