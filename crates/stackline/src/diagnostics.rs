//! Run diagnostics.
//!
//! Every absorbed signal and every stack underflow is recorded in the
//! [`TickReport`] of the tick it happened in, counted in [`Diagnostics`],
//! and emitted as a `tracing` event.

use serde::{Deserialize, Serialize};

use crate::engine::HaltReason;
use crate::grid::Coordinate;
use crate::registry::Opcode;

/// A proposal that lost arbitration or was swallowed by an overloaded cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Absorption {
    /// Tick being computed.
    pub tick: u64,
    /// Cell the signal tried to enter.
    pub target: Coordinate,
    /// Where the losing signal came from.
    pub source: Coordinate,
    /// Source that entered instead; `None` when the target was overloaded.
    pub winner: Option<Coordinate>,
}

/// A landing whose stack held fewer values than the opcode pops.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Underflow {
    pub tick: u64,
    pub instruction: Coordinate,
    pub opcode: Opcode,
    pub anchor: Coordinate,
    /// Values the stack was short by.
    pub missing: usize,
    /// Whether the signal was destroyed rather than substituted.
    pub destroyed: bool,
}

/// What happened in one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number after the commit.
    pub tick: u64,
    /// Signal heads on the committed grid.
    pub heads: usize,
    /// Instructions executed.
    pub landings: usize,
    pub absorptions: Vec<Absorption>,
    pub underflows: Vec<Underflow>,
}

/// Counters accumulated over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ticks: u64,
    pub landings: u64,
    pub absorptions: u64,
    pub underflows: u64,
    pub halt: Option<HaltReason>,
}

impl Diagnostics {
    /// Folds `report` into the counters and logs its events.
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.landings += report.landings as u64;
        self.absorptions += report.absorptions.len() as u64;
        self.underflows += report.underflows.len() as u64;

        for a in &report.absorptions {
            match a.winner {
                Some(winner) => tracing::warn!(
                    tick = a.tick,
                    target = %a.target,
                    source = %a.source,
                    winner = %winner,
                    "signal absorbed"
                ),
                None => tracing::warn!(
                    tick = a.tick,
                    target = %a.target,
                    source = %a.source,
                    "signal absorbed by overloaded cell"
                ),
            }
        }
        for u in &report.underflows {
            tracing::warn!(
                tick = u.tick,
                instruction = %u.instruction,
                opcode = ?u.opcode,
                anchor = %u.anchor,
                missing = u.missing,
                destroyed = u.destroyed,
                "stack underflow"
            );
        }
        tracing::debug!(
            tick = report.tick,
            heads = report.heads,
            landings = report.landings,
            "tick committed"
        );
    }

    pub(crate) fn record_halt(&mut self, tick: u64, reason: HaltReason) {
        if self.halt.is_none() {
            tracing::info!(tick, ?reason, "run halted");
        }
        self.halt = Some(reason);
    }
}
