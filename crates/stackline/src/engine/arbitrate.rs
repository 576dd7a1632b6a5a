//! Conflict resolution for signals entering the same cell.
//!
//! Proposals are ordered by source coordinate, row-major. Whatever the rule,
//! the winner is always the lowest source; every other proposal is absorbed.

use crate::config::ExcitationRule;
use crate::diagnostics::Absorption;
use crate::grid::{Coordinate, Direction};

/// A signal offering to enter a cell next tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Proposal {
    /// Head or instruction the signal comes from.
    pub source: Coordinate,
    /// Heading the signal will have once it enters.
    pub heading: Direction,
}

/// Outcome of arbitrating one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Option<Proposal>,
    pub absorbed: Vec<Proposal>,
}

impl Verdict {
    /// Absorption records for diagnostics.
    pub fn absorptions(
        &self,
        tick: u64,
        target: Coordinate,
    ) -> impl Iterator<Item = Absorption> + '_ {
        let winner = self.winner.map(|w| w.source);
        self.absorbed.iter().map(move |p| Absorption {
            tick,
            target,
            source: p.source,
            winner,
        })
    }
}

/// Picks which of `proposals` enters the target.
pub fn arbitrate(rule: ExcitationRule, mut proposals: Vec<Proposal>) -> Verdict {
    if proposals.is_empty() {
        return Verdict::default();
    }
    proposals.sort_by_key(|p| p.source);

    let overloaded = match rule {
        ExcitationRule::ExactlyOne => false,
        ExcitationRule::OneOrTwo => proposals.len() > 2,
    };
    if overloaded {
        return Verdict {
            winner: None,
            absorbed: proposals,
        };
    }

    let winner = proposals.remove(0);
    Verdict {
        winner: Some(winner),
        absorbed: proposals,
    }
}
