//! Tick engine.
//!
//! Each tick is computed from the committed grid alone and written into a
//! second buffer; the buffers are swapped on commit. The phases are
//!
//! ```text
//! Idle -> Computing -> Committing -> Idle
//!                                 \-> Halted
//! ```
//!
//! Nothing computed during a tick is visible until the commit, so the order
//! in which cells are evaluated never changes the result.
//!
//! - [`propagate`]: head proposals and the decay rule
//! - [`arbitrate`]: conflict resolution between proposals
//! - [`dispatch`]: instruction landings
//! - [`halt`]: halt detection

pub mod arbitrate;
pub mod dispatch;
pub mod halt;
pub mod propagate;

use core::fmt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use self::dispatch::{Dispatch, Landing};
use self::halt::Detection;
pub use self::halt::HaltReason;
use crate::config::{EngineConfig, ExcitationRule};
use crate::diagnostics::{Absorption, Diagnostics, TickReport};
use crate::error::EngineError;
use crate::grid::{Cell, Coordinate, Grid};
use crate::registry::Registry;
use crate::snapshot::RunState;
use crate::stack::{Stack, StackManager};

/// Where the engine is in its tick cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    Computing,
    Committing,
    Halted(HaltReason),
}

/// Status after one tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickStatus {
    Running,
    Halted(HaltReason),
    /// The tick counter reached the configured limit. The engine is not
    /// halted; a larger limit lets it continue.
    BudgetExceeded,
}

/// Result of [`Engine::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    pub tick: u64,
    pub report: TickReport,
    pub status: TickStatus,
}

impl TickOutcome {
    /// Whether another step would advance the run.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == TickStatus::Running
    }
}

/// How a [`Engine::run`] ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TerminalOutcome {
    Completed { tick: u64, reason: HaltReason },
    BudgetExceeded { tick: u64 },
    Aborted { tick: u64 },
}

impl TerminalOutcome {
    #[must_use]
    pub const fn tick(&self) -> u64 {
        match *self {
            TerminalOutcome::Completed { tick, .. }
            | TerminalOutcome::BudgetExceeded { tick }
            | TerminalOutcome::Aborted { tick } => tick,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, TerminalOutcome::Completed { .. })
    }
}

impl fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalOutcome::Completed { tick, reason } => {
                write!(f, "completed at tick {tick} ({reason})")
            }
            TerminalOutcome::BudgetExceeded { tick } => {
                write!(f, "tick budget exceeded at tick {tick}")
            }
            TerminalOutcome::Aborted { tick } => write!(f, "aborted at tick {tick}"),
        }
    }
}

/// Cooperative cancellation, checked between ticks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a tick produces before it is committed.
struct Computed {
    dispatch: Dispatch,
    stack_changes: BTreeMap<Coordinate, Stack>,
    absorptions: Vec<Absorption>,
    landings: usize,
}

/// The double-buffered automaton.
///
/// # Example
///
/// ```
/// use stackline::{Engine, EngineConfig, GridBuilder, HaltReason, TerminalOutcome};
///
/// let grid = GridBuilder::from_rows(&[">--- "]).build().unwrap();
/// let mut engine = Engine::new(grid, EngineConfig::default());
/// assert_eq!(
///     engine.run(Some(100)),
///     TerminalOutcome::Completed { tick: 4, reason: HaltReason::Quiescent }
/// );
/// ```
#[derive(Debug)]
pub struct Engine {
    grid: Grid,
    next: Vec<Cell>,
    stacks: StackManager,
    tick: u64,
    phase: Phase,
    config: EngineConfig,
    diagnostics: Diagnostics,
    registry: &'static Registry,
}

impl Engine {
    /// Starts a run at tick 0 with one empty stack per anchor.
    #[must_use]
    pub fn new(grid: Grid, config: EngineConfig) -> Self {
        Self::from_state(RunState::new(grid), config)
    }

    /// Continues a persisted run.
    ///
    /// # Errors
    ///
    /// [`EngineError`] if the stacks do not match the grid's anchors.
    pub fn resume(state: RunState, config: EngineConfig) -> Result<Self, EngineError> {
        state.validate()?;
        Ok(Self::from_state(state, config))
    }

    fn from_state(state: RunState, config: EngineConfig) -> Self {
        let next = Vec::with_capacity(state.grid.cells().len());
        let phase = state.halted.map_or(Phase::Idle, Phase::Halted);
        Self {
            grid: state.grid,
            next,
            stacks: state.stacks,
            tick: state.tick,
            phase,
            config,
            diagnostics: Diagnostics {
                halt: state.halted,
                ..Diagnostics::default()
            },
            registry: Registry::global(),
        }
    }

    /// The committed grid.
    #[inline]
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The committed stacks.
    #[inline]
    #[must_use]
    pub fn stacks(&self) -> &StackManager {
        &self.stacks
    }

    /// Committed ticks so far.
    #[inline]
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The current `(grid, tick, stacks)`, and the halt reason once the run
    /// has completed.
    #[must_use]
    pub fn snapshot(&self) -> RunState {
        let halted = match self.phase {
            Phase::Halted(reason) => Some(reason),
            _ => None,
        };
        RunState {
            grid: self.grid.clone(),
            tick: self.tick,
            stacks: self.stacks.clone(),
            halted,
        }
    }

    /// Advances exactly one tick, evaluating cells row-major.
    ///
    /// On a halted engine this returns the halt again without advancing;
    /// once the tick counter has reached the configured `max_ticks` it
    /// returns [`TickStatus::BudgetExceeded`] without advancing.
    pub fn step(&mut self) -> TickOutcome {
        self.advance(None, self.config.max_ticks)
    }

    /// Like [`Engine::step`], but evaluates cells in `order`.
    ///
    /// Cells missing from `order` are evaluated afterwards, row-major;
    /// duplicates and out-of-bounds coordinates are skipped. The committed
    /// result is the same for every order.
    pub fn step_in_order(&mut self, order: &[Coordinate]) -> TickOutcome {
        self.advance(Some(order), self.config.max_ticks)
    }

    /// Steps until the run completes or the tick counter reaches `max_ticks`
    /// (absolute; falls back to the configured limit, `None` is unbounded).
    pub fn run(&mut self, max_ticks: Option<u64>) -> TerminalOutcome {
        self.run_with_cancel(max_ticks, &CancelToken::new())
    }

    /// Like [`Engine::run`], returning [`TerminalOutcome::Aborted`] once
    /// `cancel` is set. A tick in progress always completes.
    pub fn run_with_cancel(
        &mut self,
        max_ticks: Option<u64>,
        cancel: &CancelToken,
    ) -> TerminalOutcome {
        let limit = max_ticks.or(self.config.max_ticks);
        loop {
            if let Phase::Halted(reason) = self.phase {
                return TerminalOutcome::Completed {
                    tick: self.tick,
                    reason,
                };
            }
            if limit.is_some_and(|limit| self.tick >= limit) {
                return TerminalOutcome::BudgetExceeded { tick: self.tick };
            }
            if cancel.is_cancelled() {
                tracing::info!(tick = self.tick, "run aborted");
                return TerminalOutcome::Aborted { tick: self.tick };
            }
            let outcome = self.advance(None, limit);
            match outcome.status {
                TickStatus::Running => {}
                TickStatus::Halted(reason) => {
                    return TerminalOutcome::Completed {
                        tick: outcome.tick,
                        reason,
                    }
                }
                TickStatus::BudgetExceeded => {
                    return TerminalOutcome::BudgetExceeded { tick: outcome.tick }
                }
            }
        }
    }

    fn advance(&mut self, order: Option<&[Coordinate]>, limit: Option<u64>) -> TickOutcome {
        if let Phase::Halted(reason) = self.phase {
            return self.idle_outcome(TickStatus::Halted(reason));
        }
        if limit.is_some_and(|limit| self.tick >= limit) {
            return self.idle_outcome(TickStatus::BudgetExceeded);
        }

        self.phase = Phase::Computing;
        let tick = self.tick + 1;
        let mut next = core::mem::take(&mut self.next);
        next.clear();
        next.resize(self.grid.cells().len(), Cell::Empty);
        let computed = self.compute(order, tick, &mut next);

        self.phase = Phase::Committing;
        self.commit(computed, next, tick, limit)
    }

    /// Outcome of a call that did not advance the tick counter.
    fn idle_outcome(&self, status: TickStatus) -> TickOutcome {
        TickOutcome {
            tick: self.tick,
            report: TickReport {
                tick: self.tick,
                heads: self.grid.head_count(),
                ..TickReport::default()
            },
            status,
        }
    }

    fn compute(&self, order: Option<&[Coordinate]>, tick: u64, next: &mut [Cell]) -> Computed {
        let grid = &self.grid;
        let rule = self.config.excitation;
        let sequence = order.map(|order| full_order(grid, order));
        let coords: Box<dyn Iterator<Item = Coordinate> + '_> = match &sequence {
            Some(seq) => Box::new(seq.iter().copied()),
            None => Box::new(grid.iter().map(|(at, _)| at)),
        };

        let mut absorptions = Vec::new();
        let mut landings = Vec::new();
        for at in coords {
            let Cell::Instruction(instruction) = *grid.get(at) else {
                continue;
            };
            let verdict = arbitrate::arbitrate(rule, propagate::proposals_into(grid, at));
            absorptions.extend(verdict.absorptions(tick, at));
            if let Some(winner) = verdict.winner {
                landings.push(Landing {
                    at,
                    instruction,
                    heading: winner.heading,
                });
            }
        }
        let landing_count = landings.len();

        let mut staged = self.stacks.stage();
        let dispatch = dispatch::dispatch(
            self.registry,
            grid,
            &mut staged,
            self.config.underflow,
            tick,
            landings,
        );
        let stack_changes = staged.into_changes();

        let emissions = &dispatch.emissions;
        match &sequence {
            Some(seq) => fill_in_order(grid, seq, emissions, rule, tick, next, &mut absorptions),
            None => fill_rows(grid, emissions, rule, tick, next, &mut absorptions),
        }
        absorptions.sort_by_key(|a| (a.target, a.source));

        Computed {
            dispatch,
            stack_changes,
            absorptions,
            landings: landing_count,
        }
    }

    fn commit(
        &mut self,
        computed: Computed,
        mut next: Vec<Cell>,
        tick: u64,
        limit: Option<u64>,
    ) -> TickOutcome {
        self.grid.swap_buffer(&mut next);
        self.next = next;
        self.grid.apply_batch(&computed.dispatch.writes);
        for write in &computed.dispatch.writes {
            tracing::trace!(tick, %write, "literal write");
        }
        self.stacks.commit(computed.stack_changes);
        self.tick = tick;

        let heads = self.grid.head_count();
        let report = TickReport {
            tick,
            heads,
            landings: computed.landings,
            absorptions: computed.absorptions,
            underflows: computed.dispatch.underflows,
        };
        self.diagnostics.record(&report);

        let status = match halt::detect(computed.dispatch.halted, heads, tick, limit) {
            Detection::Continue => {
                self.phase = Phase::Idle;
                TickStatus::Running
            }
            Detection::Completed(reason) => {
                self.phase = Phase::Halted(reason);
                self.diagnostics.record_halt(tick, reason);
                TickStatus::Halted(reason)
            }
            Detection::BudgetExceeded => {
                self.phase = Phase::Idle;
                tracing::info!(tick, "tick budget exceeded");
                TickStatus::BudgetExceeded
            }
        };

        TickOutcome {
            tick,
            report,
            status,
        }
    }
}

/// `order` made into a permutation of every coordinate on `grid`.
fn full_order(grid: &Grid, order: &[Coordinate]) -> Vec<Coordinate> {
    let (_, cols) = grid.dimensions();
    let mut seen = vec![false; grid.cells().len()];
    let mut out = Vec::with_capacity(seen.len());
    for &at in order {
        if grid.in_bounds(at) && !seen[at.index(cols)] {
            seen[at.index(cols)] = true;
            out.push(at);
        }
    }
    out.extend(
        grid.iter()
            .map(|(at, _)| at)
            .filter(|at| !seen[at.index(cols)]),
    );
    out
}

fn emissions_at(
    emissions: &BTreeMap<Coordinate, Vec<arbitrate::Proposal>>,
    at: Coordinate,
) -> &[arbitrate::Proposal] {
    emissions.get(&at).map_or(&[][..], Vec::as_slice)
}

fn fill_in_order(
    grid: &Grid,
    sequence: &[Coordinate],
    emissions: &BTreeMap<Coordinate, Vec<arbitrate::Proposal>>,
    rule: ExcitationRule,
    tick: u64,
    next: &mut [Cell],
    absorbed: &mut Vec<Absorption>,
) {
    let (_, cols) = grid.dimensions();
    for &at in sequence {
        let emitted = emissions_at(emissions, at);
        next[at.index(cols)] = propagate::next_cell(grid, at, emitted, rule, tick, absorbed);
    }
}

#[cfg(not(feature = "parallel"))]
fn fill_rows(
    grid: &Grid,
    emissions: &BTreeMap<Coordinate, Vec<arbitrate::Proposal>>,
    rule: ExcitationRule,
    tick: u64,
    next: &mut [Cell],
    absorbed: &mut Vec<Absorption>,
) {
    let (_, cols) = grid.dimensions();
    for (row, out) in next.chunks_mut(cols).enumerate() {
        for (col, slot) in out.iter_mut().enumerate() {
            let at = Coordinate::new(row, col);
            let emitted = emissions_at(emissions, at);
            *slot = propagate::next_cell(grid, at, emitted, rule, tick, absorbed);
        }
    }
}

#[cfg(feature = "parallel")]
fn fill_rows(
    grid: &Grid,
    emissions: &BTreeMap<Coordinate, Vec<arbitrate::Proposal>>,
    rule: ExcitationRule,
    tick: u64,
    next: &mut [Cell],
    absorbed: &mut Vec<Absorption>,
) {
    use rayon::prelude::*;

    let (_, cols) = grid.dimensions();
    let per_row: Vec<Vec<Absorption>> = next
        .par_chunks_mut(cols)
        .enumerate()
        .map(|(row, out)| {
            let mut local = Vec::new();
            for (col, slot) in out.iter_mut().enumerate() {
                let at = Coordinate::new(row, col);
                *slot = propagate::next_cell(
                    grid,
                    at,
                    emissions_at(emissions, at),
                    rule,
                    tick,
                    &mut local,
                );
            }
            local
        })
        .collect();
    absorbed.extend(per_row.into_iter().flatten());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnderflowPolicy;
    use crate::grid::{Direction, GridBuilder, Value};

    fn engine(rows: &[&str]) -> Engine {
        Engine::new(GridBuilder::from_rows(rows).build().unwrap(), EngineConfig::default())
    }

    #[test]
    fn test_single_step_moves_head() {
        let mut e = engine(&[">--"]);
        let out = e.step();
        assert_eq!(out.tick, 1);
        assert!(out.is_live());
        assert_eq!(e.grid().to_layout(), "~>-\n");
        assert_eq!(e.phase(), Phase::Idle);
    }

    #[test]
    fn test_halted_engine_does_not_advance() {
        let mut e = engine(&[">"]);
        let out = e.step();
        assert_eq!(out.status, TickStatus::Halted(HaltReason::Quiescent));
        let again = e.step();
        assert_eq!(again.tick, 1);
        assert_eq!(again.status, TickStatus::Halted(HaltReason::Quiescent));
        assert_eq!(e.tick(), 1);
        assert_eq!(e.diagnostics().ticks, 1);
    }

    #[test]
    fn test_budget_is_absolute() {
        let mut e = Engine::new(
            GridBuilder::from_rows(&[">-----"])
                .wrap(crate::grid::WrapMode::Toroidal)
                .build()
                .unwrap(),
            EngineConfig::default().with_max_ticks(3),
        );
        assert_eq!(e.run(None), TerminalOutcome::BudgetExceeded { tick: 3 });
        assert_eq!(e.run(None), TerminalOutcome::BudgetExceeded { tick: 3 });
        assert_eq!(e.run(Some(5)), TerminalOutcome::BudgetExceeded { tick: 5 });
    }

    #[test]
    fn test_cancel_between_ticks() {
        let mut e = engine(&[">-----"]);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(e.run_with_cancel(None, &token), TerminalOutcome::Aborted { tick: 0 });
        assert_eq!(e.tick(), 0);
    }

    #[test]
    fn test_halt_instruction_stops_run() {
        let mut e = engine(&[">H---"]);
        assert_eq!(
            e.run(Some(10)),
            TerminalOutcome::Completed {
                tick: 1,
                reason: HaltReason::Halted,
            }
        );
        assert_eq!(e.diagnostics().halt, Some(HaltReason::Halted));
    }

    #[test]
    fn test_store_applied_after_swap() {
        let grid = GridBuilder::from_rows(&["$>7-K-", "    \" "]).build().unwrap();
        let mut e = Engine::new(grid, EngineConfig::default());
        assert!(e.run(Some(10)).is_completed());
        assert_eq!(e.grid().get(Coordinate::new(1, 4)), &Cell::Literal(Value::Int(7)));
        assert_eq!(e.stacks().depth(), 0);
    }

    #[test]
    fn test_step_in_order_matches_step() {
        let rows = [" v  ", ">+A-", "$ ^ "];
        let config = EngineConfig::default().with_underflow(UnderflowPolicy::DestroySignal);
        let mut a = Engine::new(GridBuilder::from_rows(&rows).build().unwrap(), config);
        let mut b = Engine::new(GridBuilder::from_rows(&rows).build().unwrap(), config);

        let mut reversed: Vec<Coordinate> = a.grid().iter().map(|(at, _)| at).collect();
        reversed.reverse();
        for _ in 0..3 {
            let x = a.step();
            let y = b.step_in_order(&reversed);
            assert_eq!(x, y);
            assert_eq!(a.snapshot(), b.snapshot());
        }
    }

    #[test]
    fn test_full_order_fills_gaps() {
        let grid = GridBuilder::from_rows(&["--", "--"]).build().unwrap();
        let order = full_order(
            &grid,
            &[Coordinate::new(1, 1), Coordinate::new(1, 1), Coordinate::new(9, 9)],
        );
        assert_eq!(
            order,
            vec![
                Coordinate::new(1, 1),
                Coordinate::new(0, 0),
                Coordinate::new(0, 1),
                Coordinate::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_resume_rejects_mismatched_stacks() {
        let grid = GridBuilder::from_rows(&["$-"]).build().unwrap();
        let mut state = RunState::new(grid);
        state.stacks = StackManager::default();
        assert_eq!(
            Engine::resume(state, EngineConfig::default()).unwrap_err(),
            EngineError::MissingStack(Coordinate::new(0, 0))
        );
    }

    #[test]
    fn test_heading_follows_turns() {
        let mut e = engine(&[">+", " |"]);
        e.step();
        assert_eq!(e.grid().get(Coordinate::new(0, 1)).heading(), Some(Direction::Right));
        e.step();
        assert_eq!(
            e.grid().get(Coordinate::new(1, 1)),
            &Cell::head(Direction::Down)
        );
    }

    #[test]
    fn test_step_stops_at_budget() {
        let mut e = Engine::new(
            GridBuilder::from_rows(&[">-----"])
                .wrap(crate::grid::WrapMode::Toroidal)
                .build()
                .unwrap(),
            EngineConfig::default().with_max_ticks(3),
        );
        let statuses: Vec<TickStatus> = (0..6).map(|_| e.step().status).collect();
        assert_eq!(
            statuses,
            [
                TickStatus::Running,
                TickStatus::Running,
                TickStatus::BudgetExceeded,
                TickStatus::BudgetExceeded,
                TickStatus::BudgetExceeded,
                TickStatus::BudgetExceeded,
            ]
        );
        assert_eq!(e.tick(), 3);
        assert_eq!(e.diagnostics().ticks, 3);
        assert!(!e.step().is_live());
    }

    #[test]
    fn test_resumed_halted_run_stays_halted() {
        let mut original = engine(&["$>H  ", "  >--", "     "]);
        let expected = TerminalOutcome::Completed {
            tick: 1,
            reason: HaltReason::Halted,
        };
        assert_eq!(original.run(Some(10)), expected);

        let state = original.snapshot();
        assert_eq!(state.halted, Some(HaltReason::Halted));
        let mut resumed = Engine::resume(state.clone(), EngineConfig::default()).unwrap();
        assert_eq!(resumed.phase(), Phase::Halted(HaltReason::Halted));
        assert_eq!(resumed.run(Some(10)), expected);
        assert_eq!(resumed.step().status, TickStatus::Halted(HaltReason::Halted));
        assert_eq!(resumed.snapshot(), state);
    }
}
