//! Execution dispatcher: runs instruction landings against staged stacks.
//!
//! Landings execute in ascending row-major order of their instruction
//! coordinate, so two landings sharing a stack always apply in the same
//! order. Literal cells are read from the committed grid; `Store` writes are
//! deferred to the commit step.

use std::collections::BTreeMap;

use super::arbitrate::Proposal;
use crate::config::UnderflowPolicy;
use crate::diagnostics::Underflow;
use crate::grid::{Cell, CellWrite, Coordinate, Direction, Grid, Instruction, Value};
use crate::registry::{Opcode, Registry, SignalPolicy};
use crate::stack::StagedStacks;

/// A signal that won its way onto an instruction this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Landing {
    pub at: Coordinate,
    pub instruction: Instruction,
    /// Heading of the arriving signal.
    pub heading: Direction,
}

/// Combined effect of all landings in one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// New signals offered into idle conductors, keyed by target.
    pub emissions: BTreeMap<Coordinate, Vec<Proposal>>,
    /// Literal writes, in landing order.
    pub writes: Vec<CellWrite>,
    pub underflows: Vec<Underflow>,
    /// Whether a `Halt` landing fired.
    pub halted: bool,
}

/// Executes `landings` (in any order; they are sorted here).
pub fn dispatch(
    registry: &Registry,
    grid: &Grid,
    stacks: &mut StagedStacks<'_>,
    underflow: UnderflowPolicy,
    tick: u64,
    mut landings: Vec<Landing>,
) -> Dispatch {
    landings.sort_by_key(|l| l.at);
    let mut out = Dispatch::default();

    for landing in &landings {
        let spec = registry.spec(landing.instruction.opcode);
        tracing::trace!(tick, at = %landing.at, opcode = spec.name, "landing");

        let Some(exits) = execute(registry, grid, stacks, underflow, tick, landing, &mut out)
        else {
            continue;
        };
        out.halted |= spec.halts;

        for dir in exits {
            let Some(target) = grid.step(landing.at, dir) else {
                continue;
            };
            if !matches!(grid.get(target), Cell::Conductor(c) if c.accepts(dir)) {
                continue;
            }
            out.emissions.entry(target).or_default().push(Proposal {
                source: landing.at,
                heading: dir,
            });
        }
    }
    out
}

/// Runs one landing. `None` means the signal was destroyed.
fn execute(
    registry: &Registry,
    grid: &Grid,
    stacks: &mut StagedStacks<'_>,
    underflow: UnderflowPolicy,
    tick: u64,
    landing: &Landing,
    out: &mut Dispatch,
) -> Option<Vec<Direction>> {
    let instr = landing.instruction;
    let spec = registry.spec(instr.opcode);

    let mut operands = Vec::new();
    let mut stack = None;
    if spec.uses_stack() {
        let anchor = grid.stack_binding(landing.at)?;
        let available = stacks.view(anchor).map_or(0, |s| s.len());
        if available < spec.pops {
            let destroyed = underflow == UnderflowPolicy::DestroySignal;
            out.underflows.push(Underflow {
                tick,
                instruction: landing.at,
                opcode: instr.opcode,
                anchor,
                missing: spec.pops - available,
                destroyed,
            });
            if destroyed {
                return None;
            }
        }
        let staged = stacks.get_mut(anchor)?;
        operands = match underflow {
            UnderflowPolicy::Substitute(fill) => staged.pop_n_padded(spec.pops, fill).0,
            UnderflowPolicy::DestroySignal => staged.pop_n(spec.pops).ok()?,
        };
        stack = Some(staged);
    }

    let mut branch_on = false;
    let pushed: Vec<Value> = match (instr.opcode, operands.as_slice()) {
        (Opcode::Push, _) => vec![instr.operand.unwrap_or_default()],
        (Opcode::Dup, &[a]) => vec![a, a],
        (Opcode::Swap, &[a, b]) => vec![b, a],
        (Opcode::Add, &[a, b]) => vec![int(a.as_int().wrapping_add(b.as_int()))],
        (Opcode::Sub, &[a, b]) => vec![int(a.as_int().wrapping_sub(b.as_int()))],
        (Opcode::Mul, &[a, b]) => vec![int(a.as_int().wrapping_mul(b.as_int()))],
        (Opcode::Div, &[a, b]) => vec![int(checked(a, b, i64::wrapping_div))],
        (Opcode::Mod, &[a, b]) => vec![int(checked(a, b, i64::wrapping_rem))],
        (Opcode::Not, &[a]) => vec![int(i64::from(!a.is_truthy()))],
        (Opcode::Greater, &[a, b]) => vec![int(i64::from(a.as_int() > b.as_int()))],
        (Opcode::Load, _) => {
            let value = match grid.literal_slot(landing.at).map(|slot| grid.get(slot)) {
                Some(Cell::Literal(v)) => *v,
                _ => Value::default(),
            };
            vec![value]
        }
        (Opcode::Store, &[a]) => {
            if let Some(slot) = grid.literal_slot(landing.at) {
                out.writes.push(CellWrite::literal(slot, a));
            }
            Vec::new()
        }
        (Opcode::Branch, &[a]) => {
            branch_on = a.is_truthy();
            Vec::new()
        }
        _ => Vec::new(),
    };
    if let Some(stack) = stack {
        for value in pushed {
            stack.push(value);
        }
    }

    let h = landing.heading;
    let exits = match spec.policy {
        SignalPolicy::Straight => vec![h],
        SignalPolicy::Branch if branch_on => vec![h.turn_left()],
        SignalPolicy::Branch => vec![h.turn_right()],
        SignalPolicy::Fork => Direction::ALL
            .into_iter()
            .filter(|d| *d != h.opposite())
            .collect(),
        SignalPolicy::Terminate => Vec::new(),
    };
    Some(exits)
}

#[inline]
const fn int(n: i64) -> Value {
    Value::Int(n)
}

/// Applies `op` unless the divisor is zero, which yields 0.
fn checked(a: Value, b: Value, op: fn(i64, i64) -> i64) -> i64 {
    match b.as_int() {
        0 => 0,
        d => op(a.as_int(), d),
    }
}
