//! End-to-end scenarios.
//!
//! Each test builds a small program from a symbol layout, runs it to
//! completion and checks the committed grid, stacks and diagnostics.

use stackline::prelude::*;
use stackline::{Absorption, EngineError, Stack, TickReport};

fn build(rows: &[&str]) -> Grid {
    GridBuilder::from_rows(rows).build().unwrap()
}

fn stack_at(engine: &Engine, row: usize, col: usize) -> Vec<Value> {
    engine
        .stacks()
        .get(Coordinate::new(row, col))
        .map(|s| s.as_slice().to_vec())
        .unwrap_or_default()
}

// =============================================================================
// Reference programs
// =============================================================================

#[test]
fn test_head_walks_off_into_empty() {
    let mut engine = Engine::new(build(&[">--- "]), EngineConfig::default());
    let mut ticks = 0;
    loop {
        let out = engine.step();
        assert!(engine.stacks().is_empty());
        ticks += 1;
        if !out.is_live() {
            assert_eq!(out.status, TickStatus::Halted(HaltReason::Quiescent));
            break;
        }
        assert!(ticks < 10, "run did not settle");
    }
    assert_eq!(engine.tick(), 4);
    assert_eq!(engine.grid().to_layout(), "---~ \n");
}

#[test]
fn test_push_push_add() {
    let mut engine = Engine::new(build(&["$>5-3-A"]), EngineConfig::default());

    // Landings on 5, 3 and A happen at ticks 1, 2 and 3.
    engine.step();
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(5)]);
    engine.step();
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(5), Value::Int(3)]);
    let out = engine.step();
    assert_eq!(out.report.landings, 1);
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(8)]);

    assert_eq!(
        engine.run(Some(100)),
        TerminalOutcome::Completed {
            tick: 3,
            reason: HaltReason::Quiescent,
        }
    );
    assert_eq!(engine.diagnostics().underflows, 0);
}

#[test]
fn test_char_values_use_scalar_value() {
    let grid = GridBuilder::from_rows(&["$>P-1-A"])
        .set((0, 2), Instruction::push(Value::Char('A')))
        .build()
        .unwrap();
    let mut engine = Engine::new(grid, EngineConfig::default());
    assert!(engine.run(Some(20)).is_completed());
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(66)]);
}

// =============================================================================
// Wire propagation
// =============================================================================

#[test]
fn test_wire_propagation() {
    const L: usize = 12;
    let layout = format!(">{}", "-".repeat(L));
    let mut engine = Engine::new(build(&[&layout]), EngineConfig::default());

    for t in 1..=L {
        engine.step();
        let grid = engine.grid();
        assert_eq!(grid.get(Coordinate::new(0, t)), &Cell::head(Direction::Right));
        assert_eq!(
            grid.get(Coordinate::new(0, t - 1)),
            &Cell::SignalTail(Conductor::HORIZONTAL)
        );
        assert_eq!(grid.head_count(), 1);
    }

    let out = engine.step();
    assert_eq!(out.status, TickStatus::Halted(HaltReason::Quiescent));
    assert_eq!(engine.tick(), L as u64 + 1);
    let expected = format!("{}~\n", "-".repeat(L));
    assert_eq!(engine.grid().to_layout(), expected);
}

#[test]
fn test_toroidal_ring_runs_until_budget() {
    let grid = GridBuilder::from_rows(&[">-----"])
        .wrap(WrapMode::Toroidal)
        .build()
        .unwrap();
    let mut engine = Engine::new(grid, EngineConfig::default());
    assert_eq!(engine.run(Some(50)), TerminalOutcome::BudgetExceeded { tick: 50 });
    assert_eq!(engine.grid().head_count(), 1);
}

#[test]
fn test_barrier_blocks_signal() {
    let mut engine = Engine::new(build(&[">-#-"]), EngineConfig::default());
    assert!(engine.run(Some(10)).is_completed());
    assert_eq!(engine.tick(), 2);
    assert_eq!(engine.grid().get(Coordinate::new(0, 3)), &Cell::WIRE);
}

#[test]
fn test_crossing_wires_stay_apart() {
    // The vertical wires touch the horizontal one but never pick up its head.
    let mut engine = Engine::new(build(&[" | ", ">--", " | "]), EngineConfig::default());
    loop {
        let out = engine.step();
        assert!(out.report.heads <= 1);
        if !out.is_live() {
            break;
        }
    }
    assert_eq!(engine.tick(), 3);
    assert_eq!(engine.grid().to_layout(), " | \n--~\n | \n");
}

#[test]
fn test_diode_conducts_one_way() {
    let mut forward = Engine::new(build(&[">▶-"]), EngineConfig::default());
    forward.step();
    assert_eq!(
        forward.grid().get(Coordinate::new(0, 1)),
        &Cell::SignalHead(Direction::Right, Conductor::Diode(Direction::Right))
    );
    forward.step();
    assert_eq!(forward.grid().get(Coordinate::new(0, 2)), &Cell::head(Direction::Right));

    let mut backward = Engine::new(build(&["-▶-<"]), EngineConfig::default());
    assert_eq!(
        backward.run(Some(10)),
        TerminalOutcome::Completed {
            tick: 2,
            reason: HaltReason::Quiescent,
        }
    );
    assert_eq!(
        backward.grid().get(Coordinate::new(0, 1)),
        &Cell::Conductor(Conductor::Diode(Direction::Right))
    );
    assert_eq!(backward.grid().get(Coordinate::new(0, 0)), &Cell::WIRE);
}

#[test]
fn test_diode_turns_signal() {
    let mut engine = Engine::new(build(&[">▼", " |"]), EngineConfig::default());
    engine.step();
    engine.step();
    assert_eq!(engine.grid().get(Coordinate::new(1, 1)), &Cell::head(Direction::Down));
}

#[test]
fn test_resistor_delays_one_tick() {
    let mut wire = Engine::new(build(&[">--"]), EngineConfig::default());
    assert_eq!(wire.run(Some(10)).tick(), 3);

    let mut resistor = Engine::new(build(&[">→-"]), EngineConfig::default());
    resistor.step();
    let out = resistor.step();
    assert!(out.is_live());
    assert_eq!(
        resistor.grid().get(Coordinate::new(0, 1)),
        &Cell::Charged(Direction::Right)
    );
    assert_eq!(resistor.grid().get(Coordinate::new(0, 2)), &Cell::WIRE);
    resistor.step();
    assert_eq!(resistor.grid().get(Coordinate::new(0, 2)), &Cell::head(Direction::Right));
    assert_eq!(
        resistor.run(Some(10)),
        TerminalOutcome::Completed {
            tick: 4,
            reason: HaltReason::Quiescent,
        }
    );
}

// =============================================================================
// Conflict resolution
// =============================================================================

#[test]
fn test_lower_source_wins_contested_cell() {
    // (0, 1) and (1, 0) both target the wire at (1, 1); (0, 1) is lower.
    let mut engine = Engine::new(build(&[" v", ">+"]), EngineConfig::default());
    let out = engine.step();

    assert_eq!(
        engine.grid().get(Coordinate::new(1, 1)),
        &Cell::SignalHead(Direction::Down, Conductor::JUNCTION)
    );
    assert_eq!(out.report.absorptions.len(), 1);
    let absorbed = out.report.absorptions[0];
    assert_eq!(absorbed.target, Coordinate::new(1, 1));
    assert_eq!(absorbed.source, Coordinate::new(1, 0));
    assert_eq!(absorbed.winner, Some(Coordinate::new(0, 1)));
    assert_eq!(engine.diagnostics().absorptions, 1);
}

#[test]
fn test_one_or_two_overload_absorbs_all() {
    let rows = [" v ", ">+<"];
    let config = EngineConfig::default().with_excitation(ExcitationRule::OneOrTwo);
    let mut engine = Engine::new(build(&rows), config);
    let out = engine.step();
    assert_eq!(
        engine.grid().get(Coordinate::new(1, 1)),
        &Cell::Conductor(Conductor::JUNCTION)
    );
    assert_eq!(out.report.absorptions.len(), 3);
    assert!(out.report.absorptions.iter().all(|a| a.winner.is_none()));

    let mut exact = Engine::new(build(&rows), EngineConfig::default());
    let out = exact.step();
    assert_eq!(
        exact.grid().get(Coordinate::new(1, 1)),
        &Cell::SignalHead(Direction::Down, Conductor::JUNCTION)
    );
    assert_eq!(out.report.absorptions.len(), 2);
}

#[test]
fn test_one_or_two_allows_pair() {
    let config = EngineConfig::default().with_excitation(ExcitationRule::OneOrTwo);
    let mut engine = Engine::new(build(&[" v", ">+"]), config);
    let out = engine.step();
    assert_eq!(
        engine.grid().get(Coordinate::new(1, 1)),
        &Cell::SignalHead(Direction::Down, Conductor::JUNCTION)
    );
    assert_eq!(out.report.absorptions.len(), 1);
}

#[test]
fn test_contested_instruction_lands_once() {
    // Heads from the left and from below both reach the push at (0, 2).
    let mut engine = Engine::new(build(&["$>1", "  ^"]), EngineConfig::default());
    let out = engine.step();
    assert_eq!(out.report.landings, 1);
    assert_eq!(out.report.absorptions.len(), 1);
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(1)]);
}

#[test]
fn test_instruction_emission_beats_later_head() {
    // The push at (1, 1) emits down into the junction at (2, 1) in the same
    // tick the head at (2, 2) moves left into it.
    let mut engine = Engine::new(build(&[" v  ", "$1  ", " +< "]), EngineConfig::default());
    let out = engine.step();
    assert_eq!(out.report.landings, 1);
    assert_eq!(
        engine.grid().get(Coordinate::new(2, 1)),
        &Cell::SignalHead(Direction::Down, Conductor::JUNCTION)
    );
    assert_eq!(
        out.report.absorptions,
        vec![Absorption {
            tick: 1,
            target: Coordinate::new(2, 1),
            source: Coordinate::new(2, 2),
            winner: Some(Coordinate::new(1, 1)),
        }]
    );
    assert_eq!(stack_at(&engine, 1, 0), vec![Value::Int(1)]);
}

#[test]
fn test_earlier_head_beats_instruction_emission() {
    // The head at (0, 1) and the push at (1, 2) both feed the junction at
    // (1, 1); the head comes first in row-major order.
    let mut engine = Engine::new(build(&[" v$ ", " +1<"]), EngineConfig::default());
    let out = engine.step();
    assert_eq!(out.report.landings, 1);
    assert_eq!(
        engine.grid().get(Coordinate::new(1, 1)),
        &Cell::SignalHead(Direction::Down, Conductor::JUNCTION)
    );
    assert_eq!(
        out.report.absorptions,
        vec![Absorption {
            tick: 1,
            target: Coordinate::new(1, 1),
            source: Coordinate::new(1, 2),
            winner: Some(Coordinate::new(0, 1)),
        }]
    );
    assert_eq!(engine.diagnostics().absorptions, 1);
}

// =============================================================================
// Stack underflow
// =============================================================================

#[test]
fn test_underflow_substitutes_default() {
    let mut engine = Engine::new(build(&["$>A-"]), EngineConfig::default());
    let out = engine.step();
    assert_eq!(out.report.underflows.len(), 1);
    assert_eq!(out.report.underflows[0].missing, 2);
    assert!(!out.report.underflows[0].destroyed);
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(0)]);
    assert_eq!(engine.grid().get(Coordinate::new(0, 3)), &Cell::head(Direction::Right));
}

#[test]
fn test_underflow_destroys_signal() {
    let config = EngineConfig::default().with_underflow(UnderflowPolicy::DestroySignal);
    let mut engine = Engine::new(build(&["$>A-"]), config);
    assert_eq!(
        engine.run(None),
        TerminalOutcome::Completed {
            tick: 1,
            reason: HaltReason::Quiescent,
        }
    );
    assert!(stack_at(&engine, 0, 0).is_empty());
    assert_eq!(engine.diagnostics().underflows, 1);
}

// =============================================================================
// Control flow
// =============================================================================

fn branch_engine(top: i64) -> Engine {
    let grid = build(&["$  | ", " >-?-", "   | "]);
    let mut state = RunState::new(grid);
    let seed: Stack = [Value::Int(top)].into_iter().collect();
    state.stacks.insert(Coordinate::new(0, 0), seed);
    Engine::resume(state, EngineConfig::default()).unwrap()
}

#[test]
fn test_branch_turns_left_on_nonzero() {
    let mut engine = branch_engine(4);
    engine.step();
    engine.step();
    assert_eq!(engine.grid().get(Coordinate::new(0, 3)), &Cell::head(Direction::Up));
    assert_eq!(
        engine.grid().get(Coordinate::new(2, 3)),
        &Cell::Conductor(Conductor::VERTICAL)
    );
    assert!(stack_at(&engine, 0, 0).is_empty());
}

#[test]
fn test_branch_turns_right_on_zero() {
    let mut engine = branch_engine(0);
    engine.step();
    engine.step();
    assert_eq!(engine.grid().get(Coordinate::new(2, 3)), &Cell::head(Direction::Down));
    assert_eq!(
        engine.grid().get(Coordinate::new(0, 3)),
        &Cell::Conductor(Conductor::VERTICAL)
    );
}

#[test]
fn test_fork_emits_three_heads() {
    let mut engine = Engine::new(build(&["  | ", ">-Y-", "  | "]), EngineConfig::default());
    engine.step();
    let out = engine.step();
    assert_eq!(out.report.landings, 1);
    assert_eq!(out.report.heads, 3);
}

#[test]
fn test_sink_consumes_signal() {
    let mut engine = Engine::new(build(&[">O-"]), EngineConfig::default());
    let out = engine.step();
    assert_eq!(out.status, TickStatus::Halted(HaltReason::Quiescent));
    assert_eq!(engine.grid().get(Coordinate::new(0, 2)), &Cell::WIRE);
}

#[test]
fn test_halt_wins_over_live_heads() {
    let mut engine = Engine::new(build(&[">H  ", ">---"]), EngineConfig::default());
    assert_eq!(
        engine.run(None),
        TerminalOutcome::Completed {
            tick: 1,
            reason: HaltReason::Halted,
        }
    );
    assert_eq!(engine.grid().head_count(), 1);
    assert_eq!(engine.phase(), stackline::Phase::Halted(HaltReason::Halted));
}

#[test]
fn test_store_then_load() {
    // Down the right-hand side and back left into the load.
    let grid = build(&["$>7-K+", "    \"|", "   -L+"]);
    let mut engine = Engine::new(grid, EngineConfig::default());
    assert_eq!(
        engine.run(Some(50)),
        TerminalOutcome::Completed {
            tick: 6,
            reason: HaltReason::Quiescent,
        }
    );
    assert_eq!(
        engine.grid().get(Coordinate::new(1, 4)),
        &Cell::Literal(Value::Int(7))
    );
    assert_eq!(stack_at(&engine, 0, 0), vec![Value::Int(7)]);
}

#[test]
fn test_explicit_anchor_wiring() {
    // The push sits next to anchor 0 but is wired to anchor 1.
    let grid = GridBuilder::from_rows(&["$>P-$"])
        .set((0, 2), Instruction::push(Value::Int(9)).wired_to(1))
        .build()
        .unwrap();
    let mut engine = Engine::new(grid, EngineConfig::default());
    engine.run(Some(10));
    assert!(stack_at(&engine, 0, 0).is_empty());
    assert_eq!(stack_at(&engine, 0, 4), vec![Value::Int(9)]);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_resume_matches_uninterrupted_run() {
    let rows = ["$>5-3-A-C-M-", "            "];
    let mut full = Engine::new(build(&rows), EngineConfig::default());
    let expected = full.run(Some(100));

    let mut first = Engine::new(build(&rows), EngineConfig::default());
    first.step();
    first.step();
    let json = serde_json::to_string(&first.snapshot()).unwrap();

    let state: RunState = serde_json::from_str(&json).unwrap();
    assert_eq!(state.tick, 2);
    let mut resumed = Engine::resume(state, EngineConfig::default()).unwrap();
    assert_eq!(resumed.run(Some(100)), expected);
    assert_eq!(resumed.snapshot(), full.snapshot());
    assert_eq!(stack_at(&resumed, 0, 0), vec![Value::Int(64)]);
}

#[test]
fn test_resume_rejects_orphan_stack() {
    let mut state = RunState::new(build(&["$>-"]));
    state.stacks.insert(Coordinate::new(0, 2), Stack::new());
    assert_eq!(
        Engine::resume(state, EngineConfig::default()).unwrap_err(),
        EngineError::OrphanStack(Coordinate::new(0, 2))
    );
}

#[test]
fn test_invalid_grid_reports_coordinate() {
    let err = GridBuilder::from_rows(&["-->A"]).build().unwrap_err();
    assert_eq!(err.at, Coordinate::new(0, 3));
    assert_eq!(
        err.to_string(),
        "invalid grid at 0:3: Add needs a stack but the grid has no stack anchor"
    );
}

#[test]
fn test_halted_step_reports_nothing_new() {
    let mut engine = Engine::new(build(&[">"]), EngineConfig::default());
    engine.run(None);
    let out = engine.step();
    assert_eq!(
        out.report,
        TickReport {
            tick: 1,
            ..TickReport::default()
        }
    );
}
