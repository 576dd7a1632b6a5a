//! `stackline` - runs a Stackline grid and reports how it ended.
//!
//! **Usage:**
//! ```text
//! stackline run --layout program.sl [--max-ticks N] [--save state.json]
//! stackline run --state state.json [--config engine.toml]
//! stackline check --layout program.sl
//! ```
//!
//! Exits 0 when the run completes, 2 when it stops on the tick budget and
//! 1 on any error.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stackline::{
    Engine, EngineConfig, ExcitationRule, GridBuilder, RunState, TerminalOutcome, TickStatus,
    UnderflowPolicy, Value, WrapMode,
};
use tracing_subscriber::EnvFilter;

/// Run Stackline programs.
#[derive(Parser)]
#[command(name = "stackline", version, about = "Run Stackline grids")]
struct Cli {
    /// Log more (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a grid until it halts, goes quiet, or hits the tick budget.
    Run(RunArgs),
    /// Parse and validate a layout without running it.
    Check(SourceArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Text layout to start from.
    #[arg(long, conflicts_with = "state", required_unless_present = "state")]
    layout: Option<PathBuf>,

    /// JSON run state saved by `--save`.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Edge behaviour for `--layout` grids; a saved state keeps its own.
    #[arg(long, value_enum, default_value_t = Wrap::Bounded, conflicts_with = "state")]
    wrap: Wrap,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// TOML engine configuration. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute tick limit.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Excitation rule.
    #[arg(long, value_enum)]
    rule: Option<Rule>,

    /// Substitute this integer for missing operands.
    #[arg(long, conflicts_with = "destroy_on_underflow", allow_hyphen_values = true)]
    underflow_default: Option<i64>,

    /// Drop the signal instead of substituting missing operands.
    #[arg(long)]
    destroy_on_underflow: bool,

    /// Write the final run state as JSON.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print a one-line summary after every tick.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Wrap {
    Bounded,
    Toroidal,
}

impl From<Wrap> for WrapMode {
    fn from(wrap: Wrap) -> Self {
        match wrap {
            Wrap::Bounded => WrapMode::Bounded,
            Wrap::Toroidal => WrapMode::Toroidal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Rule {
    ExactlyOne,
    OneOrTwo,
}

impl From<Rule> for ExcitationRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::ExactlyOne => ExcitationRule::ExactlyOne,
            Rule::OneOrTwo => ExcitationRule::OneOrTwo,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Command::Run(args) => run(&args),
        Command::Check(args) => check(&args).map(|()| 0),
    };
    match code {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_state(source: &SourceArgs) -> Result<RunState> {
    match (&source.layout, &source.state) {
        (Some(path), _) => {
            let text = read(path)?;
            let grid = GridBuilder::from_layout(&text)
                .wrap(source.wrap.into())
                .build()
                .with_context(|| format!("invalid layout in {}", path.display()))?;
            Ok(RunState::new(grid))
        }
        (None, Some(path)) => {
            let text = read(path)?;
            let state: RunState = serde_json::from_str(&text)
                .with_context(|| format!("invalid run state in {}", path.display()))?;
            state
                .validate()
                .with_context(|| format!("inconsistent run state in {}", path.display()))?;
            Ok(state)
        }
        (None, None) => bail!("one of --layout or --state is required"),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => toml::from_str(&read(path)?)
            .with_context(|| format!("invalid engine config in {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(rule) = args.rule {
        config.excitation = rule.into();
    }
    if let Some(n) = args.underflow_default {
        config.underflow = UnderflowPolicy::Substitute(Value::Int(n));
    }
    if args.destroy_on_underflow {
        config.underflow = UnderflowPolicy::DestroySignal;
    }
    if args.max_ticks.is_some() {
        config.max_ticks = args.max_ticks;
    }
    Ok(config)
}

fn check(args: &SourceArgs) -> Result<()> {
    let state = load_state(args)?;
    let (rows, cols) = state.grid.dimensions();
    println!(
        "ok: {rows}x{cols}, {} anchors, {} signal heads",
        state.stacks.len(),
        state.grid.head_count()
    );
    Ok(())
}

fn run(args: &RunArgs) -> Result<i32> {
    let state = load_state(&args.source)?;
    let config = load_config(args)?;
    let mut engine = Engine::resume(state, config)?;

    let outcome = if args.trace {
        trace(&mut engine)
    } else {
        engine.run(None)
    };

    report(&engine, &outcome);

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&engine.snapshot())?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(match outcome {
        TerminalOutcome::Completed { .. } => 0,
        TerminalOutcome::BudgetExceeded { .. } | TerminalOutcome::Aborted { .. } => 2,
    })
}

/// Steps until the run stops, printing a summary line per tick.
fn trace(engine: &mut Engine) -> TerminalOutcome {
    loop {
        let step = engine.step();
        println!(
            "tick {:>6}  heads {:>4}  landings {:>3}  absorbed {:>3}  underflows {:>3}",
            step.tick,
            step.report.heads,
            step.report.landings,
            step.report.absorptions.len(),
            step.report.underflows.len()
        );
        if step.is_live() {
            continue;
        }
        return match step.status {
            TickStatus::Halted(reason) => TerminalOutcome::Completed {
                tick: step.tick,
                reason,
            },
            TickStatus::Running | TickStatus::BudgetExceeded => {
                TerminalOutcome::BudgetExceeded { tick: step.tick }
            }
        };
    }
}

fn report(engine: &Engine, outcome: &TerminalOutcome) {
    let diag = engine.diagnostics();
    println!("{outcome}");
    println!(
        "ticks: {}  landings: {}  absorptions: {}  underflows: {}",
        diag.ticks, diag.landings, diag.absorptions, diag.underflows
    );
    for (anchor, stack) in engine.stacks().iter() {
        let values: Vec<String> = stack.iter().map(ToString::to_string).collect();
        println!("stack {anchor}: [{}]", values.join(", "));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use stackline::HaltReason;

    #[test]
    fn test_wrap_conflicts_with_state() {
        let parsed = Cli::try_parse_from([
            "stackline", "run", "--state", "s.json", "--wrap", "toroidal",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["stackline", "run", "--state", "s.json"]);
        assert!(parsed.is_ok());
        let parsed =
            Cli::try_parse_from(["stackline", "check", "--layout", "p.sl", "--wrap", "toroidal"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_trace_stops_at_budget() {
        let grid = GridBuilder::from_rows(&[">-----"])
            .wrap(WrapMode::Toroidal)
            .build()
            .unwrap();
        let mut engine = Engine::new(grid, EngineConfig::default().with_max_ticks(3));
        assert_eq!(trace(&mut engine), TerminalOutcome::BudgetExceeded { tick: 3 });
        assert_eq!(engine.tick(), 3);
        assert_eq!(trace(&mut engine), TerminalOutcome::BudgetExceeded { tick: 3 });
    }

    #[test]
    fn test_trace_reports_halt() {
        let grid = GridBuilder::from_rows(&[">H--"]).build().unwrap();
        let mut engine = Engine::new(grid, EngineConfig::default());
        assert_eq!(
            trace(&mut engine),
            TerminalOutcome::Completed {
                tick: 1,
                reason: HaltReason::Halted,
            }
        );
    }
}
