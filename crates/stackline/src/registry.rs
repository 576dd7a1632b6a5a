//! Instruction registry: the fixed opcode table.
//!
//! Maps every [`Opcode`] to its layout symbol, its declared stack arity and
//! the policy deciding where the signal goes after the instruction fires.
//! Built once per process and read-only afterwards.
//!
//! # Examples
//!
//! ```
//! use stackline::registry::{Opcode, Registry, SignalPolicy};
//!
//! let reg = Registry::global();
//! let add = reg.spec(Opcode::Add);
//! assert_eq!((add.pops, add.pushes), (2, 1));
//! assert_eq!(add.policy, SignalPolicy::Straight);
//! assert_eq!(reg.by_symbol('A').map(|s| s.opcode), Some(Opcode::Add));
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Number of opcodes in the instruction set.
pub const OPCODE_COUNT: usize = 18;

/// Instruction opcodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Opcode {
    /// Forward the signal, no stack effect.
    Pass,
    /// Push the instruction's immediate operand.
    Push,
    /// Discard the top value.
    Pop,
    /// Duplicate the top value.
    Dup,
    /// Exchange the two top values.
    Swap,
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`, 0 when `b == 0`
    Div,
    /// `a % b`, 0 when `b == 0`
    Mod,
    /// Logical not: 1 if `a == 0`, else 0.
    Not,
    /// 1 if `a > b`, else 0.
    Greater,
    /// Push the value of the adjacent literal cell.
    Load,
    /// Pop a value into the adjacent literal cell.
    Store,
    /// Pop a value and turn left (non-zero) or right (zero).
    Branch,
    /// Send the signal out of every side except the one it came from.
    Fork,
    /// Consume the signal.
    Sink,
    /// Consume the signal and halt the run.
    Halt,
}

impl Opcode {
    /// All opcodes in table order.
    pub const ALL: [Opcode; OPCODE_COUNT] = [
        Opcode::Pass,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Swap,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Not,
        Opcode::Greater,
        Opcode::Load,
        Opcode::Store,
        Opcode::Branch,
        Opcode::Fork,
        Opcode::Sink,
        Opcode::Halt,
    ];

    #[inline]
    const fn table_index(self) -> usize {
        self as usize
    }
}

/// What happens to a signal once its instruction has fired.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignalPolicy {
    /// Leave through the side opposite the entry.
    Straight,
    /// Pop a value; non-zero turns left, zero turns right.
    Branch,
    /// Leave through every side except the entry.
    Fork,
    /// No outgoing signal.
    Terminate,
}

/// Declarative description of one opcode.
#[derive(Clone, Copy, Debug)]
pub struct OpcodeSpec {
    /// The opcode described.
    pub opcode: Opcode,
    /// Layout symbol.
    pub symbol: char,
    /// Human-readable name.
    pub name: &'static str,
    /// Values consumed from the bound stack.
    pub pops: usize,
    /// Values produced onto the bound stack.
    pub pushes: usize,
    /// Whether the instruction requires an immediate operand.
    pub operand: bool,
    /// Whether the instruction reads or writes an adjacent literal cell.
    pub literal: bool,
    /// Outgoing-signal policy.
    pub policy: SignalPolicy,
    /// Whether a landing halts the whole run.
    pub halts: bool,
}

impl OpcodeSpec {
    const fn new(
        opcode: Opcode,
        symbol: char,
        name: &'static str,
        pops: usize,
        pushes: usize,
        policy: SignalPolicy,
    ) -> Self {
        Self {
            opcode,
            symbol,
            name,
            pops,
            pushes,
            operand: false,
            literal: false,
            policy,
            halts: false,
        }
    }

    const fn with_operand(mut self) -> Self {
        self.operand = true;
        self
    }

    const fn with_literal(mut self) -> Self {
        self.literal = true;
        self
    }

    const fn halting(mut self) -> Self {
        self.halts = true;
        self
    }

    /// Whether the instruction needs a bound stack.
    #[inline]
    #[must_use]
    pub const fn uses_stack(&self) -> bool {
        self.pops > 0 || self.pushes > 0
    }
}

/// The opcode table, indexed by [`Opcode`].
#[derive(Debug)]
pub struct Registry {
    specs: [OpcodeSpec; OPCODE_COUNT],
}

impl Registry {
    /// Builds the table.
    fn build() -> Self {
        use Opcode::*;
        use SignalPolicy::{Straight, Terminate};

        let specs = [
            OpcodeSpec::new(Pass, '=', "pass", 0, 0, Straight),
            OpcodeSpec::new(Push, 'P', "push", 0, 1, Straight).with_operand(),
            OpcodeSpec::new(Pop, 'X', "pop", 1, 0, Straight),
            OpcodeSpec::new(Dup, 'C', "dup", 1, 2, Straight),
            OpcodeSpec::new(Swap, 'W', "swap", 2, 2, Straight),
            OpcodeSpec::new(Add, 'A', "add", 2, 1, Straight),
            OpcodeSpec::new(Sub, 'S', "sub", 2, 1, Straight),
            OpcodeSpec::new(Mul, 'M', "mul", 2, 1, Straight),
            OpcodeSpec::new(Div, 'D', "div", 2, 1, Straight),
            OpcodeSpec::new(Mod, 'R', "mod", 2, 1, Straight),
            OpcodeSpec::new(Not, 'N', "not", 1, 1, Straight),
            OpcodeSpec::new(Greater, 'G', "greater", 2, 1, Straight),
            OpcodeSpec::new(Load, 'L', "load", 0, 1, Straight).with_literal(),
            OpcodeSpec::new(Store, 'K', "store", 1, 0, Straight).with_literal(),
            OpcodeSpec::new(Branch, '?', "branch", 1, 0, SignalPolicy::Branch),
            OpcodeSpec::new(Fork, 'Y', "fork", 0, 0, SignalPolicy::Fork),
            OpcodeSpec::new(Sink, 'O', "sink", 0, 0, Terminate),
            OpcodeSpec::new(Halt, 'H', "halt", 0, 0, Terminate).halting(),
        ];

        debug_assert!(specs
            .iter()
            .enumerate()
            .all(|(i, s)| s.opcode.table_index() == i));

        Self { specs }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Registry::build)
    }

    /// Spec for `opcode`.
    #[inline]
    #[must_use]
    pub fn spec(&self, opcode: Opcode) -> &OpcodeSpec {
        &self.specs[opcode.table_index()]
    }

    /// Reverse lookup by layout symbol.
    #[must_use]
    pub fn by_symbol(&self, symbol: char) -> Option<&OpcodeSpec> {
        self.specs.iter().find(|s| s.symbol == symbol)
    }

    /// Number of opcodes (always [`OPCODE_COUNT`]).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        OPCODE_COUNT
    }

    /// Always false.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all specs in table order.
    pub fn iter(&self) -> impl Iterator<Item = &OpcodeSpec> + '_ {
        self.specs.iter()
    }
}
