//! Cell model: the atomic unit of grid state.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::conductor::{Conductor, Orientation};
use super::coord::Direction;
use crate::registry::{Opcode, Registry};

/// Identifier of a stack anchor, unique per grid.
pub type AnchorId = u32;

/// The single value type of the language.
///
/// Arithmetic works on [`Value::as_int`]; characters take their Unicode
/// scalar value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Signed 64-bit integer.
    Int(i64),
    /// Unicode scalar value.
    Char(char),
}

impl Value {
    /// Integer view of the value.
    #[inline]
    #[must_use]
    pub const fn as_int(self) -> i64 {
        match self {
            Value::Int(n) => n,
            Value::Char(c) => c as i64,
        }
    }

    /// Truthiness as used by [`Opcode::Branch`] and [`Opcode::Not`].
    #[inline]
    #[must_use]
    pub const fn is_truthy(self) -> bool {
        self.as_int() != 0
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<char> for Value {
    #[inline]
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{c:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Payload of an instruction cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Instruction {
    /// The opcode executed on landing.
    pub opcode: Opcode,
    /// Immediate operand, required by [`Opcode::Push`] and rejected elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Value>,
    /// Explicitly wired stack anchor; `None` binds the nearest anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorId>,
}

impl Instruction {
    /// Instruction without operand or explicit anchor.
    #[inline]
    #[must_use]
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: None,
            anchor: None,
        }
    }

    /// `Push` of `value`.
    #[inline]
    #[must_use]
    pub const fn push(value: Value) -> Self {
        Self {
            opcode: Opcode::Push,
            operand: Some(value),
            anchor: None,
        }
    }

    /// Wires the instruction to the anchor with id `anchor`.
    #[inline]
    #[must_use]
    pub const fn wired_to(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// One grid cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Nothing; never carries a signal.
    #[default]
    Empty,
    /// An idle wire, diode or resistor.
    Conductor(Conductor),
    /// Front of a signal, travelling in the given direction along the
    /// conductor it occupies.
    SignalHead(Direction, Conductor),
    /// Back of a signal; decays to the idle conductor.
    SignalTail(Conductor),
    /// A resistor holding a signal for its second tick; releases it in the
    /// resistor's direction. Counts as a live signal.
    Charged(Direction),
    /// Instruction fired when a signal lands on it.
    Instruction(Instruction),
    /// A value readable and writable by `Load`/`Store`.
    Literal(Value),
    /// Owner of one stack.
    StackAnchor(AnchorId),
    /// Blocks everything; also what bounded grids read outside their edges.
    Barrier,
}

impl Cell {
    /// An idle horizontal wire, `-`.
    pub const WIRE: Cell = Cell::Conductor(Conductor::HORIZONTAL);

    /// Head on the wire a layout arrow stands for: horizontal for `<` `>`,
    /// vertical for `^` `v`.
    #[inline]
    #[must_use]
    pub const fn head(heading: Direction) -> Self {
        Cell::SignalHead(heading, Conductor::Wire(Orientation::along(heading)))
    }

    /// Whether the cell carries a signal: head, tail or charged resistor.
    #[inline]
    #[must_use]
    pub const fn is_signal(&self) -> bool {
        matches!(
            self,
            Cell::SignalHead(..) | Cell::SignalTail(_) | Cell::Charged(_)
        )
    }

    /// Whether the cell keeps a run alive: a head or a charged resistor.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Cell::SignalHead(..) | Cell::Charged(_))
    }

    /// Heading, if the cell is a signal head.
    #[inline]
    #[must_use]
    pub const fn heading(&self) -> Option<Direction> {
        match self {
            Cell::SignalHead(dir, _) => Some(*dir),
            _ => None,
        }
    }

    /// The conductor under the cell's signal state, if any.
    #[inline]
    #[must_use]
    pub const fn conductor(&self) -> Option<Conductor> {
        match *self {
            Cell::Conductor(c) | Cell::SignalHead(_, c) | Cell::SignalTail(c) => Some(c),
            Cell::Charged(dir) => Some(Conductor::Resistor(dir)),
            _ => None,
        }
    }

    /// Whether a signal moving in `moving` may enter the cell: idle
    /// conductors that accept that direction, and instructions.
    #[inline]
    #[must_use]
    pub const fn accepts_signal(&self, moving: Direction) -> bool {
        match self {
            Cell::Conductor(c) => c.accepts(moving),
            Cell::Instruction(_) => true,
            _ => false,
        }
    }

    /// Whether the cell sends a signal out in direction `out` this tick.
    #[inline]
    #[must_use]
    pub const fn emits(&self, out: Direction) -> bool {
        match *self {
            Cell::SignalHead(heading, c) => c.passes(heading, out),
            Cell::Charged(dir) => dir as u8 == out as u8,
            _ => false,
        }
    }

    /// Layout symbol for this cell.
    ///
    /// Push instructions with a single-digit integer operand render as the
    /// digit. Literal values, other operands, explicit anchor wiring and the
    /// conductor under a signal have no symbol of their own.
    #[must_use]
    pub fn symbol(&self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Conductor(c) => c.symbol(),
            Cell::SignalHead(dir, _) => dir.arrow(),
            Cell::SignalTail(_) => '~',
            Cell::Charged(_) => '*',
            Cell::Instruction(Instruction {
                opcode: Opcode::Push,
                operand: Some(Value::Int(n @ 0..=9)),
                ..
            }) => char::from_digit(*n as u32, 10).unwrap_or('P'),
            Cell::Instruction(instr) => Registry::global().spec(instr.opcode).symbol,
            Cell::Literal(_) => '"',
            Cell::StackAnchor(_) => '$',
            Cell::Barrier => '#',
        }
    }
}

impl From<Conductor> for Cell {
    #[inline]
    fn from(conductor: Conductor) -> Self {
        Cell::Conductor(conductor)
    }
}

impl From<Instruction> for Cell {
    #[inline]
    fn from(instr: Instruction) -> Self {
        Cell::Instruction(instr)
    }
}

impl From<Opcode> for Cell {
    #[inline]
    fn from(opcode: Opcode) -> Self {
        Cell::Instruction(Instruction::new(opcode))
    }
}
