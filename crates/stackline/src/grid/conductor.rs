//! Conductors: the cells a signal travels through.
//!
//! | Conductor            | Symbols           | Accepts a signal moving | Passes it on            |
//! |----------------------|-------------------|-------------------------|-------------------------|
//! | `Wire(Horizontal)`   | `-`               | left or right           | along the wire          |
//! | `Wire(Vertical)`     | `\|`              | up or down              | along the wire          |
//! | `Wire(Any)`          | `+`               | any way                 | every way but back      |
//! | `Diode(d)`           | `▲` `▶` `▼` `◀`   | any way but against `d` | towards `d` only        |
//! | `Resistor(d)`        | `↑` `→` `↓` `←`   | any way                 | towards `d`, a tick late |

use serde::{Deserialize, Serialize};

use super::coord::Direction;

/// Axis a wire conducts along.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
    /// A junction.
    #[default]
    Any,
}

impl Orientation {
    /// Directions along the orientation, in [`Direction::ALL`] order.
    #[inline]
    #[must_use]
    pub const fn directions(self) -> &'static [Direction] {
        match self {
            Orientation::Horizontal => &[Direction::Right, Direction::Left],
            Orientation::Vertical => &[Direction::Up, Direction::Down],
            Orientation::Any => &Direction::ALL,
        }
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, dir: Direction) -> bool {
        match self {
            Orientation::Horizontal => matches!(dir, Direction::Left | Direction::Right),
            Orientation::Vertical => matches!(dir, Direction::Up | Direction::Down),
            Orientation::Any => true,
        }
    }

    /// The wire axis a signal heading `dir` runs along.
    #[inline]
    #[must_use]
    pub const fn along(dir: Direction) -> Self {
        match dir {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }
}

/// A cell kind that carries signals.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Conductor {
    Wire(Orientation),
    /// One-way wire pointing in the given direction.
    Diode(Direction),
    /// Holds a signal for one extra tick, then releases it in the given
    /// direction.
    Resistor(Direction),
}

impl Conductor {
    pub const HORIZONTAL: Conductor = Conductor::Wire(Orientation::Horizontal);
    pub const VERTICAL: Conductor = Conductor::Wire(Orientation::Vertical);
    pub const JUNCTION: Conductor = Conductor::Wire(Orientation::Any);

    /// Whether a signal moving in `moving` may enter.
    #[inline]
    #[must_use]
    pub const fn accepts(self, moving: Direction) -> bool {
        match self {
            Conductor::Wire(orientation) => orientation.contains(moving),
            Conductor::Diode(dir) => !matches_dir(moving, dir.opposite()),
            Conductor::Resistor(_) => true,
        }
    }

    /// Whether a head on this conductor, travelling `heading`, leaves it in
    /// direction `out` on the next tick.
    ///
    /// Heads on a resistor never leave directly; the resistor charges first
    /// (see [`super::Cell::Charged`]).
    #[inline]
    #[must_use]
    pub const fn passes(self, heading: Direction, out: Direction) -> bool {
        match self {
            Conductor::Wire(orientation) => {
                orientation.contains(out) && !matches_dir(out, heading.opposite())
            }
            Conductor::Diode(dir) => matches_dir(out, dir),
            Conductor::Resistor(_) => false,
        }
    }

    /// Layout symbol of the idle conductor.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Conductor::Wire(Orientation::Horizontal) => '-',
            Conductor::Wire(Orientation::Vertical) => '|',
            Conductor::Wire(Orientation::Any) => '+',
            Conductor::Diode(Direction::Up) => '▲',
            Conductor::Diode(Direction::Right) => '▶',
            Conductor::Diode(Direction::Down) => '▼',
            Conductor::Diode(Direction::Left) => '◀',
            Conductor::Resistor(Direction::Up) => '↑',
            Conductor::Resistor(Direction::Right) => '→',
            Conductor::Resistor(Direction::Down) => '↓',
            Conductor::Resistor(Direction::Left) => '←',
        }
    }

    /// Inverse of [`Conductor::symbol`].
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        let conductor = match symbol {
            '-' => Conductor::HORIZONTAL,
            '|' => Conductor::VERTICAL,
            '+' => Conductor::JUNCTION,
            '▲' => Conductor::Diode(Direction::Up),
            '▶' => Conductor::Diode(Direction::Right),
            '▼' => Conductor::Diode(Direction::Down),
            '◀' => Conductor::Diode(Direction::Left),
            '↑' => Conductor::Resistor(Direction::Up),
            '→' => Conductor::Resistor(Direction::Right),
            '↓' => Conductor::Resistor(Direction::Down),
            '←' => Conductor::Resistor(Direction::Left),
            _ => return None,
        };
        Some(conductor)
    }
}

impl Default for Conductor {
    fn default() -> Self {
        Conductor::JUNCTION
    }
}

// `Direction: PartialEq` is not const.
const fn matches_dir(a: Direction, b: Direction) -> bool {
    a as u8 == b as u8
}
