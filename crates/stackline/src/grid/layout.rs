//! Symbol layouts and the grid builder.
//!
//! | Symbol          | Cell                                      |
//! |-----------------|-------------------------------------------|
//! | `' '`           | `Empty`                                   |
//! | `-` `\|` `+`    | horizontal, vertical and junction wires   |
//! | `▲` `▶` `▼` `◀` | `Diode` pointing that way                 |
//! | `↑` `→` `↓` `←` | `Resistor` releasing that way             |
//! | `>` `<` `^` `v` | `SignalHead` on a wire along its heading  |
//! | `~`             | `SignalTail` on a junction                |
//! | `#`             | `Barrier`                                 |
//! | `$`             | `StackAnchor`, ids row-major from 0       |
//! | `"`             | `Literal(Int(0))`                         |
//! | `0`..=`9`       | `Push` of that digit                      |
//! | opcode symbol   | that instruction (see the registry)       |
//!
//! Rows shorter than the widest row are padded with `Empty`.

use super::cell::{AnchorId, Cell, Instruction, Value};
use super::conductor::Conductor;
use super::coord::{Coordinate, Direction};
use super::substrate::{Grid, WrapMode};
use crate::error::{InvalidGrid, InvalidGridReason};
use crate::registry::Registry;

/// Fluent construction of a validated [`Grid`].
///
/// Layout parsing and overrides never fail on their own; every problem is
/// reported by [`GridBuilder::build`].
///
/// # Example
///
/// ```
/// use stackline::{GridBuilder, Instruction, Value, WrapMode};
///
/// let grid = GridBuilder::from_rows(&["$>-P-"])
///     .set((0, 3), Instruction::push(Value::Char('a')))
///     .wrap(WrapMode::Toroidal)
///     .build()
///     .unwrap();
/// assert_eq!(grid.dimensions(), (1, 5));
/// ```
#[derive(Debug, Clone)]
pub struct GridBuilder {
    rows: usize,
    cols: usize,
    wrap: WrapMode,
    cells: Vec<Cell>,
    overrides: Vec<(Coordinate, Cell)>,
    error: Option<InvalidGrid>,
}

impl GridBuilder {
    /// An all-`Empty` grid of the given size.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            wrap: WrapMode::Bounded,
            cells: vec![Cell::Empty; rows.saturating_mul(cols)],
            overrides: Vec::new(),
            error: None,
        }
    }

    /// Parses one string per row.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let cols = rows
            .iter()
            .map(|r| r.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let mut builder = Self::new(rows.len(), cols);
        let mut next_anchor: AnchorId = 0;

        for (row, line) in rows.iter().enumerate() {
            for (col, symbol) in line.as_ref().chars().enumerate() {
                let at = Coordinate::new(row, col);
                match cell_for_symbol(symbol, &mut next_anchor) {
                    Some(cell) => builder.cells[at.index(cols)] = cell,
                    None => {
                        builder.fail(InvalidGrid::new(
                            at,
                            InvalidGridReason::UnknownSymbol(symbol),
                        ));
                    }
                }
            }
        }
        builder
    }

    /// Parses a multi-line layout, one line per row.
    pub fn from_layout(text: &str) -> Self {
        let rows: Vec<&str> = text.lines().collect();
        Self::from_rows(&rows)
    }

    /// Sets the edge behaviour.
    pub fn wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    /// Replaces the cell at `at`, after layout parsing.
    pub fn set(mut self, at: impl Into<Coordinate>, cell: impl Into<Cell>) -> Self {
        self.overrides.push((at.into(), cell.into()));
        self
    }

    /// Validates and builds the grid.
    ///
    /// # Errors
    ///
    /// The first layout error, an override outside the grid, or any
    /// [`Grid::new`] validation failure.
    pub fn build(self) -> Result<Grid, InvalidGrid> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut cells = self.cells;
        for (at, cell) in self.overrides {
            if at.row >= self.rows || at.col >= self.cols {
                return Err(InvalidGrid::new(at, InvalidGridReason::OutOfBounds));
            }
            cells[at.index(self.cols)] = cell;
        }
        Grid::new(self.rows, self.cols, self.wrap, cells)
    }

    fn fail(&mut self, err: InvalidGrid) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// The cell a layout symbol stands for; `$` takes the next anchor id.
pub fn cell_for_symbol(symbol: char, next_anchor: &mut AnchorId) -> Option<Cell> {
    let cell = match symbol {
        ' ' => Cell::Empty,
        '~' => Cell::SignalTail(Conductor::JUNCTION),
        '#' => Cell::Barrier,
        '"' => Cell::Literal(Value::Int(0)),
        '$' => {
            let id = *next_anchor;
            *next_anchor += 1;
            Cell::StackAnchor(id)
        }
        '0'..='9' => {
            let digit = symbol.to_digit(10)?;
            Cell::Instruction(Instruction::push(Value::Int(i64::from(digit))))
        }
        other => {
            if let Some(dir) = Direction::from_arrow(other) {
                Cell::head(dir)
            } else if let Some(conductor) = Conductor::from_symbol(other) {
                Cell::Conductor(conductor)
            } else {
                let spec = Registry::global().by_symbol(other)?;
                Cell::Instruction(Instruction::new(spec.opcode))
            }
        }
    };
    Some(cell)
}
