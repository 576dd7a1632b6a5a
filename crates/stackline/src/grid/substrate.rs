use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::binding::Bindings;
use super::cell::{AnchorId, Cell};
use super::coord::{Coordinate, Direction};
use super::mutation::CellWrite;
use crate::error::{InvalidGrid, InvalidGridReason};

static BARRIER: Cell = Cell::Barrier;

/// Edge behaviour, fixed when the grid is created.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum WrapMode {
    /// Reads beyond an edge see [`Cell::Barrier`].
    #[default]
    Bounded,
    /// Edges wrap around to the opposite side.
    Toroidal,
}

/// The bounded two-dimensional cell array.
///
/// Dimensions and wrap mode never change after construction; only cell
/// content does, and only through the engine's commit step.
///
/// # Example
///
/// ```
/// use stackline::{Cell, Coordinate, Grid, WrapMode};
///
/// let grid = Grid::new(1, 3, WrapMode::Bounded, vec![Cell::WIRE; 3]).unwrap();
/// assert_eq!(grid.dimensions(), (1, 3));
/// assert_eq!(grid.get(Coordinate::new(0, 7)), &Cell::Barrier);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "GridRepr", into = "GridRepr")]
pub struct Grid {
    rows: usize,
    cols: usize,
    wrap: WrapMode,
    cells: Vec<Cell>,
    bindings: Arc<Bindings>,
}

impl Grid {
    /// Validates `cells` (row-major, `rows * cols` long) and resolves every
    /// instruction binding.
    ///
    /// # Errors
    ///
    /// [`InvalidGrid`] with the offending coordinate when the shape is wrong,
    /// anchor ids collide, or an instruction cannot be bound.
    pub fn new(
        rows: usize,
        cols: usize,
        wrap: WrapMode,
        cells: Vec<Cell>,
    ) -> Result<Self, InvalidGrid> {
        let expected = rows
            .checked_mul(cols)
            .filter(|&n| n > 0)
            .ok_or_else(|| InvalidGrid::whole(InvalidGridReason::BadDimensions { rows, cols }))?;
        if cells.len() != expected {
            return Err(InvalidGrid::whole(InvalidGridReason::CellCount {
                expected,
                actual: cells.len(),
            }));
        }

        let mut grid = Self {
            rows,
            cols,
            wrap,
            cells,
            bindings: Arc::default(),
        };
        grid.bindings = Arc::new(Bindings::resolve(&grid)?);
        Ok(grid)
    }

    /// `(rows, cols)`.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Edge behaviour.
    #[inline]
    #[must_use]
    pub const fn wrap_mode(&self) -> WrapMode {
        self.wrap
    }

    /// Whether `at` lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, at: Coordinate) -> bool {
        at.row < self.rows && at.col < self.cols
    }

    /// Cell at `at`; out-of-bounds reads wrap or return [`Cell::Barrier`].
    #[inline]
    #[must_use]
    pub fn get(&self, at: Coordinate) -> &Cell {
        if self.in_bounds(at) {
            return &self.cells[at.index(self.cols)];
        }
        match self.wrap {
            WrapMode::Bounded => &BARRIER,
            WrapMode::Toroidal => {
                let wrapped = Coordinate::new(at.row % self.rows, at.col % self.cols);
                &self.cells[wrapped.index(self.cols)]
            }
        }
    }

    /// The neighbouring coordinate in `dir`, or `None` past a bounded edge.
    #[inline]
    #[must_use]
    pub fn step(&self, at: Coordinate, dir: Direction) -> Option<Coordinate> {
        let (dr, dc) = dir.offset();
        match self.wrap {
            WrapMode::Bounded => {
                let row = at.row.checked_add_signed(dr)?;
                let col = at.col.checked_add_signed(dc)?;
                let next = Coordinate::new(row, col);
                self.in_bounds(next).then_some(next)
            }
            WrapMode::Toroidal => {
                let row = (at.row % self.rows + self.rows).wrapping_add_signed(dr) % self.rows;
                let col = (at.col % self.cols + self.cols).wrapping_add_signed(dc) % self.cols;
                Some(Coordinate::new(row, col))
            }
        }
    }

    /// Cell one step from `at` in `dir`, [`Cell::Barrier`] past a bounded edge.
    #[inline]
    #[must_use]
    pub fn get_relative(&self, at: Coordinate, dir: Direction) -> &Cell {
        match self.step(at, dir) {
            Some(next) => self.get(next),
            None => &BARRIER,
        }
    }

    /// In-bounds orthogonal neighbours of `at`, in [`Direction::ALL`] order.
    pub fn neighbors(
        &self,
        at: Coordinate,
    ) -> impl Iterator<Item = (Direction, Coordinate, &Cell)> + '_ {
        Direction::ALL.into_iter().filter_map(move |dir| {
            let next = self.step(at, dir)?;
            Some((dir, next, self.get(next)))
        })
    }

    /// Every cell with its coordinate, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, &Cell)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (Coordinate::from_index(i, cols), cell))
    }

    /// The flat row-major cell buffer.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Coordinates and headings of every signal head, row-major.
    pub fn signal_heads(&self) -> impl Iterator<Item = (Coordinate, Direction)> + '_ {
        self.iter()
            .filter_map(|(at, cell)| cell.heading().map(|dir| (at, dir)))
    }

    /// Number of live signals: heads plus charged resistors. A run with none
    /// left is quiescent.
    #[must_use]
    pub fn head_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_live()).count()
    }

    /// Anchor bound to the instruction at `instruction`.
    #[inline]
    #[must_use]
    pub fn stack_binding(&self, instruction: Coordinate) -> Option<Coordinate> {
        self.bindings.stack_of(instruction)
    }

    /// Literal cell bound to the instruction at `instruction`.
    #[inline]
    #[must_use]
    pub fn literal_slot(&self, instruction: Coordinate) -> Option<Coordinate> {
        self.bindings.literal_of(instruction)
    }

    /// Stack anchors as `(coordinate, id)`, row-major.
    pub fn anchors(&self) -> impl Iterator<Item = (Coordinate, AnchorId)> + '_ {
        self.bindings.anchors()
    }

    /// The grid rendered as layout symbols, one line per row.
    ///
    /// This is a display rendering. It parses back into the same grid only
    /// when every cell is one a layout symbol stands for (see
    /// [`Cell::symbol`]); the serde form is the lossless one.
    #[must_use]
    pub fn to_layout(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols) {
            out.extend(row.iter().map(Cell::symbol));
            out.push('\n');
        }
        out
    }

    pub(crate) fn set(&mut self, at: Coordinate, cell: Cell) {
        debug_assert!(self.in_bounds(at));
        let cols = self.cols;
        self.cells[at.index(cols)] = cell;
    }

    /// Swaps `next` in as the committed buffer; `next` receives the old cells.
    pub(crate) fn swap_buffer(&mut self, next: &mut Vec<Cell>) {
        debug_assert_eq!(next.len(), self.cells.len());
        core::mem::swap(&mut self.cells, next);
    }

    pub(crate) fn apply(&mut self, write: &CellWrite) {
        self.set(write.at, Cell::Literal(write.value));
    }

    pub(crate) fn apply_batch(&mut self, writes: &[CellWrite]) {
        for write in writes {
            self.apply(write);
        }
    }
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.wrap == other.wrap
            && self.cells == other.cells
    }
}

impl Eq for Grid {}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("wrap", &self.wrap)
            .field("heads", &self.head_count())
            .field("anchors", &self.bindings.anchor_count())
            .finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_layout())
    }
}

/// Serialized shape of a [`Grid`]; bindings are recomputed on load.
#[derive(Serialize, Deserialize)]
struct GridRepr {
    rows: usize,
    cols: usize,
    #[serde(default)]
    wrap: WrapMode,
    cells: Vec<Cell>,
}

impl TryFrom<GridRepr> for Grid {
    type Error = InvalidGrid;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        Grid::new(repr.rows, repr.cols, repr.wrap, repr.cells)
    }
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        Self {
            rows: grid.rows,
            cols: grid.cols,
            wrap: grid.wrap,
            cells: grid.cells,
        }
    }
}
