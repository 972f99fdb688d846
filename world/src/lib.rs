#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Navigation grid shared by every pursuer in a session.
//!
//! A [`NavGrid`] is built once from a [`GridSpec`] and an injected obstacle
//! query. Obstacle flags are frozen at build time; after construction the grid
//! is read-only, so any number of agents may borrow it concurrently.

mod navigation;

use glam::Vec3;
use maze_haunt_core::{CellCoord, CellIndex, GridSpec};
use thiserror::Error;
use tracing::debug;

pub use navigation::Neighbors;

use navigation::{is_diagonal, BLOCK_OFFSETS};

/// Reasons a grid description cannot be turned into a navigation grid.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GridError {
    /// The grid has zero rows or zero columns.
    #[error("grid must contain at least one row and one column (got {rows}x{columns})")]
    Empty {
        /// Requested row count.
        rows: u32,
        /// Requested column count.
        columns: u32,
    },
    /// The cell size is zero, negative or not finite.
    #[error("cell size must be a positive finite number (got {0})")]
    InvalidCellSize(f32),
    /// The origin contains a non-finite component.
    #[error("grid origin must be finite")]
    InvalidOrigin,
}

/// One square of the navigation grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    coord: CellCoord,
    center: Vec3,
    obstacle: bool,
}

impl Cell {
    /// Column and row of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// World-space centre of the cell.
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Whether the obstacle query reported geometry over this cell.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        self.obstacle
    }
}

/// Uniform grid of traversable and obstacle cells over the play area.
#[derive(Clone, Debug)]
pub struct NavGrid {
    spec: GridSpec,
    cells: Vec<Cell>,
}

impl NavGrid {
    /// Builds the grid, calling `obstacle_query` exactly once per cell.
    ///
    /// The query receives the point `probe_height` above each cell centre and
    /// returns `true` when the cell is blocked. Cells are visited in row-major
    /// order.
    pub fn build<F>(spec: GridSpec, mut obstacle_query: F) -> Result<Self, GridError>
    where
        F: FnMut(Vec3) -> bool,
    {
        if spec.rows == 0 || spec.columns == 0 {
            return Err(GridError::Empty {
                rows: spec.rows,
                columns: spec.columns,
            });
        }
        if !spec.cell_size.is_finite() || spec.cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(spec.cell_size));
        }
        if !spec.origin.is_finite() {
            return Err(GridError::InvalidOrigin);
        }

        let probe = Vec3::new(0.0, spec.probe_height, 0.0);
        let mut cells = Vec::with_capacity(spec.cell_count());
        for row in 0..spec.rows {
            for column in 0..spec.columns {
                let center = center_for(&spec, column, row);
                cells.push(Cell {
                    coord: CellCoord::new(column, row),
                    center,
                    obstacle: obstacle_query(center + probe),
                });
            }
        }

        let grid = Self { spec, cells };
        debug!(
            rows = spec.rows,
            columns = spec.columns,
            cell_size = spec.cell_size,
            obstacles = grid.obstacle_cells().count(),
            "navigation grid built"
        );
        Ok(grid)
    }

    /// Geometry the grid was built from.
    #[must_use]
    pub const fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.spec.rows
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.spec.columns
    }

    /// Edge length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.spec.cell_size
    }

    /// World position of the grid's minimum corner.
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.spec.origin
    }

    /// Whether eight-way movement is enabled for planning.
    #[must_use]
    pub const fn allows_diagonal(&self) -> bool {
        self.spec.allow_diagonal
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the grid has no cells. Built grids never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell stored at the provided index, if it lies within the grid.
    #[must_use]
    pub fn cell(&self, index: CellIndex) -> Option<&Cell> {
        self.cells.get(index.get())
    }

    /// Cells flagged as obstacles, in row-major order.
    pub fn obstacle_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter(|cell| cell.obstacle)
    }

    /// Reports whether the ground-plane projection of `position` lies inside
    /// the grid extent, edges included.
    #[must_use]
    pub fn contains(&self, position: Vec3) -> bool {
        let local = position - self.spec.origin;
        local.x >= 0.0
            && local.x <= self.spec.width()
            && local.z >= 0.0
            && local.z <= self.spec.depth()
    }

    /// Resolves a world position to the cell containing it.
    ///
    /// Returns `None` when the position lies outside
    /// `[origin, origin + (columns, rows) * cell_size]`. Points on the far
    /// edges belong to the last row or column.
    #[must_use]
    pub fn index_of(&self, position: Vec3) -> Option<CellIndex> {
        if !self.contains(position) {
            return None;
        }

        let local = position - self.spec.origin;
        let column = axis_cell(local.x, self.spec.cell_size, self.spec.columns);
        let row = axis_cell(local.z, self.spec.cell_size, self.spec.rows);
        self.index_at(CellCoord::new(column, row))
    }

    /// World-space centre of the cell at `index`, if it lies within the grid.
    #[must_use]
    pub fn cell_center(&self, index: CellIndex) -> Option<Vec3> {
        self.cell(index).map(Cell::center)
    }

    /// Row-major index of the provided coordinate, if it lies within the grid.
    #[must_use]
    pub fn index_at(&self, coord: CellCoord) -> Option<CellIndex> {
        if coord.column() >= self.spec.columns || coord.row() >= self.spec.rows {
            return None;
        }

        let columns = usize::try_from(self.spec.columns).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(columns)?
            .checked_add(column)
            .map(CellIndex::new)
    }

    /// Column and row of the cell at `index`, if it lies within the grid.
    #[must_use]
    pub fn coord_of(&self, index: CellIndex) -> Option<CellCoord> {
        self.cell(index).map(Cell::coord)
    }

    /// Reports whether the cell at `index` exists and is free of obstacles.
    #[must_use]
    pub fn is_walkable(&self, index: CellIndex) -> bool {
        self.cell(index).is_some_and(|cell| !cell.obstacle)
    }

    /// Adjacent walkable cells of `index`.
    ///
    /// Yields up to eight cells when `allow_diagonal` is set and up to four
    /// otherwise. Out-of-range indices produce no neighbours.
    #[must_use]
    pub fn neighbors(&self, index: CellIndex, allow_diagonal: bool) -> Neighbors {
        let mut neighbors = Neighbors::default();
        let Some(coord) = self.coord_of(index) else {
            return neighbors;
        };

        let row = i64::from(coord.row());
        let column = i64::from(coord.column());
        for offset in BLOCK_OFFSETS {
            if !allow_diagonal && is_diagonal(offset) {
                continue;
            }

            let (Ok(next_row), Ok(next_column)) = (
                u32::try_from(row + offset.0),
                u32::try_from(column + offset.1),
            ) else {
                continue;
            };

            let Some(candidate) = self.index_at(CellCoord::new(next_column, next_row)) else {
                continue;
            };
            if self.is_walkable(candidate) {
                neighbors.push(candidate);
            }
        }

        neighbors
    }
}

fn center_for(spec: &GridSpec, column: u32, row: u32) -> Vec3 {
    let half = spec.cell_size / 2.0;
    spec.origin
        + Vec3::new(
            column as f32 * spec.cell_size + half,
            0.0,
            row as f32 * spec.cell_size + half,
        )
}

fn axis_cell(offset: f32, cell_size: f32, count: u32) -> u32 {
    let cell = (offset / cell_size).floor();
    let last = count.saturating_sub(1);
    if cell <= 0.0 {
        0
    } else if cell >= last as f32 {
        last
    } else {
        cell as u32
    }
}
