//! Neighbour enumeration over the navigation grid.

use maze_haunt_core::CellIndex;

/// Grid cells adjacent to a queried cell, excluding obstacles and
/// out-of-range positions.
///
/// Cells are yielded in row-major order of the surrounding 3×3 block so that
/// searches expanding them stay reproducible for a fixed grid.
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<CellIndex>; 8],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    pub(crate) fn push(&mut self, index: CellIndex) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(index);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = CellIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Neighbors {}

/// Offsets of the 3×3 block around a cell in row-major order, centre excluded.
pub(crate) const BLOCK_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Reports whether a `(row, column)` offset moves diagonally.
pub(crate) const fn is_diagonal(offset: (i64, i64)) -> bool {
    offset.0 != 0 && offset.1 != 0
}
