use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::range::Range;

/// Sparse 2D container of cell records, addressed by (row, column).
///
/// Storage is row-major nested maps, so iteration order is deterministic and
/// grouping by row is free. There is no implicit resizing; callers pass
/// explicit target coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMatrix {
    rows: BTreeMap<usize, BTreeMap<usize, Cell>>,
}

impl CellMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cols| cols.get(&col))
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(&row).and_then(|cols| cols.get_mut(&col))
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.rows.entry(row).or_default().insert(col, cell);
    }

    pub fn remove(&mut self, row: usize, col: usize) -> Option<Cell> {
        let cols = self.rows.get_mut(&row)?;
        let cell = cols.remove(&col);
        if cols.is_empty() {
            self.rows.remove(&row);
        }
        cell
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of populated cells.
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|cols| cols.len()).sum()
    }

    /// Visit populated cells in row-major order. The callback returns false
    /// to stop early.
    pub fn for_each_cell<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize, &Cell) -> bool,
    {
        for (&row, cols) in &self.rows {
            for (&col, cell) in cols {
                if !f(row, col, cell) {
                    return;
                }
            }
        }
    }

    /// Visit populated cells mutably, in row-major order.
    pub fn for_each_cell_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize, &mut Cell),
    {
        for (&row, cols) in &mut self.rows {
            for (&col, cell) in cols.iter_mut() {
                f(row, col, cell);
            }
        }
    }

    /// Visit rows in ascending order, with the populated cells of each row
    /// grouped by column index.
    pub fn for_each_row<F>(&self, mut f: F)
    where
        F: FnMut(usize, &BTreeMap<usize, Cell>),
    {
        for (&row, cols) in &self.rows {
            f(row, cols);
        }
    }

    /// Minimal rectangle covering all populated cells, or None for an empty
    /// matrix. Callers must check.
    pub fn bounding_range(&self) -> Option<Range> {
        let start_row = *self.rows.keys().next()?;
        let end_row = *self.rows.keys().next_back()?;
        let mut start_col = usize::MAX;
        let mut end_col = 0;
        for cols in self.rows.values() {
            if let (Some(&first), Some(&last)) = (cols.keys().next(), cols.keys().next_back()) {
                start_col = start_col.min(first);
                end_col = end_col.max(last);
            }
        }
        if start_col == usize::MAX {
            return None;
        }
        Some(Range::new(start_row, start_col, end_row, end_col))
    }

    /// Logical (rows, cols) extent counting merge-anchor spans, which reach
    /// past the last populated position. None for an empty matrix.
    pub fn span_extent(&self) -> Option<(usize, usize)> {
        let mut rows = 0;
        let mut cols = 0;
        self.for_each_cell(|row, col, cell| {
            let (row_span, col_span) = cell.span();
            rows = rows.max(row + row_span);
            cols = cols.max(col + col_span);
            true
        });
        if rows == 0 {
            None
        } else {
            Some((rows, cols))
        }
    }

    /// Extract the populated cells inside `range`, rebased so the range's
    /// top-left corner becomes (0, 0).
    pub fn fragment(&self, range: &Range) -> CellMatrix {
        let mut out = CellMatrix::new();
        for (&row, cols) in self.rows.range(range.start_row..=range.end_row) {
            for (&col, cell) in cols.range(range.start_column..=range.end_column) {
                out.set(row - range.start_row, col - range.start_column, cell.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(v: &str) -> Cell {
        Cell::from_input(v)
    }

    #[test]
    fn test_row_major_iteration_with_early_exit() {
        let mut matrix = CellMatrix::new();
        matrix.set(1, 1, cell("d"));
        matrix.set(0, 1, cell("b"));
        matrix.set(0, 0, cell("a"));
        matrix.set(1, 0, cell("c"));

        let mut visited = Vec::new();
        matrix.for_each_cell(|row, col, _| {
            visited.push((row, col));
            true
        });
        assert_eq!(visited, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        let mut count = 0;
        matrix.for_each_cell(|_, _, _| {
            count += 1;
            count < 2
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn test_bounding_range() {
        let mut matrix = CellMatrix::new();
        assert_eq!(matrix.bounding_range(), None);

        matrix.set(2, 3, cell("x"));
        matrix.set(5, 1, cell("y"));
        assert_eq!(matrix.bounding_range(), Some(Range::new(2, 1, 5, 3)));
    }

    #[test]
    fn test_fragment_rebases_to_origin() {
        let mut matrix = CellMatrix::new();
        matrix.set(2, 2, cell("a"));
        matrix.set(2, 3, cell("b"));
        matrix.set(3, 2, cell("c"));
        matrix.set(9, 9, cell("far"));

        let fragment = matrix.fragment(&Range::new(2, 2, 3, 3));
        assert_eq!(fragment.cell_count(), 3);
        assert_eq!(fragment.get(0, 0).unwrap().value.to_display(), "a");
        assert_eq!(fragment.get(0, 1).unwrap().value.to_display(), "b");
        assert_eq!(fragment.get(1, 0).unwrap().value.to_display(), "c");
        assert!(fragment.get(7, 7).is_none());
    }

    #[test]
    fn test_span_extent_counts_anchor_spans() {
        let mut matrix = CellMatrix::new();
        assert_eq!(matrix.span_extent(), None);

        let mut anchor = cell("a");
        anchor.row_span = Some(2);
        anchor.col_span = Some(3);
        matrix.set(0, 0, anchor);
        assert_eq!(matrix.span_extent(), Some((2, 3)));

        matrix.set(4, 1, cell("b"));
        assert_eq!(matrix.span_extent(), Some((5, 3)));
    }

    #[test]
    fn test_remove_prunes_empty_rows() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, cell("a"));
        matrix.remove(0, 0);
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_for_each_row_groups_columns() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, cell("a"));
        matrix.set(0, 4, cell("b"));
        matrix.set(2, 1, cell("c"));

        let mut rows = Vec::new();
        matrix.for_each_row(|row, cols| {
            rows.push((row, cols.keys().copied().collect::<Vec<_>>()));
        });
        assert_eq!(rows, vec![(0, vec![0, 4]), (2, vec![1])]);
    }
}
