use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::matrix::CellMatrix;
use crate::range::Range;

/// Stable sheet identifier. Monotonically increasing per workbook, never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetId(pub u64);

/// A rectangular set of grid positions treated as one logical cell.
///
/// The anchor is `start`; covered cells are visually blank. Sheet-level
/// merges are disjoint by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl MergedRegion {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start: (start_row, start_col),
            end: (end_row, end_col),
        }
    }

    pub fn from_range(range: &Range) -> Self {
        Self::new(
            range.start_row,
            range.start_column,
            range.end_row,
            range.end_column,
        )
    }

    pub fn to_range(&self) -> Range {
        Range::new(self.start.0, self.start.1, self.end.0, self.end.1)
    }

    pub fn row_span(&self) -> usize {
        self.end.0 - self.start.0 + 1
    }

    pub fn col_span(&self) -> usize {
        self.end.1 - self.start.1 + 1
    }

    pub fn intersects_range(&self, range: &Range) -> bool {
        self.end.0 >= range.start_row
            && self.start.0 <= range.end_row
            && self.end.1 >= range.start_column
            && self.start.1 <= range.end_column
    }

    pub fn contained_in(&self, range: &Range) -> bool {
        self.start.0 >= range.start_row
            && self.end.0 <= range.end_row
            && self.start.1 >= range.start_column
            && self.end.1 <= range.end_column
    }

    pub fn contains_cell(&self, row: usize, col: usize) -> bool {
        row >= self.start.0 && row <= self.end.0 && col >= self.start.1 && col <= self.end.1
    }
}

/// Error returned when adding a merge that overlaps an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOverlap {
    pub existing: MergedRegion,
}

impl fmt::Display for MergeOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "merge overlaps existing region ({}, {})..({}, {})",
            self.existing.start.0, self.existing.start.1, self.existing.end.0, self.existing.end.1
        )
    }
}

impl std::error::Error for MergeOverlap {}

/// One worksheet: sparse cells, merged regions, and row/column properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    cells: FxHashMap<(usize, usize), Cell>,
    pub rows: usize,
    pub cols: usize,
    pub merged_regions: Vec<MergedRegion>,
    row_heights: FxHashMap<usize, f64>,
    col_widths: FxHashMap<usize, f64>,
}

impl Sheet {
    pub fn new(id: SheetId, rows: usize, cols: usize) -> Self {
        Self {
            id,
            name: String::from("Sheet1"),
            cells: FxHashMap::default(),
            rows,
            cols,
            merged_regions: Vec::new(),
            row_heights: FxHashMap::default(),
            col_widths: FxHashMap::default(),
        }
    }

    /// Set a cell's value from raw input, keeping any existing style.
    pub fn set_value(&mut self, row: usize, col: usize, input: &str) {
        let cell = self.cells.entry((row, col)).or_default();
        cell.value = crate::cell::CellValue::from_input(input);
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        if cell.value.is_empty() && cell.style.is_none() && !cell.is_merge_anchor() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), cell);
        }
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn clear_cell(&mut self, row: usize, col: usize) {
        self.cells.remove(&(row, col));
    }

    pub fn get_display(&self, row: usize, col: usize) -> String {
        self.cells
            .get(&(row, col))
            .map(|c| c.value.to_display())
            .unwrap_or_default()
    }

    // =========================================================================
    // Merged regions
    // =========================================================================

    /// Add a merged region. Merges never overlap; adding one that intersects
    /// an existing region fails.
    pub fn add_merge(&mut self, merge: MergedRegion) -> Result<(), MergeOverlap> {
        let range = merge.to_range();
        if let Some(existing) = self
            .merged_regions
            .iter()
            .find(|m| m.intersects_range(&range))
        {
            return Err(MergeOverlap {
                existing: *existing,
            });
        }
        self.merged_regions.push(merge);
        Ok(())
    }

    /// Remove the merge whose anchor is at `origin`.
    pub fn remove_merge(&mut self, origin: (usize, usize)) -> Option<MergedRegion> {
        let index = self.merged_regions.iter().position(|m| m.start == origin)?;
        Some(self.merged_regions.remove(index))
    }

    /// The merge covering a position, if any.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergedRegion> {
        self.merged_regions
            .iter()
            .find(|m| m.contains_cell(row, col))
    }

    pub fn merges_intersecting(&self, range: &Range) -> Vec<MergedRegion> {
        self.merged_regions
            .iter()
            .filter(|m| m.intersects_range(range))
            .copied()
            .collect()
    }

    /// Grow `range` until it fully contains every merge it touches. One pass
    /// suffices since merges don't overlap.
    pub fn expand_range_to_merges(&self, range: &Range) -> Range {
        let mut out = *range;
        for merge in &self.merged_regions {
            if merge.intersects_range(&out) {
                out.start_row = out.start_row.min(merge.start.0);
                out.start_column = out.start_column.min(merge.start.1);
                out.end_row = out.end_row.max(merge.end.0);
                out.end_column = out.end_column.max(merge.end.1);
            }
        }
        out
    }

    // =========================================================================
    // Row / column properties
    // =========================================================================

    pub fn set_row_height(&mut self, row: usize, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_height(&self, row: usize) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn clear_row_height(&mut self, row: usize) {
        self.row_heights.remove(&row);
    }

    pub fn set_col_width(&mut self, col: usize, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn col_width(&self, col: usize) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    pub fn clear_col_width(&mut self, col: usize) {
        self.col_widths.remove(&col);
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// Build a matrix over `range` in absolute coordinates where each merge
    /// anchor carries its span and covered cells are omitted.
    ///
    /// Anchors of empty merged cells are materialized so span information
    /// survives even when no value is stored.
    pub fn matrix_with_merged_cells(&self, range: &Range) -> CellMatrix {
        let mut matrix = CellMatrix::new();

        for (&(row, col), cell) in &self.cells {
            if !range.contains_cell(row, col) {
                continue;
            }
            match self.merge_at(row, col) {
                Some(merge) if (row, col) != merge.start => {
                    // Covered by a merge; logically absent.
                }
                Some(merge) => {
                    let mut out = cell.clone();
                    out.row_span = Some(merge.row_span());
                    out.col_span = Some(merge.col_span());
                    matrix.set(row, col, out);
                }
                None => {
                    matrix.set(row, col, cell.clone());
                }
            }
        }

        // Merges whose anchor has no stored cell still contribute span info.
        for merge in &self.merged_regions {
            let (row, col) = merge.start;
            if range.contains_cell(row, col) && matrix.get(row, col).is_none() {
                let mut out = Cell::default();
                out.row_span = Some(merge.row_span());
                out.col_span = Some(merge.col_span());
                matrix.set(row, col, out);
            }
        }

        matrix
    }
}
