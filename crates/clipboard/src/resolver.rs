use std::fmt;

use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::MergedRegion;

/// Why a paste could not be placed. No mutation has been applied when this
/// is returned; the orchestrator surfaces it as "paste aborted".
#[derive(Debug, Clone, PartialEq)]
pub enum PasteRejection {
    /// The destination shape cannot be reconciled with a merged region:
    /// pasting would create a partially-overlapping merge.
    MergeConflict { merge: MergedRegion },
}

impl fmt::Display for PasteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasteRejection::MergeConflict { merge } => write!(
                f,
                "cannot paste over merged cells at ({}, {})..({}, {})",
                merge.start.0, merge.start.1, merge.end.0, merge.end.1
            ),
        }
    }
}

impl std::error::Error for PasteRejection {}

/// Compute the final destination range for pasting a `row_count` x
/// `col_count` source into `range`, rewriting `matrix` in place to match.
///
/// `matrix` is the source fragment rebased to (0, 0). `merges` is the
/// destination sheet's merge list. The decision procedure, in priority
/// order:
///
/// 1. Destination is an exact integer multiple of the source on both axes:
///    tile by wrap-indexed copy and keep the destination range — unless the
///    destination is one merge covering the whole range and the source is a
///    single cell, in which case tiling a styled/merged cell is ill-defined
///    and the content is pasted style- and span-stripped instead.
/// 2. Not a multiple, destination touches a merge: if the source footprint
///    sits flush against merge boundaries, shrink the destination to the
///    footprint. If it crosses a boundary and the destination already ends
///    beyond the merge on either axis, reject. Otherwise paste content-only.
/// 3. Not a multiple, no merge in the way: shrink the destination to the
///    footprint.
pub fn resolve_paste_geometry(
    row_count: usize,
    col_count: usize,
    matrix: &mut CellMatrix,
    range: &Range,
    merges: &[MergedRegion],
) -> Result<Range, PasteRejection> {
    debug_assert!(row_count > 0 && col_count > 0);

    let destination_rows = range.rows();
    let destination_columns = range.columns();

    let intersecting: Vec<&MergedRegion> =
        merges.iter().filter(|m| m.intersects_range(range)).collect();

    if destination_rows % row_count == 0 && destination_columns % col_count == 0 {
        let same_size = destination_rows == row_count && destination_columns == col_count;
        if !intersecting.is_empty() && !same_size {
            let merge = intersecting[0];
            let covers_exact_destination = merge.start == (range.start_row, range.start_column)
                && merge.end == (range.end_row, range.end_column);
            if covers_exact_destination && !is_multiple_cells(matrix) {
                // A single styled/merged source cell over one big merge:
                // keep the content, drop style and span.
                matrix.for_each_cell_mut(|_, _, cell| cell.strip_style_and_span());
                return Ok(*range);
            }
        }
        tile(matrix, row_count, col_count, destination_rows, destination_columns);
        return Ok(*range);
    }

    if !intersecting.is_empty() {
        if footprint_matches_merges(row_count, col_count, range, merges) {
            // Expand or shrink the destination to the source footprint.
            return Ok(Range::new(
                range.start_row,
                range.start_column,
                range.start_row + row_count - 1,
                range.start_column + col_count - 1,
            ));
        }
        let merge = intersecting[0];
        if range.end_row > merge.end.0 || range.end_column > merge.end.1 {
            return Err(PasteRejection::MergeConflict { merge: *merge });
        }
        // Content-only paste: the merge dominates the destination, so the
        // incoming styles and spans are dropped.
        matrix.for_each_cell_mut(|_, _, cell| cell.strip_style_and_span());
        return Ok(*range);
    }

    Ok(Range::new(
        range.start_row,
        range.start_column,
        range.start_row + row_count - 1,
        range.start_column + col_count - 1,
    ))
}

/// Replicate the source block across the destination with wraparound
/// indexing: destination (r, c) takes source (r % rows, c % cols).
fn tile(
    matrix: &mut CellMatrix,
    row_count: usize,
    col_count: usize,
    destination_rows: usize,
    destination_columns: usize,
) {
    for r in 0..destination_rows {
        for c in 0..destination_columns {
            if r < row_count && c < col_count {
                continue;
            }
            if let Some(cell) = matrix.get(r % row_count, c % col_count).cloned() {
                matrix.set(r, c, cell);
            }
        }
    }
}

/// Whether the matrix consists of two or more non-empty cells (plain or
/// merged). A lone cell tiles differently from a composite block.
fn is_multiple_cells(matrix: &CellMatrix) -> bool {
    let mut count = 0;
    matrix.for_each_cell(|_, _, cell| {
        if !cell.value.is_empty() || cell.is_merge_anchor() {
            count += 1;
        }
        count <= 1
    });
    count > 1
}

/// True when the source footprint placed at the destination's top-left
/// corner does not cut through any merge boundary on either axis.
fn footprint_matches_merges(
    row_count: usize,
    col_count: usize,
    range: &Range,
    merges: &[MergedRegion],
) -> bool {
    let footprint_end_row = range.start_row + row_count - 1;
    let footprint_end_column = range.start_column + col_count - 1;

    let row_crosses = merges.iter().any(|m| {
        m.start.0 <= footprint_end_row
            && footprint_end_row < m.end.0
            && m.start.1 >= range.start_column
            && m.start.1 <= footprint_end_column
    });
    let column_crosses = merges.iter().any(|m| {
        m.start.1 <= footprint_end_column
            && footprint_end_column < m.end.1
            && m.start.0 >= range.start_row
            && m.start.0 <= footprint_end_row
    });

    !row_crosses && !column_crosses
}
