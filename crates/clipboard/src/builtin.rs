//! Built-in clipboard hooks: the default copy/paste content handlers and
//! the special-paste variants. Feature hooks follow the same pattern.

use std::cell::RefCell;
use std::rc::Rc;

use gridclip_engine::cell::Cell;
use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::MergedRegion;
use gridclip_engine::workbook::WorkbookStore;

use crate::hooks::ClipboardHook;
use crate::mutation::{
    Mutation, MutationBatch, SetColWidthsParams, SetRangeValuesParams, SetRowHeightsParams,
    SetWorksheetMergesParams, SET_COL_WIDTHS_MUTATION, SET_RANGE_VALUES_MUTATION,
    SET_ROW_HEIGHTS_MUTATION, SET_WORKSHEET_MERGES_MUTATION,
};
use crate::types::{
    ColProperties, CopyInfo, PasteSource, PasteTarget, RowProperties, DEFAULT_COPY, DEFAULT_PASTE,
    SPECIAL_PASTE_COL_WIDTH, SPECIAL_PASTE_FORMAT, SPECIAL_PASTE_VALUE,
};

#[derive(Debug, Clone, Copy)]
enum PasteContentMode {
    /// Values, styles, and spans.
    Both,
    /// Values only; destination styles survive untouched in the written cell.
    ValuesOnly,
    /// Styles only; destination values survive.
    FormatsOnly,
}

fn build_cells_batch(
    store: &Rc<RefCell<WorkbookStore>>,
    target: &PasteTarget,
    matrix: &CellMatrix,
    mode: PasteContentMode,
) -> Option<MutationBatch> {
    let store = store.borrow();
    let workbook = store.get(&target.workbook_id)?;
    let sheet = workbook.sheet_by_id(target.worksheet_id)?;

    let dest = &target.range;
    let mut redo_values = Vec::new();
    let mut undo_values = Vec::new();

    matrix.for_each_cell(|r, c, cell| {
        // The resolver has already sized the matrix to the destination.
        if r >= dest.rows() || c >= dest.columns() {
            return true;
        }
        let abs_row = dest.start_row + r;
        let abs_col = dest.start_column + c;
        let existing = sheet.get_cell(abs_row, abs_col).cloned().unwrap_or_default();

        let new_cell = match mode {
            PasteContentMode::Both => cell.clone(),
            PasteContentMode::ValuesOnly => Cell::new(cell.value.clone()),
            PasteContentMode::FormatsOnly => Cell {
                value: existing.value.clone(),
                style: cell.style.clone(),
                row_span: None,
                col_span: None,
            },
        };

        redo_values.push((abs_row, abs_col, new_cell));
        undo_values.push((abs_row, abs_col, existing));
        true
    });

    if redo_values.is_empty() {
        return None;
    }

    let redo = Mutation::new(
        SET_RANGE_VALUES_MUTATION,
        &SetRangeValuesParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            cell_values: redo_values,
        },
    );
    let undo = Mutation::new(
        SET_RANGE_VALUES_MUTATION,
        &SetRangeValuesParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            cell_values: undo_values,
        },
    );
    Some(MutationBatch {
        redos: vec![redo],
        undos: vec![undo],
    })
}

/// Merge list rewrite for a paste: merges fully inside the destination are
/// replaced by the pasted anchors' regions. For a cut-paste on the same
/// sheet, merges inside the cut source disappear as part of the same
/// rewrite; a cut from another sheet gets its own rewrite there.
fn build_merges_batch(
    store: &Rc<RefCell<WorkbookStore>>,
    target: &PasteTarget,
    matrix: &CellMatrix,
    cut_source: Option<&PasteSource>,
) -> Option<MutationBatch> {
    let store = store.borrow();

    let dest = &target.range;
    let mut pasted_merges: Vec<MergedRegion> = Vec::new();
    matrix.for_each_cell(|r, c, cell| {
        if cell.is_merge_anchor() && r < dest.rows() && c < dest.columns() {
            let (row_span, col_span) = cell.span();
            pasted_merges.push(MergedRegion::new(
                dest.start_row + r,
                dest.start_column + c,
                dest.start_row + r + row_span - 1,
                dest.start_column + c + col_span - 1,
            ));
        }
        true
    });

    let same_sheet_cut = cut_source.filter(|src| {
        src.workbook_id == target.workbook_id && src.worksheet_id == target.worksheet_id
    });

    let mut batch = MutationBatch::new();
    {
        let workbook = store.get(&target.workbook_id)?;
        let sheet = workbook.sheet_by_id(target.worksheet_id)?;
        let before = sheet.merged_regions.clone();
        let mut after: Vec<MergedRegion> = before
            .iter()
            .filter(|m| {
                !m.contained_in(dest)
                    && same_sheet_cut.map_or(true, |src| !m.contained_in(&src.range))
            })
            .copied()
            .collect();
        after.extend(pasted_merges);

        if after != before {
            batch.redos.push(Mutation::new(
                SET_WORKSHEET_MERGES_MUTATION,
                &SetWorksheetMergesParams {
                    workbook_id: target.workbook_id.clone(),
                    worksheet_id: target.worksheet_id,
                    merges: after,
                },
            ));
            batch.undos.push(Mutation::new(
                SET_WORKSHEET_MERGES_MUTATION,
                &SetWorksheetMergesParams {
                    workbook_id: target.workbook_id.clone(),
                    worksheet_id: target.worksheet_id,
                    merges: before,
                },
            ));
        }
    }

    if let Some(src) = cut_source {
        let cross_sheet =
            src.workbook_id != target.workbook_id || src.worksheet_id != target.worksheet_id;
        if cross_sheet {
            if let Some(workbook) = store.get(&src.workbook_id) {
                if let Some(sheet) = workbook.sheet_by_id(src.worksheet_id) {
                    let before = sheet.merged_regions.clone();
                    let after: Vec<MergedRegion> = before
                        .iter()
                        .filter(|m| !m.contained_in(&src.range))
                        .copied()
                        .collect();
                    if after != before {
                        batch.redos.push(Mutation::new(
                            SET_WORKSHEET_MERGES_MUTATION,
                            &SetWorksheetMergesParams {
                                workbook_id: src.workbook_id.clone(),
                                worksheet_id: src.worksheet_id,
                                merges: after,
                            },
                        ));
                        batch.undos.push(Mutation::new(
                            SET_WORKSHEET_MERGES_MUTATION,
                            &SetWorksheetMergesParams {
                                workbook_id: src.workbook_id.clone(),
                                worksheet_id: src.worksheet_id,
                                merges: before,
                            },
                        ));
                    }
                }
            }
        }
    }

    if batch.is_empty() {
        None
    } else {
        Some(batch)
    }
}

/// Cut moves content: the source cells are cleared, except where the
/// destination overwrote them anyway.
fn build_source_clear_batch(
    store: &Rc<RefCell<WorkbookStore>>,
    target: &PasteTarget,
    src: &PasteSource,
) -> Option<MutationBatch> {
    let store = store.borrow();
    let workbook = store.get(&src.workbook_id)?;
    let sheet = workbook.sheet_by_id(src.worksheet_id)?;

    let same_sheet =
        src.workbook_id == target.workbook_id && src.worksheet_id == target.worksheet_id;

    let mut redo_values = Vec::new();
    let mut undo_values = Vec::new();
    for row in src.range.start_row..=src.range.end_row {
        for col in src.range.start_column..=src.range.end_column {
            if same_sheet && target.range.contains_cell(row, col) {
                continue;
            }
            if let Some(existing) = sheet.get_cell(row, col) {
                redo_values.push((row, col, Cell::default()));
                undo_values.push((row, col, existing.clone()));
            }
        }
    }

    if redo_values.is_empty() {
        return None;
    }

    let redo = Mutation::new(
        SET_RANGE_VALUES_MUTATION,
        &SetRangeValuesParams {
            workbook_id: src.workbook_id.clone(),
            worksheet_id: src.worksheet_id,
            cell_values: redo_values,
        },
    );
    let undo = Mutation::new(
        SET_RANGE_VALUES_MUTATION,
        &SetRangeValuesParams {
            workbook_id: src.workbook_id.clone(),
            worksheet_id: src.worksheet_id,
            cell_values: undo_values,
        },
    );
    Some(MutationBatch {
        redos: vec![redo],
        undos: vec![undo],
    })
}

fn build_col_widths_batch(
    store: &Rc<RefCell<WorkbookStore>>,
    target: &PasteTarget,
    cols: &[ColProperties],
) -> Option<MutationBatch> {
    if cols.iter().all(|c| c.width.is_none()) {
        return None;
    }
    let store = store.borrow();
    let workbook = store.get(&target.workbook_id)?;
    let sheet = workbook.sheet_by_id(target.worksheet_id)?;

    let mut redo_widths = Vec::new();
    let mut undo_widths = Vec::new();
    for (offset, props) in cols.iter().enumerate() {
        let Some(width) = props.width else {
            continue;
        };
        let col = target.range.start_column + offset;
        redo_widths.push((col, Some(width)));
        undo_widths.push((col, sheet.col_width(col)));
    }

    let redo = Mutation::new(
        SET_COL_WIDTHS_MUTATION,
        &SetColWidthsParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            widths: redo_widths,
        },
    );
    let undo = Mutation::new(
        SET_COL_WIDTHS_MUTATION,
        &SetColWidthsParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            widths: undo_widths,
        },
    );
    Some(MutationBatch {
        redos: vec![redo],
        undos: vec![undo],
    })
}

fn build_row_heights_batch(
    store: &Rc<RefCell<WorkbookStore>>,
    target: &PasteTarget,
    rows: &[RowProperties],
) -> Option<MutationBatch> {
    if rows.iter().all(|r| r.height.is_none()) {
        return None;
    }
    let store = store.borrow();
    let workbook = store.get(&target.workbook_id)?;
    let sheet = workbook.sheet_by_id(target.worksheet_id)?;

    let mut redo_heights = Vec::new();
    let mut undo_heights = Vec::new();
    for (offset, props) in rows.iter().enumerate() {
        let Some(height) = props.height else {
            continue;
        };
        let row = target.range.start_row + offset;
        redo_heights.push((row, Some(height)));
        undo_heights.push((row, sheet.row_height(row)));
    }

    let redo = Mutation::new(
        SET_ROW_HEIGHTS_MUTATION,
        &SetRowHeightsParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            heights: redo_heights,
        },
    );
    let undo = Mutation::new(
        SET_ROW_HEIGHTS_MUTATION,
        &SetRowHeightsParams {
            workbook_id: target.workbook_id.clone(),
            worksheet_id: target.worksheet_id,
            heights: undo_heights,
        },
    );
    Some(MutationBatch {
        redos: vec![redo],
        undos: vec![undo],
    })
}

/// Contributes the source sheet's column widths to copied HTML.
pub struct DefaultCopyHook {
    store: Rc<RefCell<WorkbookStore>>,
}

impl DefaultCopyHook {
    pub fn new(store: Rc<RefCell<WorkbookStore>>) -> Self {
        Self { store }
    }
}

impl ClipboardHook for DefaultCopyHook {
    fn hook_name(&self) -> &str {
        DEFAULT_COPY
    }

    fn on_copy_column_widths(&self, range: &Range) -> Option<Vec<Option<f64>>> {
        let store = self.store.borrow();
        let sheet = store.current()?.active_sheet();
        let widths: Vec<Option<f64>> = (range.start_column..=range.end_column)
            .map(|col| sheet.col_width(col))
            .collect();
        if widths.iter().any(|w| w.is_some()) {
            Some(widths)
        } else {
            None
        }
    }
}

/// Pastes cell content with full fidelity: values, styles, spans, merges,
/// and row/column properties.
pub struct DefaultPasteHook {
    store: Rc<RefCell<WorkbookStore>>,
}

impl DefaultPasteHook {
    pub fn new(store: Rc<RefCell<WorkbookStore>>) -> Self {
        Self { store }
    }
}

impl ClipboardHook for DefaultPasteHook {
    fn hook_name(&self) -> &str {
        DEFAULT_PASTE
    }

    fn on_paste_rows(
        &self,
        target: &PasteTarget,
        rows: &[RowProperties],
        _paste_kind: &str,
    ) -> Option<MutationBatch> {
        build_row_heights_batch(&self.store, target, rows)
    }

    fn on_paste_columns(
        &self,
        target: &PasteTarget,
        cols: &[ColProperties],
        _paste_kind: &str,
    ) -> Option<MutationBatch> {
        build_col_widths_batch(&self.store, target, cols)
    }

    fn on_paste_cells(
        &self,
        target: &PasteTarget,
        matrix: &CellMatrix,
        _paste_kind: &str,
        copy_info: &CopyInfo,
    ) -> Option<MutationBatch> {
        let cut_source = match copy_info.copy_kind {
            crate::types::CopyKind::Cut => copy_info.source.as_ref(),
            crate::types::CopyKind::Copy => None,
        };
        let mut batch = build_cells_batch(&self.store, target, matrix, PasteContentMode::Both)?;
        if let Some(merges) = build_merges_batch(&self.store, target, matrix, cut_source) {
            batch.merge(merges);
        }
        if let Some(src) = cut_source {
            if let Some(clear) = build_source_clear_batch(&self.store, target, src) {
                batch.merge(clear);
            }
        }
        Some(batch)
    }
}

/// Paste Values: computed values only, no styles or spans.
pub struct SpecialPasteValueHook {
    store: Rc<RefCell<WorkbookStore>>,
}

impl SpecialPasteValueHook {
    pub fn new(store: Rc<RefCell<WorkbookStore>>) -> Self {
        Self { store }
    }
}

impl ClipboardHook for SpecialPasteValueHook {
    fn hook_name(&self) -> &str {
        SPECIAL_PASTE_VALUE
    }

    fn is_special_paste(&self) -> bool {
        true
    }

    fn on_paste_cells(
        &self,
        target: &PasteTarget,
        matrix: &CellMatrix,
        _paste_kind: &str,
        _copy_info: &CopyInfo,
    ) -> Option<MutationBatch> {
        build_cells_batch(&self.store, target, matrix, PasteContentMode::ValuesOnly)
    }
}

/// Paste Formats: styles only, values untouched.
pub struct SpecialPasteFormatHook {
    store: Rc<RefCell<WorkbookStore>>,
}

impl SpecialPasteFormatHook {
    pub fn new(store: Rc<RefCell<WorkbookStore>>) -> Self {
        Self { store }
    }
}

impl ClipboardHook for SpecialPasteFormatHook {
    fn hook_name(&self) -> &str {
        SPECIAL_PASTE_FORMAT
    }

    fn is_special_paste(&self) -> bool {
        true
    }

    fn on_paste_cells(
        &self,
        target: &PasteTarget,
        matrix: &CellMatrix,
        _paste_kind: &str,
        _copy_info: &CopyInfo,
    ) -> Option<MutationBatch> {
        build_cells_batch(&self.store, target, matrix, PasteContentMode::FormatsOnly)
    }
}

/// Paste Column Widths: only the column properties.
pub struct SpecialPasteColWidthHook {
    store: Rc<RefCell<WorkbookStore>>,
}

impl SpecialPasteColWidthHook {
    pub fn new(store: Rc<RefCell<WorkbookStore>>) -> Self {
        Self { store }
    }
}

impl ClipboardHook for SpecialPasteColWidthHook {
    fn hook_name(&self) -> &str {
        SPECIAL_PASTE_COL_WIDTH
    }

    fn is_special_paste(&self) -> bool {
        true
    }

    fn on_paste_columns(
        &self,
        target: &PasteTarget,
        cols: &[ColProperties],
        _paste_kind: &str,
    ) -> Option<MutationBatch> {
        build_col_widths_batch(&self.store, target, cols)
    }
}
