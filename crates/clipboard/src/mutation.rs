use std::cell::RefCell;
use std::rc::Rc;

use gridclip_engine::cell::Cell;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::{MergedRegion, SheetId};
use gridclip_engine::workbook::WorkbookStore;
use serde::{Deserialize, Serialize};

use crate::interface::SharedSelection;

/// Mutation ids understood by the reference executor. An embedding command
/// service may route additional ids from feature hooks.
pub const SET_RANGE_VALUES_MUTATION: &str = "sheet.mutation.set-range-values";
pub const SET_WORKSHEET_MERGES_MUTATION: &str = "sheet.mutation.set-worksheet-merges";
pub const SET_ROW_HEIGHTS_MUTATION: &str = "sheet.mutation.set-row-heights";
pub const SET_COL_WIDTHS_MUTATION: &str = "sheet.mutation.set-col-widths";
pub const SET_SELECTIONS_OPERATION: &str = "sheet.operation.set-selections";

/// A mutation descriptor crossing the command boundary: an id plus an
/// id-specific JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation {
    pub id: String,
    pub params: serde_json::Value,
}

impl Mutation {
    pub fn new<T: Serialize>(id: &str, params: &T) -> Self {
        let params = serde_json::to_value(params).unwrap_or(serde_json::Value::Null);
        Self {
            id: id.to_string(),
            params,
        }
    }
}

/// Paired apply/undo mutation lists produced by a paste hook.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    pub redos: Vec<Mutation>,
    pub undos: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: MutationBatch) {
        self.redos.extend(other.redos);
        self.undos.extend(other.undos);
    }

    pub fn is_empty(&self) -> bool {
        self.redos.is_empty() && self.undos.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRangeValuesParams {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    /// Sparse list of (row, column, cell). An empty default cell clears the
    /// position.
    pub cell_values: Vec<(usize, usize, Cell)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWorksheetMergesParams {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    /// Full replacement merge list for the sheet.
    pub merges: Vec<MergedRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRowHeightsParams {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    /// (row, height); None restores the default height.
    pub heights: Vec<(usize, Option<f64>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetColWidthsParams {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    /// (column, width); None restores the default width.
    pub widths: Vec<(usize, Option<f64>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSelectionsParams {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    pub range: Range,
    /// The primary cell, expanded to its merge when the pasted main cell is
    /// a merge anchor.
    pub primary: Range,
}

/// Executes mutation descriptors. Returns false on any failure; the caller
/// treats the batch as failed and does not record undo history.
pub trait CommandExecutor {
    fn execute(&mut self, mutation: &Mutation) -> bool;
}

impl<T: CommandExecutor> CommandExecutor for Rc<RefCell<T>> {
    fn execute(&mut self, mutation: &Mutation) -> bool {
        self.borrow_mut().execute(mutation)
    }
}

/// Receives the apply/undo pair of a successful paste, keyed by workbook.
pub trait UndoRedoService {
    fn push_undo_redo(&mut self, unit_id: &str, redos: Vec<Mutation>, undos: Vec<Mutation>);
}

impl<T: UndoRedoService> UndoRedoService for Rc<RefCell<T>> {
    fn push_undo_redo(&mut self, unit_id: &str, redos: Vec<Mutation>, undos: Vec<Mutation>) {
        self.borrow_mut().push_undo_redo(unit_id, redos, undos);
    }
}

/// Reference executor applying the built-in mutations directly to a
/// `WorkbookStore`.
pub struct WorkbookCommandExecutor {
    store: Rc<RefCell<WorkbookStore>>,
    selection: SharedSelection,
}

impl WorkbookCommandExecutor {
    pub fn new(store: Rc<RefCell<WorkbookStore>>, selection: SharedSelection) -> Self {
        Self { store, selection }
    }

    fn set_range_values(&self, params: SetRangeValuesParams) -> bool {
        let mut store = self.store.borrow_mut();
        let Some(workbook) = store.get_mut(&params.workbook_id) else {
            return false;
        };
        let Some(sheet) = workbook.sheet_by_id_mut(params.worksheet_id) else {
            return false;
        };
        for (row, col, cell) in params.cell_values {
            sheet.set_cell(row, col, cell);
        }
        true
    }

    fn set_worksheet_merges(&self, params: SetWorksheetMergesParams) -> bool {
        let mut store = self.store.borrow_mut();
        let Some(workbook) = store.get_mut(&params.workbook_id) else {
            return false;
        };
        let Some(sheet) = workbook.sheet_by_id_mut(params.worksheet_id) else {
            return false;
        };
        sheet.merged_regions = params.merges;
        true
    }

    fn set_row_heights(&self, params: SetRowHeightsParams) -> bool {
        let mut store = self.store.borrow_mut();
        let Some(workbook) = store.get_mut(&params.workbook_id) else {
            return false;
        };
        let Some(sheet) = workbook.sheet_by_id_mut(params.worksheet_id) else {
            return false;
        };
        for (row, height) in params.heights {
            match height {
                Some(h) => sheet.set_row_height(row, h),
                None => sheet.clear_row_height(row),
            }
        }
        true
    }

    fn set_col_widths(&self, params: SetColWidthsParams) -> bool {
        let mut store = self.store.borrow_mut();
        let Some(workbook) = store.get_mut(&params.workbook_id) else {
            return false;
        };
        let Some(sheet) = workbook.sheet_by_id_mut(params.worksheet_id) else {
            return false;
        };
        for (col, width) in params.widths {
            match width {
                Some(w) => sheet.set_col_width(col, w),
                None => sheet.clear_col_width(col),
            }
        }
        true
    }
}

impl CommandExecutor for WorkbookCommandExecutor {
    fn execute(&mut self, mutation: &Mutation) -> bool {
        match mutation.id.as_str() {
            SET_RANGE_VALUES_MUTATION => {
                match serde_json::from_value(mutation.params.clone()) {
                    Ok(params) => self.set_range_values(params),
                    Err(err) => {
                        log::error!("bad set-range-values params: {}", err);
                        false
                    }
                }
            }
            SET_WORKSHEET_MERGES_MUTATION => {
                match serde_json::from_value(mutation.params.clone()) {
                    Ok(params) => self.set_worksheet_merges(params),
                    Err(err) => {
                        log::error!("bad set-worksheet-merges params: {}", err);
                        false
                    }
                }
            }
            SET_ROW_HEIGHTS_MUTATION => match serde_json::from_value(mutation.params.clone()) {
                Ok(params) => self.set_row_heights(params),
                Err(err) => {
                    log::error!("bad set-row-heights params: {}", err);
                    false
                }
            },
            SET_COL_WIDTHS_MUTATION => match serde_json::from_value(mutation.params.clone()) {
                Ok(params) => self.set_col_widths(params),
                Err(err) => {
                    log::error!("bad set-col-widths params: {}", err);
                    false
                }
            },
            SET_SELECTIONS_OPERATION => {
                match serde_json::from_value::<SetSelectionsParams>(mutation.params.clone()) {
                    Ok(params) => {
                        self.selection.select(params.range);
                        true
                    }
                    Err(err) => {
                        log::error!("bad set-selections params: {}", err);
                        false
                    }
                }
            }
            other => {
                log::warn!("unknown mutation id: {}", other);
                false
            }
        }
    }
}

/// One undoable step: the full apply and undo batches of a paste.
#[derive(Debug, Clone)]
pub struct UndoRedoEntry {
    pub unit_id: String,
    pub redos: Vec<Mutation>,
    pub undos: Vec<Mutation>,
}

/// Bounded undo/redo stacks. Pushing clears the redo stack.
pub struct UndoRedoStack {
    undo_stack: Vec<UndoRedoEntry>,
    redo_stack: Vec<UndoRedoEntry>,
    max_entries: usize,
}

impl Default for UndoRedoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: 100,
        }
    }

    /// Pop the last entry for undo; it moves to the redo stack.
    pub fn undo(&mut self) -> Option<UndoRedoEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop from the redo stack; it moves back to the undo stack.
    pub fn redo(&mut self) -> Option<UndoRedoEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn last(&self) -> Option<&UndoRedoEntry> {
        self.undo_stack.last()
    }
}

impl UndoRedoService for UndoRedoStack {
    fn push_undo_redo(&mut self, unit_id: &str, redos: Vec<Mutation>, undos: Vec<Mutation>) {
        self.undo_stack.push(UndoRedoEntry {
            unit_id: unit_id.to_string(),
            redos,
            undos,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }
}
