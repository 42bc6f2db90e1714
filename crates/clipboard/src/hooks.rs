use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::SheetId;

use crate::mutation::MutationBatch;
use crate::types::{ColProperties, CopyInfo, PasteTarget, RowProperties};

/// A named participant in copy/paste. Every method except the name is
/// optional; implement the subset the feature needs.
///
/// Hooks run in registration order. A content-paste method returns the
/// mutations to apply plus the mutations that undo them; the orchestrator
/// merges all batches into one logical transaction.
pub trait ClipboardHook {
    fn hook_name(&self) -> &str;

    /// Special-paste hooks participate only when the requested paste kind
    /// equals their name; regular hooks always participate.
    fn is_special_paste(&self) -> bool {
        false
    }

    /// Rows to exclude from a copy (e.g. hidden by a filter view).
    fn filtered_out_rows(&self) -> Vec<usize> {
        Vec::new()
    }

    fn on_before_copy(&mut self, _workbook_id: &str, _worksheet_id: SheetId, _range: &Range) {}

    fn on_after_copy(&mut self) {}

    /// Per-column widths to embed in copied HTML, one entry per column of
    /// the copied range.
    fn on_copy_column_widths(&self, _range: &Range) -> Option<Vec<Option<f64>>> {
        None
    }

    /// Returning false vetoes the entire paste.
    fn on_before_paste(&mut self, _target: &PasteTarget) -> bool {
        true
    }

    fn on_after_paste(&mut self, _success: bool) {}

    fn on_paste_rows(
        &self,
        _target: &PasteTarget,
        _rows: &[RowProperties],
        _paste_kind: &str,
    ) -> Option<MutationBatch> {
        None
    }

    fn on_paste_columns(
        &self,
        _target: &PasteTarget,
        _cols: &[ColProperties],
        _paste_kind: &str,
    ) -> Option<MutationBatch> {
        None
    }

    fn on_paste_cells(
        &self,
        _target: &PasteTarget,
        _matrix: &CellMatrix,
        _paste_kind: &str,
        _copy_info: &CopyInfo,
    ) -> Option<MutationBatch> {
        None
    }
}

/// Whether a hook participates in a paste of the given kind.
pub(crate) fn hook_participates(hook: &dyn ClipboardHook, paste_kind: &str) -> bool {
    (!hook.is_special_paste() && hook.hook_name() != crate::types::DEFAULT_PASTE)
        || hook.hook_name() == paste_kind
}
