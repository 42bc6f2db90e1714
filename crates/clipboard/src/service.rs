use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use gridclip_engine::cell::Cell;
use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::SheetId;
use gridclip_engine::style::StyleRef;
use gridclip_engine::workbook::WorkbookStore;

use crate::builtin::{
    DefaultCopyHook, DefaultPasteHook, SpecialPasteColWidthHook, SpecialPasteFormatHook,
    SpecialPasteValueHook,
};
use crate::cache::{extract_copy_id, stamp_copy_id, CopyCacheEntry, CopyContentCache};
use crate::config::ClipboardConfig;
use crate::error::ClipboardError;
use crate::hooks::{hook_participates, ClipboardHook};
use crate::html::{GridToHtml, HtmlToGrid};
use crate::interface::{
    ClipboardInterface, ClipboardItem, MarkSelectionService, SelectionProvider, HTML_MIME,
    PLAIN_TEXT_MIME,
};
use crate::mutation::{
    CommandExecutor, Mutation, SetRangeValuesParams, SetSelectionsParams, UndoRedoService,
    SET_RANGE_VALUES_MUTATION, SET_SELECTIONS_OPERATION,
};
use crate::plain_text::matrix_plain_text;
use crate::resolver::resolve_paste_geometry;
use crate::types::{CopyDataModel, CopyInfo, CopyKind, PasteSource, PasteTarget};

/// Coordinates copy, cut, and paste end-to-end: selection retrieval, hook
/// invocation, codec work, geometry resolution, mutation generation, and
/// undo/redo registration.
///
/// All collaborators are constructor-injected. Operations take `&mut self`,
/// so no two copy/paste calls on one service overlap; each call re-reads the
/// current selection — last selection wins.
pub struct SheetClipboardService {
    hooks: Vec<Box<dyn ClipboardHook>>,
    html_to_grid: HtmlToGrid,
    grid_to_html: GridToHtml,
    cache: CopyContentCache,
    config: ClipboardConfig,
    store: Rc<RefCell<WorkbookStore>>,
    clipboard: Box<dyn ClipboardInterface>,
    selection: Box<dyn SelectionProvider>,
    executor: Box<dyn CommandExecutor>,
    undo_redo: Box<dyn UndoRedoService>,
    mark: Box<dyn MarkSelectionService>,
    copy_mark_id: Option<String>,
}

impl SheetClipboardService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Rc<RefCell<WorkbookStore>>,
        clipboard: Box<dyn ClipboardInterface>,
        selection: Box<dyn SelectionProvider>,
        executor: Box<dyn CommandExecutor>,
        undo_redo: Box<dyn UndoRedoService>,
        mark: Box<dyn MarkSelectionService>,
        config: ClipboardConfig,
    ) -> Self {
        Self {
            hooks: Vec::new(),
            html_to_grid: HtmlToGrid::new(),
            grid_to_html: GridToHtml::new(),
            cache: CopyContentCache::new(config.cache_capacity),
            config,
            store,
            clipboard,
            selection,
            executor,
            undo_redo,
            mark,
            copy_mark_id: None,
        }
    }

    /// Register the built-in content hooks: default copy/paste plus the
    /// special-paste variants.
    pub fn register_default_hooks(&mut self) {
        let store = Rc::clone(&self.store);
        self.add_hook(Box::new(DefaultCopyHook::new(Rc::clone(&store))));
        self.add_hook(Box::new(DefaultPasteHook::new(Rc::clone(&store))));
        self.add_hook(Box::new(SpecialPasteValueHook::new(Rc::clone(&store))));
        self.add_hook(Box::new(SpecialPasteFormatHook::new(Rc::clone(&store))));
        self.add_hook(Box::new(SpecialPasteColWidthHook::new(store)));
    }

    /// Add a hook. Insertion order is invocation order. Duplicate names are
    /// rejected.
    pub fn add_hook(&mut self, hook: Box<dyn ClipboardHook>) -> bool {
        if self
            .hooks
            .iter()
            .any(|h| h.hook_name() == hook.hook_name())
        {
            log::error!("clipboard hook already exists: {}", hook.hook_name());
            return false;
        }
        self.hooks.push(hook);
        true
    }

    /// Remove a hook by name. O(n), acceptable at hook cardinality.
    pub fn remove_hook(&mut self, name: &str) -> bool {
        let Some(index) = self.hooks.iter().position(|h| h.hook_name() == name) else {
            return false;
        };
        self.hooks.remove(index);
        true
    }

    pub fn hook_names(&self) -> Vec<String> {
        self.hooks.iter().map(|h| h.hook_name().to_string()).collect()
    }

    // =========================================================================
    // Copy
    // =========================================================================

    pub fn copy(&mut self, kind: CopyKind) -> Result<bool, ClipboardError> {
        let Some(selection) = self.selection.last_selection() else {
            return Ok(false);
        };

        let (workbook_id, worksheet_id) = {
            let store = self.store.borrow();
            let Some(workbook) = store.current() else {
                return Ok(false);
            };
            (workbook.unit_id().to_string(), workbook.active_sheet().id)
        };

        // Rows excluded by plugins (filter views etc.).
        let filtered: BTreeSet<usize> = self
            .hooks
            .iter()
            .flat_map(|h| h.filtered_out_rows())
            .collect();

        let (range, fragment, source_rows) = {
            let store = self.store.borrow();
            let Some(workbook) = store.current() else {
                return Ok(false);
            };
            let sheet = workbook.active_sheet();
            // Merge handling is skipped in a filtered view; visible rows are
            // packed consecutively instead.
            let range = if filtered.is_empty() {
                sheet.expand_range_to_merges(&selection.range)
            } else {
                selection.range
            };
            let matrix = sheet.matrix_with_merged_cells(&range);
            let mut fragment = matrix.fragment(&range);
            let source_rows = if filtered.is_empty() {
                range.rows()
            } else {
                fragment = compact_filtered_rows(&fragment, &range, &filtered);
                (0..range.rows())
                    .filter(|r| !filtered.contains(&(range.start_row + r)))
                    .count()
            };
            (range, fragment, source_rows)
        };

        for hook in &mut self.hooks {
            hook.on_before_copy(&workbook_id, worksheet_id, &range);
        }

        let col_widths = self
            .hooks
            .iter()
            .find_map(|h| h.on_copy_column_widths(&range));

        let html = {
            let store = self.store.borrow();
            match store.get(&workbook_id) {
                Some(workbook) => {
                    self.grid_to_html
                        .convert(&fragment, workbook.styles(), col_widths.as_deref())
                }
                None => return Ok(false),
            }
        };
        let plain = matrix_plain_text(&fragment);

        let cell_count = fragment.cell_count();
        let copy_id = self.cache.put(CopyCacheEntry {
            workbook_id: workbook_id.clone(),
            worksheet_id,
            range,
            rows: source_rows,
            cols: range.columns(),
            matrix: fragment,
            copy_kind: kind,
        });
        let html = stamp_copy_id(&html, &copy_id);

        self.clipboard.write(&plain, &html)?;

        if let Some(old_mark) = self.copy_mark_id.take() {
            self.mark.remove_mark(&old_mark);
        }
        self.copy_mark_id = Some(self.mark.add_mark(&range));

        for hook in &mut self.hooks {
            hook.on_after_copy();
        }

        log::debug!(
            "copied {} cells from {}:{:?} as {}",
            cell_count,
            workbook_id,
            worksheet_id,
            copy_id
        );
        Ok(true)
    }

    pub fn cut(&mut self) -> Result<bool, ClipboardError> {
        self.copy(CopyKind::Cut)
    }

    // =========================================================================
    // Paste
    // =========================================================================

    /// Paste from a platform clipboard item. HTML is preferred over plain
    /// text when both are present.
    pub fn paste(&mut self, item: &ClipboardItem, paste_kind: &str) -> Result<bool, ClipboardError> {
        let html = item.text_for(HTML_MIME).filter(|s| !s.is_empty());
        let text = item.text_for(PLAIN_TEXT_MIME).filter(|s| !s.is_empty());

        if let Some(html) = html {
            let html = html.to_string();
            return self.paste_html(&html, paste_kind);
        }
        if let Some(text) = text {
            let text = text.to_string();
            return self.paste_plain_text(&text);
        }

        log::error!("no valid data on clipboard");
        Err(ClipboardError::NoClipboardData)
    }

    fn paste_html(&mut self, html: &str, paste_kind: &str) -> Result<bool, ClipboardError> {
        if let Some(copy_id) = extract_copy_id(html) {
            if self.cache.contains(&copy_id) {
                return self.paste_internal(&copy_id, paste_kind);
            }
        }
        self.paste_external(html, paste_kind)
    }

    /// Plain text lands in the single cell at the selection's start; no
    /// tiling semantics apply to raw text.
    fn paste_plain_text(&mut self, text: &str) -> Result<bool, ClipboardError> {
        let Some((workbook_id, worksheet_id, selection)) = self.pasting_target() else {
            return Ok(false);
        };

        let mutation = Mutation::new(
            SET_RANGE_VALUES_MUTATION,
            &SetRangeValuesParams {
                workbook_id,
                worksheet_id,
                cell_values: vec![(
                    selection.start_row,
                    selection.start_column,
                    Cell::from_input(text),
                )],
            },
        );
        Ok(self.executor.execute(&mutation))
    }

    fn paste_external(&mut self, html: &str, paste_kind: &str) -> Result<bool, ClipboardError> {
        let Some((workbook_id, worksheet_id, selection)) = self.pasting_target() else {
            return Ok(false);
        };

        let model = self.html_to_grid.convert(html);
        let Some(bounds) = model.cell_matrix.bounding_range() else {
            log::warn!("clipboard HTML produced no usable cells");
            return Ok(false);
        };
        let mut matrix = if bounds.start_row == 0 && bounds.start_column == 0 {
            model.cell_matrix
        } else {
            model.cell_matrix.fragment(&bounds)
        };
        // Logical source size counts merge spans past the last populated cell.
        let Some((source_rows, source_cols)) = matrix.span_extent() else {
            return Ok(false);
        };

        let merges = {
            let store = self.store.borrow();
            match store
                .get(&workbook_id)
                .and_then(|wb| wb.sheet_by_id(worksheet_id))
            {
                Some(sheet) => sheet.merged_regions.clone(),
                None => return Ok(false),
            }
        };

        let pasted_range = match resolve_paste_geometry(
            source_rows,
            source_cols,
            &mut matrix,
            &selection,
            &merges,
        ) {
            Ok(range) => range,
            Err(rejection) => {
                log::warn!("paste aborted: {}", rejection);
                return Ok(false);
            }
        };

        let target = PasteTarget {
            workbook_id,
            worksheet_id,
            range: pasted_range,
        };
        let model = CopyDataModel {
            row_properties: model.row_properties,
            col_properties: model.col_properties,
            cell_matrix: matrix,
        };
        Ok(self.paste_data_model(&model, &target, paste_kind, None))
    }

    fn paste_internal(&mut self, copy_id: &str, paste_kind: &str) -> Result<bool, ClipboardError> {
        let Some((workbook_id, worksheet_id, selection)) = self.pasting_target() else {
            return Ok(false);
        };
        // Deep clone: the cached entry must survive this paste unchanged.
        let Some(entry) = self.cache.get(copy_id) else {
            return Ok(false);
        };
        let mut matrix = entry.matrix;

        // Style ids are workbook-scoped. Resolve them against the source
        // workbook's table before the content crosses into the destination.
        {
            let store = self.store.borrow();
            if let Some(source_workbook) = store.get(&entry.workbook_id) {
                let styles = source_workbook.styles();
                matrix.for_each_cell_mut(|_, _, cell| {
                    if matches!(cell.style, Some(StyleRef::Id(_))) {
                        let resolved = cell.style.as_ref().and_then(|s| styles.resolve(s));
                        cell.style = resolved.map(StyleRef::Inline);
                    }
                });
            }
        }

        if matrix.is_empty() || entry.rows == 0 || entry.cols == 0 {
            return Ok(false);
        }

        let merges = {
            let store = self.store.borrow();
            match store
                .get(&workbook_id)
                .and_then(|wb| wb.sheet_by_id(worksheet_id))
            {
                Some(sheet) => sheet.merged_regions.clone(),
                None => return Ok(false),
            }
        };

        // The cached dimensions, not the populated extent: merge-covered
        // positions are absent from the sparse fragment.
        let pasted_range = match resolve_paste_geometry(
            entry.rows,
            entry.cols,
            &mut matrix,
            &selection,
            &merges,
        ) {
            Ok(range) => range,
            Err(rejection) => {
                log::warn!("paste aborted: {}", rejection);
                // The copied-range marker survives a failed external
                // attempt but not an internal one.
                self.clear_copy_mark();
                return Ok(false);
            }
        };

        let target = PasteTarget {
            workbook_id,
            worksheet_id,
            range: pasted_range,
        };
        let source = PasteSource {
            workbook_id: entry.workbook_id.clone(),
            worksheet_id: entry.worksheet_id,
            range: entry.range,
            copy_kind: entry.copy_kind,
            copy_id: copy_id.to_string(),
        };
        let model = CopyDataModel::from_matrix(matrix);
        let result = self.paste_data_model(&model, &target, paste_kind, Some(source));

        if entry.copy_kind == CopyKind::Cut && result {
            self.cache.remove(copy_id);
        }
        self.clear_copy_mark();

        Ok(result)
    }

    /// Shared paste tail: veto, hook dispatch, transactional execution,
    /// undo/redo registration.
    fn paste_data_model(
        &mut self,
        model: &CopyDataModel,
        target: &PasteTarget,
        paste_kind: &str,
        source: Option<PasteSource>,
    ) -> bool {
        if target.range.cell_count() > self.config.max_paste_cells {
            log::warn!(
                "paste rejected: destination {} cells exceeds cap {}",
                target.range.cell_count(),
                self.config.max_paste_cells
            );
            return false;
        }

        // Pre-paste veto: every hook consulted so far is notified of the
        // abort, and nothing is executed.
        let mut consulted = 0;
        let mut vetoed = false;
        for hook in &mut self.hooks {
            consulted += 1;
            if !hook.on_before_paste(target) {
                vetoed = true;
                break;
            }
        }
        if vetoed {
            for hook in self.hooks.iter_mut().take(consulted) {
                hook.on_after_paste(false);
            }
            return false;
        }

        let copy_info = CopyInfo {
            copy_kind: source.as_ref().map_or(CopyKind::Copy, |s| s.copy_kind),
            source,
        };

        let mut redos: Vec<Mutation> = Vec::new();
        let mut undos: Vec<Mutation> = Vec::new();
        for hook in &self.hooks {
            if !hook_participates(hook.as_ref(), paste_kind) {
                continue;
            }
            if !model.row_properties.is_empty() {
                if let Some(batch) = hook.on_paste_rows(target, &model.row_properties, paste_kind)
                {
                    redos.extend(batch.redos);
                    undos.extend(batch.undos);
                }
            }
            if let Some(batch) = hook.on_paste_columns(target, &model.col_properties, paste_kind) {
                redos.extend(batch.redos);
                undos.extend(batch.undos);
            }
            if let Some(batch) =
                hook.on_paste_cells(target, &model.cell_matrix, paste_kind, &copy_info)
            {
                redos.extend(batch.redos);
                undos.extend(batch.undos);
            }
        }

        // Paste always re-selects the pasted area, whatever the paste kind.
        redos.push(self.set_selection_mutation(target, &model.cell_matrix));

        log::debug!(
            "pasting {} mutations ({} undo) into {}:{:?}",
            redos.len(),
            undos.len(),
            target.workbook_id,
            target.worksheet_id
        );

        // One logical transaction: first failure fails the paste. Executed
        // mutations are not compensated here; that belongs to the command
        // subsystem. No undo entry is recorded on failure.
        let result = redos.iter().all(|m| self.executor.execute(m));
        if result {
            self.undo_redo
                .push_undo_redo(&target.workbook_id, redos, undos);
        }

        for hook in &mut self.hooks {
            hook.on_after_paste(result);
        }

        result
    }

    fn set_selection_mutation(&self, target: &PasteTarget, matrix: &CellMatrix) -> Mutation {
        let start_row = target.range.start_row;
        let start_column = target.range.start_column;
        let mut primary = Range::single_cell(start_row, start_column);
        if let Some(main_cell) = matrix.get(0, 0) {
            let (row_span, col_span) = main_cell.span();
            if row_span > 1 || col_span > 1 {
                primary = Range::new(
                    start_row,
                    start_column,
                    start_row + row_span - 1,
                    start_column + col_span - 1,
                );
            }
        }
        Mutation::new(
            SET_SELECTIONS_OPERATION,
            &SetSelectionsParams {
                workbook_id: target.workbook_id.clone(),
                worksheet_id: target.worksheet_id,
                range: target.range,
                primary,
            },
        )
    }

    fn pasting_target(&self) -> Option<(String, SheetId, Range)> {
        let selection = self.selection.last_selection()?;
        let store = self.store.borrow();
        let workbook = store.current()?;
        Some((
            workbook.unit_id().to_string(),
            workbook.active_sheet().id,
            selection.range,
        ))
    }

    fn clear_copy_mark(&mut self) {
        if let Some(mark_id) = self.copy_mark_id.take() {
            self.mark.remove_mark(&mark_id);
        }
    }

    /// Number of cached copy entries (mainly for tests and diagnostics).
    pub fn cached_copies(&self) -> usize {
        self.cache.len()
    }
}

/// Pack the visible rows of a copied fragment consecutively, dropping the
/// filtered-out ones. Span info does not survive a filtered copy.
fn compact_filtered_rows(
    matrix: &CellMatrix,
    range: &Range,
    filtered: &BTreeSet<usize>,
) -> CellMatrix {
    let mut rows: BTreeMap<usize, Vec<(usize, Cell)>> = BTreeMap::new();
    matrix.for_each_cell(|r, c, cell| {
        rows.entry(r).or_default().push((c, cell.clone()));
        true
    });

    let mut out = CellMatrix::new();
    let mut out_row = 0;
    for r in 0..range.rows() {
        if filtered.contains(&(range.start_row + r)) {
            continue;
        }
        if let Some(cells) = rows.get(&r) {
            for (c, cell) in cells {
                let mut cell = cell.clone();
                cell.row_span = None;
                cell.col_span = None;
                out.set(out_row, *c, cell);
            }
        }
        out_row += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_filtered_rows_packs_visible() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, Cell::from_input("a"));
        matrix.set(1, 0, Cell::from_input("hidden"));
        matrix.set(2, 0, Cell::from_input("b"));

        let range = Range::new(10, 0, 12, 0);
        let filtered: BTreeSet<usize> = [11].into_iter().collect();
        let out = compact_filtered_rows(&matrix, &range, &filtered);

        assert_eq!(out.get(0, 0).unwrap().value.to_display(), "a");
        assert_eq!(out.get(1, 0).unwrap().value.to_display(), "b");
        assert_eq!(out.cell_count(), 2);
    }
}
