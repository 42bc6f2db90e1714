//! End-to-end clipboard scenarios over the in-memory collaborators.

use std::cell::RefCell;
use std::rc::Rc;

use gridclip_clipboard::config::ClipboardConfig;
use gridclip_clipboard::error::ClipboardError;
use gridclip_clipboard::hooks::ClipboardHook;
use gridclip_clipboard::html::{GridToHtml, HtmlToGrid};
use gridclip_clipboard::interface::{
    ClipboardInterface, ClipboardItem, InMemoryClipboard, NoopMarkSelection, SelectionProvider,
    SharedSelection, PLAIN_TEXT_MIME,
};
use gridclip_clipboard::mutation::{
    UndoRedoStack, WorkbookCommandExecutor, SET_SELECTIONS_OPERATION,
};
use gridclip_clipboard::service::SheetClipboardService;
use gridclip_clipboard::types::{CopyKind, PasteTarget, DEFAULT_PASTE, SPECIAL_PASTE_VALUE};
use gridclip_engine::cell::{Cell, CellValue};
use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::MergedRegion;
use gridclip_engine::style::{CellStyle, StyleRef, StyleTable};
use gridclip_engine::workbook::{Workbook, WorkbookStore};

struct Fixture {
    store: Rc<RefCell<WorkbookStore>>,
    selection: SharedSelection,
    clipboard: Rc<RefCell<InMemoryClipboard>>,
    undo: Rc<RefCell<UndoRedoStack>>,
    service: SheetClipboardService,
}

fn fixture() -> Fixture {
    let mut store = WorkbookStore::new();
    store.insert(Workbook::new("book1"));
    let store = Rc::new(RefCell::new(store));
    let selection = SharedSelection::new();
    let clipboard = Rc::new(RefCell::new(InMemoryClipboard::new()));
    let undo = Rc::new(RefCell::new(UndoRedoStack::new()));
    let executor = WorkbookCommandExecutor::new(Rc::clone(&store), selection.clone());

    let mut service = SheetClipboardService::new(
        Rc::clone(&store),
        Box::new(Rc::clone(&clipboard)),
        Box::new(selection.clone()),
        Box::new(executor),
        Box::new(Rc::clone(&undo)),
        Box::new(NoopMarkSelection),
        ClipboardConfig::default(),
    );
    service.register_default_hooks();

    Fixture {
        store,
        selection,
        clipboard,
        undo,
        service,
    }
}

fn set_values(fx: &Fixture, cells: &[(usize, usize, &str)]) {
    let mut store = fx.store.borrow_mut();
    let sheet = store.current_mut().unwrap().active_sheet_mut();
    for (row, col, value) in cells {
        sheet.set_value(*row, *col, value);
    }
}

fn display(fx: &Fixture, row: usize, col: usize) -> String {
    fx.store
        .borrow()
        .current()
        .unwrap()
        .active_sheet()
        .get_display(row, col)
}

fn read_item(fx: &Fixture) -> ClipboardItem {
    fx.clipboard.borrow().read().unwrap()
}

#[test]
fn test_copy_then_internal_paste_same_shape() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "1"), (0, 1, "2"), (1, 0, "3"), (1, 1, "4")]);
    fx.selection.select(Range::new(0, 0, 1, 1));

    assert!(fx.service.copy(CopyKind::Copy).unwrap());
    assert_eq!(fx.service.cached_copies(), 1);

    let item = read_item(&fx);
    fx.selection.select(Range::new(0, 3, 1, 4));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    assert_eq!(display(&fx, 0, 3), "1");
    assert_eq!(display(&fx, 0, 4), "2");
    assert_eq!(display(&fx, 1, 3), "3");
    assert_eq!(display(&fx, 1, 4), "4");

    // Copy, not cut: the cache entry survives, and the source is untouched.
    assert_eq!(fx.service.cached_copies(), 1);
    assert_eq!(display(&fx, 0, 0), "1");

    // Paste re-selected the pasted area.
    assert_eq!(
        fx.selection.last_selection().unwrap().range,
        Range::new(0, 3, 1, 4)
    );

    // Exactly one undo record, whose redo list ends with the selection op.
    let undo = fx.undo.borrow();
    assert_eq!(undo.undo_len(), 1);
    let entry = undo.last().unwrap();
    assert_eq!(entry.unit_id, "book1");
    assert_eq!(entry.redos.last().unwrap().id, SET_SELECTIONS_OPERATION);
}

#[test]
fn test_cut_paste_moves_content_and_drops_cache_entry() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "1"), (0, 1, "2"), (1, 0, "3"), (1, 1, "4")]);
    fx.selection.select(Range::new(0, 0, 1, 1));

    assert!(fx.service.cut().unwrap());
    assert_eq!(fx.service.cached_copies(), 1);

    let item = read_item(&fx);
    fx.selection.select(Range::new(5, 5, 6, 6));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    // Destination received the block; the cut source was cleared.
    assert_eq!(display(&fx, 5, 5), "1");
    assert_eq!(display(&fx, 6, 6), "4");
    assert_eq!(display(&fx, 0, 0), "");
    assert_eq!(display(&fx, 1, 1), "");

    // Cache entry removed after a successful cut-paste.
    assert_eq!(fx.service.cached_copies(), 0);
}

#[test]
fn test_plain_text_only_paste_hits_single_cell() {
    let mut fx = fixture();
    fx.selection.select(Range::single_cell(4, 5));

    let item = ClipboardItem::new().with_plain_text("hello");
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    assert_eq!(display(&fx, 4, 5), "hello");
    // Neighbors untouched; no tiling semantics for raw text.
    assert_eq!(display(&fx, 4, 6), "");
    assert_eq!(display(&fx, 5, 5), "");
}

#[test]
fn test_internal_paste_tiles_exact_multiple() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "1"), (0, 1, "2"), (1, 0, "3"), (1, 1, "4")]);
    fx.selection.select(Range::new(0, 0, 1, 1));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::new(4, 0, 7, 3));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    let source = [["1", "2"], ["3", "4"]];
    for r in 0..4 {
        for c in 0..4 {
            assert_eq!(
                display(&fx, 4 + r, c),
                source[r % 2][c % 2],
                "tile mismatch at offset ({}, {})",
                r,
                c
            );
        }
    }
}

#[test]
fn test_merge_conflict_aborts_without_mutation() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "1"), (0, 1, "2"), (1, 0, "3"), (1, 1, "4")]);
    {
        let mut store = fx.store.borrow_mut();
        let sheet = store.current_mut().unwrap().active_sheet_mut();
        sheet.add_merge(MergedRegion::new(10, 0, 12, 1)).unwrap();
    }

    fx.selection.select(Range::new(0, 0, 1, 1));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::new(10, 0, 12, 2));
    assert!(!fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    // Zero mutations applied, no undo history.
    assert_eq!(display(&fx, 10, 0), "");
    assert_eq!(fx.undo.borrow().undo_len(), 0);
}

#[test]
fn test_single_cell_into_covering_merge_strips_without_tiling() {
    let mut fx = fixture();
    {
        let mut store = fx.store.borrow_mut();
        let sheet = store.current_mut().unwrap().active_sheet_mut();
        let mut cell = Cell::from_input("solo");
        cell.style = Some(StyleRef::Inline(CellStyle {
            bold: true,
            ..Default::default()
        }));
        sheet.set_cell(0, 0, cell);
        sheet.add_merge(MergedRegion::new(5, 5, 6, 6)).unwrap();
    }

    fx.selection.select(Range::single_cell(0, 0));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::new(5, 5, 6, 6));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    let store = fx.store.borrow();
    let sheet = store.current().unwrap().active_sheet();
    let pasted = sheet.get_cell(5, 5).unwrap();
    assert_eq!(pasted.value, CellValue::Text("solo".to_string()));
    assert!(pasted.style.is_none());
    assert_eq!(pasted.span(), (1, 1));
    // Not tiled: the other merge-covered corner got no content.
    assert!(sheet.get_cell(6, 6).is_none());
}

struct VetoHook {
    outcomes: Rc<RefCell<Vec<bool>>>,
}

impl ClipboardHook for VetoHook {
    fn hook_name(&self) -> &str {
        "veto"
    }

    fn on_before_paste(&mut self, _target: &PasteTarget) -> bool {
        false
    }

    fn on_after_paste(&mut self, success: bool) {
        self.outcomes.borrow_mut().push(success);
    }
}

#[test]
fn test_hook_veto_blocks_paste_and_notifies() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "x")]);
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    assert!(fx.service.add_hook(Box::new(VetoHook {
        outcomes: Rc::clone(&outcomes),
    })));

    fx.selection.select(Range::single_cell(0, 0));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::single_cell(3, 3));
    assert!(!fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    assert_eq!(display(&fx, 3, 3), "");
    assert_eq!(fx.undo.borrow().undo_len(), 0);
    assert_eq!(*outcomes.borrow(), vec![false]);
}

#[test]
fn test_external_html_paste_applies_values_and_col_widths() {
    let mut fx = fixture();
    fx.selection.select(Range::single_cell(2, 2));

    let html = "<table><colgroup><col width=\"96\"><col width=\"48\"></colgroup>\
        <tr><td>10</td><td>twenty</td></tr>\
        <tr><td>30</td><td>40</td></tr></table>";
    let item = ClipboardItem::new().with_html(html);
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    assert_eq!(display(&fx, 2, 2), "10");
    assert_eq!(display(&fx, 2, 3), "twenty");
    assert_eq!(display(&fx, 3, 2), "30");
    assert_eq!(display(&fx, 3, 3), "40");

    let store = fx.store.borrow();
    let sheet = store.current().unwrap().active_sheet();
    assert_eq!(sheet.col_width(2), Some(96.0));
    assert_eq!(sheet.col_width(3), Some(48.0));

    // Destination was resized to the source footprint and re-selected.
    assert_eq!(
        fx.selection.last_selection().unwrap().range,
        Range::new(2, 2, 3, 3)
    );
}

#[test]
fn test_paste_with_no_usable_format_errors() {
    let mut fx = fixture();
    fx.selection.select(Range::single_cell(0, 0));
    let err = fx
        .service
        .paste(&ClipboardItem::new(), DEFAULT_PASTE)
        .unwrap_err();
    assert!(matches!(err, ClipboardError::NoClipboardData));
}

#[test]
fn test_copy_with_nothing_selected_returns_false() {
    let mut fx = fixture();
    assert!(!fx.service.copy(CopyKind::Copy).unwrap());
    assert_eq!(fx.service.cached_copies(), 0);
}

#[test]
fn test_internal_paste_resolves_style_ids_from_source_workbook() {
    let mut fx = fixture();
    {
        let mut store = fx.store.borrow_mut();
        let workbook = store.current_mut().unwrap();
        workbook.styles_mut().insert(
            "s1",
            CellStyle {
                bold: true,
                ..Default::default()
            },
        );
        let sheet = workbook.active_sheet_mut();
        let mut cell = Cell::from_input("styled");
        cell.style = Some(StyleRef::Id("s1".to_string()));
        sheet.set_cell(0, 0, cell);
        store.insert(Workbook::new("book2"));
    }

    fx.selection.select(Range::single_cell(0, 0));
    fx.service.copy(CopyKind::Copy).unwrap();
    let item = read_item(&fx);

    fx.store.borrow_mut().set_current("book2");
    fx.selection.select(Range::single_cell(2, 2));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    let store = fx.store.borrow();
    let cell = store
        .get("book2")
        .unwrap()
        .active_sheet()
        .get_cell(2, 2)
        .unwrap()
        .clone();
    match cell.style.unwrap() {
        StyleRef::Inline(style) => assert!(style.bold),
        StyleRef::Id(id) => panic!("style id '{}' should have been resolved inline", id),
    }
}

struct FilterHook {
    rows: Vec<usize>,
}

impl ClipboardHook for FilterHook {
    fn hook_name(&self) -> &str {
        "filter"
    }

    fn filtered_out_rows(&self) -> Vec<usize> {
        self.rows.clone()
    }
}

#[test]
fn test_filtered_rows_are_excluded_from_copy() {
    let mut fx = fixture();
    set_values(&fx, &[(0, 0, "a"), (1, 0, "hidden"), (2, 0, "c")]);
    assert!(fx.service.add_hook(Box::new(FilterHook { rows: vec![1] })));

    fx.selection.select(Range::new(0, 0, 2, 0));
    assert!(fx.service.copy(CopyKind::Copy).unwrap());

    let item = read_item(&fx);
    assert_eq!(item.text_for(PLAIN_TEXT_MIME), Some("a\nc"));

    // The cached matrix is packed the same way: pasting yields two rows.
    fx.selection.select(Range::single_cell(0, 4));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());
    assert_eq!(display(&fx, 0, 4), "a");
    assert_eq!(display(&fx, 1, 4), "c");
    assert_eq!(display(&fx, 2, 4), "");
}

#[test]
fn test_special_paste_value_drops_styles() {
    let mut fx = fixture();
    {
        let mut store = fx.store.borrow_mut();
        let sheet = store.current_mut().unwrap().active_sheet_mut();
        let mut cell = Cell::from_input("42");
        cell.style = Some(StyleRef::Inline(CellStyle {
            italic: true,
            ..Default::default()
        }));
        sheet.set_cell(0, 0, cell);
    }

    fx.selection.select(Range::single_cell(0, 0));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::single_cell(0, 2));
    assert!(fx.service.paste(&item, SPECIAL_PASTE_VALUE).unwrap());

    let store = fx.store.borrow();
    let cell = store
        .current()
        .unwrap()
        .active_sheet()
        .get_cell(0, 2)
        .unwrap()
        .clone();
    assert_eq!(cell.value, CellValue::Number(42.0));
    assert!(cell.style.is_none());
}

#[test]
fn test_merged_copy_recreates_merge_at_destination() {
    let mut fx = fixture();
    {
        let mut store = fx.store.borrow_mut();
        let sheet = store.current_mut().unwrap().active_sheet_mut();
        sheet.set_value(0, 0, "anchor");
        sheet.add_merge(MergedRegion::new(0, 0, 1, 1)).unwrap();
    }

    // Selecting just the anchor expands to the whole merge on copy.
    fx.selection.select(Range::single_cell(0, 0));
    fx.service.copy(CopyKind::Copy).unwrap();

    let item = read_item(&fx);
    fx.selection.select(Range::new(4, 4, 5, 5));
    assert!(fx.service.paste(&item, DEFAULT_PASTE).unwrap());

    let store = fx.store.borrow();
    let sheet = store.current().unwrap().active_sheet();
    assert_eq!(sheet.get_display(4, 4), "anchor");
    assert!(sheet
        .merged_regions
        .contains(&MergedRegion::new(4, 4, 5, 5)));
    // The pasted primary selection covers the merge.
    assert_eq!(
        fx.selection.last_selection().unwrap().range,
        Range::new(4, 4, 5, 5)
    );
}

#[test]
fn test_html_round_trip_reproduces_values() {
    let mut matrix = CellMatrix::new();
    matrix.set(0, 0, Cell::from_input("a<b"));
    matrix.set(0, 1, Cell::from_input("3.5"));
    matrix.set(1, 0, Cell::from_input("TRUE"));
    matrix.set(1, 1, Cell::from_input("plain"));

    let html = GridToHtml::new().convert(&matrix, &StyleTable::new(), None);
    let model = HtmlToGrid::new().convert(&html);

    assert_eq!(
        model.cell_matrix.get(0, 0).unwrap().value,
        CellValue::Text("a<b".to_string())
    );
    assert_eq!(
        model.cell_matrix.get(0, 1).unwrap().value,
        CellValue::Number(3.5)
    );
    assert_eq!(
        model.cell_matrix.get(1, 0).unwrap().value,
        CellValue::Boolean(true)
    );
    assert_eq!(
        model.cell_matrix.get(1, 1).unwrap().value,
        CellValue::Text("plain".to_string())
    );
}
