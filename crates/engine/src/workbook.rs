use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::sheet::{Sheet, SheetId};
use crate::style::StyleTable;

/// A workbook: a set of sheets plus the workbook-scoped style table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    unit_id: String,
    sheets: Vec<Sheet>,
    active_sheet: usize,
    /// Next ID to assign to a new sheet. Monotonically increasing, never reused.
    next_sheet_id: u64,
    styles: StyleTable,
}

impl Workbook {
    pub fn new(unit_id: impl Into<String>) -> Self {
        let sheet = Sheet::new(SheetId(1), 65536, 256);
        Self {
            unit_id: unit_id.into(),
            sheets: vec![sheet],
            active_sheet: 0,
            next_sheet_id: 2,
            styles: StyleTable::new(),
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> SheetId {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        let mut sheet = Sheet::new(id, 65536, 256);
        sheet.name = name.into();
        self.sheets.push(sheet);
        id
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active_sheet]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[self.active_sheet]
    }

    pub fn set_active_sheet(&mut self, index: usize) {
        if index < self.sheets.len() {
            self.active_sheet = index;
        }
    }

    pub fn sheet_by_id(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub fn sheet_by_id_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleTable {
        &mut self.styles
    }
}

/// Owner of the open workbooks, keyed by unit id, with one current workbook.
///
/// Passed by handle to whichever component needs it; there is no ambient
/// global instance.
#[derive(Debug, Default)]
pub struct WorkbookStore {
    workbooks: FxHashMap<String, Workbook>,
    current: Option<String>,
}

impl WorkbookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a workbook and make it current if none is.
    pub fn insert(&mut self, workbook: Workbook) {
        let unit_id = workbook.unit_id().to_string();
        if self.current.is_none() {
            self.current = Some(unit_id.clone());
        }
        self.workbooks.insert(unit_id, workbook);
    }

    pub fn get(&self, unit_id: &str) -> Option<&Workbook> {
        self.workbooks.get(unit_id)
    }

    pub fn get_mut(&mut self, unit_id: &str) -> Option<&mut Workbook> {
        self.workbooks.get_mut(unit_id)
    }

    pub fn set_current(&mut self, unit_id: &str) -> bool {
        if self.workbooks.contains_key(unit_id) {
            self.current = Some(unit_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&Workbook> {
        self.current.as_deref().and_then(|id| self.workbooks.get(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Workbook> {
        let id = self.current.clone()?;
        self.workbooks.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_ids_monotonic() {
        let mut wb = Workbook::new("book1");
        let a = wb.add_sheet("A");
        let b = wb.add_sheet("B");
        assert_eq!(a, SheetId(2));
        assert_eq!(b, SheetId(3));
        assert_eq!(wb.sheet_count(), 3);
        assert!(wb.sheet_by_id(a).is_some());
    }

    #[test]
    fn test_store_current_tracking() {
        let mut store = WorkbookStore::new();
        assert!(store.current().is_none());

        store.insert(Workbook::new("book1"));
        store.insert(Workbook::new("book2"));
        assert_eq!(store.current().unwrap().unit_id(), "book1");

        assert!(store.set_current("book2"));
        assert_eq!(store.current().unwrap().unit_id(), "book2");
        assert!(!store.set_current("missing"));
    }
}
