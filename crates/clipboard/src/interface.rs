use std::cell::RefCell;
use std::rc::Rc;

use gridclip_engine::range::Range;

use crate::error::ClipboardError;

/// Recognized MIME types on the platform clipboard.
pub const PLAIN_TEXT_MIME: &str = "text/plain";
pub const HTML_MIME: &str = "text/html";

/// One clipboard payload: a list of MIME types with per-type content.
#[derive(Debug, Clone, Default)]
pub struct ClipboardItem {
    contents: Vec<(String, String)>,
}

impl ClipboardItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.contents.push((PLAIN_TEXT_MIME.to_string(), text.into()));
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.contents.push((HTML_MIME.to_string(), html.into()));
        self
    }

    pub fn types(&self) -> Vec<&str> {
        self.contents.iter().map(|(mime, _)| mime.as_str()).collect()
    }

    pub fn text_for(&self, mime: &str) -> Option<&str> {
        self.contents
            .iter()
            .find(|(m, _)| m == mime)
            .map(|(_, text)| text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// The platform clipboard boundary. `write` is a single atomic multi-MIME
/// write of both representations.
pub trait ClipboardInterface {
    fn write(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError>;
    fn read(&self) -> Result<ClipboardItem, ClipboardError>;
}

impl<T: ClipboardInterface> ClipboardInterface for Rc<RefCell<T>> {
    fn write(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError> {
        self.borrow_mut().write(plain, html)
    }

    fn read(&self) -> Result<ClipboardItem, ClipboardError> {
        self.borrow().read()
    }
}

/// In-memory clipboard for tests and headless embedding.
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    item: Option<ClipboardItem>,
}

impl InMemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardInterface for InMemoryClipboard {
    fn write(&mut self, plain: &str, html: &str) -> Result<(), ClipboardError> {
        self.item = Some(
            ClipboardItem::new()
                .with_plain_text(plain)
                .with_html(html),
        );
        Ok(())
    }

    fn read(&self) -> Result<ClipboardItem, ClipboardError> {
        self.item
            .clone()
            .ok_or_else(|| ClipboardError::ReadFailed("clipboard is empty".to_string()))
    }
}

/// The current selection on the active sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub range: Range,
}

/// Supplies the selection at call time. Copy and paste re-read the current
/// selection on every call — last selection wins.
pub trait SelectionProvider {
    fn last_selection(&self) -> Option<Selection>;
}

/// Selection state shared between the embedding shell and the clipboard
/// service.
#[derive(Debug, Clone, Default)]
pub struct SharedSelection {
    inner: Rc<RefCell<Option<Selection>>>,
}

impl SharedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, range: Range) {
        *self.inner.borrow_mut() = Some(Selection { range });
    }

    pub fn clear(&self) {
        *self.inner.borrow_mut() = None;
    }
}

impl SelectionProvider for SharedSelection {
    fn last_selection(&self) -> Option<Selection> {
        *self.inner.borrow()
    }
}

/// Visual marker over the copied range (the dashed border). Presentation
/// lives in the shell; the service only tracks the mark's lifetime.
pub trait MarkSelectionService {
    fn add_mark(&mut self, range: &Range) -> String;
    fn remove_mark(&mut self, id: &str);
}

/// Marker implementation for headless use.
#[derive(Debug, Default)]
pub struct NoopMarkSelection;

impl MarkSelectionService for NoopMarkSelection {
    fn add_mark(&mut self, _range: &Range) -> String {
        String::new()
    }

    fn remove_mark(&mut self, _id: &str) {}
}
