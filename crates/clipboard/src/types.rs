use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::range::Range;
use gridclip_engine::sheet::SheetId;
use serde::{Deserialize, Serialize};

/// Predefined hook names. Non-special hooks always participate in a paste;
/// special hooks participate only when the requested paste kind matches
/// their name.
pub const DEFAULT_COPY: &str = "default-copy";
pub const DEFAULT_PASTE: &str = "default-paste";
pub const SPECIAL_PASTE_VALUE: &str = "special-paste-value";
pub const SPECIAL_PASTE_FORMAT: &str = "special-paste-format";
pub const SPECIAL_PASTE_COL_WIDTH: &str = "special-paste-col-width";

/// Copy leaves the source untouched; Cut clears it, and its cache entry is
/// removed after a successful paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyKind {
    Copy,
    Cut,
}

/// Per-row properties carried alongside a pasted matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowProperties {
    pub height: Option<f64>,
}

/// Per-column properties carried alongside a pasted matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColProperties {
    pub width: Option<f64>,
}

/// What the HTML codec (or the copy cache) hands to the paste pipeline.
#[derive(Debug, Clone, Default)]
pub struct CopyDataModel {
    pub row_properties: Vec<RowProperties>,
    pub col_properties: Vec<ColProperties>,
    pub cell_matrix: CellMatrix,
}

impl CopyDataModel {
    pub fn from_matrix(cell_matrix: CellMatrix) -> Self {
        Self {
            row_properties: Vec::new(),
            col_properties: Vec::new(),
            cell_matrix,
        }
    }
}

/// The resolved destination of a paste. Always contiguous and non-empty.
#[derive(Debug, Clone)]
pub struct PasteTarget {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    pub range: Range,
}

/// Where an internal paste came from.
#[derive(Debug, Clone)]
pub struct PasteSource {
    pub workbook_id: String,
    pub worksheet_id: SheetId,
    pub range: Range,
    pub copy_kind: CopyKind,
    pub copy_id: String,
}

/// Copy provenance handed to cell-content paste hooks. External pastes have
/// no source; internal pastes carry the cached origin so cut-paste can move
/// rather than copy.
#[derive(Debug, Clone)]
pub struct CopyInfo {
    pub copy_kind: CopyKind,
    pub source: Option<PasteSource>,
}

impl CopyInfo {
    pub fn copy_range(&self) -> Option<Range> {
        self.source.as_ref().map(|s| s.range)
    }
}
