use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Presentational attributes of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub alignment: Alignment,
    /// Font size in points. None = inherit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    /// Foreground color as #RRGGBB. None = inherit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background color as #RRGGBB. None = none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// Reference to a style: either an identifier into the owning workbook's
/// style table, or the style data inlined.
///
/// Style identifiers are workbook-scoped. Content that leaves its workbook
/// (cached copies pasted elsewhere) must be resolved to `Inline` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleRef {
    Id(String),
    Inline(CellStyle),
}

/// Workbook-owned table of named styles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleTable {
    styles: FxHashMap<String, CellStyle>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, style: CellStyle) {
        self.styles.insert(id.into(), style);
    }

    pub fn get(&self, id: &str) -> Option<&CellStyle> {
        self.styles.get(id)
    }

    /// Resolve a reference to concrete style data. Unknown ids resolve to
    /// None; callers decide whether that degrades to "no style".
    pub fn resolve(&self, style_ref: &StyleRef) -> Option<CellStyle> {
        match style_ref {
            StyleRef::Id(id) => self.styles.get(id).cloned(),
            StyleRef::Inline(style) => Some(style.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_id_and_inline() {
        let mut table = StyleTable::new();
        let style = CellStyle {
            bold: true,
            ..Default::default()
        };
        table.insert("s1", style.clone());

        assert_eq!(table.resolve(&StyleRef::Id("s1".to_string())), Some(style.clone()));
        assert_eq!(table.resolve(&StyleRef::Id("missing".to_string())), None);
        assert_eq!(table.resolve(&StyleRef::Inline(style.clone())), Some(style));
    }
}
