use serde::{Deserialize, Serialize};

use crate::style::StyleRef;

/// A cell's stored value. Closed set: downstream formatting and comparison
/// match exhaustively on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// An error literal such as `#DIV/0!` or `#REF!`.
    Error(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if trimmed.eq_ignore_ascii_case("TRUE") {
            return CellValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return CellValue::Boolean(false);
        }

        // Error literals round-trip as-is (#REF!, #DIV/0!, ...)
        if trimmed.starts_with('#') && trimmed.ends_with('!') {
            return CellValue::Error(trimmed.to_string());
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            return CellValue::Number(num);
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn to_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Boolean(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            CellValue::Error(e) => e.clone(),
        }
    }
}

/// One cell record as it travels through the clipboard pipeline.
///
/// A `row_span`/`col_span` greater than 1 marks this cell as the anchor of a
/// merged region; the covered positions are absent from the containing
/// matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_span: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col_span: Option<usize>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style: None,
            row_span: None,
            col_span: None,
        }
    }

    pub fn from_input(input: &str) -> Self {
        Self::new(CellValue::from_input(input))
    }

    /// Effective span, defaulting to 1x1.
    pub fn span(&self) -> (usize, usize) {
        (self.row_span.unwrap_or(1), self.col_span.unwrap_or(1))
    }

    pub fn is_merge_anchor(&self) -> bool {
        self.row_span.map_or(false, |s| s > 1) || self.col_span.map_or(false, |s| s > 1)
    }

    /// Content-only form: style and span info removed.
    pub fn strip_style_and_span(&mut self) {
        self.style = None;
        self.row_span = None;
        self.col_span = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_coercion() {
        assert_eq!(CellValue::from_input(""), CellValue::Empty);
        assert_eq!(CellValue::from_input("  "), CellValue::Empty);
        assert_eq!(CellValue::from_input("42"), CellValue::Number(42.0));
        assert_eq!(CellValue::from_input("-3.5"), CellValue::Number(-3.5));
        assert_eq!(CellValue::from_input("true"), CellValue::Boolean(true));
        assert_eq!(CellValue::from_input("FALSE"), CellValue::Boolean(false));
        assert_eq!(
            CellValue::from_input("#REF!"),
            CellValue::Error("#REF!".to_string())
        );
        assert_eq!(
            CellValue::from_input("hello"),
            CellValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_display_integer_without_fraction() {
        assert_eq!(CellValue::Number(3.0).to_display(), "3");
        assert_eq!(CellValue::Number(3.25).to_display(), "3.25");
        assert_eq!(CellValue::Boolean(true).to_display(), "TRUE");
        assert_eq!(CellValue::Empty.to_display(), "");
    }

    #[test]
    fn test_span_defaults_to_single() {
        let cell = Cell::from_input("x");
        assert_eq!(cell.span(), (1, 1));
        assert!(!cell.is_merge_anchor());
    }

    #[test]
    fn test_strip_style_and_span() {
        let mut cell = Cell::from_input("x");
        cell.row_span = Some(2);
        cell.col_span = Some(3);
        assert!(cell.is_merge_anchor());
        cell.strip_style_and_span();
        assert_eq!(cell.span(), (1, 1));
        assert!(cell.style.is_none());
    }
}
