use std::collections::HashSet;

use gridclip_engine::cell::{Cell, CellValue};
use gridclip_engine::style::{Alignment, CellStyle, StyleRef};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::plugins::{GridPastePlugin, PastePlugin, WordPastePlugin};
use crate::types::{ColProperties, CopyDataModel, RowProperties};

/// Parses external HTML into a `CopyDataModel` through an ordered set of
/// per-producer recognizers; the first plugin that claims the content wins,
/// and the generic table reader is the fallback.
pub struct HtmlToGrid {
    plugins: Vec<Box<dyn PastePlugin>>,
}

impl Default for HtmlToGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlToGrid {
    pub fn new() -> Self {
        let mut converter = Self {
            plugins: Vec::new(),
        };
        converter.use_plugin(Box::new(WordPastePlugin));
        converter.use_plugin(Box::new(GridPastePlugin));
        converter
    }

    /// Register a recognizer. Order of registration is the order of
    /// consultation.
    pub fn use_plugin(&mut self, plugin: Box<dyn PastePlugin>) {
        self.plugins.push(plugin);
    }

    /// Convert HTML to a data model. Content no recognizer can make sense of
    /// yields an empty matrix; the caller treats that paste as a no-op.
    pub fn convert(&self, html: &str) -> CopyDataModel {
        if !html.to_ascii_lowercase().contains("<table") {
            return CopyDataModel::default();
        }
        for plugin in &self.plugins {
            if plugin.can_handle(html) {
                if let Some(model) = plugin.convert(html) {
                    return model;
                }
            }
        }
        read_table(html)
    }
}

struct PendingCell {
    row: usize,
    col: usize,
    row_span: usize,
    col_span: usize,
    style: CellStyle,
    text: String,
}

/// Generic `<table>` reader: one lenient event pass over the first table in
/// the markup. Span attributes reproduce merge anchors; covered positions
/// are skipped when assigning column indices, as they would be in the
/// source grid.
pub fn read_table(html: &str) -> CopyDataModel {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut model = CopyDataModel::default();
    let mut depth: usize = 0;
    let mut row: i64 = -1;
    let mut col: usize = 0;
    let mut occupied: HashSet<(usize, usize)> = HashSet::new();
    let mut pending: Option<PendingCell> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            // Lenient mode: hand back whatever was readable.
            Err(_) => break,
        };
        let self_closing = matches!(&event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name().as_ref().to_ascii_lowercase();
                match name.as_slice() {
                    b"table" => depth += 1,
                    b"col" if depth == 1 => {
                        let width = attr_value(e, "width")
                            .as_deref()
                            .and_then(parse_dimension)
                            .or_else(|| style_dimension(e, "width"));
                        let span = attr_value(e, "span")
                            .and_then(|s| s.parse::<usize>().ok())
                            .unwrap_or(1)
                            .max(1);
                        for _ in 0..span {
                            model.col_properties.push(ColProperties { width });
                        }
                    }
                    b"tr" if depth == 1 => {
                        // Implicitly close a cell left open by sloppy markup.
                        if let Some(cell) = pending.take() {
                            finish_cell(&mut model, cell, &mut col);
                        }
                        row += 1;
                        col = 0;
                        let height = attr_value(e, "height")
                            .as_deref()
                            .and_then(parse_dimension)
                            .or_else(|| style_dimension(e, "height"));
                        model.row_properties.push(RowProperties { height });
                    }
                    b"td" | b"th" if depth == 1 && row >= 0 => {
                        if let Some(cell) = pending.take() {
                            finish_cell(&mut model, cell, &mut col);
                        }
                        let r = row as usize;
                        while occupied.contains(&(r, col)) {
                            col += 1;
                        }
                        let row_span = span_attr(e, "rowspan");
                        let col_span = span_attr(e, "colspan");
                        for rr in r..r + row_span {
                            for cc in col..col + col_span {
                                if (rr, cc) != (r, col) {
                                    occupied.insert((rr, cc));
                                }
                            }
                        }
                        let mut style = attr_value(e, "style")
                            .map(|s| parse_inline_style(&s))
                            .unwrap_or_default();
                        if style.background.is_none() {
                            style.background = attr_value(e, "bgcolor");
                        }
                        let cell = PendingCell {
                            row: r,
                            col,
                            row_span,
                            col_span,
                            style,
                            text: String::new(),
                        };
                        if self_closing {
                            finish_cell(&mut model, cell, &mut col);
                        } else {
                            pending = Some(cell);
                        }
                    }
                    b"b" | b"strong" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.style.bold = true;
                        }
                    }
                    b"i" | b"em" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.style.italic = true;
                        }
                    }
                    b"u" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.style.underline = true;
                        }
                    }
                    b"s" | b"strike" | b"del" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.style.strikethrough = true;
                        }
                    }
                    b"br" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name().as_ref().to_ascii_lowercase();
                match name.as_slice() {
                    b"table" => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                    }
                    b"td" | b"th" | b"tr" if depth == 1 => {
                        if let Some(cell) = pending.take() {
                            finish_cell(&mut model, cell, &mut col);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                if depth == 1 {
                    if let Some(cell) = pending.as_mut() {
                        // Entity references arrive as separate GeneralRef
                        // events; the raw bytes here are plain text.
                        cell.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
            }
            Event::GeneralRef(ref e) => {
                if depth == 1 {
                    if let Some(cell) = pending.as_mut() {
                        if let Some(ch) = resolve_entity(e.as_ref()) {
                            cell.text.push(ch);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(cell) = pending.take() {
        finish_cell(&mut model, cell, &mut col);
    }

    model
}

fn finish_cell(model: &mut CopyDataModel, pending: PendingCell, col: &mut usize) {
    let value = coerce_external_text(&pending.text);
    let style = if pending.style == CellStyle::default() {
        None
    } else {
        Some(StyleRef::Inline(pending.style))
    };
    let is_anchor = pending.row_span > 1 || pending.col_span > 1;

    // Fully empty cells stay absent, keeping the matrix sparse.
    if !value.is_empty() || style.is_some() || is_anchor {
        let cell = Cell {
            value,
            style,
            row_span: if pending.row_span > 1 {
                Some(pending.row_span)
            } else {
                None
            },
            col_span: if pending.col_span > 1 {
                Some(pending.col_span)
            } else {
                None
            },
        };
        model.cell_matrix.set(pending.row, pending.col, cell);
    }
    *col += pending.col_span;
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = e.try_get_attribute(name).ok().flatten()?;
    Some(match attr.unescape_value() {
        Ok(value) => value.into_owned(),
        Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
    })
}

fn span_attr(e: &BytesStart<'_>, name: &str) -> usize {
    attr_value(e, name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

fn style_dimension(e: &BytesStart<'_>, property: &str) -> Option<f64> {
    let style = attr_value(e, "style")?;
    for declaration in style.split(';') {
        let mut parts = declaration.splitn(2, ':');
        let key = parts.next()?.trim().to_ascii_lowercase();
        if key == property {
            return parse_dimension(parts.next()?.trim());
        }
    }
    None
}

/// Parse "72", "72px", "54pt" to a number. Unit conversion is not attempted.
fn parse_dimension(value: &str) -> Option<f64> {
    let trimmed = value
        .trim()
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim();
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Coerce text from a foreign producer into a typed value. Leading zeros
/// ("007") are preserved as text rather than collapsed to a number.
fn coerce_external_text(text: &str) -> CellValue {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    if trimmed.len() > 1 && trimmed.starts_with('0') && trimmed.as_bytes()[1].is_ascii_digit() {
        return CellValue::Text(trimmed.to_string());
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    if trimmed.starts_with('#') && trimmed.ends_with('!') {
        return CellValue::Error(trimmed.to_string());
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        return CellValue::Number(n);
    }

    CellValue::Text(trimmed.to_string())
}

fn parse_inline_style(style_attr: &str) -> CellStyle {
    let mut style = CellStyle::default();
    for declaration in style_attr.split(';') {
        let mut parts = declaration.splitn(2, ':');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "font-weight" => {
                let lowered = value.to_ascii_lowercase();
                if lowered == "bold" || lowered == "bolder" {
                    style.bold = true;
                } else if let Ok(weight) = lowered.parse::<u32>() {
                    style.bold = weight >= 600;
                }
            }
            "font-style" => {
                if value.eq_ignore_ascii_case("italic") {
                    style.italic = true;
                }
            }
            "text-decoration" | "text-decoration-line" => {
                let lowered = value.to_ascii_lowercase();
                if lowered.contains("underline") {
                    style.underline = true;
                }
                if lowered.contains("line-through") {
                    style.strikethrough = true;
                }
            }
            "color" => style.color = Some(value.to_string()),
            "background-color" | "background" => style.background = Some(value.to_string()),
            "font-size" => {
                if let Some(size) = parse_dimension(value) {
                    style.font_size = Some(size.round() as u32);
                }
            }
            "text-align" => {
                if value.eq_ignore_ascii_case("center") {
                    style.alignment = Alignment::Center;
                } else if value.eq_ignore_ascii_case("right") {
                    style.alignment = Alignment::Right;
                }
            }
            _ => {}
        }
    }
    style
}

fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        b"nbsp" => Some(' '),
        _ => {
            // Numeric character references: &#65; or &#x41;
            let text = std::str::from_utf8(name).ok()?;
            let rest = text.strip_prefix('#')?;
            let code = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                rest.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table() {
        let model = read_table("<table><tr><td>1</td><td>two</td></tr><tr><td>3</td></tr></table>");
        assert_eq!(
            model.cell_matrix.get(0, 0).unwrap().value,
            CellValue::Number(1.0)
        );
        assert_eq!(
            model.cell_matrix.get(0, 1).unwrap().value,
            CellValue::Text("two".to_string())
        );
        assert_eq!(
            model.cell_matrix.get(1, 0).unwrap().value,
            CellValue::Number(3.0)
        );
    }

    #[test]
    fn test_spans_shift_following_cells() {
        // B spans 2x2; C must land in column 2, and the second row's only
        // cell lands in column 2 as well.
        let html = "<table>\
            <tr><td rowspan=\"2\" colspan=\"2\">B</td><td>C</td></tr>\
            <tr><td>D</td></tr>\
            </table>";
        let model = read_table(html);
        let anchor = model.cell_matrix.get(0, 0).unwrap();
        assert_eq!(anchor.span(), (2, 2));
        assert_eq!(
            model.cell_matrix.get(0, 2).unwrap().value,
            CellValue::Text("C".to_string())
        );
        assert_eq!(
            model.cell_matrix.get(1, 2).unwrap().value,
            CellValue::Text("D".to_string())
        );
        assert!(model.cell_matrix.get(1, 0).is_none());
    }

    #[test]
    fn test_inline_styles_recognized() {
        let html = "<table><tr>\
            <td style=\"font-weight:bold;background-color:#ff0000\">x</td>\
            <td><b>y</b></td>\
            </tr></table>";
        let model = read_table(html);
        let styled = model.cell_matrix.get(0, 0).unwrap();
        match styled.style.as_ref().unwrap() {
            StyleRef::Inline(style) => {
                assert!(style.bold);
                assert_eq!(style.background.as_deref(), Some("#ff0000"));
            }
            StyleRef::Id(_) => panic!("expected inline style"),
        }
        let tagged = model.cell_matrix.get(0, 1).unwrap();
        match tagged.style.as_ref().unwrap() {
            StyleRef::Inline(style) => assert!(style.bold),
            StyleRef::Id(_) => panic!("expected inline style"),
        }
    }

    #[test]
    fn test_row_and_col_properties() {
        let html = "<table><colgroup><col width=\"72\"><col width=\"100px\"></colgroup>\
            <tr style=\"height:28px\"><td>a</td><td>b</td></tr></table>";
        let model = read_table(html);
        assert_eq!(model.col_properties.len(), 2);
        assert_eq!(model.col_properties[0].width, Some(72.0));
        assert_eq!(model.col_properties[1].width, Some(100.0));
        assert_eq!(model.row_properties[0].height, Some(28.0));
    }

    #[test]
    fn test_entities_and_leading_zeros() {
        let html = "<table><tr><td>a &amp; b</td><td>007</td></tr></table>";
        let model = read_table(html);
        assert_eq!(
            model.cell_matrix.get(0, 0).unwrap().value,
            CellValue::Text("a & b".to_string())
        );
        assert_eq!(
            model.cell_matrix.get(0, 1).unwrap().value,
            CellValue::Text("007".to_string())
        );
    }

    #[test]
    fn test_no_table_yields_empty_model() {
        let model = HtmlToGrid::new().convert("<p>just a paragraph</p>");
        assert!(model.cell_matrix.is_empty());
    }

    #[test]
    fn test_unclosed_markup_is_tolerated() {
        let model = read_table("<table><tr><td>1<td>2</table>");
        // Browser-grade HTML without closing tags still produces the first
        // cell; the reader never panics on malformed input.
        assert!(!model.cell_matrix.is_empty());
    }
}
