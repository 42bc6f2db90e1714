use gridclip_engine::matrix::CellMatrix;
use gridclip_engine::style::{Alignment, CellStyle, StyleTable};

use crate::plain_text::escape_special_code;

/// Serializes a matrix fragment to a `<table>` fragment.
///
/// The caller stamps the copy id onto the result; this layer only renders
/// structure, spans, and resolved styles.
#[derive(Debug, Default)]
pub struct GridToHtml;

impl GridToHtml {
    pub fn new() -> Self {
        Self
    }

    /// Render `matrix` (a rebased fragment, top-left at (0, 0)) as HTML.
    /// `col_widths` is an optional per-column width list contributed by
    /// copy hooks.
    pub fn convert(
        &self,
        matrix: &CellMatrix,
        styles: &StyleTable,
        col_widths: Option<&[Option<f64>]>,
    ) -> String {
        let Some(bounds) = matrix.bounding_range() else {
            return "<table></table>".to_string();
        };

        let mut html = String::from("<table>");

        if let Some(widths) = col_widths {
            html.push_str("<colgroup>");
            for width in widths {
                match width {
                    Some(w) => html.push_str(&format!("<col width=\"{}\">", w)),
                    None => html.push_str("<col>"),
                }
            }
            html.push_str("</colgroup>");
        }

        // Positions covered by a merge anchor are skipped, mirroring how
        // covered cells are absent from the matrix.
        let mut covered: Vec<(usize, usize)> = Vec::new();
        matrix.for_each_cell(|row, col, cell| {
            let (row_span, col_span) = cell.span();
            if row_span > 1 || col_span > 1 {
                for r in row..row + row_span {
                    for c in col..col + col_span {
                        if (r, c) != (row, col) {
                            covered.push((r, c));
                        }
                    }
                }
            }
            true
        });

        html.push_str("<tbody>");
        for row in bounds.start_row..=bounds.end_row {
            html.push_str("<tr>");
            for col in bounds.start_column..=bounds.end_column {
                if covered.contains(&(row, col)) {
                    continue;
                }
                let Some(cell) = matrix.get(row, col) else {
                    html.push_str("<td></td>");
                    continue;
                };

                html.push_str("<td");
                let (row_span, col_span) = cell.span();
                if row_span > 1 {
                    html.push_str(&format!(" rowspan=\"{}\"", row_span));
                }
                if col_span > 1 {
                    html.push_str(&format!(" colspan=\"{}\"", col_span));
                }
                if let Some(style) = cell.style.as_ref().and_then(|s| styles.resolve(s)) {
                    let css = style_to_css(&style);
                    if !css.is_empty() {
                        html.push_str(&format!(" style=\"{}\"", css));
                    }
                }
                html.push('>');
                html.push_str(&escape_special_code(&cell.value.to_display()));
                html.push_str("</td>");
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }
}

fn style_to_css(style: &CellStyle) -> String {
    let mut css = String::new();
    if style.bold {
        css.push_str("font-weight:bold;");
    }
    if style.italic {
        css.push_str("font-style:italic;");
    }
    if style.underline {
        css.push_str("text-decoration:underline;");
    } else if style.strikethrough {
        css.push_str("text-decoration:line-through;");
    }
    if let Some(size) = style.font_size {
        css.push_str(&format!("font-size:{}pt;", size));
    }
    if let Some(color) = &style.color {
        css.push_str(&format!("color:{};", color));
    }
    if let Some(background) = &style.background {
        css.push_str(&format!("background-color:{};", background));
    }
    match style.alignment {
        Alignment::Left => {}
        Alignment::Center => css.push_str("text-align:center;"),
        Alignment::Right => css.push_str("text-align:right;"),
    }
    css
}
