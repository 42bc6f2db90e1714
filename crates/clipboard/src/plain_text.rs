use gridclip_engine::matrix::CellMatrix;

/// Serialize a matrix fragment as tab-separated plain text.
///
/// Rows ascend over the bounding rectangle; absent cells contribute an empty
/// field; rows are joined with a single newline and the last row has no
/// terminator. Plain text is not escaped — escaping exists only for the HTML
/// embedding path.
pub fn matrix_plain_text(matrix: &CellMatrix) -> String {
    let Some(bounds) = matrix.bounding_range() else {
        return String::new();
    };

    let mut plain = String::new();
    for row in bounds.start_row..=bounds.end_row {
        if row != bounds.start_row {
            plain.push('\n');
        }
        for col in bounds.start_column..=bounds.end_column {
            if col != bounds.start_column {
                plain.push('\t');
            }
            if let Some(cell) = matrix.get(row, col) {
                plain.push_str(&cell.value.to_display());
            }
        }
    }
    plain
}

/// Escape cell text for embedding into HTML markup. Strips the byte-order
/// mark some producers leave in cell text.
pub fn escape_special_code(cell_str: &str) -> String {
    let mut out = String::with_capacity(cell_str.len());
    for ch in cell_str.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{feff}' => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridclip_engine::cell::Cell;

    #[test]
    fn test_empty_matrix_is_empty_string() {
        assert_eq!(matrix_plain_text(&CellMatrix::new()), "");
    }

    #[test]
    fn test_rows_and_fields() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, Cell::from_input("1"));
        matrix.set(0, 1, Cell::from_input("2"));
        matrix.set(1, 0, Cell::from_input("3"));
        matrix.set(1, 1, Cell::from_input("4"));
        assert_eq!(matrix_plain_text(&matrix), "1\t2\n3\t4");
    }

    #[test]
    fn test_sparse_gaps_render_as_empty_fields() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, Cell::from_input("a"));
        matrix.set(0, 2, Cell::from_input("c"));
        matrix.set(2, 0, Cell::from_input("d"));
        // Row 1 is entirely empty; row 0 has a gap at column 1.
        assert_eq!(matrix_plain_text(&matrix), "a\t\tc\n\t\t\nd\t\t");
    }

    #[test]
    fn test_no_trailing_newline() {
        let mut matrix = CellMatrix::new();
        matrix.set(0, 0, Cell::from_input("x"));
        assert!(!matrix_plain_text(&matrix).ends_with('\n'));
    }

    #[test]
    fn test_escape_special_code() {
        assert_eq!(escape_special_code("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_special_code("\u{feff}x"), "x");
    }
}
