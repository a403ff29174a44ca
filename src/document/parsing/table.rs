//! Table grid resolution
//!
//! Rows in WordprocessingML list only the cells that physically exist.
//! Horizontal spans (`w:gridSpan`), skipped leading columns (`w:gridBefore`)
//! and vertical merges (`w:vMerge`) have to be folded back into a rectangular
//! grid before cells can be addressed by (row, column).

use crate::markup::Element;

/// Widest table Word can create. Declared widths past this are clamped.
pub(crate) const MAX_COLUMNS: usize = 63;

/// Resolve every row of `table` into grid columns.
///
/// Each slot holds the cell covering it: a spanned cell appears in every
/// column it spans, and a vertical-merge continuation resolves to the cell
/// that started the merge above it. Slots covered by nothing are `None`.
/// Rows never grow past [`MAX_COLUMNS`].
pub(crate) fn cell_grid(table: &Element) -> Vec<Vec<Option<&Element>>> {
    let mut grid: Vec<Vec<Option<&Element>>> = Vec::new();

    for row in table.children_named("w:tr") {
        let mut columns: Vec<Option<&Element>> = vec![None; grid_before(row).min(MAX_COLUMNS)];

        for cell in row_cells(row) {
            let start = columns.len();
            let span = grid_span(cell).min(MAX_COLUMNS - start);
            let continues = continues_merge(cell);
            for offset in 0..span {
                let covering = if continues {
                    grid.last()
                        .and_then(|above| above.get(start + offset).copied().flatten())
                        .unwrap_or(cell)
                } else {
                    cell
                };
                columns.push(Some(covering));
            }
        }

        grid.push(columns);
    }

    grid
}

/// The declared width of `table` when it exceeds [`MAX_COLUMNS`], from
/// either its grid or its widest row.
pub(crate) fn declared_overflow(table: &Element) -> Option<usize> {
    let grid = table
        .child("w:tblGrid")
        .map(|grid| grid.children_named("w:gridCol").count())
        .unwrap_or(0);
    let widest = table
        .children_named("w:tr")
        .map(|row| {
            row_cells(row)
                .iter()
                .fold(grid_before(row), |width, cell| width.saturating_add(grid_span(cell)))
        })
        .max()
        .unwrap_or(0);
    let declared = grid.max(widest);
    (declared > MAX_COLUMNS).then_some(declared)
}

/// Physical cells of a row, looking through content-control wrappers.
fn row_cells(row: &Element) -> Vec<&Element> {
    let mut cells = Vec::new();
    for child in row.elements() {
        match child.name.as_str() {
            "w:tc" => cells.push(child),
            "w:sdt" => {
                if let Some(content) = child.child("w:sdtContent") {
                    cells.extend(content.children_named("w:tc"));
                }
            }
            "w:customXml" => cells.extend(child.children_named("w:tc")),
            _ => {}
        }
    }
    cells
}

fn grid_before(row: &Element) -> usize {
    row.child("w:trPr")
        .and_then(|pr| pr.child("w:gridBefore"))
        .and_then(|el| el.attr("w:val"))
        .and_then(|val| val.parse().ok())
        .unwrap_or(0)
}

fn grid_span(cell: &Element) -> usize {
    cell.child("w:tcPr")
        .and_then(|pr| pr.child("w:gridSpan"))
        .and_then(|el| el.attr("w:val"))
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// `w:vMerge` without `w:val="restart"` continues the cell above.
fn continues_merge(cell: &Element) -> bool {
    cell.child("w:tcPr")
        .and_then(|pr| pr.child("w:vMerge"))
        .is_some_and(|merge| merge.attr("w:val") != Some("restart"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::view::Table;
    use crate::markup::{ns, parse};

    fn table(rows: &str) -> Element {
        let xml = format!(r#"<w:tbl xmlns:w="{}">{rows}</w:tbl>"#, ns::W);
        parse("test.xml", xml.as_bytes()).unwrap()
    }

    fn cell(text: &str, tc_pr: &str) -> String {
        format!(r#"<w:tc><w:tcPr>{tc_pr}</w:tcPr><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"#)
    }

    #[test]
    fn test_plain_grid() {
        let t = table(&format!(
            "<w:tr>{}{}</w:tr><w:tr>{}{}</w:tr>",
            cell("a", ""),
            cell("b", ""),
            cell("c", ""),
            cell("d", "")
        ));
        let view = Table::new(&t);
        assert_eq!(view.row_count(), 2);
        assert_eq!(view.column_count(), 2);
        let cells = view.cells();
        assert_eq!(cells[1][0].unwrap().text(), "c");
    }

    #[test]
    fn test_horizontal_span_covers_columns() {
        let t = table(&format!(
            r#"<w:tblGrid><w:gridCol/><w:gridCol/><w:gridCol/></w:tblGrid><w:tr>{}{}</w:tr>"#,
            cell("wide", r#"<w:gridSpan w:val="2"/>"#),
            cell("narrow", "")
        ));
        let cells = Table::new(&t).cells();
        assert_eq!(cells[0].len(), 3);
        assert_eq!(cells[0][0].unwrap().text(), "wide");
        assert_eq!(cells[0][1].unwrap().text(), "wide");
        assert_eq!(cells[0][2].unwrap().text(), "narrow");
    }

    #[test]
    fn test_vertical_merge_resolves_to_top_cell() {
        let t = table(&format!(
            "<w:tr>{}{}</w:tr><w:tr>{}{}</w:tr>",
            cell("top", r#"<w:vMerge w:val="restart"/>"#),
            cell("x", ""),
            cell("", "<w:vMerge/>"),
            cell("y", "")
        ));
        let cells = Table::new(&t).cells();
        assert_eq!(cells[1][0].unwrap().text(), "top");
        assert_eq!(cells[1][1].unwrap().text(), "y");
    }

    #[test]
    fn test_grid_before_leaves_gaps_and_widest_row_wins() {
        let t = table(&format!(
            r#"<w:tr><w:trPr><w:gridBefore w:val="1"/></w:trPr>{}</w:tr><w:tr>{}{}{}</w:tr>"#,
            cell("b", ""),
            cell("1", ""),
            cell("2", ""),
            cell("3", "")
        ));
        let view = Table::new(&t);
        let cells = view.cells();
        assert!(cells[0][0].is_none());
        assert_eq!(cells[0][1].unwrap().text(), "b");
        assert_eq!(view.column_count(), 3);
    }

    #[test]
    fn test_oversized_counts_are_clamped() {
        let t = table(&format!(
            r#"<w:tr><w:trPr><w:gridBefore w:val="18446744073709551615"/></w:trPr>{}</w:tr><w:tr>{}{}</w:tr>"#,
            cell("lost", ""),
            cell("wide", r#"<w:gridSpan w:val="4000000000"/>"#),
            cell("after", "")
        ));
        assert_eq!(declared_overflow(&t), Some(usize::MAX));

        let cells = Table::new(&t).cells();
        assert_eq!(cells[0].len(), MAX_COLUMNS);
        assert!(cells[0].iter().all(Option::is_none));
        assert_eq!(cells[1].len(), MAX_COLUMNS);
        assert!(cells[1].iter().all(|c| c.unwrap().text() == "wide"));
        assert_eq!(Table::new(&t).column_count(), MAX_COLUMNS);
    }

    #[test]
    fn test_ordinary_width_has_no_overflow() {
        let t = table(&format!("<w:tr>{}{}</w:tr>", cell("a", ""), cell("b", "")));
        assert_eq!(declared_overflow(&t), None);
    }
}
