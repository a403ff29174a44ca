//! Table copier
//!
//! Creates a destination table with the source's exact rows and grid columns,
//! then fills it cell by cell. Spans and vertical merges are not rebuilt: each
//! destination grid slot receives the content of the source cell covering it.

use super::attr::Scope;
use super::paragraph::copy_paragraph;
use super::CopyContext;
use crate::document::parsing::table::{declared_overflow, MAX_COLUMNS};
use crate::document::{Cell, Table};
use crate::error::CopyError;
use crate::markup::{element, schema, Element};

/// Cell properties carried over as opaque blocks.
const CELL_BLOCKS: &[&str] = &["w:tcW", "w:tcBorders", "w:shd", "w:vAlign"];

/// Copy one table into a new, detached destination table element.
pub fn copy_table(ctx: &mut CopyContext<'_>, table: &Table<'_>) -> Element {
    if let Some(declared) = declared_overflow(table.element()) {
        ctx.skip(
            Scope::Table,
            "w:tblGrid",
            &CopyError::malformed("table width", format!("{declared} columns (limit {MAX_COLUMNS})")),
        );
    }

    let rows = table.row_count();
    let columns = table.column_count();
    let mut out = skeleton(rows, columns, ctx.dest.text_width_twips());

    copy_table_properties(ctx, table, &mut out, columns);

    let grid = table.cells();
    {
        let mut dest_rows = out.elements_mut().filter(|e| e.name == "w:tr");
        for source_row in &grid {
            let Some(dest_row) = dest_rows.next() else {
                break;
            };
            let dest_cells = dest_row.elements_mut().filter(|e| e.name == "w:tc");
            for (column, dest_cell) in dest_cells.enumerate() {
                if let Some(source_cell) = source_row.get(column).copied().flatten() {
                    fill_cell(ctx, &source_cell, dest_cell);
                }
            }
        }
    }

    out
}

/// An empty `rows` x `columns` table shaped like a freshly added Word table.
fn skeleton(rows: usize, columns: usize, text_width: u32) -> Element {
    let column_width = (text_width as usize / columns.max(1)).to_string();

    let properties = element("w", "tblPr")
        .with_child(
            element("w", "tblW")
                .with_attr("w:type", "auto")
                .with_attr("w:w", "0"),
        )
        .with_child(
            element("w", "tblLook")
                .with_attr("w:firstColumn", "1")
                .with_attr("w:firstRow", "1")
                .with_attr("w:lastColumn", "0")
                .with_attr("w:lastRow", "0")
                .with_attr("w:noHBand", "0")
                .with_attr("w:noVBand", "1")
                .with_attr("w:val", "04A0"),
        );

    let mut grid = element("w", "tblGrid");
    for _ in 0..columns {
        grid.push(element("w", "gridCol").with_attr("w:w", column_width.as_str()));
    }

    let mut table = element("w", "tbl").with_child(properties).with_child(grid);
    for _ in 0..rows {
        let mut row = element("w", "tr");
        for _ in 0..columns {
            row.push(
                element("w", "tc")
                    .with_child(
                        element("w", "tcPr").with_child(
                            element("w", "tcW")
                                .with_attr("w:type", "dxa")
                                .with_attr("w:w", column_width.as_str()),
                        ),
                    )
                    .with_child(element("w", "p")),
            );
        }
        table.push(row);
    }
    table
}

fn copy_table_properties(
    ctx: &mut CopyContext<'_>,
    table: &Table<'_>,
    out: &mut Element,
    columns: usize,
) {
    let order = schema::TABLE_PROPERTIES;
    let mut style = None;
    if let Some(style_id) = table.style_id() {
        if ctx.dest.has_style(style_id) {
            style = Some(element("w", "tblStyle").with_attr("w:val", style_id));
        } else {
            ctx.skip(
                Scope::Table,
                "table style",
                &CopyError::UnknownStyle(style_id.to_string()),
            );
        }
    }
    let blocks: Vec<Element> = ["w:tblBorders", "w:tblW"]
        .iter()
        .filter_map(|name| table.property(name))
        .map(|block| ctx.clone_opaque(block))
        .collect();

    let properties = out.ensure_child_ordered("w:tblPr", schema::TABLE);
    if let Some(style) = style {
        properties.set_child_ordered(style, order);
    }
    for block in blocks {
        properties.set_child_ordered(block, order);
    }

    if let Some(grid) = table.grid() {
        if grid.children_named("w:gridCol").count() == columns {
            let grid = ctx.clone_opaque(grid);
            out.set_child_ordered(grid, schema::TABLE);
        }
    }
}

fn fill_cell(ctx: &mut CopyContext<'_>, source: &Cell<'_>, dest: &mut Element) {
    dest.children
        .retain(|node| matches!(node, crate::markup::Node::Element(e) if e.name == "w:tcPr"));

    for paragraph in source.paragraphs() {
        let copied = copy_paragraph(ctx, &paragraph);
        dest.push(copied);
    }

    let nested = source.nested_tables();
    if nested > 0 {
        ctx.skip(
            Scope::Cell,
            "w:tbl",
            &CopyError::Unsupported(format!("{nested} nested table(s)")),
        );
    }
    if dest.children_named("w:p").next().is_none() {
        dest.push(element("w", "p"));
    }

    let blocks: Vec<Element> = CELL_BLOCKS
        .iter()
        .filter_map(|name| source.property(name))
        .map(|block| ctx.clone_opaque(block))
        .collect();
    let properties = dest.ensure_child_ordered("w:tcPr", schema::CELL);
    for block in blocks {
        properties.set_child_ordered(block, schema::CELL_PROPERTIES);
    }
}
