//! Document body copier

use super::attr::Scope;
use super::paragraph::copy_paragraph;
use super::table::copy_table;
use super::{page_break, CopyContext};
use crate::document::Block;
use crate::error::CopyError;

/// Append every top-level block of the source body to the destination, in
/// order. Returns how many blocks were appended.
pub fn copy_body(ctx: &mut CopyContext<'_>) -> usize {
    let source = ctx.source;
    let mut appended = 0;

    for block in source.blocks() {
        let copied = match block {
            Block::Paragraph(paragraph) => copy_paragraph(ctx, &paragraph),
            Block::Table(table) => copy_table(ctx, &table),
            Block::PageBreak(_) => page_break(),
            Block::Other(node) => {
                ctx.skip(
                    Scope::Body,
                    node.name.as_str(),
                    &CopyError::Unsupported(node.name.clone()),
                );
                continue;
            }
        };
        ctx.dest.append_block(copied);
        appended += 1;
    }

    appended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::markup::{ns, parse};
    use crate::merge::{AnchorRegistry, CopyReport};

    fn source_with_body(body: &str) -> Document {
        let mut source = Document::blank().unwrap();
        let xml = format!(
            r#"<w:body xmlns:w="{}">{body}</w:body>"#,
            ns::W
        );
        let parsed = parse("test.xml", xml.as_bytes()).unwrap();
        for block in parsed.elements() {
            source.append_block(block.clone());
        }
        source
    }

    #[test]
    fn test_blocks_copied_in_order_and_unknown_skipped() {
        let source = source_with_body(
            r#"<w:p><w:r><w:t>one</w:t></w:r></w:p>
               <w:p><w:r><w:br w:type="page"/></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
               <w:sdt><w:sdtContent><w:p/></w:sdtContent></w:sdt>
               <w:p><w:r><w:t>two</w:t></w:r></w:p>"#,
        );
        let mut dest = Document::blank().unwrap();
        let mut registry = AnchorRegistry::new();
        let mut report = CopyReport::new();
        let appended = {
            let mut ctx = CopyContext::new(&source, &mut dest, &mut registry, &mut report);
            copy_body(&mut ctx)
        };

        assert_eq!(appended, 4);
        let kinds: Vec<&str> = dest
            .blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(_) => Some("p"),
                Block::PageBreak(_) => Some("break"),
                Block::Table(_) => Some("tbl"),
                Block::Other(_) => None,
            })
            .collect();
        assert_eq!(kinds, vec!["p", "break", "tbl", "p"]);
        if let Some(Block::Other(last)) = dest.blocks().last() {
            assert_eq!(last.name, "w:sectPr");
        }
        assert!(report.skipped().iter().any(|s| s.item == "w:sdt"));
    }
}
