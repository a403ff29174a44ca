//! Read-only queries over a loaded document
//!
//! Used for the merge summary and for checking merged output.

use serde::Serialize;

use super::models::Document;
use super::view::Block;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub block_index: usize,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

/// Block counts of a document body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BodyStats {
    pub paragraphs: usize,
    pub tables: usize,
    pub page_breaks: usize,
    pub images: usize,
}

/// Case-insensitive search through paragraph and table cell text.
pub fn search_document(document: &Document, query: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    if query.trim().is_empty() {
        return results;
    }
    let query_lower = query.to_lowercase();

    for (block_index, block) in document.blocks().iter().enumerate() {
        let texts = match block {
            Block::Paragraph(paragraph) => vec![paragraph.text()],
            Block::Table(table) => table
                .element()
                .descendants("w:tc")
                .into_iter()
                .map(|tc| super::view::Cell::new(tc).text())
                .collect(),
            Block::PageBreak(_) | Block::Other(_) => continue,
        };

        for text in texts {
            let text_lower = text.to_lowercase();
            if let Some(start_pos) = text_lower.find(&query_lower) {
                results.push(SearchResult {
                    block_index,
                    text,
                    start_pos,
                    end_pos: start_pos + query_lower.len(),
                });
            }
        }
    }

    results
}

/// Text of every top-level paragraph, in body order.
pub fn paragraph_texts(document: &Document) -> Vec<String> {
    document
        .blocks()
        .iter()
        .filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph.text()),
            _ => None,
        })
        .collect()
}

pub fn body_stats(document: &Document) -> BodyStats {
    let mut stats = BodyStats::default();
    for block in document.blocks() {
        match block {
            Block::Paragraph(_) => stats.paragraphs += 1,
            Block::Table(_) => stats.tables += 1,
            Block::PageBreak(_) => stats.page_breaks += 1,
            Block::Other(_) => {}
        }
    }
    stats.images = document
        .body()
        .map(|body| body.descendants("a:blip").len())
        .unwrap_or(0);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{ns, parse};

    fn document(body: &str) -> Document {
        let mut doc = Document::blank().unwrap();
        let xml = format!(r#"<w:body xmlns:w="{}">{body}</w:body>"#, ns::W);
        for block in parse("test.xml", xml.as_bytes()).unwrap().elements() {
            doc.append_block(block.clone());
        }
        doc
    }

    fn sample() -> Document {
        document(
            r#"<w:p><w:r><w:t>Revenue rose</w:t></w:r></w:p>
               <w:p><w:r><w:br w:type="page"/></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Q4 revenue</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>12</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        )
    }

    #[test]
    fn test_empty_search_returns_no_results() {
        let doc = sample();
        assert!(search_document(&doc, "").is_empty());
        assert!(search_document(&doc, "   ").is_empty());
    }

    #[test]
    fn test_case_insensitive_search_covers_table_cells() {
        let doc = sample();
        let results = search_document(&doc, "REVENUE");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "Revenue rose");
        assert_eq!((results[0].start_pos, results[0].end_pos), (0, 7));
        assert_eq!(results[1].text, "Q4 revenue");
        assert_eq!(results[1].block_index, 2);
    }

    #[test]
    fn test_paragraph_texts_and_stats() {
        let doc = sample();
        assert_eq!(paragraph_texts(&doc), vec!["Revenue rose"]);
        assert_eq!(
            body_stats(&doc),
            BodyStats {
                paragraphs: 1,
                tables: 1,
                page_breaks: 1,
                images: 0,
            }
        );
    }
}
