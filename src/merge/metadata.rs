//! Document metadata copier

use super::attr::{CopyReport, Scope};
use crate::document::{CoreField, Document};

/// Copy title, subject, author, keywords and comments from `source`.
///
/// Each field is copied on its own. A readable field always wins, including
/// an absent one, which clears the destination field.
pub fn copy_metadata(source: &Document, dest: &mut Document, report: &mut CopyReport) -> usize {
    let mut copied = 0;
    for field in CoreField::ALL {
        match source.core_field(field) {
            Ok(value) => {
                dest.set_core_field(field, value.as_deref());
                copied += 1;
            }
            Err(e) => report.record(Scope::Metadata, field.label(), &e),
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_writer_wins_including_clears() {
        let mut first = Document::blank().unwrap();
        first.set_core_field(CoreField::Title, Some("First"));
        first.set_core_field(CoreField::Author, Some("Ada"));
        let mut second = Document::blank().unwrap();
        second.set_core_field(CoreField::Title, Some("Second"));

        let mut dest = Document::blank().unwrap();
        let mut report = CopyReport::new();
        copy_metadata(&first, &mut dest, &mut report);
        copy_metadata(&second, &mut dest, &mut report);

        assert!(report.is_empty());
        assert_eq!(dest.core_field(CoreField::Title), Ok(Some("Second".to_string())));
        assert_eq!(dest.core_field(CoreField::Author), Ok(None));
    }
}
