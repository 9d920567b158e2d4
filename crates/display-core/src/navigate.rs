//! Display navigation: locating region bounds and occurrences by identity.
//!
//! All operations are pure queries relative to a position `p` (except
//! [`delete_current_display`], which removes the enclosing region). Region
//! bounds come from two sources that must be combined: the identity
//! attribute layer (which merges adjacent equal-identity runs) and the
//! region-begin marker set (which keeps abutting regions distinguishable).

use crate::document::Document;
use crate::region::DisplayToken;

/// The identity tagging the char at `p`, or `None`.
pub fn current_display(doc: &Document, p: usize) -> Option<DisplayToken> {
    doc.identity_at(p)
}

/// Position of the enclosing region's begin marker.
///
/// Returns `p` itself when marked; otherwise the nearest preceding marker;
/// start of document when none exists before `p`.
pub fn beginning_of_display(doc: &Document, p: usize) -> usize {
    if doc.is_region_begin(p) {
        return p;
    }
    doc.region_begins().prev_at_or_before(p).unwrap_or(0)
}

/// End (exclusive) of the region enclosing `p`.
///
/// The smaller of: the next position where the identity value changes, and
/// the next region-begin marker strictly after `p`. The marker bound matters
/// when a region is immediately followed by another region: the identity
/// runs stay distinct only while their tokens differ, but the begin marker
/// always bounds the first region exactly.
pub fn end_of_display(doc: &Document, p: usize) -> usize {
    let doc_end = doc.len_chars();
    let change = doc.identity_layer().next_change(p).unwrap_or(doc_end);
    let marker = doc.region_begins().next_after(p).unwrap_or(doc_end);
    change.min(marker).min(doc_end)
}

/// Position of the first region with identity `id`, scanning forward from
/// `p` through successive region-begin boundaries.
///
/// Special case: at document start, a region already under the cursor counts
/// as a match at `p`. Returns `None` when exhausted; nothing moves.
pub fn next_display_with_id(doc: &Document, p: usize, id: DisplayToken) -> Option<usize> {
    if p == 0 && doc.identity_at(0) == Some(id) {
        return Some(0);
    }
    next_display_with_id_after(doc, p, id)
}

/// Like [`next_display_with_id`], but considers region-begin markers strictly
/// after `p` only, with no document-start special case. This is what a resumed
/// scan wants: a match at the scan position itself was already processed.
pub fn next_display_with_id_after(doc: &Document, p: usize, id: DisplayToken) -> Option<usize> {
    doc.region_begins()
        .iter_after(p)
        .find(|&pos| doc.identity_at(pos) == Some(id))
}

/// Delete the full span of the region enclosing `p`, if any.
///
/// Returns the removed `[begin, end)` bounds.
pub fn delete_current_display(doc: &mut Document, p: usize) -> Option<(usize, usize)> {
    current_display(doc, p)?;
    let begin = beginning_of_display(doc, p);
    let end = end_of_display(doc, p);
    doc.delete_range(begin, end);
    Some((begin, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::tag_region;

    /// `[ text ][RegionX][RegionY] tail` with X spanning [5,10), Y [10,15).
    fn two_region_doc() -> Document {
        let mut doc = Document::new();
        doc.insert_at_point("head ");
        tag_region(&mut doc, DisplayToken(1), |doc| {
            doc.insert_at_point("xxxxx");
            Ok(true)
        })
        .unwrap();
        tag_region(&mut doc, DisplayToken(2), |doc| {
            doc.insert_at_point("yyyyy");
            Ok(true)
        })
        .unwrap();
        doc.insert_at_point(" tail");
        doc
    }

    #[test]
    fn test_current_display() {
        let doc = two_region_doc();
        assert_eq!(current_display(&doc, 0), None);
        assert_eq!(current_display(&doc, 5), Some(DisplayToken(1)));
        assert_eq!(current_display(&doc, 9), Some(DisplayToken(1)));
        assert_eq!(current_display(&doc, 10), Some(DisplayToken(2)));
        assert_eq!(current_display(&doc, 15), None);
    }

    #[test]
    fn test_beginning_of_display() {
        let doc = two_region_doc();
        assert_eq!(beginning_of_display(&doc, 5), 5);
        assert_eq!(beginning_of_display(&doc, 8), 5);
        assert_eq!(beginning_of_display(&doc, 12), 10);
        // No marker before position 3: falls back to document start.
        assert_eq!(beginning_of_display(&doc, 3), 0);
    }

    #[test]
    fn test_end_of_display_stops_at_adjacent_region() {
        let doc = two_region_doc();
        for p in 5..10 {
            assert_eq!(end_of_display(&doc, p), 10, "at {p}");
        }
        assert_eq!(end_of_display(&doc, 10), 15);
    }

    #[test]
    fn test_end_of_display_bounds_merged_identity_runs() {
        // Two abutting regions with the *same* token: the identity layer
        // merges them into one run, so only the begin marker separates them.
        let mut doc = Document::new();
        tag_region(&mut doc, DisplayToken(1), |doc| {
            doc.insert_at_point("aaa");
            Ok(true)
        })
        .unwrap();
        tag_region(&mut doc, DisplayToken(1), |doc| {
            doc.insert_at_point("bbb");
            Ok(true)
        })
        .unwrap();

        assert_eq!(end_of_display(&doc, 0), 3);
        assert_eq!(end_of_display(&doc, 3), 6);
    }

    #[test]
    fn test_next_display_with_id() {
        let doc = two_region_doc();
        assert_eq!(next_display_with_id(&doc, 0, DisplayToken(1)), Some(5));
        assert_eq!(next_display_with_id(&doc, 0, DisplayToken(2)), Some(10));
        assert_eq!(next_display_with_id(&doc, 5, DisplayToken(1)), None);
        assert_eq!(next_display_with_id(&doc, 5, DisplayToken(2)), Some(10));
        assert_eq!(next_display_with_id(&doc, 0, DisplayToken(9)), None);
    }

    #[test]
    fn test_next_display_with_id_at_document_start() {
        let mut doc = Document::new();
        tag_region(&mut doc, DisplayToken(1), |doc| {
            doc.insert_at_point("aaa");
            Ok(true)
        })
        .unwrap();

        // Document starts inside the region: counts as a match at 0.
        assert_eq!(next_display_with_id(&doc, 0, DisplayToken(1)), Some(0));
    }

    #[test]
    fn test_delete_current_display() {
        let mut doc = two_region_doc();
        let removed = delete_current_display(&mut doc, 7);
        assert_eq!(removed, Some((5, 10)));
        assert_eq!(doc.text(), "head yyyyy tail");
        assert_eq!(current_display(&doc, 5), Some(DisplayToken(2)));

        assert_eq!(delete_current_display(&mut doc, 0), None);
    }
}
