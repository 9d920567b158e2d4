//! In-place display updates: replace every occurrence of an identity.
//!
//! The replacement content is rendered exactly once, on the first occurrence
//! processed; the resulting span (bytes and attributes) is extracted and
//! re-inserted verbatim at every further occurrence, so all occurrences are
//! byte-identical and expensive strategies (LaTeX image generation, HTML
//! parsing) run once.
//!
//! The scan mutates strictly forward, so the bounds captured for the first
//! rendered span stay valid while later occurrences are rewritten.

use log::debug;

use crate::document::{Document, OwnedSpan};
use crate::error::DisplayError;
use crate::face::{Face, Markup};
use crate::mime::MimeBundle;
use crate::navigate::{end_of_display, next_display_with_id, next_display_with_id_after};
use crate::region::{DisplayInterner, tag_region};
use crate::registry::RendererRegistry;

/// Replace every occurrence of the display named `raw_id` with freshly
/// rendered content from `bundle`.
///
/// Fails with [`DisplayError::UnknownDisplayId`] when `raw_id` was never
/// interned, [`DisplayError::DisplayNotFound`] when no live occurrence
/// exists, and [`DisplayError::NoRenderableType`] when the bundle offers
/// nothing renderable — in that last case every occurrence keeps its old
/// content. Returns the bounds of every replacement span, in document order.
pub fn update_display(
    doc: &mut Document,
    interner: &DisplayInterner,
    registry: &mut RendererRegistry,
    raw_id: &str,
    bundle: &MimeBundle,
    order: &[&str],
) -> Result<Vec<(usize, usize)>, DisplayError> {
    let token = interner
        .lookup(raw_id)
        .ok_or_else(|| DisplayError::UnknownDisplayId(raw_id.to_string()))?;

    let mut cached: Option<OwnedSpan> = None;
    let mut replaced: Vec<(usize, usize)> = Vec::new();

    let mut next = next_display_with_id(doc, 0, token);
    while let Some(begin) = next {
        let end = end_of_display(doc, begin);

        let new_end = match &cached {
            Some(span) => {
                doc.delete_range(begin, end);
                doc.insert_span(begin, span);
                begin + span.char_len()
            }
            None => {
                let backup = doc.extract_span(begin, end);
                doc.delete_range(begin, end);
                doc.set_point(begin);
                let mut chosen: Option<String> = None;
                let (b, e) = tag_region(doc, token, |doc| {
                    chosen = registry.dispatch(doc, bundle, order)?;
                    Ok(chosen.as_deref() != Some(crate::mime::WIDGET_VIEW))
                })?;
                if chosen.is_none() {
                    // Nothing rendered and nothing was inserted (a dispatch
                    // miss never mutates), so restoring the one deleted
                    // occurrence leaves the document exactly as it was.
                    doc.insert_span(begin, &backup);
                    return Err(DisplayError::NoRenderableType(raw_id.to_string()));
                }
                cached = Some(doc.extract_span(b, e));
                e
            }
        };

        if new_end > begin {
            doc.prepend_face(begin, new_end, Face::markup(Markup::UpdateFlash));
        }
        replaced.push((begin, new_end));

        // Resume just inside the replacement so an occurrence abutting it is
        // still found; the marker search is strictly-after, which keeps the
        // occurrence just written from matching again. An empty replacement
        // leaves no tag at `begin`, so a tag there now belongs to a marker
        // that shifted onto it.
        next = if new_end > begin {
            next_display_with_id_after(doc, new_end - 1, token)
        } else if doc.is_region_begin(begin) && doc.identity_at(begin) == Some(token) {
            Some(begin)
        } else {
            next_display_with_id_after(doc, begin, token)
        };
    }

    if replaced.is_empty() {
        return Err(DisplayError::DisplayNotFound(raw_id.to_string()));
    }
    debug!(
        "updated display {raw_id:?}: {} occurrence(s) replaced",
        replaced.len()
    );
    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::RenderError;
    use crate::mime::TEXT_PLAIN;
    use crate::registry::RenderStrategy;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingText {
        calls: Rc<Cell<usize>>,
    }

    impl RenderStrategy for CountingText {
        fn render(
            &mut self,
            doc: &mut Document,
            content: &str,
            _metadata: Option<&Value>,
        ) -> Result<bool, RenderError> {
            self.calls.set(self.calls.get() + 1);
            doc.insert_at_point(content);
            Ok(true)
        }
    }

    fn setup(
        occurrences: usize,
    ) -> (
        Document,
        DisplayInterner,
        RendererRegistry,
        Rc<Cell<usize>>,
    ) {
        let mut doc = Document::new();
        let mut interner = DisplayInterner::new();
        let token = interner.intern("X");

        for i in 0..occurrences {
            doc.insert_at_point(&format!("--{i}--"));
            tag_region(&mut doc, token, |doc| {
                doc.insert_at_point("old");
                Ok(true)
            })
            .unwrap();
        }
        doc.insert_at_point("--end--");

        let calls = Rc::new(Cell::new(0));
        let mut registry = RendererRegistry::new();
        registry.register(
            TEXT_PLAIN,
            Box::new(CountingText {
                calls: calls.clone(),
            }),
        );
        (doc, interner, registry, calls)
    }

    #[test]
    fn test_update_replaces_all_occurrences_rendering_once() {
        let (mut doc, interner, mut registry, calls) = setup(3);
        let bundle = MimeBundle::new().with(TEXT_PLAIN, "NEW!");

        let replaced = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "X",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap();

        assert_eq!(replaced.len(), 3);
        assert_eq!(calls.get(), 1);
        assert_eq!(doc.text(), "--0--NEW!--1--NEW!--2--NEW!--end--");

        // Every occurrence is byte-identical and stays findable.
        let token = interner.lookup("X").unwrap();
        for &(b, e) in &replaced {
            assert_eq!(doc.slice(b, e), "NEW!");
            assert_eq!(doc.identity_at(b), Some(token));
            assert!(doc.is_region_begin(b));
        }
    }

    #[test]
    fn test_update_adjacent_occurrences() {
        let mut doc = Document::new();
        let mut interner = DisplayInterner::new();
        let token = interner.intern("X");
        for _ in 0..2 {
            tag_region(&mut doc, token, |doc| {
                doc.insert_at_point("old");
                Ok(true)
            })
            .unwrap();
        }

        let calls = Rc::new(Cell::new(0));
        let mut registry = RendererRegistry::new();
        registry.register(
            TEXT_PLAIN,
            Box::new(CountingText {
                calls: calls.clone(),
            }),
        );

        let bundle = MimeBundle::new().with(TEXT_PLAIN, "ab");
        let replaced = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "X",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap();

        assert_eq!(replaced, vec![(0, 2), (2, 4)]);
        assert_eq!(doc.text(), "abab");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_update_single_char_replacement_at_document_start() {
        // Replacement spans of length 1 starting at offset 0 resume the scan
        // at 0; the occurrence just written must not match again.
        let mut doc = Document::new();
        let mut interner = DisplayInterner::new();
        let token = interner.intern("X");
        for _ in 0..2 {
            tag_region(&mut doc, token, |doc| {
                doc.insert_at_point("old");
                Ok(true)
            })
            .unwrap();
        }

        let mut registry = RendererRegistry::new();
        registry.register(
            TEXT_PLAIN,
            Box::new(CountingText {
                calls: Rc::new(Cell::new(0)),
            }),
        );

        let bundle = MimeBundle::new().with(TEXT_PLAIN, "z");
        let replaced = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "X",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap();

        assert_eq!(replaced, vec![(0, 1), (1, 2)]);
        assert_eq!(doc.text(), "zz");
    }

    #[test]
    fn test_update_unknown_id() {
        let (mut doc, interner, mut registry, _) = setup(1);
        let bundle = MimeBundle::new().with(TEXT_PLAIN, "n");

        let err = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "never-seen",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap_err();
        assert!(matches!(err, DisplayError::UnknownDisplayId(_)));
    }

    #[test]
    fn test_update_interned_but_absent() {
        let (mut doc, mut interner, mut registry, _) = setup(1);
        interner.intern("gone");
        let bundle = MimeBundle::new().with(TEXT_PLAIN, "n");

        let err = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "gone",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap_err();
        assert!(matches!(err, DisplayError::DisplayNotFound(_)));
    }

    #[test]
    fn test_update_unrenderable_bundle_errors_and_restores() {
        let (mut doc, interner, mut registry, calls) = setup(2);
        let before = doc.text();
        let bundle = MimeBundle::new().with("application/x-unknown", "?");

        let err = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "X",
            &bundle,
            &["application/x-unknown"],
        )
        .unwrap_err();

        assert!(matches!(err, DisplayError::NoRenderableType(_)));
        assert_eq!(calls.get(), 0);
        // Every occurrence survives, including the first, and stays tagged.
        assert_eq!(doc.text(), before);
        let token = interner.lookup("X").unwrap();
        assert_eq!(doc.identity_at(5), Some(token));
        assert!(doc.is_region_begin(5));
        assert_eq!(doc.identity_at(13), Some(token));
    }

    #[test]
    fn test_update_flash_applied() {
        let (mut doc, interner, mut registry, _) = setup(1);
        let bundle = MimeBundle::new().with(TEXT_PLAIN, "NEW");

        let replaced = update_display(
            &mut doc,
            &interner,
            &mut registry,
            "X",
            &bundle,
            &[TEXT_PLAIN],
        )
        .unwrap();

        let (b, _) = replaced[0];
        let stack = doc.faces_at(b).unwrap();
        assert_eq!(stack[0].markup, Some(Markup::UpdateFlash));
    }
}
