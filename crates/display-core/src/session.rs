//! The display session: the host-facing facade.
//!
//! A [`DisplaySession`] owns the document, the display intern table and the
//! renderer registry, and wires them together: output bundles are rendered at
//! the point, named displays are tagged and later updated in place, and
//! side effects (bells, update flashes, unrenderable bundles) reach the host
//! through subscribed callbacks.

use crate::document::{DocEvent, Document};
use crate::error::DisplayError;
use crate::html::HtmlStrategy;
use crate::image::ImageStrategy;
use crate::mime::{self, MimeBundle};
use crate::navigate;
use crate::region::{DisplayInterner, DisplayToken, tag_region};
use crate::registry::{PlainTextStrategy, RenderStrategy, RendererRegistry};
use crate::update;

/// A notification forwarded to session subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A named display was rendered or replaced; one event per occurrence.
    Updated {
        /// The display's interned identity.
        token: DisplayToken,
        /// Start of the rewritten span (char offset).
        begin: usize,
        /// End (exclusive) of the rewritten span.
        end: usize,
    },
    /// A bell control character was consumed from a text payload.
    Bell,
    /// No type in a dispatched bundle was renderable; the document is
    /// unchanged. Carries the types the bundle offered.
    NoRenderableType {
        /// MIME tags present in the rejected bundle.
        types: Vec<String>,
    },
}

/// Display event callback function type.
pub type DisplayCallback = Box<dyn FnMut(&DisplayEvent) + Send>;

/// Link activation callback function type; receives the link target.
pub type LinkHandler = Box<dyn FnMut(&str) + Send>;

/// Host-facing session over one rich-output document.
#[derive(Default)]
pub struct DisplaySession {
    doc: Document,
    interner: DisplayInterner,
    registry: RendererRegistry,
    callbacks: Vec<DisplayCallback>,
    link_handler: Option<LinkHandler>,
}

impl DisplaySession {
    /// Create a session with an empty registry. The host registers the
    /// strategies it wants, or starts from
    /// [`with_builtin_strategies`](Self::with_builtin_strategies).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with the built-in strategies registered: plain text
    /// (with control-code and ANSI normalization), HTML, and the three image
    /// types.
    pub fn with_builtin_strategies() -> Self {
        let mut session = Self::new();
        session.register_strategy(mime::TEXT_PLAIN, Box::new(PlainTextStrategy::new()));
        session.register_strategy(mime::TEXT_HTML, Box::new(HtmlStrategy::new()));
        session.register_strategy(mime::IMAGE_PNG, Box::new(ImageStrategy::raster(mime::IMAGE_PNG)));
        session.register_strategy(
            mime::IMAGE_JPEG,
            Box::new(ImageStrategy::raster(mime::IMAGE_JPEG)),
        );
        session.register_strategy(mime::IMAGE_SVG, Box::new(ImageStrategy::svg(mime::IMAGE_SVG)));
        session
    }

    /// The document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the document (advanced usage; attribute consistency
    /// is the caller's responsibility).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The display intern table.
    pub fn interner(&self) -> &DisplayInterner {
        &self.interner
    }

    /// Register a rendering strategy for a MIME tag.
    pub fn register_strategy(&mut self, mime: &str, strategy: Box<dyn RenderStrategy>) {
        self.registry.register(mime, strategy);
    }

    /// Register a strategy gated on a capability predicate (evaluated now).
    pub fn register_gated_strategy<P>(
        &mut self,
        mime: &str,
        capability: P,
        strategy: Box<dyn RenderStrategy>,
    ) where
        P: Fn() -> bool,
    {
        self.registry.register_gated(mime, capability, strategy);
    }

    /// Subscribe to display events.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&DisplayEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    fn notify(&mut self, event: DisplayEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }

    fn flush_doc_events(&mut self) {
        for event in self.doc.take_events() {
            match event {
                DocEvent::Bell => self.notify(DisplayEvent::Bell),
            }
        }
    }

    /// Render the richest representable type of `bundle` at the point.
    ///
    /// Anonymous output: no identity is attached, so the content cannot be
    /// updated later. Returns the chosen MIME tag, or `None` (and a
    /// [`DisplayEvent::NoRenderableType`] notification) when nothing in the
    /// bundle was renderable.
    pub fn insert_output(
        &mut self,
        bundle: &MimeBundle,
        order: &[&str],
    ) -> Result<Option<String>, DisplayError> {
        let chosen = self.registry.dispatch(&mut self.doc, bundle, order)?;
        if chosen.is_none() {
            let types = bundle.types().map(str::to_string).collect();
            self.notify(DisplayEvent::NoRenderableType { types });
        }
        self.flush_doc_events();
        Ok(chosen)
    }

    /// Render `bundle` at the point as an occurrence of the display named
    /// `raw_id`, tagging the inserted span with its identity.
    ///
    /// Returns the `(begin, end)` bounds of the inserted span. Content handled
    /// by an opaque external viewer (widget placeholders) renders but is left
    /// untagged.
    pub fn insert_display(
        &mut self,
        raw_id: &str,
        bundle: &MimeBundle,
        order: &[&str],
    ) -> Result<(usize, usize), DisplayError> {
        let token = self.interner.intern(raw_id);
        let registry = &mut self.registry;
        let mut chosen: Option<String> = None;
        let bounds = tag_region(&mut self.doc, token, |doc| {
            chosen = registry.dispatch(doc, bundle, order)?;
            Ok(chosen.as_deref() != Some(mime::WIDGET_VIEW))
        })?;

        if chosen.is_none() {
            let types = bundle.types().map(str::to_string).collect();
            self.notify(DisplayEvent::NoRenderableType { types });
        } else if bounds.1 > bounds.0 {
            self.notify(DisplayEvent::Updated {
                token,
                begin: bounds.0,
                end: bounds.1,
            });
        }
        self.flush_doc_events();
        Ok(bounds)
    }

    /// Replace every occurrence of the display named `raw_id` with freshly
    /// rendered content; the bundle is rendered once and copied to further
    /// occurrences. Returns the bounds of every replacement.
    pub fn update_display(
        &mut self,
        raw_id: &str,
        bundle: &MimeBundle,
        order: &[&str],
    ) -> Result<Vec<(usize, usize)>, DisplayError> {
        let replaced = update::update_display(
            &mut self.doc,
            &self.interner,
            &mut self.registry,
            raw_id,
            bundle,
            order,
        )?;
        if let Some(token) = self.interner.lookup(raw_id) {
            for &(begin, end) in &replaced {
                self.notify(DisplayEvent::Updated { token, begin, end });
            }
        }
        self.flush_doc_events();
        Ok(replaced)
    }

    /// Install the hook invoked by [`activate_link_at`](Self::activate_link_at).
    ///
    /// Rendering only records link targets in the document's link layer;
    /// what *following* one means (open a browser, jump in-document, copy)
    /// is the host's call, made here.
    pub fn set_link_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.link_handler = Some(Box::new(handler));
    }

    /// Invoke the link handler with the target recorded at `pos`.
    ///
    /// Returns `false` when no link covers `pos` or no handler is installed.
    pub fn activate_link_at(&mut self, pos: usize) -> bool {
        let Some(target) = self.doc.link_at(pos).map(str::to_string) else {
            return false;
        };
        match &mut self.link_handler {
            Some(handler) => {
                handler(&target);
                true
            }
            None => false,
        }
    }

    /// The identity of the display at `pos`, if any.
    pub fn display_at(&self, pos: usize) -> Option<DisplayToken> {
        navigate::current_display(&self.doc, pos)
    }

    /// Bounds of the region enclosing `pos`.
    pub fn display_bounds(&self, pos: usize) -> Option<(usize, usize)> {
        navigate::current_display(&self.doc, pos)?;
        Some((
            navigate::beginning_of_display(&self.doc, pos),
            navigate::end_of_display(&self.doc, pos),
        ))
    }

    /// Delete the region enclosing `pos`, if any; returns the removed bounds.
    pub fn delete_display_at(&mut self, pos: usize) -> Option<(usize, usize)> {
        navigate::delete_current_display(&mut self.doc, pos)
    }

    /// Drop interned ids whose token no longer tags any live region.
    ///
    /// The sweep walks the intern table against the identity layer's spans;
    /// its cost is independent of document size. Call between bursts of
    /// output, not per render.
    pub fn compact_identities(&mut self) {
        self.interner.compact(&self.doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    fn recording_session() -> (DisplaySession, Arc<Mutex<Vec<DisplayEvent>>>) {
        let mut session = DisplaySession::with_builtin_strategies();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |event| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });
        (session, events)
    }

    #[test]
    fn test_insert_output_plain() {
        let (mut session, _) = recording_session();
        let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "hello\n");

        let chosen = session
            .insert_output(&bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!(chosen.as_deref(), Some(mime::TEXT_PLAIN));
        assert_eq!(session.document().text(), "hello\n");
    }

    #[test]
    fn test_insert_output_prefers_html() {
        let (mut session, _) = recording_session();
        let bundle = MimeBundle::new()
            .with(mime::TEXT_PLAIN, "plain")
            .with(mime::TEXT_HTML, "<b>rich</b>");

        let chosen = session
            .insert_output(&bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!(chosen.as_deref(), Some(mime::TEXT_HTML));
        assert_eq!(session.document().text(), "rich");
    }

    #[test]
    fn test_unrenderable_bundle_notifies() {
        let (mut session, events) = recording_session();
        let bundle = MimeBundle::new().with("application/x-custom", "?");

        let chosen = session
            .insert_output(&bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!(chosen, None);
        assert!(session.document().is_empty());

        let seen = events.lock().unwrap();
        assert_eq!(
            *seen,
            vec![DisplayEvent::NoRenderableType {
                types: vec!["application/x-custom".to_string()],
            }]
        );
    }

    #[test]
    fn test_insert_display_tags_and_notifies() {
        let (mut session, events) = recording_session();
        let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "out");

        let (begin, end) = session
            .insert_display("d1", &bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!((begin, end), (0, 3));

        let token = session.interner().lookup("d1").unwrap();
        assert_eq!(session.display_at(0), Some(token));
        assert_eq!(session.display_bounds(1), Some((0, 3)));

        let seen = events.lock().unwrap();
        assert_eq!(
            *seen,
            vec![DisplayEvent::Updated {
                token,
                begin: 0,
                end: 3,
            }]
        );
    }

    #[test]
    fn test_update_display_notifies_per_occurrence() {
        let (mut session, events) = recording_session();
        let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "v1");
        session
            .insert_display("d", &bundle, mime::RICH_PREFERENCE)
            .unwrap();
        session.document_mut().insert_at_point(" | ");
        session
            .insert_display("d", &bundle, mime::RICH_PREFERENCE)
            .unwrap();
        events.lock().unwrap().clear();

        let bundle2 = MimeBundle::new().with(mime::TEXT_PLAIN, "v2!");
        let replaced = session
            .update_display("d", &bundle2, mime::RICH_PREFERENCE)
            .unwrap();

        assert_eq!(session.document().text(), "v2! | v2!");
        assert_eq!(replaced, vec![(0, 3), (6, 9)]);

        let token = session.interner().lookup("d").unwrap();
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            DisplayEvent::Updated {
                token,
                begin: 0,
                end: 3,
            }
        );
    }

    #[test]
    fn test_bell_forwarded_to_subscribers() {
        let (mut session, events) = recording_session();
        let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "ding\u{7}");

        session
            .insert_output(&bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!(session.document().text(), "ding");
        assert!(events.lock().unwrap().contains(&DisplayEvent::Bell));
    }

    #[test]
    fn test_widget_placeholder_left_untagged() {
        struct WidgetPlaceholder;
        impl RenderStrategy for WidgetPlaceholder {
            fn render(
                &mut self,
                doc: &mut Document,
                _content: &str,
                _metadata: Option<&Value>,
            ) -> Result<bool, crate::error::RenderError> {
                doc.insert_at_point("[widget]");
                Ok(true)
            }
        }

        let mut session = DisplaySession::new();
        session.register_strategy(mime::WIDGET_VIEW, Box::new(WidgetPlaceholder));

        let bundle = MimeBundle::new().with(mime::WIDGET_VIEW, "{}");
        let (begin, end) = session
            .insert_display("w", &bundle, mime::RICH_PREFERENCE)
            .unwrap();

        assert_eq!(session.document().text(), "[widget]");
        assert!(end > begin);
        // Rendered, but carries no identity: it cannot be updated in place.
        assert_eq!(session.display_at(begin), None);
    }

    #[test]
    fn test_link_activation_invokes_handler() {
        let mut session = DisplaySession::with_builtin_strategies();
        let bundle = MimeBundle::new().with(
            mime::TEXT_HTML,
            r#"<a href="https://example.com/doc">docs</a>"#,
        );
        session
            .insert_output(&bundle, mime::RICH_PREFERENCE)
            .unwrap();
        assert_eq!(session.document().text(), "docs");

        // No handler installed yet.
        assert!(!session.activate_link_at(0));

        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = opened.clone();
        session.set_link_handler(move |target| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(target.to_string());
            }
        });

        assert!(session.activate_link_at(0));
        // Past the linked span: nothing to activate.
        assert!(!session.activate_link_at(40));
        assert_eq!(
            *opened.lock().unwrap(),
            vec!["https://example.com/doc".to_string()]
        );
    }

    #[test]
    fn test_compact_identities() {
        let mut session = DisplaySession::with_builtin_strategies();
        let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "x");
        session
            .insert_display("keep", &bundle, mime::RICH_PREFERENCE)
            .unwrap();
        let (b, e) = session
            .insert_display("drop", &bundle, mime::RICH_PREFERENCE)
            .unwrap();
        session.document_mut().delete_range(b, e);

        session.compact_identities();
        assert!(session.interner().lookup("keep").is_some());
        assert_eq!(session.interner().lookup("drop"), None);
    }
}
