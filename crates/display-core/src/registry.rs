//! The renderer registry: type-dispatched rendering strategies.
//!
//! A [`RenderStrategy`] renders one MIME type's content into the document at
//! the current point. Strategies are registered per type tag, optionally
//! gated on a capability predicate, and dispatched in the caller's
//! preference order; the first successful strategy wins.
//!
//! Success is a double condition, preserved on purpose: a strategy is
//! considered to have handled the content if it returns `true` **or** if its
//! invocation observably mutated the document (detected by sampling the
//! document's modification counter before and after the call) — some
//! strategies insert without signalling.

use log::warn;
use serde_json::Value;

use crate::ansi::{AnsiContext, apply_ansi, normalize_controls};
use crate::document::Document;
use crate::error::RenderError;
use crate::mime::MimeBundle;

/// A pluggable renderer for one content type.
///
/// Renders `content` into `doc` at the current point and returns whether it
/// handled the content. A strategy signalling an error may already have
/// inserted part of its output; the registry performs no rollback (the host
/// owns recovery policy).
pub trait RenderStrategy {
    /// Render `content` (with optional per-type `metadata`) into `doc`.
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<bool, RenderError>;
}

struct Registered {
    mime: String,
    active: bool,
    strategy: Box<dyn RenderStrategy>,
}

/// Registry mapping MIME type tags to rendering strategies.
#[derive(Default)]
pub struct RendererRegistry {
    entries: Vec<Registered>,
}

impl RendererRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for `mime`, replacing any existing registration
    /// for that tag.
    pub fn register(&mut self, mime: &str, strategy: Box<dyn RenderStrategy>) {
        self.register_gated(mime, || true, strategy);
    }

    /// Register `strategy` for `mime`, gated on a capability predicate.
    ///
    /// The predicate is evaluated once, at registration; a strategy whose
    /// capability is missing stays registered but inactive, and dispatch
    /// treats it as absent.
    pub fn register_gated<P>(&mut self, mime: &str, capability: P, strategy: Box<dyn RenderStrategy>)
    where
        P: Fn() -> bool,
    {
        self.entries.retain(|e| e.mime != mime);
        self.entries.push(Registered {
            mime: mime.to_string(),
            active: capability(),
            strategy,
        });
    }

    /// Check whether an active strategy exists for `mime`.
    pub fn has_strategy(&self, mime: &str) -> bool {
        self.entries.iter().any(|e| e.active && e.mime == mime)
    }

    fn strategy_mut(&mut self, mime: &str) -> Option<&mut Box<dyn RenderStrategy>> {
        self.entries
            .iter_mut()
            .find(|e| e.active && e.mime == mime)
            .map(|e| &mut e.strategy)
    }

    /// Render the richest representable type of `bundle` into `doc`.
    ///
    /// Tries each tag of `order` in turn; the first strategy that signals
    /// success or mutates the document wins, and its tag is returned. When
    /// nothing is renderable, a warning naming every type present in the
    /// bundle is logged and `None` is returned — not an error.
    ///
    /// Strategy errors propagate uncaught, and any partial insertion made
    /// before the failure stays in the document.
    pub fn dispatch(
        &mut self,
        doc: &mut Document,
        bundle: &MimeBundle,
        order: &[&str],
    ) -> Result<Option<String>, RenderError> {
        for &mime in order {
            let Some(content) = bundle.get(mime) else {
                continue;
            };
            let Some(strategy) = self.strategy_mut(mime) else {
                continue;
            };

            let before = doc.version();
            let handled = strategy.render(doc, content, bundle.metadata(mime))?;
            if handled || doc.version() != before {
                return Ok(Some(mime.to_string()));
            }
        }

        let present: Vec<&str> = bundle.types().collect();
        warn!("no valid mimetype found in bundle: {present:?}");
        Ok(None)
    }
}

/// Built-in `text/plain` strategy: literal insertion followed by
/// control-code normalization and ANSI color decoding.
///
/// Owns the [`AnsiContext`] so escape sequences and deferred carriage
/// returns split across successive chunks combine correctly.
#[derive(Default)]
pub struct PlainTextStrategy {
    ctx: AnsiContext,
}

impl PlainTextStrategy {
    /// Create a strategy with a fresh ANSI context.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStrategy for PlainTextStrategy {
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        _metadata: Option<&Value>,
    ) -> Result<bool, RenderError> {
        let begin = doc.point();
        doc.insert_at_point(content);
        let end = doc.point();
        // The control pass may overwrite text before the chunk; its adjusted
        // begin is where the surviving output actually starts.
        let outcome = normalize_controls(doc, begin, end);
        apply_ansi(doc, outcome.begin.min(outcome.end), outcome.end, &mut self.ctx);
        Ok(true)
    }
}
