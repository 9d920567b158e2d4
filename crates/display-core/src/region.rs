//! Display identity: interning and region tagging.
//!
//! A *display* is a logical piece of output named by the host (e.g. a
//! notebook display id). One display may occur at several places in the
//! document; each physical occurrence is a *region*: a contiguous span
//! tagged with the display's [`DisplayToken`], whose first char also carries
//! the region-begin marker so adjacent regions with different identities
//! stay distinguishable.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::RenderError;

/// Canonical interned handle for one named display.
///
/// Opaque and stable for the lifetime of the session; compare with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayToken(pub u32);

/// Session-scoped intern table mapping raw display-id strings to tokens.
///
/// Created lazily on first use. There are no weak references here: the host
/// calls [`DisplayInterner::compact`] periodically to drop ids that no longer
/// tag any live region. The sweep walks the intern table and the identity
/// layer's spans, never the document text, so its cost is independent of
/// document size.
#[derive(Debug, Default)]
pub struct DisplayInterner {
    by_name: HashMap<String, DisplayToken>,
    names: Vec<String>,
}

impl DisplayInterner {
    /// Create an empty intern table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw_id` to its token, creating the mapping on first use.
    pub fn intern(&mut self, raw_id: &str) -> DisplayToken {
        if let Some(&token) = self.by_name.get(raw_id) {
            return token;
        }
        let token = DisplayToken(self.names.len() as u32);
        self.names.push(raw_id.to_string());
        self.by_name.insert(raw_id.to_string(), token);
        token
    }

    /// Resolve `raw_id` without creating a mapping.
    pub fn lookup(&self, raw_id: &str) -> Option<DisplayToken> {
        self.by_name.get(raw_id).copied()
    }

    /// The raw id a token was interned from, if still retained.
    pub fn name(&self, token: DisplayToken) -> Option<&str> {
        let name = self.names.get(token.0 as usize)?;
        // A compacted entry keeps its slot (tokens stay stable) but loses
        // its name mapping.
        if self.by_name.get(name) == Some(&token) {
            Some(name.as_str())
        } else {
            None
        }
    }

    /// Number of live id mappings.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check whether the table holds no live mappings.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Drop id mappings whose token tags no live span in `doc`.
    ///
    /// Token values are never reused, so a compacted id that arrives again
    /// simply interns to a fresh token.
    pub fn compact(&mut self, doc: &Document) {
        let live: std::collections::HashSet<DisplayToken> =
            doc.identity_layer().spans().map(|s| s.value).collect();
        self.by_name.retain(|_, token| live.contains(token));
    }
}

/// Run `insert_fn` at the document point and tag what it inserted.
///
/// Captures the point before and after the insertion; if the inserted span
/// is non-empty and `insert_fn` reported the content as taggable, applies
/// `token` across the span and marks its first char as a region begin.
/// Content rendered by an opaque external viewer (widget placeholders) is
/// not taggable — it has no in-document span to tag — which is why the
/// closure decides: only after dispatch is the handling type known.
///
/// Returns the `(begin, end)` bounds of the inserted span.
pub fn tag_region<F>(
    doc: &mut Document,
    token: DisplayToken,
    insert_fn: F,
) -> Result<(usize, usize), RenderError>
where
    F: FnOnce(&mut Document) -> Result<bool, RenderError>,
{
    let begin = doc.point();
    let taggable = insert_fn(doc)?;
    let end = doc.point();

    if end > begin && taggable {
        doc.set_identity(begin, end, token);
        doc.add_region_begin(begin);
    }
    Ok((begin, end))
}
