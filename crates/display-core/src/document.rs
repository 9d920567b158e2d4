//! The rich-output document: rope text plus attribute layers.
//!
//! All offsets in this module are **char offsets** (Unicode scalar values),
//! half-open `[start, end)`. The document tracks:
//!
//! - the text itself (a [`ropey::Rope`]),
//! - one attribute layer per presentation key (identity, faces, visibility,
//!   images, links) plus the region-begin marker set,
//! - an insertion point, where renderer strategies insert,
//! - a monotonically increasing version, bumped on every mutation. The
//!   renderer registry samples the version around a strategy call to detect
//!   side-effecting renders that do not signal success explicitly.

use ropey::Rope;

use crate::attrs::{AttrLayer, AttrSpan, MarkerSet};
use crate::face::{Face, FaceStack, prepend};
use crate::image::ImageSpec;
use crate::region::DisplayToken;

/// A side effect noticed during document processing, queued for the session
/// to forward to its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocEvent {
    /// A bell control character was consumed by the control-code pass.
    Bell,
}

/// A mutable rich-text document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: Rope,
    version: u64,
    point: usize,
    identity: AttrLayer<DisplayToken>,
    region_begin: MarkerSet,
    faces: AttrLayer<FaceStack>,
    invisible: AttrLayer<bool>,
    images: AttrLayer<ImageSpec>,
    links: AttrLayer<String>,
    events: Vec<DocEvent>,
}

/// An extracted copy of a document span: text plus every attribute it
/// carried, with offsets rebased to the span start.
///
/// Produced by [`Document::extract_span`] and re-inserted verbatim by
/// [`Document::insert_span`]. The update coordinator uses this to copy a
/// rendered region byte-for-byte to further occurrences of the same display.
#[derive(Debug, Clone)]
pub struct OwnedSpan {
    text: String,
    char_len: usize,
    identity: Vec<AttrSpan<DisplayToken>>,
    faces: Vec<AttrSpan<FaceStack>>,
    invisible: Vec<AttrSpan<bool>>,
    images: Vec<AttrSpan<ImageSpec>>,
    links: Vec<AttrSpan<String>>,
    markers: Vec<usize>,
}

impl OwnedSpan {
    /// Length of the span in chars.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// The raw text of the span (invisible chars included).
    pub fn text(&self) -> &str {
        &self.text
    }
}

fn rebase<V: Clone + PartialEq>(
    layer: &AttrLayer<V>,
    start: usize,
    end: usize,
) -> Vec<AttrSpan<V>> {
    layer
        .spans()
        .filter(|s| s.start < end && s.end > start)
        .map(|s| {
            AttrSpan::new(
                s.start.max(start) - start,
                s.end.min(end) - start,
                s.value.clone(),
            )
        })
        .collect()
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total length in chars.
    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Check whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.text.len_chars() == 0
    }

    /// The modification counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The current insertion point (char offset).
    pub fn point(&self) -> usize {
        self.point
    }

    /// Move the insertion point (clamped to document length).
    pub fn set_point(&mut self, pos: usize) {
        self.point = pos.min(self.len_chars());
    }

    /// The full text as a `String` (raw bytes, invisible spans included).
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Raw text of `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        self.text.slice(start..end).to_string()
    }

    /// The char at `pos`, if in bounds.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos < self.len_chars() {
            Some(self.text.char(pos))
        } else {
            None
        }
    }

    /// Text of `[start, end)` with invisible spans elided.
    ///
    /// This is what a renderer would show; the raw text (with escape bytes,
    /// deferred carriage returns, hidden markup) stays available via
    /// [`Document::slice`].
    pub fn visible_slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        let mut out = String::with_capacity(end - start);
        let mut pos = start;
        while pos < end {
            let hidden = self.invisible.value_at(pos).copied().unwrap_or(false);
            let next = self
                .invisible
                .next_change(pos)
                .unwrap_or(end)
                .min(end);
            if !hidden {
                out.push_str(&self.text.slice(pos..next).to_string());
            }
            pos = next;
        }
        out
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    fn shift_for_insertion(&mut self, pos: usize, len: usize) {
        self.identity.update_for_insertion(pos, len);
        self.region_begin.update_for_insertion(pos, len);
        self.faces.update_for_insertion(pos, len);
        self.invisible.update_for_insertion(pos, len);
        self.images.update_for_insertion(pos, len);
        self.links.update_for_insertion(pos, len);
    }

    fn shift_for_deletion(&mut self, start: usize, end: usize) {
        self.identity.update_for_deletion(start, end);
        self.region_begin.update_for_deletion(start, end);
        self.faces.update_for_deletion(start, end);
        self.invisible.update_for_deletion(start, end);
        self.images.update_for_deletion(start, end);
        self.links.update_for_deletion(start, end);
    }

    /// Insert `content` at `pos`, shifting attributes and the point.
    pub fn insert(&mut self, pos: usize, content: &str) {
        if content.is_empty() {
            return;
        }
        let pos = pos.min(self.len_chars());
        let len = content.chars().count();
        self.text.insert(pos, content);
        self.shift_for_insertion(pos, len);
        if self.point >= pos {
            self.point += len;
        }
        self.bump();
    }

    /// Insert `content` at the current point, leaving the point after it.
    pub fn insert_at_point(&mut self, content: &str) {
        self.insert(self.point, content);
    }

    /// Delete `[start, end)`, shifting attributes and the point.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        if start == end {
            return;
        }
        self.text.remove(start..end);
        self.shift_for_deletion(start, end);
        if self.point >= end {
            self.point -= end - start;
        } else if self.point > start {
            self.point = start;
        }
        self.bump();
    }

    // --- identity / region-begin -------------------------------------------

    /// Tag `[start, end)` with a display identity.
    pub fn set_identity(&mut self, start: usize, end: usize, token: DisplayToken) {
        self.identity.set(start, end, token);
        self.bump();
    }

    /// The display identity covering `pos`, if any.
    pub fn identity_at(&self, pos: usize) -> Option<DisplayToken> {
        self.identity.value_at(pos).copied()
    }

    /// The identity attribute layer (for navigation queries).
    pub fn identity_layer(&self) -> &AttrLayer<DisplayToken> {
        &self.identity
    }

    /// Mark `pos` as the beginning of a region.
    pub fn add_region_begin(&mut self, pos: usize) {
        self.region_begin.add(pos);
        self.bump();
    }

    /// Check whether `pos` carries the region-begin marker.
    pub fn is_region_begin(&self, pos: usize) -> bool {
        self.region_begin.contains(pos)
    }

    /// The region-begin marker set (for navigation queries).
    pub fn region_begins(&self) -> &MarkerSet {
        &self.region_begin
    }

    // --- presentation attributes -------------------------------------------

    /// Replace the face stack over `[start, end)`.
    pub fn set_faces(&mut self, start: usize, end: usize, faces: FaceStack) {
        self.faces.set(start, end, faces);
        self.bump();
    }

    /// Prepend `face` to whatever face stacks cover `[start, end)`.
    ///
    /// Existing styling is preserved underneath; used by the ANSI decoder and
    /// the update flash.
    pub fn prepend_face(&mut self, start: usize, end: usize, face: Face) {
        self.faces
            .map_range(start, end, |existing| Some(prepend(face, existing)));
        self.bump();
    }

    /// The face stack at `pos`, if any.
    pub fn faces_at(&self, pos: usize) -> Option<&FaceStack> {
        self.faces.value_at(pos)
    }

    /// Mark `[start, end)` invisible (bytes stay in the document).
    pub fn set_invisible(&mut self, start: usize, end: usize) {
        self.invisible.set(start, end, true);
        self.bump();
    }

    /// Check whether the char at `pos` is marked invisible.
    pub fn is_invisible(&self, pos: usize) -> bool {
        self.invisible.value_at(pos).copied().unwrap_or(false)
    }

    /// Anchor an overlay image over `[start, end)`.
    pub fn set_image(&mut self, start: usize, end: usize, image: ImageSpec) {
        self.images.set(start, end, image);
        self.bump();
    }

    /// The overlay image anchored at `pos`, if any.
    pub fn image_at(&self, pos: usize) -> Option<&ImageSpec> {
        self.images.value_at(pos)
    }

    /// Set a link target over `[start, end)`.
    pub fn set_link(&mut self, start: usize, end: usize, target: String) {
        self.links.set(start, end, target);
        self.bump();
    }

    /// The link target at `pos`, if any.
    pub fn link_at(&self, pos: usize) -> Option<&str> {
        self.links.value_at(pos).map(String::as_str)
    }

    // --- events -------------------------------------------------------------

    /// Queue a processing side effect for the session to forward.
    pub fn push_event(&mut self, event: DocEvent) {
        self.events.push(event);
    }

    /// Drain the queued processing events.
    pub fn take_events(&mut self) -> Vec<DocEvent> {
        std::mem::take(&mut self.events)
    }

    // --- span extraction ----------------------------------------------------

    /// Copy `[start, end)` out of the document: text plus all attributes,
    /// rebased to the span start.
    pub fn extract_span(&self, start: usize, end: usize) -> OwnedSpan {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        OwnedSpan {
            text: self.slice(start, end),
            char_len: end - start,
            identity: rebase(&self.identity, start, end),
            faces: rebase(&self.faces, start, end),
            invisible: rebase(&self.invisible, start, end),
            images: rebase(&self.images, start, end),
            links: rebase(&self.links, start, end),
            markers: self
                .region_begin
                .positions()
                .iter()
                .copied()
                .filter(|&p| p >= start && p < end)
                .map(|p| p - start)
                .collect(),
        }
    }

    /// Re-insert an extracted span at `pos`, verbatim: same bytes, same
    /// attributes. The point is left after the inserted span.
    pub fn insert_span(&mut self, pos: usize, span: &OwnedSpan) {
        let pos = pos.min(self.len_chars());
        if !span.text.is_empty() {
            self.text.insert(pos, &span.text);
            self.shift_for_insertion(pos, span.char_len);
            if self.point >= pos {
                self.point += span.char_len;
            }
        }
        for s in &span.identity {
            self.identity.set(pos + s.start, pos + s.end, s.value);
        }
        for s in &span.faces {
            self.faces.set(pos + s.start, pos + s.end, s.value.clone());
        }
        for s in &span.invisible {
            self.invisible.set(pos + s.start, pos + s.end, s.value);
        }
        for s in &span.images {
            self.images.set(pos + s.start, pos + s.end, s.value.clone());
        }
        for s in &span.links {
            self.links.set(pos + s.start, pos + s.end, s.value.clone());
        }
        for &m in &span.markers {
            self.region_begin.add(pos + m);
        }
        self.point = pos + span.char_len;
        self.bump();
    }
}
