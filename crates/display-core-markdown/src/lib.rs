#![warn(missing_docs)]
//! Markdown rendering strategy for `display-core`.
//!
//! The source text is inserted verbatim and never rewritten: delimiter
//! characters (`**`, backticks, heading hashes, link syntax) are marked
//! invisible instead of deleted, and faces are applied over the content they
//! wrap. Re-extracting the raw span therefore recovers the original
//! markdown byte-for-byte, which is what in-place display updates copy
//! between occurrences.
//!
//! Inline and display math (`$...$`, `$$...$$`) pass through with a math
//! face and visible body; rendering the TeX itself is the host's business
//! (see `display-core-convert`).
//!
//! Links are recorded in the document's link layer, optionally rewritten by
//! a [`LinkResolver`]. Following a link is not a rendering concern: the host
//! installs an activation hook on the session
//! (`DisplaySession::set_link_handler`) and triggers it per position.

use std::ops::Range;

use display_core::{Document, Face, Markup, RenderError, RenderStrategy};
use log::trace;
use pulldown_cmark::{Event, Options, Parser, Tag};
use serde_json::Value;

/// Rewrites link destinations before they land in the document's link layer
/// (e.g. resolving relative notebook paths).
pub type LinkResolver = Box<dyn Fn(&str) -> String + Send>;

/// `text/markdown` strategy.
#[derive(Default)]
pub struct MarkdownStrategy {
    link_resolver: Option<LinkResolver>,
}

impl MarkdownStrategy {
    /// Create a strategy that records link destinations as written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a link resolver applied to every destination URL.
    pub fn with_link_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        self.link_resolver = Some(Box::new(resolver));
        self
    }

    fn resolve(&self, url: &str) -> String {
        match &self.link_resolver {
            Some(resolver) => resolver(url),
            None => url.to_string(),
        }
    }
}

/// `table[b]` is the char offset of the char containing byte `b`;
/// `table[len]` is the total char count.
fn byte_to_char_table(content: &str) -> Vec<usize> {
    let mut table = vec![0usize; content.len() + 1];
    let mut chars = 0;
    for (bi, c) in content.char_indices() {
        for slot in &mut table[bi..bi + c.len_utf8()] {
            *slot = chars;
        }
        chars += 1;
    }
    table[content.len()] = chars;
    table
}

fn strong_face() -> Face {
    let mut f = Face::markup(Markup::Strong);
    f.bold = true;
    f
}

fn emphasis_face() -> Face {
    let mut f = Face::markup(Markup::Emphasis);
    f.italic = true;
    f
}

fn heading_face(level: u8) -> Face {
    let mut f = Face::markup(Markup::Header(level));
    f.bold = true;
    f
}

impl RenderStrategy for MarkdownStrategy {
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        _metadata: Option<&Value>,
    ) -> Result<bool, RenderError> {
        let base = doc.point();
        doc.insert_at_point(content);
        let table = byte_to_char_table(content);

        // Byte ranges, all relative to `content`.
        let mut visible: Vec<Range<usize>> = Vec::new();
        let mut styled: Vec<(Range<usize>, Face)> = Vec::new();
        let mut markup: Vec<Range<usize>> = Vec::new();
        let mut links: Vec<(Range<usize>, String)> = Vec::new();

        let options =
            Options::ENABLE_STRIKETHROUGH | Options::ENABLE_MATH | Options::ENABLE_TABLES;
        for (event, range) in Parser::new_ext(content, options).into_offset_iter() {
            match event {
                Event::Start(tag) => {
                    let face = match &tag {
                        Tag::Strong => Some(strong_face()),
                        Tag::Emphasis => Some(emphasis_face()),
                        Tag::Strikethrough => Some(Face::markup(Markup::Strikethrough)),
                        Tag::Heading { level, .. } => Some(heading_face(*level as u8)),
                        Tag::CodeBlock(_) => Some(Face::markup(Markup::Code)),
                        Tag::Link { dest_url, .. } => {
                            links.push((range.clone(), self.resolve(dest_url)));
                            Some(Face::markup(Markup::Link))
                        }
                        _ => None,
                    };
                    if let Some(face) = face {
                        styled.push((range.clone(), face));
                        markup.push(range);
                    }
                }
                Event::Text(_) | Event::SoftBreak | Event::HardBreak => visible.push(range),
                Event::Code(code) => {
                    styled.push((range.clone(), Face::markup(Markup::Code)));
                    // The backticks hide; the code body stays visible.
                    if let Some(off) = content[range.clone()].find(code.as_ref()) {
                        let start = range.start + off;
                        visible.push(start..start + code.len());
                    }
                    markup.push(range);
                }
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    styled.push((range.clone(), Face::markup(Markup::Math)));
                    if let Some(off) = content[range.clone()].find(math.as_ref()) {
                        let start = range.start + off;
                        visible.push(start..start + math.len());
                    }
                    markup.push(range);
                }
                _ => {}
            }
        }
        trace!(
            "markdown: {} styled range(s), {} link(s)",
            styled.len(),
            links.len()
        );

        // Inside each markup construct, hide every byte that is not part of
        // a text child. Newlines always stay visible so block separation
        // survives in the visible rendering.
        visible.sort_by_key(|r| r.start);
        for region in &markup {
            let mut pos = region.start;
            for v in visible.iter().filter(|v| v.end > region.start && v.start < region.end) {
                if v.start > pos {
                    hide(doc, base, content, &table, pos..v.start.min(region.end));
                }
                pos = pos.max(v.end);
                if pos >= region.end {
                    break;
                }
            }
            if pos < region.end {
                hide(doc, base, content, &table, pos..region.end);
            }
        }

        for (range, face) in styled {
            doc.prepend_face(base + table[range.start], base + table[range.end], face);
        }
        for (range, target) in links {
            doc.set_link(base + table[range.start], base + table[range.end], target);
        }
        Ok(true)
    }
}

/// Mark a byte range invisible, splitting around newlines (which stay
/// visible).
fn hide(doc: &mut Document, base: usize, content: &str, table: &[usize], range: Range<usize>) {
    let mut run_start = range.start;
    for (off, byte) in content[range.clone()].bytes().enumerate() {
        if byte == b'\n' {
            let b = range.start + off;
            if b > run_start {
                doc.set_invisible(base + table[run_start], base + table[b]);
            }
            run_start = b + 1;
        }
    }
    if range.end > run_start {
        doc.set_invisible(base + table[run_start], base + table[range.end]);
    }
}
