//! Control-code and ANSI escape normalization.
//!
//! Runs over a `[begin, end)` span immediately after a raw insertion, in two
//! independent passes:
//!
//! - the **control pass** collapses CRLF, simulates terminal overwrite for a
//!   lone carriage return, deletes bells and destructive backspaces, and
//!   defers a span-final carriage return by hiding it (a later append may
//!   complete the CRLF);
//! - the **ANSI pass** hides SGR escape sequences without deleting them (the
//!   raw bytes stay available for re-copy) and applies the accumulated
//!   color/style state as a face *prepended* to the text between sequences.
//!
//! Output often arrives in chunks that split lines and escape sequences, so
//! both passes support continuation: the control pass backs up over a
//! deferred carriage return, and the ANSI pass carries accumulated SGR codes
//! and a trailing partial-sequence length in an explicit [`AnsiContext`].

use std::sync::OnceLock;

use regex::Regex;

use crate::document::{DocEvent, Document};
use crate::face::{Color, Face};

/// Result of the control-code pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Start of the surviving span. Smaller than the requested begin when an
    /// overwrite, a collapse, or a backspace consumed chars before it.
    pub begin: usize,
    /// The (possibly smaller) end of the processed span after deletions.
    pub end: usize,
    /// Number of bell characters encountered and removed.
    pub bells: usize,
}

/// Start of the logical line containing `pos`: one past the previous LF.
fn line_start(doc: &Document, pos: usize) -> usize {
    let mut p = pos;
    while p > 0 {
        if doc.char_at(p - 1) == Some('\n') {
            break;
        }
        p -= 1;
    }
    p
}

/// Normalize raw control characters over `[begin, end)`.
///
/// If the char immediately preceding `begin` is a carriage return (deferred
/// from a prior append), the scan starts one position earlier so it combines
/// with this chunk.
pub fn normalize_controls(doc: &mut Document, begin: usize, end: usize) -> ControlOutcome {
    let mut begin = begin;
    let mut pos = begin;
    if begin > 0 && doc.char_at(begin - 1) == Some('\r') {
        pos = begin - 1;
    }

    let mut end = end.min(doc.len_chars());
    let mut bells = 0usize;

    while pos < end {
        match doc.char_at(pos) {
            Some('\r') => {
                if pos + 1 >= end {
                    // Span-final CR: defer. It stays in the text, hidden, and
                    // a following append may complete the CRLF collapse.
                    doc.set_invisible(pos, pos + 1);
                    pos += 1;
                } else if matches!(doc.char_at(pos + 1), Some('\n') | Some('\r')) {
                    doc.delete_range(pos, pos + 1);
                    end -= 1;
                    begin = begin.min(pos);
                } else {
                    // Lone interior CR: terminal overwrite. Drop the visual
                    // line up to and including the CR; the line may have
                    // started before this chunk.
                    let start = line_start(doc, pos);
                    doc.delete_range(start, pos + 1);
                    end -= pos + 1 - start;
                    pos = start;
                    begin = begin.min(start);
                }
            }
            Some('\u{7}') => {
                doc.delete_range(pos, pos + 1);
                end -= 1;
                bells += 1;
                doc.push_event(DocEvent::Bell);
            }
            Some('\u{8}') => {
                if pos > 0 {
                    doc.delete_range(pos - 1, pos + 1);
                    end -= 2;
                    pos -= 1;
                    begin = begin.min(pos);
                } else {
                    doc.delete_range(pos, pos + 1);
                    end -= 1;
                }
            }
            _ => pos += 1,
        }
    }

    ControlOutcome { begin, end, bells }
}

/// Carry-over state for chunked ANSI decoding.
///
/// One incoming chunk may end mid-escape-sequence; the fragment is left in
/// the document (hidden) and `trailing_partial` records its length so the
/// next call resumes over it. `codes` accumulates the active SGR parameters.
#[derive(Debug, Clone, Default)]
pub struct AnsiContext {
    codes: Vec<u16>,
    trailing_partial: usize,
}

impl AnsiContext {
    /// Fresh context with no active state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently accumulated SGR parameters.
    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    fn absorb(&mut self, params: &str) {
        let new: Vec<u16> = params
            .split([';', ':'])
            .map(|p| p.parse::<u16>().unwrap_or(0))
            .collect();

        // A reset anywhere clears everything accumulated before it.
        let mut i = 0;
        while i < new.len() {
            if new[i] == 0 {
                self.codes.clear();
                i += 1;
            } else if new[i] == 38 || new[i] == 48 {
                // Extended color: consume the whole 38;5;n / 48;5;n triple.
                let take = new.len().min(i + 3) - i;
                self.codes.extend_from_slice(&new[i..i + take]);
                i += take;
            } else {
                self.codes.push(new[i]);
                i += 1;
            }
        }
    }

    /// The face implied by the accumulated codes, or `None` when plain.
    pub fn face(&self) -> Option<Face> {
        let mut face = Face::default();
        let mut i = 0;
        while i < self.codes.len() {
            let code = self.codes[i];
            match code {
                1 => face.bold = true,
                3 => face.italic = true,
                4 => face.underline = true,
                7 => face.inverse = true,
                22 => face.bold = false,
                23 => face.italic = false,
                24 => face.underline = false,
                27 => face.inverse = false,
                30..=37 => face.fg = Some(Color::Base((code - 30) as u8)),
                90..=97 => face.fg = Some(Color::Base((code - 90 + 8) as u8)),
                39 => face.fg = None,
                40..=47 => face.bg = Some(Color::Base((code - 40) as u8)),
                100..=107 => face.bg = Some(Color::Base((code - 100 + 8) as u8)),
                49 => face.bg = None,
                38 | 48 => {
                    if self.codes.get(i + 1) == Some(&5)
                        && let Some(&n) = self.codes.get(i + 2)
                    {
                        let color = Some(Color::Indexed(n.min(255) as u8));
                        if code == 38 {
                            face.fg = color;
                        } else {
                            face.bg = color;
                        }
                    }
                    i += 2;
                }
                _ => {}
            }
            i += 1;
        }
        if face.is_plain() { None } else { Some(face) }
    }
}

fn csi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;:?]*[@-~]").expect("static CSI pattern"))
}

fn partial_csi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b(\[[0-9;:?]*)?\z").expect("static CSI fragment pattern"))
}

/// Decode ANSI escapes over `[begin, end)`, carrying state in `ctx`.
///
/// Escape sequences are hidden, never deleted; styled text between them gets
/// the accumulated face prepended to any face stack already present (markup
/// or images rendered earlier must survive).
pub fn apply_ansi(doc: &mut Document, begin: usize, end: usize, ctx: &mut AnsiContext) {
    let scan_start = begin.saturating_sub(ctx.trailing_partial);
    ctx.trailing_partial = 0;

    let end = end.min(doc.len_chars());
    if scan_start >= end {
        return;
    }

    let text = doc.slice(scan_start, end);
    // Byte offsets from the regex map back to char offsets through this
    // index (the slice may contain multibyte chars).
    let byte_to_char: Vec<usize> = {
        let mut v: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        v.push(text.len());
        v
    };
    let to_char = |byte: usize| -> usize {
        scan_start
            + match byte_to_char.binary_search(&byte) {
                Ok(i) | Err(i) => i,
            }
    };

    let mut styled_from = scan_start;
    let mut last_end_byte = 0usize;
    // Ranges are collected first; the document is only mutated afterward so
    // the char offsets stay valid throughout the scan.
    struct Piece {
        start: usize,
        end: usize,
        face: Option<Face>,
        escape: bool,
    }
    let mut pieces: Vec<Piece> = Vec::new();

    for m in csi_regex().find_iter(&text) {
        let (m_start, m_end) = (to_char(m.start()), to_char(m.end()));
        if m_start > styled_from {
            pieces.push(Piece {
                start: styled_from,
                end: m_start,
                face: ctx.face(),
                escape: false,
            });
        }
        pieces.push(Piece {
            start: m_start,
            end: m_end,
            face: None,
            escape: true,
        });
        let seq = m.as_str();
        if seq.ends_with('m') && !seq.contains('?') {
            ctx.absorb(&seq[2..seq.len() - 1]);
        }
        styled_from = m_end;
        last_end_byte = m.end();
    }

    // A chunk may end mid-sequence; hide the fragment and remember its
    // length so the next chunk resumes over it.
    let mut tail_end = end;
    if let Some(partial) = partial_csi_regex().find(&text[last_end_byte..]) {
        let frag_start = to_char(last_end_byte + partial.start());
        pieces.push(Piece {
            start: frag_start,
            end,
            face: None,
            escape: true,
        });
        ctx.trailing_partial = end - frag_start;
        tail_end = frag_start;
    }

    if tail_end > styled_from {
        pieces.push(Piece {
            start: styled_from,
            end: tail_end,
            face: ctx.face(),
            escape: false,
        });
    }

    for piece in pieces {
        if piece.escape {
            doc.set_invisible(piece.start, piece.end);
        } else if let Some(face) = piece.face {
            doc.prepend_face(piece.start, piece.end, face);
        }
    }
}
