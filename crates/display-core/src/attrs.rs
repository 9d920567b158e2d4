//! Attribute layers: out-of-band presentation metadata over document ranges.
//!
//! A [`AttrLayer`] maps half-open `[start, end)` char ranges to values of one
//! attribute key (identity, face stack, visibility, ...). Ranges within a
//! layer never overlap, and adjacent ranges carrying equal values merge
//! automatically, so each layer is a canonical sorted run of spans.
//!
//! Layers keep themselves consistent across text edits via
//! [`AttrLayer::update_for_insertion`] / [`AttrLayer::update_for_deletion`],
//! which the [`Document`](crate::Document) calls on every mutation.
//!
//! [`MarkerSet`] is the companion structure for single-position markers
//! (region-begin). It is deliberately not a mergeable range layer: two
//! adjacent regions must keep two distinct begin markers.

/// One contiguous attribute span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpan<V> {
    /// Start offset (chars, inclusive).
    pub start: usize,
    /// End offset (chars, exclusive).
    pub end: usize,
    /// The attribute value covering `[start, end)`.
    pub value: V,
}

impl<V> AttrSpan<V> {
    /// Create a new span.
    pub fn new(start: usize, end: usize, value: V) -> Self {
        Self { start, end, value }
    }

    /// Check if the span contains a specific position.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// A single attribute key's interval map.
///
/// Invariants: spans are sorted by `start`, pairwise disjoint, non-empty, and
/// no two adjacent spans (`a.end == b.start`) carry equal values.
#[derive(Debug, Clone)]
pub struct AttrLayer<V: Clone + PartialEq> {
    spans: Vec<AttrSpan<V>>,
}

impl<V: Clone + PartialEq> AttrLayer<V> {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Number of spans in the layer.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if the layer has no spans.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Iterate all spans in document order.
    pub fn spans(&self) -> impl Iterator<Item = &AttrSpan<V>> {
        self.spans.iter()
    }

    /// Index of the span containing `pos`, if any.
    fn span_index_at(&self, pos: usize) -> Option<usize> {
        // First span with start > pos, then check its predecessor.
        let idx = self
            .spans
            .partition_point(|s| s.start <= pos);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        if self.spans[candidate].contains(pos) {
            Some(candidate)
        } else {
            None
        }
    }

    /// The value covering `pos`, if any.
    pub fn value_at(&self, pos: usize) -> Option<&V> {
        self.span_index_at(pos).map(|i| &self.spans[i].value)
    }

    /// First position strictly after `pos` where the value differs from the
    /// value at `pos`, or `None` if the layer is uniform from `pos` onward.
    ///
    /// Because adjacent equal-valued spans are merged, a covered position
    /// always changes at its span end, and an uncovered position changes at
    /// the start of the next span.
    pub fn next_change(&self, pos: usize) -> Option<usize> {
        match self.span_index_at(pos) {
            Some(idx) => Some(self.spans[idx].end),
            None => {
                let idx = self.spans.partition_point(|s| s.start <= pos);
                self.spans.get(idx).map(|s| s.start)
            }
        }
    }

    /// First span starting at or after `pos`.
    pub fn next_span_at_or_after(&self, pos: usize) -> Option<&AttrSpan<V>> {
        let idx = self.spans.partition_point(|s| s.start < pos);
        self.spans.get(idx)
    }

    /// Set `value` over `[start, end)`, replacing whatever was there.
    pub fn set(&mut self, start: usize, end: usize, value: V) {
        if start >= end {
            return;
        }
        self.clear_range(start, end);
        let idx = self.spans.partition_point(|s| s.start < start);
        self.spans.insert(idx, AttrSpan::new(start, end, value));
        self.merge_around(idx);
    }

    /// Remove all attribute coverage over `[start, end)`, splitting spans
    /// that cross the boundary.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        if start >= end || self.spans.is_empty() {
            return;
        }

        let mut result: Vec<AttrSpan<V>> = Vec::with_capacity(self.spans.len() + 1);
        for span in self.spans.drain(..) {
            if span.end <= start || span.start >= end {
                result.push(span);
            } else {
                if span.start < start {
                    result.push(AttrSpan::new(span.start, start, span.value.clone()));
                }
                if span.end > end {
                    result.push(AttrSpan::new(end, span.end, span.value));
                }
            }
        }
        self.spans = result;
    }

    /// Rewrite the value over `[start, end)` by applying `f` to the existing
    /// value (or `None` where uncovered) on each distinct sub-range.
    ///
    /// Used for combining attributes (e.g. prepending an ANSI face to an
    /// existing face stack) without clobbering prior values.
    pub fn map_range<F>(&mut self, start: usize, end: usize, mut f: F)
    where
        F: FnMut(Option<&V>) -> Option<V>,
    {
        if start >= end {
            return;
        }

        // Collect the distinct sub-ranges first; mutation happens afterward
        // so positions stay valid.
        let mut pieces: Vec<(usize, usize, Option<V>)> = Vec::new();
        let mut pos = start;
        while pos < end {
            let current = self.value_at(pos).cloned();
            let next = self.next_change(pos).unwrap_or(end).min(end);
            pieces.push((pos, next, current));
            pos = next;
        }

        for (s, e, old) in pieces {
            match f(old.as_ref()) {
                Some(new) => self.set(s, e, new),
                None => self.clear_range(s, e),
            }
        }
    }

    /// Merge the span at `idx` with equal-valued neighbors it now abuts.
    fn merge_around(&mut self, idx: usize) {
        // Merge with successor first so `idx` stays valid.
        if idx + 1 < self.spans.len()
            && self.spans[idx].end == self.spans[idx + 1].start
            && self.spans[idx].value == self.spans[idx + 1].value
        {
            let next_end = self.spans[idx + 1].end;
            self.spans[idx].end = next_end;
            self.spans.remove(idx + 1);
        }
        if idx > 0
            && self.spans[idx - 1].end == self.spans[idx].start
            && self.spans[idx - 1].value == self.spans[idx].value
        {
            let end = self.spans[idx].end;
            self.spans[idx - 1].end = end;
            self.spans.remove(idx);
        }
    }

    /// Re-establish the merge invariant across the whole layer.
    fn merge_all(&mut self) {
        let mut i = 0;
        while i + 1 < self.spans.len() {
            if self.spans[i].end == self.spans[i + 1].start
                && self.spans[i].value == self.spans[i + 1].value
            {
                let next_end = self.spans[i + 1].end;
                self.spans[i].end = next_end;
                self.spans.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Shift spans to account for `len` chars inserted at `pos`.
    ///
    /// A span starting at or after `pos` moves right; a span strictly
    /// containing `pos` grows. Text inserted exactly at a span's end is not
    /// covered (new content carries its own attributes).
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for span in &mut self.spans {
            if span.start >= pos {
                span.start += len;
                span.end += len;
            } else if span.end > pos {
                span.end += len;
            }
        }
    }

    /// Shrink/shift spans to account for deletion of `[start, end)`.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let delta = end - start;
        let mut i = 0;
        while i < self.spans.len() {
            let span = &mut self.spans[i];
            if span.end <= start {
                i += 1;
            } else if span.start >= end {
                span.start -= delta;
                span.end -= delta;
                i += 1;
            } else if span.start >= start && span.end <= end {
                self.spans.remove(i);
            } else if span.start < start && span.end > end {
                span.end -= delta;
                i += 1;
            } else if span.start < start {
                span.end = start;
                i += 1;
            } else {
                span.start = start;
                span.end -= delta;
                i += 1;
            }
        }
        // Deleting a gap can bring equal-valued spans together.
        self.merge_all();
    }
}

impl<V: Clone + PartialEq> Default for AttrLayer<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sorted set of single-char marker positions.
///
/// Used for the region-begin marker. Markers shift with text edits the same
/// way attribute spans do; a marker inside a deleted range is dropped.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    positions: Vec<usize>,
}

impl MarkerSet {
    /// Create an empty marker set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker at `pos` (idempotent).
    pub fn add(&mut self, pos: usize) {
        match self.positions.binary_search(&pos) {
            Ok(_) => {}
            Err(idx) => self.positions.insert(idx, pos),
        }
    }

    /// Remove the marker at `pos`, if present.
    pub fn remove(&mut self, pos: usize) -> bool {
        match self.positions.binary_search(&pos) {
            Ok(idx) => {
                self.positions.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Check whether `pos` carries a marker.
    pub fn contains(&self, pos: usize) -> bool {
        self.positions.binary_search(&pos).is_ok()
    }

    /// Nearest marker at or before `pos`.
    pub fn prev_at_or_before(&self, pos: usize) -> Option<usize> {
        let idx = self.positions.partition_point(|&p| p <= pos);
        idx.checked_sub(1).map(|i| self.positions[i])
    }

    /// First marker strictly after `pos`.
    pub fn next_after(&self, pos: usize) -> Option<usize> {
        let idx = self.positions.partition_point(|&p| p <= pos);
        self.positions.get(idx).copied()
    }

    /// Iterate marker positions strictly after `pos`, in order.
    pub fn iter_after(&self, pos: usize) -> impl Iterator<Item = usize> + '_ {
        let idx = self.positions.partition_point(|&p| p <= pos);
        self.positions[idx..].iter().copied()
    }

    /// All marker positions, in order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Shift markers for `len` chars inserted at `pos`.
    pub fn update_for_insertion(&mut self, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for p in &mut self.positions {
            if *p >= pos {
                *p += len;
            }
        }
    }

    /// Shift markers for deletion of `[start, end)`; markers inside the
    /// deleted range are dropped.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let delta = end - start;
        self.positions.retain(|&p| p < start || p >= end);
        for p in &mut self.positions {
            if *p >= end {
                *p -= delta;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_at_and_boundaries() {
        let mut layer = AttrLayer::new();
        layer.set(10, 20, "x");

        assert_eq!(layer.value_at(9), None);
        assert_eq!(layer.value_at(10), Some(&"x"));
        assert_eq!(layer.value_at(19), Some(&"x"));
        assert_eq!(layer.value_at(20), None);
    }

    #[test]
    fn test_adjacent_equal_values_merge() {
        let mut layer = AttrLayer::new();
        layer.set(0, 5, "x");
        layer.set(5, 10, "x");

        assert_eq!(layer.len(), 1);
        let span = layer.spans().next().unwrap();
        assert_eq!((span.start, span.end), (0, 10));
    }

    #[test]
    fn test_adjacent_distinct_values_do_not_merge() {
        let mut layer = AttrLayer::new();
        layer.set(0, 5, "x");
        layer.set(5, 10, "y");

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.next_change(2), Some(5));
        assert_eq!(layer.next_change(7), Some(10));
    }

    #[test]
    fn test_set_splits_overlapped_span() {
        let mut layer = AttrLayer::new();
        layer.set(0, 10, "x");
        layer.set(3, 6, "y");

        let spans: Vec<_> = layer
            .spans()
            .map(|s| (s.start, s.end, s.value))
            .collect();
        assert_eq!(spans, vec![(0, 3, "x"), (3, 6, "y"), (6, 10, "x")]);
    }

    #[test]
    fn test_next_change_in_gap() {
        let mut layer = AttrLayer::new();
        layer.set(10, 20, "x");

        assert_eq!(layer.next_change(0), Some(10));
        assert_eq!(layer.next_change(15), Some(20));
        assert_eq!(layer.next_change(25), None);
    }

    #[test]
    fn test_update_for_insertion() {
        let mut layer = AttrLayer::new();
        layer.set(10, 20, "x");

        // Insertion inside grows the span.
        layer.update_for_insertion(15, 5);
        assert_eq!(layer.value_at(24), Some(&"x"));
        assert_eq!(layer.value_at(25), None);

        // Insertion at the start shifts the span.
        layer.update_for_insertion(10, 2);
        assert_eq!(layer.value_at(11), None);
        assert_eq!(layer.value_at(12), Some(&"x"));

        // Insertion exactly at the end is not covered.
        layer.update_for_insertion(27, 3);
        assert_eq!(layer.value_at(27), None);
    }

    #[test]
    fn test_update_for_deletion_remerges() {
        let mut layer = AttrLayer::new();
        layer.set(0, 5, "x");
        layer.set(8, 12, "x");

        // Deleting the gap brings the equal-valued spans together.
        layer.update_for_deletion(5, 8);
        assert_eq!(layer.len(), 1);
        let span = layer.spans().next().unwrap();
        assert_eq!((span.start, span.end), (0, 9));
    }

    #[test]
    fn test_map_range_prepends() {
        let mut layer: AttrLayer<Vec<&str>> = AttrLayer::new();
        layer.set(5, 10, vec!["old"]);

        layer.map_range(0, 10, |existing| {
            let mut stack = vec!["new"];
            if let Some(rest) = existing {
                stack.extend(rest.iter().copied());
            }
            Some(stack)
        });

        assert_eq!(layer.value_at(2), Some(&vec!["new"]));
        assert_eq!(layer.value_at(7), Some(&vec!["new", "old"]));
    }

    #[test]
    fn test_marker_set_queries() {
        let mut markers = MarkerSet::new();
        markers.add(5);
        markers.add(12);
        markers.add(5); // idempotent

        assert_eq!(markers.positions(), &[5, 12]);
        assert!(markers.contains(5));
        assert_eq!(markers.prev_at_or_before(11), Some(5));
        assert_eq!(markers.prev_at_or_before(4), None);
        assert_eq!(markers.next_after(5), Some(12));
        assert_eq!(markers.next_after(12), None);
    }

    #[test]
    fn test_marker_set_edits() {
        let mut markers = MarkerSet::new();
        markers.add(5);
        markers.add(12);

        markers.update_for_insertion(5, 3);
        assert_eq!(markers.positions(), &[8, 15]);

        // Marker inside the deleted range is dropped.
        markers.update_for_deletion(7, 10);
        assert_eq!(markers.positions(), &[12]);
    }
}
