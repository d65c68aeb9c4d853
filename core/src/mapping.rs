//! Offset correspondence between filtered plain text and the markup it came from.
//!
//! Offsets are UTF-8 byte offsets. Inside a span, offsets are interpolated
//! proportionally (floor) and snapped down to a char boundary; span
//! boundaries map exactly. Plain offsets that fall between spans resolve to
//! the end of the nearest preceding span, or the start of the first span.

use std::ops::Range;

use serde::Serialize;

use crate::error::{MappingError, UnmappableOffset};

/// One contiguous piece of plain text and the markup it was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedSpan {
    pub plain: Range<usize>,
    pub original: Range<usize>,
}

impl MappedSpan {
    pub fn new(plain: Range<usize>, original: Range<usize>) -> Self {
        Self { plain, original }
    }

    fn plain_to_original(&self, offset: usize) -> usize {
        interpolate(offset, &self.plain, &self.original)
    }

    fn original_to_plain(&self, offset: usize) -> usize {
        interpolate(offset, &self.original, &self.plain)
    }
}

/// Plain text plus the ordered spans tying it to the original markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainTextMapping {
    plain_text: String,
    spans: Vec<MappedSpan>,
}

impl PlainTextMapping {
    /// Validates that spans are in bounds, non-overlapping and increasing in
    /// both coordinate spaces. `original_len` bounds the original ranges.
    pub fn new(
        plain_text: impl Into<String>,
        spans: Vec<MappedSpan>,
        original_len: usize,
    ) -> Result<Self, MappingError> {
        let plain_text = plain_text.into();
        let mut previous: Option<&MappedSpan> = None;
        for (index, span) in spans.iter().enumerate() {
            if span.plain.start > span.plain.end
                || span.original.start > span.original.end
                || span.plain.end > plain_text.len()
                || span.original.end > original_len
            {
                return Err(MappingError::OutOfBounds { index });
            }
            if let Some(prev) = previous {
                if span.plain.start < prev.plain.end || span.original.start < prev.original.end {
                    return Err(MappingError::NotMonotonic { index });
                }
            }
            previous = Some(span);
        }
        Ok(Self { plain_text, spans })
    }

    /// A mapping where the plain text is the original, byte for byte.
    pub fn identity(text: impl Into<String>) -> Self {
        let plain_text = text.into();
        let spans = vec![MappedSpan::new(0..plain_text.len(), 0..plain_text.len())];
        Self { plain_text, spans }
    }

    pub(crate) fn from_parts_unchecked(plain_text: String, spans: Vec<MappedSpan>) -> Self {
        debug_assert!(spans
            .windows(2)
            .all(|w| w[0].plain.end <= w[1].plain.start && w[0].original.end <= w[1].original.start));
        Self { plain_text, spans }
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn spans(&self) -> &[MappedSpan] {
        &self.spans
    }

    pub fn into_plain_text(self) -> String {
        self.plain_text
    }

    /// Original offset for a plain offset that starts a range. An offset on
    /// the boundary between two spans resolves into the later span.
    pub fn to_original_start(&self, plain: usize) -> Option<usize> {
        self.check_domain(plain)?;
        let index = self.spans.partition_point(|s| s.plain.start <= plain);
        Some(self.resolve(plain, index))
    }

    /// Original offset for a plain offset that ends a range. An offset on the
    /// boundary between two spans resolves into the earlier span.
    pub fn to_original_end(&self, plain: usize) -> Option<usize> {
        self.check_domain(plain)?;
        let index = self.spans.partition_point(|s| s.plain.start < plain);
        Some(self.resolve(plain, index))
    }

    /// Maps a plain range onto the original text. Empty ranges stay empty.
    pub fn to_original_range(&self, plain: Range<usize>) -> Result<Range<usize>, UnmappableOffset> {
        let unmappable = || UnmappableOffset {
            start: plain.start,
            end: plain.end,
            plain_len: self.plain_text.len(),
        };
        if plain.start > plain.end {
            return Err(unmappable());
        }
        let start = self.to_original_start(plain.start).ok_or_else(unmappable)?;
        if plain.start == plain.end {
            return Ok(start..start);
        }
        let end = self.to_original_end(plain.end).ok_or_else(unmappable)?;
        Ok(start..end.max(start))
    }

    /// Plain offset for an original offset, the inverse of
    /// [`Self::to_original_start`] up to interpolation: where a span's
    /// markup is shorter than its plain text, a round trip may land up to
    /// `plain.len() / original.len()` bytes (rounded up) before the start.
    pub fn to_plain(&self, original: usize) -> Option<usize> {
        let first = self.spans.first()?;
        let index = self.spans.partition_point(|s| s.original.start <= original);
        if index == 0 {
            return Some(first.plain.start);
        }
        let span = &self.spans[index - 1];
        if original <= span.original.end {
            Some(snap_to_char_boundary(
                &self.plain_text,
                span.original_to_plain(original),
            ))
        } else {
            Some(span.plain.end)
        }
    }

    fn check_domain(&self, plain: usize) -> Option<()> {
        if self.spans.is_empty() || plain > self.plain_text.len() {
            None
        } else {
            Some(())
        }
    }

    /// `index` is the partition point: spans before it qualify as candidates.
    fn resolve(&self, plain: usize, index: usize) -> usize {
        if index == 0 {
            return self.spans[0].original.start;
        }
        let span = &self.spans[index - 1];
        if plain <= span.plain.end {
            span.plain_to_original(plain)
        } else {
            span.original.end
        }
    }
}

fn interpolate(offset: usize, from: &Range<usize>, to: &Range<usize>) -> usize {
    if offset <= from.start {
        return to.start;
    }
    if offset >= from.end {
        return to.end;
    }
    let from_len = from.end - from.start;
    let to_len = to.end - to.start;
    to.start + (offset - from.start) * to_len / from_len
}

pub(crate) fn snap_to_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    // "'''Bold''' text&amp;more" filtered to "Bold text&more"
    fn bold_mapping() -> PlainTextMapping {
        PlainTextMapping::new(
            "Bold text&more",
            vec![
                MappedSpan::new(0..4, 3..7),
                MappedSpan::new(4..9, 10..15),
                MappedSpan::new(9..10, 15..20),
                MappedSpan::new(10..14, 20..24),
            ],
            24,
        )
        .unwrap()
    }

    #[test]
    fn maps_span_boundaries_exactly() {
        let mapping = bold_mapping();
        assert_eq!(mapping.to_original_start(0), Some(3));
        assert_eq!(mapping.to_original_end(4), Some(7));
        assert_eq!(mapping.to_original_start(4), Some(10));
        assert_eq!(mapping.to_original_end(14), Some(24));
    }

    #[test]
    fn interpolates_inside_entities() {
        let mapping = bold_mapping();
        assert_eq!(mapping.to_original_range(9..10).unwrap(), 15..20);
        assert_eq!(mapping.to_original_range(0..4).unwrap(), 3..7);
        assert_eq!(mapping.to_original_range(5..9).unwrap(), 11..15);
    }

    #[test]
    fn empty_ranges_stay_empty() {
        let mapping = bold_mapping();
        assert_eq!(mapping.to_original_range(4..4).unwrap(), 10..10);
    }

    #[test]
    fn gaps_resolve_to_preceding_span() {
        let mapping = PlainTextMapping::new(
            "ab\n\ncd",
            vec![MappedSpan::new(0..2, 0..2), MappedSpan::new(4..6, 10..12)],
            12,
        )
        .unwrap();
        assert_eq!(mapping.to_original_start(3), Some(2));
        assert_eq!(mapping.to_original_end(3), Some(2));
        assert_eq!(mapping.to_original_start(4), Some(10));
    }

    #[test]
    fn leading_synthesized_text_resolves_to_first_span() {
        let mapping =
            PlainTextMapping::new("\nab", vec![MappedSpan::new(1..3, 5..7)], 7).unwrap();
        assert_eq!(mapping.to_original_start(0), Some(5));
    }

    #[test]
    fn rejects_offsets_outside_the_plain_text() {
        let mapping = bold_mapping();
        let err = mapping.to_original_range(10..40).unwrap_err();
        assert_eq!(err.plain_len, 14);
        assert!(mapping.to_original_range(6..5).is_err());
        assert!(PlainTextMapping::new("x", Vec::new(), 1)
            .unwrap()
            .to_original_range(0..1)
            .is_err());
    }

    #[test]
    fn rejects_overlapping_spans() {
        let err = PlainTextMapping::new(
            "abcd",
            vec![MappedSpan::new(0..2, 0..4), MappedSpan::new(2..4, 3..6)],
            6,
        )
        .unwrap_err();
        assert_eq!(err, MappingError::NotMonotonic { index: 1 });
        let err = PlainTextMapping::new("ab", vec![MappedSpan::new(0..3, 0..3)], 3).unwrap_err();
        assert_eq!(err, MappingError::OutOfBounds { index: 0 });
    }

    #[test]
    fn maps_original_offsets_back() {
        let mapping = bold_mapping();
        assert_eq!(mapping.to_plain(0), Some(0));
        assert_eq!(mapping.to_plain(12), Some(6));
        assert_eq!(mapping.to_plain(8), Some(4));
    }

    #[test]
    fn round_trip_through_a_short_original_stays_within_one_unit() {
        let mapping = PlainTextMapping::new(
            "xxxxxxxxCategory:",
            vec![MappedSpan::new(8..17, 13..14)],
            14,
        )
        .unwrap();
        let original = mapping.to_original_start(13).unwrap();
        assert_eq!(original, 13);
        let back = mapping.to_plain(original).unwrap();
        assert_eq!(back, 8);
        assert!(13 - back <= 9);
    }

    #[test]
    fn snaps_to_char_boundaries() {
        let mapping = PlainTextMapping::new("é", vec![MappedSpan::new(0..2, 0..8)], 8).unwrap();
        assert_eq!(mapping.to_plain(5), Some(0));
        assert_eq!(snap_to_char_boundary("aé", 2), 1);
    }
}
