//! Applies a finding, expressed in plain-text offsets, to the original markup.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::Finding;
use crate::error::UnmappableOffset;
use crate::mapping::{snap_to_char_boundary, PlainTextMapping};

pub const DEFAULT_CONTEXT_RADIUS: usize = 50;

/// Strings wrapped around a finding instead of applying a correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarker {
    pub before: String,
    pub after: String,
}

impl ErrorMarker {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }
}

/// One way of applying a finding to the original text: a substituted
/// suggestion, a marked span, or no change at all.
#[derive(Debug, Clone, Serialize)]
pub struct RuleMatchApplication {
    #[serde(skip)]
    original: Arc<str>,
    pub original_start: usize,
    pub original_end: usize,
    pub replacement: Option<String>,
    /// The original text after substitution or marking.
    pub text: String,
    /// Where the substituted or marked span sits in `text`.
    pub text_start: usize,
    pub text_end: usize,
}

impl RuleMatchApplication {
    pub fn has_real_replacement(&self) -> bool {
        self.replacement.is_some()
    }

    pub fn original_text(&self) -> &str {
        &self.original
    }

    /// The original markup around the finding.
    pub fn original_context(&self, radius: usize) -> ContextExcerpt {
        ContextExcerpt::around(&self.original, self.original_start, self.original_end, radius)
    }

    /// The edited (or marked) text around the changed span.
    pub fn corrected_context(&self, radius: usize) -> ContextExcerpt {
        ContextExcerpt::around(&self.text, self.text_start, self.text_end, radius)
    }
}

/// A window of text around a span; `match_start..match_end` index into `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextExcerpt {
    pub text: String,
    pub match_start: usize,
    pub match_end: usize,
}

impl ContextExcerpt {
    /// Up to `radius` characters on each side of `start..end`, clipped to `text`.
    pub fn around(text: &str, start: usize, end: usize, radius: usize) -> Self {
        let start = snap_to_char_boundary(text, start);
        let end = snap_to_char_boundary(text, end).max(start);
        let from = text[..start]
            .char_indices()
            .rev()
            .take(radius)
            .last()
            .map_or(start, |(idx, _)| idx);
        let to = text[end..]
            .char_indices()
            .nth(radius)
            .map_or(text.len(), |(idx, _)| end + idx);
        Self {
            text: text[from..to].to_string(),
            match_start: start - from,
            match_end: end - from,
        }
    }

    /// Single-line rendering with line breaks shown as `\n`.
    pub fn escaped(&self) -> String {
        self.text.replace('\r', "\\r").replace('\n', "\\n")
    }
}

impl fmt::Display for ContextExcerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.escaped())
    }
}

/// Maps `finding` onto `original` and applies it.
///
/// With a marker, one application wraps the span. Otherwise there is one
/// application per suggestion, or a single unchanged one when the finding
/// has no suggestions.
pub fn apply(
    mapping: &PlainTextMapping,
    original: Arc<str>,
    finding: &Finding,
    marker: Option<&ErrorMarker>,
) -> Result<Vec<RuleMatchApplication>, UnmappableOffset> {
    let range = mapping.to_original_range(finding.start..finding.end)?;
    let start = snap_to_char_boundary(&original, range.start);
    let end = snap_to_char_boundary(&original, range.end).max(start);

    let unchanged = |original: &Arc<str>| RuleMatchApplication {
        original: Arc::clone(original),
        original_start: start,
        original_end: end,
        replacement: None,
        text: original.to_string(),
        text_start: start,
        text_end: end,
    };

    if let Some(marker) = marker {
        let text = format!(
            "{}{}{}{}{}",
            &original[..start],
            marker.before,
            &original[start..end],
            marker.after,
            &original[end..]
        );
        let text_end = start + marker.before.len() + (end - start) + marker.after.len();
        return Ok(vec![RuleMatchApplication {
            text,
            text_end,
            ..unchanged(&original)
        }]);
    }

    if finding.suggestions.is_empty() {
        return Ok(vec![unchanged(&original)]);
    }

    Ok(finding
        .suggestions
        .iter()
        .map(|suggestion| {
            let text = format!("{}{}{}", &original[..start], suggestion, &original[end..]);
            RuleMatchApplication {
                replacement: Some(suggestion.clone()),
                text,
                text_end: start + suggestion.len(),
                ..unchanged(&original)
            }
        })
        .collect())
}
