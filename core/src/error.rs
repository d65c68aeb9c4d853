//! Error taxonomy for a page check.

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Why a page that was fetched successfully has nothing to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The revision text is missing or blank.
    Empty,
    /// The revision only redirects to another page.
    Redirect,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::Empty => f.write_str("no content"),
            NotFoundReason::Redirect => f.write_str("no content but a redirect"),
        }
    }
}

/// Transport failure raised by a [`crate::PageFetcher`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Fatal errors that abort a page check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("`{locator}` does not look like a Wikipedia URL: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("failed to fetch `{url}`")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("could not parse API response: {0}")]
    MalformedPayload(String),

    #[error("{reason} found for page `{title}`")]
    PageNotFound {
        title: String,
        reason: NotFoundReason,
    },

    #[error("failed to load language model from {}", path.display())]
    LanguageModel {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    /// True when the page simply has nothing to report, as opposed to a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckError::PageNotFound { .. })
    }

    pub(crate) fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        CheckError::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}

/// A finding whose plain-text offsets cannot be related to the markup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("offsets {start}..{end} cannot be mapped (plain text has {plain_len} bytes)")]
pub struct UnmappableOffset {
    pub start: usize,
    pub end: usize,
    pub plain_len: usize,
}

/// Spans handed to [`crate::PlainTextMapping::new`] break the ordering invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("span {index} is inverted or exceeds its text")]
    OutOfBounds { index: usize },
    #[error("span {index} overlaps or precedes the span before it")]
    NotMonotonic { index: usize },
}
