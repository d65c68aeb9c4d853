//! Wikipedia page URLs and the API requests derived from them.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;

use crate::error::CheckError;
use crate::language::Language;

static WIKIPEDIA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(..)\.wikipedia\.org/wiki/(.*)$").expect("valid wikipedia url regex")
});

static SECURE_WIKIPEDIA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://secure\.wikimedia\.org/wikipedia/(..)/wiki/(.*)$")
        .expect("valid secure wikipedia url regex")
});

/// A validated reference to exactly one Wikipedia page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    url: String,
    language: Language,
    title: String,
}

impl Locator {
    /// Accepts `https://<lang>.wikipedia.org/wiki/<title>` and the legacy
    /// `https://secure.wikimedia.org/wikipedia/<lang>/wiki/<title>` form.
    pub fn parse(url: &str) -> Result<Self, CheckError> {
        let captures = WIKIPEDIA_URL_RE
            .captures(url)
            .or_else(|| SECURE_WIKIPEDIA_URL_RE.captures(url))
            .ok_or_else(|| CheckError::invalid_locator(url, "unrecognized URL shape"))?;

        let code = &captures[1];
        let language = Language::from_code(code).ok_or_else(|| {
            CheckError::invalid_locator(url, format!("unsupported language `{code}`"))
        })?;

        let title = percent_decode_str(&captures[2])
            .decode_utf8()
            .map_err(|e| CheckError::invalid_locator(url, format!("title is not UTF-8: {e}")))?
            .into_owned();
        if title.is_empty() {
            return Err(CheckError::invalid_locator(url, "missing page title"));
        }

        Ok(Self {
            url: url.to_string(),
            language,
            title,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// MediaWiki API request for the latest revision's content and timestamp.
    pub fn api_url(&self) -> Result<Url, CheckError> {
        let endpoint = format!("https://{}.wikipedia.org/w/api.php", self.language.code());
        Url::parse_with_params(
            &endpoint,
            &[
                ("titles", self.title.as_str()),
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content|timestamp"),
                ("format", "xml"),
            ],
        )
        .map_err(|e| CheckError::invalid_locator(&self.url, format!("cannot build API URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_and_title() {
        let locator = Locator::parse("https://de.wikipedia.org/wiki/Angela_Merkel").unwrap();
        assert_eq!(locator.language().code(), "de");
        assert_eq!(locator.title(), "Angela_Merkel");
    }

    #[test]
    fn accepts_plain_http_and_secure_mirror() {
        let locator = Locator::parse("http://en.wikipedia.org/wiki/Talk:Main_Page").unwrap();
        assert_eq!(locator.title(), "Talk:Main_Page");

        let locator =
            Locator::parse("https://secure.wikimedia.org/wikipedia/de/wiki/G%C3%BCtersloh")
                .unwrap();
        assert_eq!(locator.language().code(), "de");
        assert_eq!(locator.title(), "Gütersloh");
    }

    #[test]
    fn rejects_foreign_and_incomplete_urls() {
        for url in [
            "https://example.com/foo",
            "https://de.wikipedia.org/w/index.php?title=X",
            "https://de.wikipedia.org/wiki/",
            "https://xx.wikipedia.org/wiki/Foo",
            "ftp://de.wikipedia.org/wiki/Foo",
        ] {
            let err = Locator::parse(url).unwrap_err();
            assert!(
                matches!(err, CheckError::InvalidLocator { .. }),
                "expected invalid locator for {url}, got {err:?}"
            );
        }
    }

    #[test]
    fn builds_api_query() {
        let locator = Locator::parse("https://fr.wikipedia.org/wiki/Tour_Eiffel").unwrap();
        let url = locator.api_url().unwrap();
        assert_eq!(url.host_str(), Some("fr.wikipedia.org"));
        assert_eq!(url.path(), "/w/api.php");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("titles".into(), "Tour_Eiffel".into())));
        assert!(pairs.contains(&("rvprop".into(), "content|timestamp".into())));
        assert!(pairs.contains(&("format".into(), "xml".into())));
    }
}
