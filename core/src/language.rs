//! Wikipedia language editions known to the checker.

use std::fmt;

use serde::Serialize;

/// A Wikipedia language edition the checker knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    code: &'static str,
    name: &'static str,
}

const SUPPORTED: &[Language] = &[
    Language::new("ca", "Catalan"),
    Language::new("de", "German"),
    Language::new("en", "English"),
    Language::new("eo", "Esperanto"),
    Language::new("es", "Spanish"),
    Language::new("fr", "French"),
    Language::new("gl", "Galician"),
    Language::new("it", "Italian"),
    Language::new("nl", "Dutch"),
    Language::new("pl", "Polish"),
    Language::new("pt", "Portuguese"),
    Language::new("ru", "Russian"),
    Language::new("sv", "Swedish"),
    Language::new("uk", "Ukrainian"),
];

impl Language {
    pub const ENGLISH: Language = Language::new("en", "English");

    const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }

    /// Looks up a two-letter language code such as `de`.
    pub fn from_code(code: &str) -> Option<Language> {
        SUPPORTED.iter().copied().find(|lang| lang.code == code)
    }

    pub fn supported() -> &'static [Language] {
        SUPPORTED
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes_only() {
        assert_eq!(Language::from_code("de").map(|l| l.name()), Some("German"));
        assert_eq!(Language::from_code("en"), Some(Language::ENGLISH));
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::from_code("EN"), None);
    }
}
