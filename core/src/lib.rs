//! Wikipedia page checker core.
//! Fetches the markup of a page, reduces it to plain prose, runs a set of
//! style and grammar rules over the prose and reports every finding in the
//! coordinates of the original markup.

use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

pub mod checker;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod language;
pub mod language_model;
pub mod links;
pub mod locator;
pub mod mapping;
pub mod replacer;
pub mod revision;
pub mod rules;

pub use checker::{
    plain_text, plain_text_mapping, AppliedFinding, CheckResult, Checker, PlainCheckResult,
};
pub use engine::{Finding, Rule, RuleCategory, RuleEngine};
pub use error::{CheckError, FetchError, MappingError, NotFoundReason, UnmappableOffset};
pub use fetch::{HttpFetcher, PageFetcher};
pub use language::Language;
pub use locator::Locator;
pub use mapping::{MappedSpan, PlainTextMapping};
pub use replacer::{ContextExcerpt, ErrorMarker, RuleMatchApplication};
pub use revision::{extract_revision, RevisionContent};

/// Phrases flagged by one phrase rule, with optional replacements keyed by
/// the lowercased phrase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseList {
    pub phrases: Vec<String>,
    pub replacements: BTreeMap<String, String>,
}

impl PhraseList {
    fn of(phrases: &[&str]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            replacements: BTreeMap::new(),
        }
    }

    fn replacing(mut self, pairs: &[(&str, &str)]) -> Self {
        for (phrase, replacement) in pairs {
            if !self.phrases.iter().any(|p| p == phrase) {
                self.phrases.push(phrase.to_string());
            }
            self.replacements
                .insert(phrase.to_string(), replacement.to_string());
        }
        self
    }
}

/// Word lists for a single language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageRules {
    pub buzzwords: PhraseList,
    pub peacock: PhraseList,
    pub weasel: PhraseList,
    pub contractions: PhraseList,
    /// Misspelling to correction.
    pub typos: BTreeMap<String, String>,
}

impl LanguageRules {
    /// The lists shipped for English.
    pub fn english() -> Self {
        Self {
            buzzwords: PhraseList::of(&[
                "delve into",
                "deep dive",
                "leverage",
                "facilitate",
                "embark on a journey",
                "pivotal",
                "robust",
                "seamless",
                "multifaceted",
                "groundbreaking",
                "holistic",
                "paradigm-shifting",
                "synergy",
                "cutting-edge",
                "game-changing",
                "state-of-the-art",
                "plethora",
            ])
            .replacing(&[
                ("utilize", "use"),
                ("utilise", "use"),
                ("utilization", "use"),
                ("in order to", "to"),
                ("a large number of", "many"),
                ("at this point in time", "now"),
                ("due to the fact that", "because"),
                ("prior to", "before"),
                ("commence", "begin"),
            ]),
            peacock: PhraseList::of(&[
                "legendary",
                "iconic",
                "world-class",
                "breathtaking",
                "must-see",
                "must-visit",
                "stunning natural beauty",
                "rich cultural heritage",
                "enduring legacy",
                "nestled",
                "in the heart of",
                "stands as a testament",
                "stands as a symbol of",
                "plays a pivotal role in",
                "unparalleled",
                "renowned",
                "visionary",
                "virtuoso",
            ]),
            weasel: PhraseList::of(&[
                "some people say",
                "many people believe",
                "it is widely believed",
                "it has been said",
                "experts say",
                "critics say",
                "it is often said",
                "some argue",
                "many consider",
                "it is thought",
                "it is claimed",
                "research has shown",
            ]),
            contractions: PhraseList::default().replacing(&[
                ("don't", "do not"),
                ("doesn't", "does not"),
                ("didn't", "did not"),
                ("can't", "cannot"),
                ("won't", "will not"),
                ("wouldn't", "would not"),
                ("couldn't", "could not"),
                ("isn't", "is not"),
                ("aren't", "are not"),
                ("wasn't", "was not"),
                ("weren't", "were not"),
                ("hasn't", "has not"),
                ("haven't", "have not"),
                ("it's", "it is"),
                ("they're", "they are"),
            ]),
            typos: [
                ("teh", "the"),
                ("recieve", "receive"),
                ("recieved", "received"),
                ("seperate", "separate"),
                ("occured", "occurred"),
                ("untill", "until"),
                ("wich", "which"),
                ("accomodate", "accommodate"),
                ("definately", "definitely"),
                ("goverment", "government"),
                ("enviroment", "environment"),
                ("begining", "beginning"),
                ("beleive", "believe"),
                ("existance", "existence"),
                ("independant", "independent"),
            ]
            .into_iter()
            .map(|(typo, fix)| (typo.to_string(), fix.to_string()))
            .collect(),
        }
    }
}

/// Rule parameters and per-language word lists keyed by language code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Sentences with more words are flagged; 0 turns the rule off.
    pub max_sentence_words: usize,
    pub languages: BTreeMap<String, LanguageRules>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            max_sentence_words: 40,
            languages: BTreeMap::from([("en".to_string(), LanguageRules::english())]),
        }
    }
}

/// Checker configuration, usually loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub disabled_rules: Vec<String>,
    /// Directory holding `<lang>/2grams.txt` and `<lang>/confusion_sets.txt`.
    pub ngram_dir: Option<PathBuf>,
    /// Mark findings with these strings instead of applying suggestions.
    pub marker: Option<ErrorMarker>,
    pub context_radius: usize,
    /// Rule engine threads; 0 uses the available parallelism.
    pub workers: usize,
    /// Lowercase prefixes that mark a revision as a redirect.
    pub redirect_keywords: Vec<String>,
    pub rules: RuleSettings,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            disabled_rules: Vec::new(),
            ngram_dir: None,
            marker: None,
            context_radius: replacer::DEFAULT_CONTEXT_RADIUS,
            workers: 0,
            redirect_keywords: vec![
                "#redirect".into(),
                "#weiterleitung".into(),
                "#redirection".into(),
                "#redirección".into(),
                "#rinvia".into(),
                "#doorverwijzing".into(),
                "#перенаправление".into(),
            ],
            rules: RuleSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacements_are_also_phrases() {
        let english = LanguageRules::english();
        assert!(english.buzzwords.phrases.iter().any(|p| p == "utilize"));
        assert_eq!(english.contractions.replacements["don't"], "do not");
        assert_eq!(
            english.contractions.phrases.len(),
            english.contractions.replacements.len()
        );
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: CheckerConfig = serde_yaml::from_str(
            "disabled_rules: [WHITESPACE_RULE]\nmarker:\n  before: '<'\n  after: '>'\nrules:\n  max_sentence_words: 25\n",
        )
        .unwrap();
        assert_eq!(config.disabled_rules, vec!["WHITESPACE_RULE".to_string()]);
        assert_eq!(config.marker, Some(ErrorMarker::new("<", ">")));
        assert_eq!(config.context_radius, 50);
        assert_eq!(config.rules.max_sentence_words, 25);
        assert!(config.rules.languages.contains_key("en"));
        assert!(config.redirect_keywords.contains(&"#redirect".to_string()));
    }
}
