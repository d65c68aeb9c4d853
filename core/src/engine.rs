//! Rule engine: evaluates independent rules over one immutable text on a
//! small pool of scoped worker threads.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CheckError;
use crate::language::Language;
use crate::language_model::load_confusion_rule;
use crate::rules::rules_for;
use crate::RuleSettings;

/// Rule category identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    Typography,
    Grammar,
    Style,
    Wikipedia,
    Spelling,
    Confusion,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCategory::Typography => "typography",
            RuleCategory::Grammar => "grammar",
            RuleCategory::Style => "style",
            RuleCategory::Wikipedia => "wikipedia",
            RuleCategory::Spelling => "spelling",
            RuleCategory::Confusion => "confusion",
        };
        f.write_str(name)
    }
}

/// One issue reported against the plain text, in byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: String,
    pub category: RuleCategory,
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub suggestions: Vec<String>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        category: RuleCategory,
        message: impl Into<String>,
        span: (usize, usize),
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            message: message.into(),
            start: span.0,
            end: span.1,
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.rule_id, self.start, self.end, self.message
        )
    }
}

/// A single check over plain text. Rules must not depend on each other.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn category(&self) -> RuleCategory;

    /// Rules that are off unless explicitly enabled return `false`.
    fn default_on(&self) -> bool {
        true
    }

    fn is_dictionary_spelling(&self) -> bool {
        false
    }

    fn check(&self, text: &str) -> Vec<Finding>;
}

/// Rules for one language plus their on/off state. Built per check; dropping
/// it releases everything it holds.
pub struct RuleEngine {
    language: Language,
    rules: Vec<Box<dyn Rule>>,
    active: Vec<bool>,
    /// Ids turned off by name; also applies to rules added later.
    disabled: HashSet<String>,
    workers: usize,
}

impl RuleEngine {
    /// `workers == 0` uses the available parallelism.
    pub fn new(language: Language, settings: &RuleSettings, workers: usize) -> Self {
        let rules = rules_for(language, settings);
        let active = rules.iter().map(|rule| rule.default_on()).collect();
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        debug!(
            language = language.code(),
            rules = rules.len(),
            workers,
            "rule engine ready"
        );
        Self {
            language,
            rules,
            active,
            disabled: HashSet::new(),
            workers,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.active
            .push(rule.default_on() && !self.disabled.contains(rule.id()));
        self.rules.push(rule);
    }

    pub fn all_rules(&self) -> impl Iterator<Item = &dyn Rule> + '_ {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &dyn Rule> + '_ {
        self.rules
            .iter()
            .zip(&self.active)
            .filter(|(_, on)| **on)
            .map(|(rule, _)| rule.as_ref())
    }

    pub fn is_active(&self, rule_id: &str) -> bool {
        self.rules
            .iter()
            .zip(&self.active)
            .any(|(rule, on)| *on && rule.id() == rule_id)
    }

    /// Turns a rule on, including rules that are off by default.
    pub fn enable_rule(&mut self, rule_id: &str) {
        self.disabled.remove(rule_id);
        self.set_where(|rule| rule.id() == rule_id, true);
    }

    /// Turns a rule off, including one that is only added afterwards.
    pub fn disable_rule(&mut self, rule_id: &str) {
        self.disabled.insert(rule_id.to_string());
        self.set_where(|rule| rule.id() == rule_id, false);
    }

    pub fn enable_category(&mut self, category: RuleCategory) {
        self.set_where(|rule| rule.category() == category, true);
    }

    pub fn disable_dictionary_spelling(&mut self) {
        self.set_where(|rule| rule.is_dictionary_spelling(), false);
    }

    /// Adds the n-gram backed confusion rule when `ngram_dir` has data for
    /// this language. Returns whether a rule was added.
    pub fn activate_language_model(&mut self, ngram_dir: &Path) -> Result<bool, CheckError> {
        match load_confusion_rule(ngram_dir, self.language)? {
            Some(rule) => {
                self.add_rule(Box::new(rule));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_where(&mut self, predicate: impl Fn(&dyn Rule) -> bool, on: bool) {
        for (rule, active) in self.rules.iter().zip(self.active.iter_mut()) {
            if predicate(rule.as_ref()) {
                *active = on;
            }
        }
    }

    /// Runs every active rule. Findings come back ordered by position and
    /// then by rule order, however the workers were scheduled.
    pub fn check(&self, text: &str) -> Vec<Finding> {
        let active: Vec<(usize, &dyn Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.active[*idx])
            .map(|(idx, rule)| (idx, rule.as_ref()))
            .collect();
        if active.is_empty() {
            return Vec::new();
        }
        let workers = self.workers.clamp(1, active.len());
        let shard_len = active.len().div_ceil(workers);

        let shards: Vec<Vec<(usize, Finding)>> = std::thread::scope(|scope| {
            let handles: Vec<_> = active
                .chunks(shard_len)
                .map(|shard| {
                    scope.spawn(move || {
                        let mut found = Vec::new();
                        for (order, rule) in shard {
                            found.extend(rule.check(text).into_iter().map(|f| (*order, f)));
                        }
                        found
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(found) => found,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut ordered: Vec<(usize, Finding)> = shards.into_iter().flatten().collect();
        ordered.sort_by_key(|(order, f)| (f.start, f.end, *order));
        ordered.into_iter().map(|(_, f)| f).collect()
    }
}

impl Drop for RuleEngine {
    fn drop(&mut self) {
        debug!(language = self.language.code(), "rule engine released");
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("language", &self.language)
            .field(
                "active",
                &self.active_rules().map(|rule| rule.id()).collect::<Vec<_>>(),
            )
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRule {
        id: &'static str,
        category: RuleCategory,
        spans: Vec<(usize, usize)>,
    }

    impl Rule for FixedRule {
        fn id(&self) -> &str {
            self.id
        }

        fn category(&self) -> RuleCategory {
            self.category
        }

        fn default_on(&self) -> bool {
            self.category != RuleCategory::Wikipedia
        }

        fn is_dictionary_spelling(&self) -> bool {
            self.category == RuleCategory::Spelling
        }

        fn check(&self, _text: &str) -> Vec<Finding> {
            self.spans
                .iter()
                .map(|span| Finding::new(self.id, self.category, "fixed", *span))
                .collect()
        }
    }

    fn engine(workers: usize) -> RuleEngine {
        let mut engine = RuleEngine::new(Language::ENGLISH, &RuleSettings::default(), workers);
        engine.rules.clear();
        engine.active.clear();
        engine.add_rule(Box::new(FixedRule {
            id: "B",
            category: RuleCategory::Style,
            spans: vec![(10, 12), (0, 3)],
        }));
        engine.add_rule(Box::new(FixedRule {
            id: "A",
            category: RuleCategory::Grammar,
            spans: vec![(0, 3), (5, 6)],
        }));
        engine.add_rule(Box::new(FixedRule {
            id: "W",
            category: RuleCategory::Wikipedia,
            spans: vec![(1, 2)],
        }));
        engine.add_rule(Box::new(FixedRule {
            id: "S",
            category: RuleCategory::Spelling,
            spans: vec![(4, 5)],
        }));
        engine
    }

    fn ids(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule_id.as_str()).collect()
    }

    #[test]
    fn orders_findings_deterministically() {
        let single = engine(1).check("text");
        let many = engine(4).check("text");
        assert_eq!(single, many);
        assert_eq!(ids(&single), vec!["B", "A", "S", "A", "B"]);
    }

    #[test]
    fn toggles_rules_by_id_and_category() {
        let mut engine = engine(2);
        assert!(!engine.is_active("W"));
        engine.enable_category(RuleCategory::Wikipedia);
        engine.disable_dictionary_spelling();
        engine.disable_rule("B");
        let found = engine.check("text");
        assert_eq!(ids(&found), vec!["A", "W", "A"]);
        engine.enable_rule("B");
        assert!(engine.is_active("B"));
    }

    #[test]
    fn disabling_by_id_covers_rules_added_later() {
        let mut engine = engine(1);
        engine.disable_rule("LATE");
        engine.add_rule(Box::new(FixedRule {
            id: "LATE",
            category: RuleCategory::Confusion,
            spans: vec![(2, 3)],
        }));
        assert!(!engine.is_active("LATE"));
        assert!(engine.check("text").iter().all(|f| f.rule_id != "LATE"));
        engine.enable_rule("LATE");
        assert!(engine.is_active("LATE"));
    }

    #[test]
    fn no_active_rules_means_no_findings() {
        let mut engine = engine(3);
        for id in ["A", "B", "S"] {
            engine.disable_rule(id);
        }
        assert!(engine.check("text").is_empty());
    }

    #[test]
    fn default_rules_find_repeated_whitespace() {
        let engine = RuleEngine::new(Language::ENGLISH, &RuleSettings::default(), 2);
        let found = engine.check("The Eiffel Tower  is tall.");
        let whitespace = found
            .iter()
            .find(|f| f.rule_id == "WHITESPACE_RULE")
            .expect("whitespace finding");
        assert_eq!((whitespace.start, whitespace.end), (16, 18));
        assert_eq!(whitespace.suggestions, vec![" ".to_string()]);
    }
}
