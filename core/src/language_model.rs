//! Optional n-gram data that lets the confusion rule tell commonly mixed-up
//! words apart (`their`/`there`, `then`/`than`).
//!
//! Layout under the configured directory:
//!
//! ```text
//! <dir>/<lang>/2grams.txt          "first second<TAB>count" per line
//! <dir>/<lang>/confusion_sets.txt  "word; other" per line, `#` comments
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::engine::{Finding, Rule, RuleCategory};
use crate::error::CheckError;
use crate::language::Language;
use crate::rules::match_case;

pub const CONFUSION_RULE: &str = "CONFUSION_RULE";

const BIGRAM_FILE: &str = "2grams.txt";
const CONFUSION_SET_FILE: &str = "confusion_sets.txt";

/// How many times more frequent the alternative must be before it is suggested.
const CONFIDENCE_FACTOR: u64 = 10;

/// Bigram counts, keyed by lowercased word pairs.
#[derive(Debug, Default)]
pub struct LanguageModel {
    bigrams: HashMap<(String, String), u64>,
}

impl LanguageModel {
    /// Parses `first second<TAB>count` lines; malformed lines are skipped.
    pub fn parse(data: &str) -> Self {
        let mut bigrams = HashMap::new();
        for line in data.lines() {
            let Some((pair, count)) = line.split_once('\t') else {
                continue;
            };
            let mut words = pair.split_whitespace();
            let (Some(first), Some(second), None) = (words.next(), words.next(), words.next())
            else {
                continue;
            };
            let Ok(count) = count.trim().parse::<u64>() else {
                continue;
            };
            let total = bigrams
                .entry((first.to_lowercase(), second.to_lowercase()))
                .or_insert(0u64);
            *total = total.saturating_add(count);
        }
        Self { bigrams }
    }

    pub fn count(&self, first: &str, second: &str) -> u64 {
        self.bigrams
            .get(&(first.to_lowercase(), second.to_lowercase()))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.bigrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bigrams.is_empty()
    }
}

/// Flags a word when its confusable alternative is far more common next to
/// the surrounding words.
#[derive(Debug)]
pub struct ConfusionProbabilityRule {
    model: LanguageModel,
    alternatives: HashMap<String, Vec<String>>,
}

impl ConfusionProbabilityRule {
    pub fn new(model: LanguageModel, sets: &[(String, String)]) -> Self {
        let mut alternatives: HashMap<String, Vec<String>> = HashMap::new();
        for (a, b) in sets {
            let (a, b) = (a.to_lowercase(), b.to_lowercase());
            alternatives.entry(a.clone()).or_default().push(b.clone());
            alternatives.entry(b).or_default().push(a);
        }
        Self {
            model,
            alternatives,
        }
    }

    /// Bigram counts with the neighbouring words on both sides.
    fn context_score(&self, before: Option<&str>, word: &str, after: Option<&str>) -> u64 {
        let left = before.map_or(0, |b| self.model.count(b, word));
        let right = after.map_or(0, |a| self.model.count(word, a));
        left.saturating_add(right)
    }
}

impl Rule for ConfusionProbabilityRule {
    fn id(&self) -> &str {
        CONFUSION_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Confusion
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        let words: Vec<(usize, &str)> = text.unicode_word_indices().collect();
        let mut findings = Vec::new();
        for (pos, &(idx, word)) in words.iter().enumerate() {
            let Some(options) = self.alternatives.get(&word.to_lowercase()) else {
                continue;
            };
            let before = pos.checked_sub(1).map(|p| words[p].1);
            let after = words.get(pos + 1).map(|&(_, w)| w);
            let seen = self.context_score(before, word, after);
            let best = options
                .iter()
                .map(|alt| (alt, self.context_score(before, alt, after)))
                .max_by_key(|(_, score)| *score);
            if let Some((alt, score)) = best {
                if score > 0 && score >= CONFIDENCE_FACTOR.saturating_mul(seen.max(1)) {
                    findings.push(
                        Finding::new(
                            CONFUSION_RULE,
                            RuleCategory::Confusion,
                            format!(
                                "Statistically, `{alt}` fits this context far better than `{word}`"
                            ),
                            (idx, idx + word.len()),
                        )
                        .with_suggestion(match_case(word, alt)),
                    );
                }
            }
        }
        findings
    }
}

/// Parses `a; b` lines, ignoring blanks and `#` comments.
pub fn parse_confusion_sets(data: &str) -> Vec<(String, String)> {
    data.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (a, b) = line.split_once(';')?;
            let (a, b) = (a.trim(), b.trim());
            (!a.is_empty() && !b.is_empty()).then(|| (a.to_string(), b.to_string()))
        })
        .collect()
}

/// Loads the confusion rule for `language`. A missing language directory is
/// not an error; unreadable files are.
pub fn load_confusion_rule(
    ngram_dir: &Path,
    language: Language,
) -> Result<Option<ConfusionProbabilityRule>, CheckError> {
    let dir = ngram_dir.join(language.code());
    if !dir.is_dir() {
        warn!(
            path = %dir.display(),
            "no language model data for {language}, confusion rule stays off"
        );
        return Ok(None);
    }
    let read = |name: &str| {
        let path = dir.join(name);
        fs::read_to_string(&path).map_err(|source| CheckError::LanguageModel { path, source })
    };
    let model = LanguageModel::parse(&read(BIGRAM_FILE)?);
    let sets = parse_confusion_sets(&read(CONFUSION_SET_FILE)?);
    debug!(
        bigrams = model.len(),
        confusion_sets = sets.len(),
        "language model loaded"
    );
    Ok(Some(ConfusionProbabilityRule::new(model, &sets)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> ConfusionProbabilityRule {
        let model = LanguageModel::parse(
            "over there\t500\nover their\t3\ntheir house\t800\nthere house\t1\nbroken line\n",
        );
        let sets = parse_confusion_sets("# common mix-ups\ntheir; there\n\nbad line\n");
        ConfusionProbabilityRule::new(model, &sets)
    }

    #[test]
    fn parses_bigrams_and_sets() {
        let model = LanguageModel::parse("a b\t2\nA B\t3\nnot-a-bigram\t9\nc d\tx\n");
        assert_eq!(model.count("a", "b"), 5);
        assert_eq!(model.len(), 1);
        assert_eq!(
            parse_confusion_sets("then; than # comparisons\n;\n"),
            vec![("then".to_string(), "than".to_string())]
        );
    }

    #[test]
    fn suggests_the_far_more_common_alternative() {
        let found = rule().check("They went over their and saw there house.");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].suggestions, vec!["there".to_string()]);
        assert_eq!(found[1].suggestions, vec!["their".to_string()]);
    }

    #[test]
    fn leaves_common_usage_alone() {
        assert!(rule().check("They went over there to their house.").is_empty());
    }

    #[test]
    fn huge_counts_saturate() {
        let max = u64::MAX;
        let model = LanguageModel::parse(&format!(
            "over their\t{max}\nover their\t{max}\ntheir house\t{max}\nover there\t{max}\n"
        ));
        assert_eq!(model.count("over", "their"), max);
        let rule = ConfusionProbabilityRule::new(model, &parse_confusion_sets("their; there"));
        assert_eq!(rule.context_score(Some("over"), "their", Some("house")), max);
        assert!(rule.check("over their house").len() <= 1);
    }

    #[test]
    fn missing_language_directory_is_not_an_error() {
        let dir = std::env::temp_dir().join(format!("wikicheck-lm-{}", std::process::id()));
        let loaded = load_confusion_rule(&dir, Language::ENGLISH).unwrap();
        assert!(loaded.is_none());
    }
}
