//! Built-in rules. Every rule is a pure function of the plain text.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use unicode_segmentation::UnicodeSegmentation;

use crate::engine::{Finding, Rule, RuleCategory};
use crate::language::Language;
use crate::{PhraseList, RuleSettings};

pub const WHITESPACE_RULE: &str = "WHITESPACE_RULE";
pub const DOUBLE_PUNCTUATION_RULE: &str = "DOUBLE_PUNCTUATION";
pub const WORD_REPEAT_RULE: &str = "WORD_REPEAT_RULE";
pub const SENTENCE_LENGTH_RULE: &str = "TOO_LONG_SENTENCE";
pub const BUZZWORD_RULE: &str = "BUZZWORD";
pub const PEACOCK_RULE: &str = "WIKIPEDIA_PEACOCK";
pub const WEASEL_RULE: &str = "WIKIPEDIA_WEASEL";
pub const CONTRACTIONS_RULE: &str = "WIKIPEDIA_CONTRACTIONS";
pub const SPELLING_RULE: &str = "SPELLING_RULE";

/// Repeats that are usually intentional.
const ALLOWED_REPEATS: &[&str] = &["had", "that", "is", "bye", "ha", "no", "very"];

/// Instantiates the built-in rules for `language`. Phrase and spelling rules
/// only exist for languages with configured word lists.
pub(crate) fn rules_for(language: Language, settings: &RuleSettings) -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Box::new(WhitespaceRule),
        Box::new(DoublePunctuationRule),
        Box::new(RepeatedWordRule),
    ];
    if settings.max_sentence_words > 0 {
        rules.push(Box::new(SentenceLengthRule {
            max_words: settings.max_sentence_words,
        }));
    }

    let Some(lists) = settings.languages.get(language.code()) else {
        return rules;
    };
    let phrase_rules = [
        (BUZZWORD_RULE, RuleCategory::Style, true, "Buzzword detected", &lists.buzzwords),
        (PEACOCK_RULE, RuleCategory::Wikipedia, false, "Peacock term", &lists.peacock),
        (WEASEL_RULE, RuleCategory::Wikipedia, false, "Vague attribution", &lists.weasel),
        (
            CONTRACTIONS_RULE,
            RuleCategory::Wikipedia,
            false,
            "Avoid contractions in encyclopedic prose",
            &lists.contractions,
        ),
    ];
    for (id, category, default_on, label, list) in phrase_rules {
        if let Some(rule) = PhraseRule::new(id, category, default_on, label, list) {
            rules.push(Box::new(rule));
        }
    }
    if !lists.typos.is_empty() {
        rules.push(Box::new(SpellingRule {
            typos: lists
                .typos
                .iter()
                .map(|(typo, fix)| (typo.to_lowercase(), fix.clone()))
                .collect(),
        }));
    }
    rules
}

/// Two or more spaces between words.
pub struct WhitespaceRule;

impl Rule for WhitespaceRule {
    fn id(&self) -> &str {
        WHITESPACE_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Typography
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        let bytes = text.as_bytes();
        let mut findings = Vec::new();
        let mut idx = 0;
        while idx < bytes.len() {
            if bytes[idx] != b' ' {
                idx += 1;
                continue;
            }
            let start = idx;
            while idx < bytes.len() && bytes[idx] == b' ' {
                idx += 1;
            }
            let inside_line = start > 0
                && !bytes[start - 1].is_ascii_whitespace()
                && idx < bytes.len()
                && !bytes[idx].is_ascii_whitespace();
            if idx - start >= 2 && inside_line {
                findings.push(
                    Finding::new(
                        WHITESPACE_RULE,
                        RuleCategory::Typography,
                        "Possible typo: you repeated a whitespace",
                        (start, idx),
                    )
                    .with_suggestion(" "),
                );
            }
        }
        findings
    }
}

/// `,,` `;;` and `..` (but not an ellipsis).
pub struct DoublePunctuationRule;

impl Rule for DoublePunctuationRule {
    fn id(&self) -> &str {
        DOUBLE_PUNCTUATION_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Typography
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        let bytes = text.as_bytes();
        let mut findings = Vec::new();
        let mut idx = 0;
        while idx + 1 < bytes.len() {
            let mark = bytes[idx];
            if !matches!(mark, b',' | b';' | b'.') || bytes[idx + 1] != mark {
                idx += 1;
                continue;
            }
            let start = idx;
            while idx < bytes.len() && bytes[idx] == mark {
                idx += 1;
            }
            if mark == b'.' && idx - start >= 3 {
                continue;
            }
            let single = (mark as char).to_string();
            findings.push(
                Finding::new(
                    DOUBLE_PUNCTUATION_RULE,
                    RuleCategory::Typography,
                    format!("Two consecutive `{single}`"),
                    (start, idx),
                )
                .with_suggestion(single),
            );
        }
        findings
    }
}

/// The same word twice in a row, separated only by spaces.
pub struct RepeatedWordRule;

impl Rule for RepeatedWordRule {
    fn id(&self) -> &str {
        WORD_REPEAT_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Grammar
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut previous: Option<(usize, &str)> = None;
        for (idx, segment) in text.split_word_bound_indices() {
            let is_word = segment.chars().all(char::is_alphabetic);
            if is_word {
                if let Some((prev_idx, prev)) = previous {
                    let lower = segment.to_lowercase();
                    if prev.to_lowercase() == lower && !ALLOWED_REPEATS.contains(&lower.as_str()) {
                        findings.push(
                            Finding::new(
                                WORD_REPEAT_RULE,
                                RuleCategory::Grammar,
                                format!("Possible typo: you repeated a word (`{segment}`)"),
                                (prev_idx, idx + segment.len()),
                            )
                            .with_suggestion(prev),
                        );
                    }
                }
                previous = Some((idx, segment));
            } else if segment.contains('\n') || !segment.trim().is_empty() {
                previous = None;
            }
        }
        findings
    }
}

/// Sentences longer than a word budget.
pub struct SentenceLengthRule {
    max_words: usize,
}

impl Rule for SentenceLengthRule {
    fn id(&self) -> &str {
        SENTENCE_LENGTH_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Style
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        split_sentences_with_offset(text)
            .into_iter()
            .filter_map(|(sentence, offset)| {
                let words = count_words(sentence);
                (words > self.max_words).then(|| {
                    Finding::new(
                        SENTENCE_LENGTH_RULE,
                        RuleCategory::Style,
                        format!(
                            "Sentence has {words} words; consider splitting it (limit {}).",
                            self.max_words
                        ),
                        (offset, offset + sentence.len()),
                    )
                })
            })
            .collect()
    }
}

/// Phrase list matcher with optional per-phrase replacements.
pub struct PhraseRule {
    id: &'static str,
    category: RuleCategory,
    default_on: bool,
    label: &'static str,
    matcher: AhoCorasick,
    replacements: HashMap<String, String>,
}

impl PhraseRule {
    pub fn new(
        id: &'static str,
        category: RuleCategory,
        default_on: bool,
        label: &'static str,
        list: &PhraseList,
    ) -> Option<Self> {
        let phrases: Vec<&str> = list
            .phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return None;
        }
        let matcher = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&phrases);
        let replacements = list
            .replacements
            .iter()
            .map(|(phrase, replacement)| (phrase.to_lowercase(), replacement.clone()))
            .collect();
        Some(Self {
            id,
            category,
            default_on,
            label,
            matcher,
            replacements,
        })
    }
}

impl Rule for PhraseRule {
    fn id(&self) -> &str {
        self.id
    }

    fn category(&self) -> RuleCategory {
        self.category
    }

    fn default_on(&self) -> bool {
        self.default_on
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for mat in self.matcher.find_iter(text) {
            if !is_word_bounded(text, mat.start(), mat.end()) {
                continue;
            }
            let snippet = &text[mat.start()..mat.end()];
            let mut finding = Finding::new(
                self.id,
                self.category,
                format!("{}: `{snippet}`", self.label),
                (mat.start(), mat.end()),
            );
            if let Some(replacement) = self.replacements.get(&snippet.to_lowercase()) {
                finding = finding.with_suggestion(match_case(snippet, replacement));
            }
            findings.push(finding);
        }
        findings
    }
}

/// Dictionary lookup of known misspellings.
pub struct SpellingRule {
    typos: HashMap<String, String>,
}

impl Rule for SpellingRule {
    fn id(&self) -> &str {
        SPELLING_RULE
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Spelling
    }

    fn is_dictionary_spelling(&self) -> bool {
        true
    }

    fn check(&self, text: &str) -> Vec<Finding> {
        text.unicode_word_indices()
            .filter_map(|(idx, word)| {
                let fix = self.typos.get(&word.to_lowercase())?;
                Some(
                    Finding::new(
                        SPELLING_RULE,
                        RuleCategory::Spelling,
                        format!("Possible spelling mistake found: `{word}`"),
                        (idx, idx + word.len()),
                    )
                    .with_suggestion(match_case(word, fix)),
                )
            })
            .collect()
    }
}

pub(crate) fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Capitalizes `replacement` when `original` starts with an uppercase letter.
pub(crate) fn match_case(original: &str, replacement: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(char::is_uppercase);
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if starts_upper => first.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

/// Sentences (trimmed) with the byte offset where each one starts. Line
/// breaks always end a sentence: plain text lines are paragraphs, headings
/// or list items.
fn split_sentences_with_offset(text: &str) -> Vec<(&str, usize)> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let end = match ch {
            '.' | '!' | '?' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(idx + ch.len_utf8()),
                None => Some(idx + ch.len_utf8()),
                _ => None,
            },
            '\n' => Some(idx),
            _ => None,
        };
        if let Some(end) = end {
            push_trimmed(text, start, end, &mut sentences);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut sentences);
    sentences
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<(&'a str, usize)>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        let offset = start + (raw.len() - raw.trim_start().len());
        out.push((trimmed, offset));
    }
}

fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .count()
}
