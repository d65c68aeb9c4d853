//! Heuristic removal of link syntax that should never be read as prose.
//!
//! Catches most, not all, links: `[[pt:Linux]]` goes, `[[zh-min-nan:Linux]]`
//! stays. Removals are recorded so offsets in the cleaned text can be traced
//! back to the text that went in.

use once_cell::sync::Lazy;
use regex::Regex;

static INTERLANGUAGE_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[a-z]{2,6}:.*?\]\]").expect("valid interlanguage regex"));

static CATEGORY_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[:?(Category|Categoria|Categoría|Catégorie|Kategorie):.*?\]\]")
        .expect("valid category regex")
});

// Keeps alt text and caption: only the file name and layout directives go.
static FILE_LINK_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(File|Fitxer|Fichero|Ficheiro|Fichier|Datei):.*?\.(png|jpg|svg|jpeg|tiff|gif|PNG|JPG|SVG|JPEG|TIFF|GIF)\|((thumb|miniatur)\|)?((right|left)\|)?",
    )
    .expect("valid file link regex")
});

/// One stretch of removed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Offset in the cleaned text where the removed text used to be.
    pub at: usize,
    /// Length of the removed text in the input.
    pub len: usize,
}

/// Which side of a removal an offset sitting exactly on it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Cleaned markup plus the removals that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedMarkup {
    pub text: String,
    pub removals: Vec<Removal>,
}

impl StrippedMarkup {
    /// Translates an offset in the cleaned text to the input text.
    pub fn raw_offset(&self, cleaned: usize, side: Side) -> usize {
        let count = match side {
            Side::Before => self.removals.partition_point(|r| r.at < cleaned),
            Side::After => self.removals.partition_point(|r| r.at <= cleaned),
        };
        cleaned + self.removals[..count].iter().map(|r| r.len).sum::<usize>()
    }

    /// Removal points strictly inside `start..end` of the cleaned text.
    pub fn removals_within(&self, start: usize, end: usize) -> &[Removal] {
        let from = self.removals.partition_point(|r| r.at <= start);
        let to = self.removals.partition_point(|r| r.at < end);
        if from >= to {
            &[]
        } else {
            &self.removals[from..to]
        }
    }
}

/// Removes interlanguage links, category links and file link prefixes.
pub fn strip_links(markup: &str) -> String {
    strip_links_tracked(markup).text
}

/// Like [`strip_links`], keeping track of what was removed and where.
///
/// The patterns run one after another, each over the output of the previous
/// one, so a later pattern may match text that only became contiguous once an
/// earlier removal closed the gap.
pub fn strip_links_tracked(markup: &str) -> StrippedMarkup {
    let patterns: [&Regex; 3] = [
        &INTERLANGUAGE_LINK_RE,
        &CATEGORY_LINK_RE,
        &FILE_LINK_PREFIX_RE,
    ];
    let mut stripped = StrippedMarkup {
        text: markup.to_string(),
        removals: Vec::new(),
    };
    for re in patterns {
        stripped = stripped.remove_matches(re);
    }
    stripped
}

impl StrippedMarkup {
    /// Deletes every match of `re` from the cleaned text. Earlier removals
    /// touching a match are folded into it so offsets still lead back to the
    /// original input.
    fn remove_matches(self, re: &Regex) -> Self {
        let mut text = String::with_capacity(self.text.len());
        let mut removals = Vec::with_capacity(self.removals.len());
        let mut earlier = self.removals.iter().peekable();
        let mut cursor = 0;
        let mut raw_cursor = 0;

        for found in re.find_iter(&self.text) {
            let shift = cursor - text.len();
            while let Some(prior) = earlier.next_if(|r| r.at < found.start()) {
                fold_removal(&mut removals, prior.at - shift, prior.len);
            }
            text.push_str(&self.text[cursor..found.start()]);

            let raw_start = self
                .raw_offset(found.start(), Side::Before)
                .max(raw_cursor);
            let raw_end = self.raw_offset(found.end(), Side::After);
            while earlier.next_if(|r| r.at <= found.end()).is_some() {}
            fold_removal(&mut removals, text.len(), raw_end - raw_start);

            cursor = found.end();
            raw_cursor = raw_end;
        }

        let shift = cursor - text.len();
        for prior in earlier {
            fold_removal(&mut removals, prior.at - shift, prior.len);
        }
        text.push_str(&self.text[cursor..]);

        StrippedMarkup { text, removals }
    }
}

fn fold_removal(removals: &mut Vec<Removal>, at: usize, len: usize) {
    match removals.last_mut() {
        Some(last) if last.at == at => last.len += len,
        _ => removals.push(Removal { at, len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_interlanguage_links() {
        assert_eq!(
            strip_links("The Eiffel Tower [[fr:La Tour Eiffel]] is tall"),
            "The Eiffel Tower  is tall"
        );
        assert_eq!(strip_links("[[zh-min-nan:Linux]]"), "[[zh-min-nan:Linux]]");
    }

    #[test]
    fn removes_localized_category_links() {
        let text = "Text.\n[[Category:Towers]][[Kategorie:Turm]]\n[[:Catégorie:Tour]]";
        assert_eq!(strip_links(text), "Text.\n\n");
    }

    #[test]
    fn keeps_file_captions() {
        assert_eq!(
            strip_links("[[File:Tower.jpg|thumb|right|The tower at night]]"),
            "[[The tower at night]]"
        );
        assert_eq!(
            strip_links("[[Datei:Turm.PNG|miniatur|Der Turm]]"),
            "[[Der Turm]]"
        );
    }

    #[test]
    fn leaves_ordinary_links_and_prose() {
        let text = "See [[Paris]] and [[Gustave Eiffel|Eiffel]]: a fine engineer.";
        assert_eq!(strip_links(text), text);
    }

    #[test]
    fn stripping_is_idempotent() {
        let text = "A [[de:Turm]] b [[Category:X]] c [[File:a.svg|left|cap]] d";
        let once = strip_links(text);
        assert_eq!(strip_links(&once), once);
    }

    #[test]
    fn tracks_raw_offsets_around_removals() {
        let raw = "The Eiffel Tower [[fr:La Tour Eiffel]] is tall";
        let stripped = strip_links_tracked(raw);
        assert_eq!(stripped.removals, vec![Removal { at: 17, len: 21 }]);
        assert_eq!(stripped.raw_offset(16, Side::After), 16);
        assert_eq!(stripped.raw_offset(17, Side::Before), 17);
        assert_eq!(stripped.raw_offset(17, Side::After), 38);
        assert_eq!(stripped.raw_offset(18, Side::Before), 39);
        assert_eq!(stripped.removals_within(0, 25).len(), 1);
        assert!(stripped.removals_within(17, 25).is_empty());
    }

    #[test]
    fn interlanguage_links_go_before_file_prefixes() {
        let stripped = strip_links_tracked("File:foo [[de:bar.png|x]]");
        assert_eq!(stripped.text, "File:foo ");
        assert_eq!(stripped.removals, vec![Removal { at: 9, len: 16 }]);
    }

    #[test]
    fn later_patterns_see_earlier_output() {
        let raw = "[[Categ[[fr:x]]ory:Y]] end";
        let stripped = strip_links_tracked(raw);
        assert_eq!(stripped.text, " end");
        assert_eq!(stripped.removals, vec![Removal { at: 0, len: 22 }]);
        assert_eq!(stripped.raw_offset(1, Side::Before), 23);
        assert_eq!(&raw[stripped.raw_offset(0, Side::After)..], " end");
    }

    #[test]
    fn merges_adjacent_removals() {
        let stripped = strip_links_tracked("a[[en:X]][[Category:Y]]b");
        assert_eq!(stripped.text, "ab");
        assert_eq!(stripped.removals, vec![Removal { at: 1, len: 22 }]);
    }
}
