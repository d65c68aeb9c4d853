//! Wiki markup to plain text, recording where every piece of text came from.

use parse_wiki_text::{Configuration, ListItem, Node};

use crate::links::{strip_links_tracked, Side, StrippedMarkup};
use crate::mapping::{MappedSpan, PlainTextMapping};

const PARAGRAPH_BREAK: &str = "\n\n";
const LINE_BREAK: &str = "\n";

/// Tags whose content is never prose.
const SKIPPED_TAGS: &[&str] = &[
    "ref",
    "references",
    "math",
    "gallery",
    "score",
    "syntaxhighlight",
    "source",
    "timeline",
    "chem",
    "hiero",
];

/// Strips link syntax from raw revision markup, converts the rest to plain
/// text, and returns a mapping whose original offsets point into `raw`.
pub fn filter(raw: &str) -> PlainTextMapping {
    let stripped = strip_links_tracked(raw);
    let cleaned = build_mapping(&stripped.text);
    if stripped.removals.is_empty() {
        return cleaned;
    }
    let spans = remap_spans(cleaned.spans(), &stripped);
    PlainTextMapping::from_parts_unchecked(cleaned.into_plain_text(), spans)
}

/// Converts markup to plain text. Original offsets point into `markup`.
pub fn build_mapping(markup: &str) -> PlainTextMapping {
    let output = Configuration::default().parse(markup);
    let mut builder = MappingBuilder::new(markup);
    builder.visit_nodes(&output.nodes);
    builder.finish()
}

struct MappingBuilder<'a> {
    markup: &'a str,
    plain: String,
    spans: Vec<MappedSpan>,
    /// Lowest original offset the next span may start at.
    floor: usize,
}

impl<'a> MappingBuilder<'a> {
    fn new(markup: &'a str) -> Self {
        Self {
            markup,
            plain: String::with_capacity(markup.len()),
            spans: Vec::new(),
            floor: 0,
        }
    }

    fn push_text(&mut self, text: &str, start: usize, end: usize) {
        if text.is_empty() {
            return;
        }
        let start = start.max(self.floor);
        let end = end.max(start);
        let plain_start = self.plain.len();
        self.plain.push_str(text);
        self.spans
            .push(MappedSpan::new(plain_start..self.plain.len(), start..end));
        self.floor = end;
    }

    /// Text with no markup counterpart, pinned to a zero-width position.
    fn push_synthetic(&mut self, text: &str, at: usize) {
        let at = at.max(self.floor);
        self.push_text(text, at, at);
    }

    fn paragraph_break(&mut self, at: usize) {
        if self.plain.is_empty() || self.plain.ends_with(PARAGRAPH_BREAK) {
            return;
        }
        let missing = if self.plain.ends_with(LINE_BREAK) {
            LINE_BREAK
        } else {
            PARAGRAPH_BREAK
        };
        self.push_synthetic(missing, at);
    }

    fn line_break(&mut self, at: usize) {
        if self.plain.is_empty() || self.plain.ends_with(LINE_BREAK) {
            return;
        }
        self.push_synthetic(LINE_BREAK, at);
    }

    fn visit_nodes(&mut self, nodes: &[Node<'_>]) {
        for node in nodes {
            self.visit(node);
        }
    }

    fn visit(&mut self, node: &Node<'_>) {
        match node {
            Node::Text {
                start, end, value, ..
            } => self.push_text(value, *start, *end),
            Node::CharacterEntity {
                character,
                start,
                end,
                ..
            } => {
                let mut buf = [0u8; 4];
                self.push_text(character.encode_utf8(&mut buf), *start, *end);
            }
            Node::Link {
                text, target, start, end, ..
            } => {
                if text.is_empty() {
                    self.link_target(target, *start, *end);
                } else {
                    self.visit_nodes(text);
                }
            }
            Node::ExternalLink { nodes, .. } => self.external_link_label(nodes),
            Node::Heading { nodes, start, end, .. } => {
                self.paragraph_break(*start);
                self.visit_nodes(nodes);
                self.paragraph_break(*end);
            }
            Node::ParagraphBreak { start, .. } => self.paragraph_break(*start),
            Node::UnorderedList { items, .. } | Node::OrderedList { items, .. } => {
                self.list_items(items)
            }
            Node::DefinitionList { items, .. } => {
                for item in items {
                    self.line_break(item.start);
                    self.visit_nodes(&item.nodes);
                }
            }
            Node::Preformatted { nodes, start, .. } => {
                self.line_break(*start);
                self.visit_nodes(nodes);
            }
            Node::Tag { name, nodes, .. } => {
                let tag: &str = name;
                if !SKIPPED_TAGS.contains(&tag) {
                    self.visit_nodes(nodes);
                }
            }
            _ => {}
        }
    }

    fn list_items(&mut self, items: &[ListItem<'_>]) {
        for item in items {
            self.line_break(item.start);
            self.visit_nodes(&item.nodes);
        }
    }

    /// `[[target]]` without display nodes: the target follows the brackets.
    fn link_target(&mut self, target: &str, start: usize, end: usize) {
        let inner = start + 2;
        match self.markup.get(inner..end) {
            Some(rest) if rest.starts_with(target) => {
                self.push_text(target, inner, inner + target.len())
            }
            _ => self.push_text(target, start, end),
        }
    }

    /// `[http://host label]`: only the label after the URL is prose.
    fn external_link_label(&mut self, nodes: &[Node<'_>]) {
        let mut seen_url = false;
        for node in nodes {
            match node {
                Node::Text {
                    start, end, value, ..
                } if !seen_url => {
                    seen_url = true;
                    let Some(space) = value.find(char::is_whitespace) else {
                        continue;
                    };
                    let label = value[space..].trim_start();
                    let offset = value.len() - label.len();
                    self.push_text(label, start + offset, *end);
                }
                _ => {
                    seen_url = true;
                    self.visit(node);
                }
            }
        }
    }

    fn finish(self) -> PlainTextMapping {
        PlainTextMapping::from_parts_unchecked(self.plain, self.spans)
    }
}

/// Moves original ranges from cleaned-markup to raw-markup coordinates.
/// Spans that copy text 1:1 are split where links were removed so both
/// halves stay exact.
fn remap_spans(spans: &[MappedSpan], stripped: &StrippedMarkup) -> Vec<MappedSpan> {
    let mut remapped = Vec::with_capacity(spans.len());
    for span in spans {
        let same_length = span.plain.len() == span.original.len();
        let cuts = stripped.removals_within(span.original.start, span.original.end);
        if !same_length || cuts.is_empty() {
            let start = stripped.raw_offset(span.original.start, Side::After);
            let end = if span.original.is_empty() {
                start
            } else {
                stripped.raw_offset(span.original.end, Side::Before)
            };
            remapped.push(MappedSpan::new(span.plain.clone(), start..end));
            continue;
        }
        let mut piece_start = span.original.start;
        for cut in cuts.iter().map(|r| r.at).chain(std::iter::once(span.original.end)) {
            let plain_start = span.plain.start + (piece_start - span.original.start);
            let plain_end = span.plain.start + (cut - span.original.start);
            remapped.push(MappedSpan::new(
                plain_start..plain_end,
                stripped.raw_offset(piece_start, Side::After)
                    ..stripped.raw_offset(cut, Side::Before),
            ));
            piece_start = cut;
        }
    }
    remapped
}
