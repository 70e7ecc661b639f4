//! Inline bookmark markers.
//!
//! Narration text may carry self-closing `<bookmark mark='name'/>` tags. They
//! never reach the TTS backend: [`parse`] removes them and remembers where each
//! one sat in the cleaned text. Anything that only looks like a marker (missing
//! attribute, unterminated tag) is ordinary text and is passed through.

use std::sync::LazyLock;

use regex::Regex;

static BOOKMARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<bookmark\s*mark\s*=['"](\w*)['"]\s*/>"#).expect("bookmark pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    Marker(&'a str),
}

/// Lazy tokenizer over annotated text. Cloning restarts from the same position.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a str,
    pos: usize,
}

pub fn tokens(text: &str) -> Tokens<'_> {
    Tokens { text, pos: 0 }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.text.len() {
            return None;
        }

        let Some(caps) = BOOKMARK.captures_at(self.text, self.pos) else {
            let literal = &self.text[self.pos..];
            self.pos = self.text.len();
            return Some(Token::Literal(literal));
        };

        let whole = caps.get(0)?;
        if whole.start() > self.pos {
            let literal = &self.text[self.pos..whole.start()];
            self.pos = whole.start();
            return Some(Token::Literal(literal));
        }

        self.pos = whole.end();
        let name = caps.get(1).map_or("", |m| m.as_str());
        Some(Token::Marker(name))
    }
}

/// Marker name to character offset in the cleaned text, in order of first
/// appearance. Re-using a name moves its offset to the later occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerOffsets {
    entries: Vec<(String, usize)>,
}

impl MarkerOffsets {
    pub fn insert(&mut self, name: &str, offset: usize) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = offset,
            None => self.entries.push((name.to_string(), offset)),
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, offset)| *offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), *o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    pub cleaned: String,
    pub markers: MarkerOffsets,
}

impl ParsedText {
    /// Length of the cleaned text in characters
    pub fn cleaned_len(&self) -> usize {
        self.cleaned.chars().count()
    }
}

pub fn parse(raw: &str) -> ParsedText {
    let mut cleaned = String::with_capacity(raw.len());
    let mut cleaned_chars = 0;
    let mut markers = MarkerOffsets::default();

    for token in tokens(raw) {
        match token {
            Token::Literal(s) => {
                cleaned.push_str(s);
                cleaned_chars += s.chars().count();
            }
            Token::Marker(name) => markers.insert(name, cleaned_chars),
        }
    }

    ParsedText { cleaned, markers }
}

pub fn strip(raw: &str) -> String {
    tokens(raw)
        .filter_map(|t| match t {
            Token::Literal(s) => Some(s),
            Token::Marker(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_offset_before_marker() {
        let parsed = parse("Hello <bookmark mark='a'/>world");
        assert_eq!(parsed.cleaned, "Hello world");
        assert_eq!(parsed.cleaned_len(), 11);
        assert_eq!(parsed.markers.get("a"), Some(6));
    }

    #[test]
    fn test_parse_accepts_double_quotes_and_spacing() {
        let parsed = parse(r#"A <bookmark mark ="first" />B<bookmark mark='second'/>"#);
        assert_eq!(parsed.cleaned, "A B");
        let collected: Vec<_> = parsed.markers.iter().collect();
        assert_eq!(collected, vec![("first", 2), ("second", 3)]);
    }

    #[test]
    fn test_duplicate_name_keeps_last_offset() {
        let parsed = parse("<bookmark mark='a'/>one two <bookmark mark='a'/>three");
        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers.get("a"), Some(8));
    }

    #[test]
    fn test_no_markers() {
        let parsed = parse("Just narration.");
        assert_eq!(parsed.cleaned, "Just narration.");
        assert!(parsed.markers.is_empty());
    }

    #[test]
    fn test_malformed_markers_are_literal() {
        let raw = "a <bookmark mark='x' b <bookmark/> c <bookmark name='y'/>";
        let parsed = parse(raw);
        assert_eq!(parsed.cleaned, raw);
        assert!(parsed.markers.is_empty());
    }

    #[test]
    fn test_offsets_count_characters() {
        let parsed = parse("Übung macht <bookmark mark='m'/>den Meister");
        assert_eq!(parsed.markers.get("m"), Some(12));
    }

    #[test]
    fn test_strip_leaves_no_markers() {
        let raw = "x<bookmark mark='a'/>y<bookmark mark='b'/>z";
        let cleaned = strip(raw);
        assert_eq!(cleaned, "xyz");
        assert_eq!(strip(&cleaned), cleaned);
        assert!(tokens(&cleaned).all(|t| matches!(t, Token::Literal(_))));
        assert_eq!(parse(raw).cleaned, cleaned);
    }

    #[test]
    fn test_tokens_are_restartable() {
        let toks = tokens("a<bookmark mark='m'/>b");
        let first: Vec<_> = toks.clone().collect();
        let second: Vec<_> = toks.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![Token::Literal("a"), Token::Marker("m"), Token::Literal("b")]
        );
    }

    #[test]
    fn test_marker_count_preserved() {
        let raw: String = (0..10)
            .map(|i| format!("word{i} <bookmark mark='m{i}'/>"))
            .collect();
        assert_eq!(parse(&raw).markers.len(), 10);
    }
}
