use crate::error::SearchError;
use crate::locator::is_word_char;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighlightTags {
    pub start: String,
    pub end: String,
}

impl Default for HighlightTags {
    fn default() -> Self {
        Self {
            start: "<mark>".to_string(),
            end: "</mark>".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    patterns: Vec<Regex>,
    tags: HighlightTags,
}

impl Highlighter {
    pub fn new<S: AsRef<str>>(words: &[S], tags: HighlightTags) -> Result<Self, SearchError> {
        let mut seen = Vec::<String>::new();
        let mut patterns = Vec::new();

        for word in words {
            let word = word.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            let folded = word.to_lowercase();
            if seen.contains(&folded) {
                continue;
            }
            patterns.push(Regex::new(&whole_word_pattern(word))?);
            seen.push(folded);
        }

        Ok(Self { patterns, tags })
    }

    pub fn tags(&self) -> &HighlightTags {
        &self.tags
    }

    pub fn highlight(&self, text: &str) -> String {
        let mut marked = text.to_string();
        for pattern in &self.patterns {
            marked = self.wrap_unmarked(&marked, pattern);
        }
        collapse_markers(&marked, &self.tags)
    }

    fn wrap_unmarked(&self, text: &str, pattern: &Regex) -> String {
        let mut output = String::with_capacity(text.len() + 16);
        let mut depth = 0usize;
        let mut rest = text;

        loop {
            let next = next_tag(rest, &self.tags);
            let plain = match next {
                Some((position, _)) => &rest[..position],
                None => rest,
            };

            if depth == 0 {
                let wrapped = pattern.replace_all(plain, |caps: &Captures| {
                    format!("{}{}{}", self.tags.start, &caps[0], self.tags.end)
                });
                output.push_str(&wrapped);
            } else {
                output.push_str(plain);
            }

            let Some((position, tag)) = next else {
                break;
            };

            match tag {
                Tag::Start => {
                    output.push_str(&self.tags.start);
                    depth += 1;
                    rest = &rest[position + self.tags.start.len()..];
                }
                Tag::End => {
                    output.push_str(&self.tags.end);
                    depth = depth.saturating_sub(1);
                    rest = &rest[position + self.tags.end.len()..];
                }
            }
        }

        output
    }
}

pub fn highlight(text: &str, word: &str) -> Result<String, SearchError> {
    highlight_many(text, &[word])
}

pub fn highlight_many<S: AsRef<str>>(text: &str, words: &[S]) -> Result<String, SearchError> {
    Ok(Highlighter::new(words, HighlightTags::default())?.highlight(text))
}

pub fn collapse_markers(text: &str, tags: &HighlightTags) -> String {
    let mut collapsed = text.to_string();
    for tag in [&tags.start, &tags.end] {
        if tag.is_empty() {
            continue;
        }
        let doubled = tag.repeat(2);
        while collapsed.contains(&doubled) {
            collapsed = collapsed.replace(&doubled, tag);
        }
    }
    collapsed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Start,
    End,
}

fn next_tag(text: &str, tags: &HighlightTags) -> Option<(usize, Tag)> {
    let start = (!tags.start.is_empty())
        .then(|| text.find(&tags.start))
        .flatten()
        .map(|position| (position, Tag::Start));
    let end = (!tags.end.is_empty())
        .then(|| text.find(&tags.end))
        .flatten()
        .map(|position| (position, Tag::End));

    match (start, end) {
        (Some(start), Some(end)) => Some(if end.0 < start.0 { end } else { start }),
        (start, end) => start.or(end),
    }
}

fn whole_word_pattern(word: &str) -> String {
    let open = if word.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let close = if word.chars().next_back().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    format!("(?i){open}{}{close}", regex::escape(word))
}
