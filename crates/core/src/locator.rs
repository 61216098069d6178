use crate::models::{MatchIndex, TranscriptSentence};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Sentence,
    /// The phrase starts in this sentence and ends in the following one.
    Boundary,
}

pub fn locate(transcript: &[TranscriptSentence], query_words: &[String]) -> Vec<MatchIndex> {
    let words = fold_words(query_words);
    if words.is_empty() {
        return Vec::new();
    }

    let views = transcript.iter().map(SentenceView::new).collect::<Vec<_>>();

    (0..views.len())
        .filter(|&index| classify(&views, index, &words).is_some())
        .collect()
}

pub fn match_kind(
    transcript: &[TranscriptSentence],
    index: MatchIndex,
    query_words: &[String],
) -> Option<MatchKind> {
    let words = fold_words(query_words);
    let current = SentenceView::new(transcript.get(index)?);

    match words.as_slice() {
        [] => None,
        [word] => current.contains(word).then_some(MatchKind::Sentence),
        _ => {
            let next = transcript.get(index + 1).map(SentenceView::new);
            classify_pair(&current, next.as_ref(), &words)
        }
    }
}

fn classify(views: &[SentenceView], index: usize, words: &[String]) -> Option<MatchKind> {
    let current = &views[index];

    match words {
        [] => None,
        [word] => current.contains(word).then_some(MatchKind::Sentence),
        _ => classify_pair(current, views.get(index + 1), words),
    }
}

fn classify_pair(
    current: &SentenceView,
    next: Option<&SentenceView>,
    words: &[String],
) -> Option<MatchKind> {
    let found = words
        .iter()
        .take_while(|word| current.contains(word))
        .count();

    if found == words.len() {
        return Some(MatchKind::Sentence);
    }

    // A boundary match needs at least one word on this side of the split.
    if found == 0 {
        return None;
    }

    let next = next?;
    words[found..]
        .iter()
        .all(|word| next.contains(word))
        .then_some(MatchKind::Boundary)
}

fn fold_words(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|word| word.to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

struct SentenceView {
    folded: String,
    hints: Vec<String>,
}

impl SentenceView {
    fn new(sentence: &TranscriptSentence) -> Self {
        Self {
            folded: sentence.text.to_lowercase(),
            hints: sentence
                .matched_tokens
                .iter()
                .map(|token| token.to_lowercase())
                .collect(),
        }
    }

    fn contains(&self, word: &str) -> bool {
        self.hints.iter().any(|hint| hint == word) || contains_whole_word(&self.folded, word)
    }
}

// Same class as the regex crate's Unicode `\w`, so the locator and the
// highlighter's `\b` agree on where a word ends.
pub(crate) fn is_word_char(c: char) -> bool {
    regex_syntax::is_word_character(c)
}

/// A boundary is only required on an edge of `word` that is itself a word
/// character, so `"c++"` still matches inside `"c++ templates"`.
pub(crate) fn contains_whole_word(haystack: &str, word: &str) -> bool {
    let (Some(first), Some(last)) = (word.chars().next(), word.chars().next_back()) else {
        return false;
    };
    let check_start = is_word_char(first);
    let check_end = is_word_char(last);

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(word) {
        let start = from + offset;
        let end = start + word.len();

        let open = !check_start || !haystack[..start].chars().next_back().is_some_and(is_word_char);
        let close = !check_end || !haystack[end..].chars().next().is_some_and(is_word_char);
        if open && close {
            return true;
        }

        from = start + first.len_utf8();
    }

    false
}
