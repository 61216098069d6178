use crate::error::SearchError;
use crate::highlight::HighlightTags;
use serde::{Deserialize, Serialize};

pub type MatchIndex = usize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptDocument {
    pub id: String,
    #[serde(default)]
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_name: String,
    pub duration: i64,
    pub upload_date: i64,
    pub transcript: Vec<String>,
    pub timestamps: Vec<i64>,
    /// Only present on search hits and never written back to the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_tokens: Option<Vec<Vec<String>>>,
}

impl TranscriptDocument {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.transcript.len() != self.timestamps.len() {
            return Err(SearchError::InvalidInput {
                video_id: self.id.clone(),
                details: format!(
                    "{} sentences but {} timestamps",
                    self.transcript.len(),
                    self.timestamps.len()
                ),
            });
        }
        Ok(())
    }

    // Hints that do not line up with the transcript are dropped.
    pub fn sentences(&self) -> Result<Vec<TranscriptSentence>, SearchError> {
        self.validate()?;

        let hints = self
            .matched_tokens
            .as_ref()
            .filter(|hints| hints.len() == self.transcript.len());

        if hints.is_none() && self.matched_tokens.is_some() {
            tracing::debug!(
                video_id = %self.id,
                "ignoring matched token hints that do not line up with the transcript"
            );
        }

        Ok(self
            .transcript
            .iter()
            .zip(self.timestamps.iter())
            .enumerate()
            .map(|(position, (text, start))| TranscriptSentence {
                text: text.clone(),
                start: *start,
                matched_tokens: hints
                    .map(|hints| hints[position].clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptSentence {
    pub text: String,
    pub start: i64,
    #[serde(default)]
    pub matched_tokens: Vec<String>,
}

impl TranscriptSentence {
    pub fn new(text: impl Into<String>, start: i64) -> Self {
        Self {
            text: text.into(),
            start,
            matched_tokens: Vec::new(),
        }
    }

    pub fn with_matched_tokens(mut self, tokens: Vec<String>) -> Self {
        self.matched_tokens = tokens;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Match {
    pub snippet: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_name: String,
    pub duration: i64,
    pub upload_date: i64,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct QueryFilters {
    pub channel_id: Option<String>,
    #[serde(default)]
    pub video_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub filters: QueryFilters,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: QueryFilters::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_query_words: usize,
    pub highlight_tags: HighlightTags,
    pub per_page: usize,
    pub sort_by: String,
    pub video_id_groups: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_query_words: 5,
            highlight_tags: HighlightTags::default(),
            per_page: 250,
            sort_by: "upload_date:desc".to_string(),
            video_id_groups: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: String,
    pub query: String,
    pub max_query_words: usize,
    pub elapsed_seconds: f64,
    pub hits: Vec<VideoResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub successes: usize,
    pub failures: usize,
}
