use crate::assemble::collect_video_results;
use crate::highlight::Highlighter;
use crate::query::tokenize;
use crate::traits::TranscriptIndex;
use crate::{SearchError, SearchOptions, SearchQuery, SearchResponse};
use std::time::Instant;
use tracing::debug;

pub struct SearchCoordinator<I>
where
    I: TranscriptIndex,
{
    index: I,
    options: SearchOptions,
}

impl<I> SearchCoordinator<I>
where
    I: TranscriptIndex + Send + Sync,
{
    pub fn new(index: I, options: SearchOptions) -> Self {
        Self { index, options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();

        // Validate before touching the backend.
        let words = tokenize(&query.text, self.options.max_query_words)?;
        if words.is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let documents = self.index.search_transcripts(query, &self.options).await?;
        let highlighter = Highlighter::new(&words, self.options.highlight_tags.clone())?;
        let hits = collect_video_results(&documents, &words, &highlighter)?;

        let elapsed_seconds = started.elapsed().as_secs_f64();
        debug!(
            query = %query.text,
            documents = documents.len(),
            videos = hits.len(),
            elapsed_seconds,
            "search finished"
        );

        Ok(SearchResponse {
            status: "success".to_string(),
            query: query.text.clone(),
            max_query_words: self.options.max_query_words,
            elapsed_seconds,
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImportSummary, TranscriptDocument};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeTranscriptIndex {
        documents: Vec<TranscriptDocument>,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptIndex for FakeTranscriptIndex {
        async fn index_documents(
            &self,
            documents: &[TranscriptDocument],
        ) -> Result<ImportSummary, SearchError> {
            Ok(ImportSummary {
                successes: documents.len(),
                failures: 0,
            })
        }

        async fn search_transcripts(
            &self,
            _query: &SearchQuery,
            _options: &SearchOptions,
        ) -> Result<Vec<TranscriptDocument>, SearchError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(self.documents.clone())
        }
    }

    fn document(id: &str, transcript: &[&str], timestamps: &[i64]) -> TranscriptDocument {
        TranscriptDocument {
            id: id.to_string(),
            video_id: id.to_string(),
            title: "Algorithms".to_string(),
            channel_id: "UC123".to_string(),
            channel_name: "CS Channel".to_string(),
            duration: 1200,
            upload_date: 20240215,
            transcript: transcript.iter().map(|text| text.to_string()).collect(),
            timestamps: timestamps.to_vec(),
            matched_tokens: None,
        }
    }

    #[tokio::test]
    async fn coordinator_builds_highlighted_video_results() {
        let index = FakeTranscriptIndex {
            documents: vec![
                document("v1", &["hello world", "dynamic programming is fun", "goodbye"], &[0, 5, 10]),
                document("v2", &["nothing here"], &[0]),
                document("v3", &["he said dynamic", "programming is cool"], &[0, 3]),
            ],
            ..Default::default()
        };

        let coordinator = SearchCoordinator::new(index, SearchOptions::default());
        let response = coordinator
            .search(&SearchQuery::new("Dynamic Programming"))
            .await
            .expect("search should succeed");

        assert_eq!(response.status, "success");
        assert_eq!(response.max_query_words, 5);
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].video_id, "v1");
        assert_eq!(
            response.hits[0].matches[0].snippet,
            "<mark>dynamic</mark> <mark>programming</mark> is fun"
        );
        assert_eq!(response.hits[0].matches[0].timestamp, 5);
        assert_eq!(response.hits[1].video_id, "v3");
        assert_eq!(
            response.hits[1].matches[0].snippet,
            "he said <mark>dynamic</mark> <mark>programming</mark> is cool"
        );
    }

    #[tokio::test]
    async fn long_query_fails_before_the_backend_is_called() {
        let coordinator = SearchCoordinator::new(FakeTranscriptIndex::default(), SearchOptions::default());
        let result = coordinator
            .search(&SearchQuery::new("the quick brown fox jumps over the lazy dog"))
            .await;

        assert!(matches!(result, Err(SearchError::QueryTooLong { limit: 5 })));
        assert_eq!(coordinator.index().searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_query_is_a_client_error() {
        let coordinator = SearchCoordinator::new(FakeTranscriptIndex::default(), SearchOptions::default());
        let error = coordinator
            .search(&SearchQuery::new("   "))
            .await
            .expect_err("empty query should fail");
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn backend_hints_drive_matching() {
        let mut hinted = document("v1", &["colour matters"], &[42]);
        hinted.matched_tokens = Some(vec![vec!["color".to_string()]]);
        let index = FakeTranscriptIndex {
            documents: vec![hinted],
            ..Default::default()
        };

        let coordinator = SearchCoordinator::new(index, SearchOptions::default());
        let response = coordinator.search(&SearchQuery::new("color")).await.unwrap();

        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].matches[0].timestamp, 42);
        // The hint proves the match; the text itself has nothing to mark.
        assert_eq!(response.hits[0].matches[0].snippet, "colour matters");
    }
}
