use crate::{ImportSummary, SearchError, SearchOptions, SearchQuery, TranscriptDocument};
use async_trait::async_trait;

#[async_trait]
pub trait TranscriptIndex {
    async fn index_documents(
        &self,
        documents: &[TranscriptDocument],
    ) -> Result<ImportSummary, SearchError>;

    async fn search_transcripts(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
    ) -> Result<Vec<TranscriptDocument>, SearchError>;
}
