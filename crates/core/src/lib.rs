pub mod assemble;
pub mod error;
pub mod highlight;
pub mod ingest;
pub mod locator;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod stores;
pub mod traits;
pub mod url_kind;

pub use assemble::{
    assemble, assemble_with, build_video_result, collect_video_results, snippet_text,
};
pub use error::{IngestError, SearchError};
pub use highlight::{collapse_markers, highlight, highlight_many, HighlightTags, Highlighter};
pub use ingest::{
    discover_document_files, load_documents, load_documents_best_effort, IngestionReport,
    SkippedFile,
};
pub use locator::{locate, match_kind, MatchKind};
pub use models::{
    ImportSummary, Match, MatchIndex, QueryFilters, SearchOptions, SearchQuery, SearchResponse,
    TranscriptDocument, TranscriptSentence, VideoResult,
};
pub use orchestrator::SearchCoordinator;
pub use query::{distribute, phrase_query, tokenize};
pub use stores::{TypesenseConfig, TypesenseStore};
pub use traits::TranscriptIndex;
pub use url_kind::{classify_url, UrlClassifier, UrlKind, UrlPatterns};
