use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid document {document_id}: {details}")]
    InvalidDocument { document_id: String, details: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is too long, please limit it to {limit} words or less")]
    QueryTooLong { limit: usize },

    #[error("invalid transcript data for video {video_id}: {details}")]
    InvalidInput { video_id: String, details: String },

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl SearchError {
    /// Caller mistakes; never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::QueryTooLong { .. } | Self::Request(_) | Self::InvalidUrl(_)
        )
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
