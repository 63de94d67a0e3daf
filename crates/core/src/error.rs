use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("relational source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("search service error {status}: {body}")]
    IndexService { status: u16, body: String },
    #[error("search service unreachable: {0}")]
    ServiceUnreachable(String),
    #[error("malformed search service response: {0}")]
    MalformedResponse(String),
    #[error("record {code} rejected: {reason}")]
    RecordRejected { code: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexError {
    /// Maps a failed call to the search service.
    pub fn from_service(err: ProviderError) -> Self {
        match err {
            ProviderError::Status { status, body } => IndexError::IndexService { status, body },
            ProviderError::InvalidResponse(msg) => IndexError::MalformedResponse(msg),
            other => IndexError::ServiceUnreachable(other.to_string()),
        }
    }

    pub fn from_embedding(err: ProviderError) -> Self {
        IndexError::EmbeddingUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::SourceUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
