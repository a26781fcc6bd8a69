use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("embedding dimension {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("pdf extraction failed: {0}")]
    Extraction(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("model failure: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("model failure: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
