//! Error types for the ingestion CLI.

use thiserror::Error;

/// Errors raised while loading and normalizing the input CSV.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    ParseError(#[from] csv::Error),

    #[error("CSV missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV has no header row")]
    EmptyHeader,
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to reach embedding service: {0}")]
    ConnectionError(String),

    #[error("embedding service error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding request timed out")]
    Timeout,
}

/// Errors related to the Pinecone index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to reach Pinecone: {0}")]
    ConnectionError(String),

    #[error("Pinecone request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Pinecone API error: {0}")]
    ApiError(String),

    #[error("invalid Pinecone response: {0}")]
    InvalidResponse(String),

    #[error(
        "index '{name}' exists with dimension {existing_dimension} and metric \
         {existing_metric}, but this run requires dimension {requested_dimension} \
         and metric {requested_metric}"
    )]
    IndexMismatch {
        name: String,
        existing_dimension: usize,
        requested_dimension: usize,
        existing_metric: String,
        requested_metric: String,
    },

    #[error("index '{0}' was not ready after {1} readiness checks")]
    ProvisioningTimeout(String, u32),

    #[error("upsert error: {0}")]
    UpsertError(String),
}

/// Errors related to configuration and environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}
