mod config;
mod record;

pub use config::{
    ChunkingConfig, Config, DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_URL, DEFAULT_PINECONE_URL,
    EmbeddingConfig, IngestConfig, PineconeConfig,
};
pub use record::{Metric, Record, VectorRecord};
