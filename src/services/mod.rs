mod chunker;
mod embedding;
mod loader;
mod pinecone;
mod pipeline;

pub use chunker::TextChunker;
pub use embedding::{Embedder, OpenAiEmbedder};
pub use loader::load_records;
pub use pinecone::{
    IndexControl, IndexModel, PineconeClient, PineconeIndex, VectorIndex, ensure_index,
};
pub use pipeline::{IngestStats, Ingestor};
