//! The chunk-embed-upsert pipeline.

use indicatif::ProgressBar;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{Record, VectorRecord};
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::pinecone::VectorIndex;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub records: u64,
    pub chunks: u64,
    pub chunks_skipped: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub vectors_upserted: u64,
}

/// Drives records through chunking, embedding, and batched upserts.
///
/// Processing is strictly sequential: one embedding call per chunk, one
/// upsert call per full batch, in input order. With `continue_on_error`
/// set, a failed embedding drops that chunk and a failed upsert drops
/// that batch; otherwise the first failure aborts the run.
pub struct Ingestor<'a> {
    chunker: &'a TextChunker,
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    namespace: Option<&'a str>,
    batch_size: usize,
    continue_on_error: bool,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        chunker: &'a TextChunker,
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        namespace: Option<&'a str>,
        batch_size: usize,
        continue_on_error: bool,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            namespace,
            batch_size: batch_size.max(1),
            continue_on_error,
        }
    }

    pub async fn run(
        &self,
        records: &[Record],
        progress: &ProgressBar,
    ) -> Result<IngestStats, AppError> {
        let mut stats = IngestStats {
            records: records.len() as u64,
            ..Default::default()
        };
        let mut batch: Vec<VectorRecord> = Vec::with_capacity(self.batch_size);

        for record in records {
            let chunks = self.chunker.split(&record.text);
            let total_chunks = chunks.len();
            stats.chunks += total_chunks as u64;

            let label = record.label();
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let values = match self.embedder.embed(&chunk).await {
                    Ok(values) => values,
                    Err(e) if self.continue_on_error => {
                        progress.println(format!(
                            "warning: embedding failed for row {}, chunk {}: {}",
                            record.row_index, chunk_index, e
                        ));
                        stats.chunks_skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                batch.push(VectorRecord {
                    id: VectorRecord::generate_id(&label, chunk_index),
                    values,
                    metadata: build_metadata(record, &chunk, chunk_index, total_chunks),
                });

                if batch.len() >= self.batch_size {
                    self.flush(&mut batch, &mut stats, progress).await?;
                }
            }

            progress.inc(1);
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut stats, progress).await?;
        }

        Ok(stats)
    }

    async fn flush(
        &self,
        batch: &mut Vec<VectorRecord>,
        stats: &mut IngestStats,
        progress: &ProgressBar,
    ) -> Result<(), AppError> {
        let size = batch.len();
        match self.index.upsert(batch, self.namespace).await {
            Ok(_) => {
                stats.batches_sent += 1;
                stats.vectors_upserted += size as u64;
                progress.println(format!("Upserted {} vectors...", stats.vectors_upserted));
            }
            Err(e) if self.continue_on_error => {
                stats.batches_failed += 1;
                progress.println(format!(
                    "warning: upsert failed, dropping batch of {}: {}",
                    size, e
                ));
            }
            Err(e) => return Err(e.into()),
        }
        batch.clear();
        Ok(())
    }
}

fn build_metadata(
    record: &Record,
    chunk: &str,
    chunk_index: usize,
    total_chunks: usize,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    for (key, value) in &record.fields {
        metadata.insert(key.clone(), Value::String(value.clone()));
    }
    metadata.insert("text".to_string(), Value::String(chunk.to_string()));
    metadata.insert("chunk_index".to_string(), Value::from(chunk_index as u64));
    metadata.insert("total_chunks".to_string(), Value::from(total_chunks as u64));
    metadata.insert("row_index".to_string(), Value::from(record.row_index as u64));
    metadata.insert(
        "ingested_at".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    metadata
}
