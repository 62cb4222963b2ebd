//! CLI definition for the ingestion tool.

use std::path::PathBuf;

use clap::Parser;

use crate::models::Metric;

/// Ingest a CSV of text records into a Pinecone serverless index for RAG.
#[derive(Debug, Parser)]
#[command(name = "pinegest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the CSV file to ingest (must have a text column)
    #[arg(long)]
    pub csv: PathBuf,

    /// Pinecone index name
    #[arg(long)]
    pub index: String,

    /// Maximum chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// Chunk overlap in characters
    #[arg(long)]
    pub overlap: Option<u32>,

    /// OpenAI embedding model
    #[arg(long)]
    pub model: Option<String>,

    /// Optional Pinecone namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Upsert batch size
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Distance metric for a newly created index
    #[arg(long, default_value_t = Metric::Cosine)]
    pub metric: Metric,

    /// Skip failed chunks and batches instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Enable verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::try_parse_from(["pinegest", "--csv", "data.csv", "--index", "policies"])
            .unwrap();
        assert_eq!(cli.index, "policies");
        assert_eq!(cli.metric, Metric::Cosine);
        assert!(cli.chunk_size.is_none());
        assert!(!cli.continue_on_error);
    }

    #[test]
    fn test_full_invocation() {
        let cli = Cli::try_parse_from([
            "pinegest",
            "--csv",
            "data.csv",
            "--index",
            "policies",
            "--chunk-size",
            "400",
            "--overlap",
            "60",
            "--model",
            "text-embedding-3-large",
            "--namespace",
            "renewables",
            "--batch-size",
            "50",
            "--metric",
            "dotproduct",
            "--continue-on-error",
        ])
        .unwrap();
        assert_eq!(cli.chunk_size, Some(400));
        assert_eq!(cli.overlap, Some(60));
        assert_eq!(cli.metric, Metric::Dotproduct);
        assert_eq!(cli.namespace.as_deref(), Some("renewables"));
        assert!(cli.continue_on_error);
    }

    #[test]
    fn test_invalid_metric_rejected() {
        let result = Cli::try_parse_from([
            "pinegest",
            "--csv",
            "data.csv",
            "--index",
            "policies",
            "--metric",
            "manhattan",
        ]);
        assert!(result.is_err());
    }
}
