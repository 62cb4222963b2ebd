use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use pinegest::cli::Cli;
use pinegest::error::{AppError, ConfigError};
use pinegest::models::Config;
use pinegest::services::{
    Embedder, Ingestor, OpenAiEmbedder, PineconeClient, TextChunker, VectorIndex, load_records,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::load()?;
    if let Some(chunk_size) = cli.chunk_size {
        config.chunking.chunk_size = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        config.chunking.chunk_overlap = overlap;
    }
    if let Some(ref model) = cli.model {
        config.embedding.model = model.clone();
    }
    if let Some(batch_size) = cli.batch_size {
        config.ingest.batch_size = batch_size;
    }
    if cli.continue_on_error {
        config.ingest.continue_on_error = true;
    }

    let openai_key = cli
        .openai_api_key
        .clone()
        .ok_or(ConfigError::MissingEnv("OPENAI_API_KEY"))?;
    let pinecone_key = cli
        .pinecone_api_key
        .clone()
        .ok_or(ConfigError::MissingEnv("PINECONE_API_KEY"))?;

    println!("{}", style("Starting CSV to Pinecone ingestion").bold());
    println!("CSV file: {}", cli.csv.display());
    println!("Index: {}", cli.index);
    println!("Chunk size: {}", config.chunking.chunk_size);
    println!("Overlap: {}", config.chunking.chunk_overlap);
    println!("Embedding model: {}", config.embedding.model);
    println!("Namespace: {}", cli.namespace.as_deref().unwrap_or("default"));
    println!("{}", "-".repeat(50));

    let records = load_records(&cli.csv)?;
    println!("Loaded {} records from {}", records.len(), cli.csv.display());

    let embedder = OpenAiEmbedder::new(&config.embedding, openai_key)?;
    println!("Probing embedding model...");
    let dimension = embedder.probe_dimension().await?;
    println!("Embedding dimension: {}", dimension);

    let pinecone = PineconeClient::new(&config.pinecone, pinecone_key)?;
    let model = pinecone
        .ensure_index(&cli.index, dimension, cli.metric)
        .await?;
    let index = pinecone.index(&model);
    if cli.verbose {
        println!("Index host: {}", index.host_url());
    }

    let chunker = TextChunker::new(&config.chunking);
    let ingestor = Ingestor::new(
        &chunker,
        &embedder,
        &index,
        cli.namespace.as_deref(),
        config.ingest.batch_size as usize,
        config.ingest.continue_on_error,
    );

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap()
            .progress_chars("#>-"),
    );

    let stats = ingestor.run(&records, &pb).await?;
    pb.finish_and_clear();

    println!("{}", "-".repeat(50));
    println!("{}", style("Ingestion complete").green().bold());
    println!("Records processed: {}", stats.records);
    println!("Chunks generated: {}", stats.chunks);
    if stats.chunks_skipped > 0 {
        println!("Chunks skipped: {}", stats.chunks_skipped);
    }
    if stats.batches_failed > 0 {
        println!("Batches dropped: {}", stats.batches_failed);
    }
    println!("Total vectors upserted: {}", stats.vectors_upserted);

    match index.total_vector_count().await {
        Ok(count) => println!("Index total vector count: {}", count),
        Err(e) => {
            if cli.verbose {
                eprintln!("could not fetch index stats: {}", e);
            }
        }
    }

    Ok(())
}
