use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

mod cli;
mod config;
mod covers;
mod embedding;
mod http;
mod index;
mod query;

use config::Config;
use covers::CoverResolver;
use embedding::EmbeddingProvider;
use index::builder::{BuildOptions, IndexBuilder};
use index::record::{BookRecord, CoverStatus};
use index::storage::IndexStorage;

/// Characters of description shown per query result.
const SNIPPET_CHARS: usize = 200;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();
    let config = Config::load();

    match args.command {
        cli::Command::Build {
            records,
            output,
            limit,
            model,
            workers,
            no_covers,
        } => build(&config, &records, &output, limit, model, workers, no_covers),

        cli::Command::Query {
            phrase,
            index,
            count,
        } => run_query(&config, &index, &phrase, count),

        cli::Command::Cover {
            title,
            author,
            isbn,
        } => resolve_one_cover(&config, title, author, isbn),
    }
}

fn build(
    config: &Config,
    records_path: &PathBuf,
    output: &PathBuf,
    limit: i64,
    model_override: Option<String>,
    workers_override: Option<usize>,
    no_covers: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(records_path)
        .with_context(|| format!("reading catalog {}", records_path.display()))?;
    let raw_records: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("catalog is not a JSON array of records")?;

    let records: Vec<BookRecord> = raw_records.iter().map(BookRecord::from_raw).collect();
    log::info!("loaded {} catalog records", records.len());

    let model_name = model_override.unwrap_or_else(|| config.model.clone());
    let provider = EmbeddingProvider::new(&model_name, config.base_path().clone())?;
    log::info!("embedding model {} ({} dims)", provider.name(), provider.dims());

    // Embeddings are computed for the *truncated* record set so a sampled
    // run stays cheap end to end.
    let effective: &[BookRecord] = if limit > 0 && (limit as usize) < records.len() {
        &records[..limit as usize]
    } else {
        &records
    };

    let texts: Vec<String> = effective.iter().map(|r| r.description.clone()).collect();
    let embeddings = provider.embed_batch(&texts)?;

    let resolver = CoverResolver::new(
        Duration::from_secs(config.covers.http_timeout_secs),
        Duration::from_millis(config.covers.throttle_millis),
    );
    let builder = IndexBuilder::new(
        &resolver,
        BuildOptions {
            sample_limit: limit,
            workers: workers_override.unwrap_or(config.workers),
            skip_covers: no_covers,
            quiet: false,
        },
    );

    let index = builder.build(effective.to_vec(), embeddings)?;

    let storage = IndexStorage::new(output.clone());
    storage.save(&index, &provider.model_id_hash())?;

    let with_cover = index
        .records()
        .iter()
        .filter(|r| matches!(r.cover, CoverStatus::Url(_)))
        .count();
    println!(
        "indexed {} books ({} with covers) -> {}",
        index.len(),
        with_cover,
        output.display()
    );
    Ok(())
}

fn run_query(
    config: &Config,
    index_path: &PathBuf,
    phrase: &str,
    count: i64,
) -> anyhow::Result<()> {
    if phrase.trim().is_empty() {
        anyhow::bail!("empty query phrase");
    }

    // Non-positive counts fall back to the configured default rather than
    // erroring; this mirrors how interactive callers treat bad input.
    let top_n = if count > 0 {
        count as usize
    } else {
        log::warn!("invalid result count {count}, using default {}", config.result_count);
        config.result_count
    };

    // Load the artifact first: a missing or malformed index fails cheaply,
    // before any model setup or download. The model check only needs the
    // name hash, not a live model.
    let storage = IndexStorage::new(index_path.clone());
    let loaded = storage
        .load(Some(&embedding::model_id_for(&config.model)))
        .with_context(|| format!("loading index {}", index_path.display()))?;

    let provider = EmbeddingProvider::new(&config.model, config.base_path().clone())?;
    let query_embedding = provider.embed(phrase)?;
    let matches = query::top_matches(&loaded.index, &query_embedding, top_n)?;

    println!("top {} vibe matches for: {phrase:?}\n", matches.len());
    for (i, m) in matches.iter().enumerate() {
        println!("{}. {} by {}", i + 1, m.record.title, m.record.author);
        println!("   vibe match: {:.0}%", m.score * 100.0);
        let snippet = m.record.snippet(SNIPPET_CHARS);
        if !snippet.is_empty() {
            println!("   synopsis: {snippet:?}");
        }
        if let Some(url) = m.record.cover.url() {
            println!("   cover: {url}");
        }
        println!();
    }
    Ok(())
}

fn resolve_one_cover(
    config: &Config,
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
) -> anyhow::Result<()> {
    if title.is_none() && isbn.is_none() {
        anyhow::bail!("provide at least --title or --isbn");
    }

    let record = BookRecord {
        title: title.unwrap_or_else(|| index::record::UNTITLED.to_string()),
        author: author.unwrap_or_else(|| index::record::UNKNOWN_AUTHOR.to_string()),
        description: String::new(),
        isbns: isbn
            .as_deref()
            .and_then(covers::normalize::normalize_isbn)
            .map(|i| vec![i])
            .unwrap_or_default(),
        cover: CoverStatus::Unresolved,
    };

    let resolver = CoverResolver::new(
        Duration::from_secs(config.covers.http_timeout_secs),
        Duration::from_millis(config.covers.throttle_millis),
    );

    match resolver.resolve(&record) {
        CoverStatus::Url(url) => println!("{url}"),
        _ => {
            println!("no cover found");
            std::process::exit(1);
        }
    }
    Ok(())
}
