mod cli;
mod config;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use docslice_core::{compatible_pipelines, Config};
use docslice_ingest::chunker::chunk_parse_result;
use docslice_ingest::document::{list_columns, list_sheets};
use docslice_ingest::embedding::{embed_chunks, embedder_from_config};
use docslice_ingest::parse::ProgressReporter;
use docslice_ingest::{
    Chunk, ChunkStats, ChunkingOutcome, ChunkingParameters, ChunksJson, DocumentParser,
    ParseOptions, Progress, SourceFile, UpsertBatch,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command, ParseArgs};
use crate::config::CliState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    docslice_core::config::load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let state_path = match args.state {
        Some(path) => path,
        None => CliState::default_path()?,
    };

    match args.command {
        Command::Parse(parse) => run_parse(parse, &config, &state_path).await,
        Command::Sheets { file } => {
            let file = load(&file).await?;
            for sheet in list_sheets(file.bytes(), file.name())? {
                println!("{sheet}");
            }
            Ok(())
        }
        Command::Columns { file, sheet } => {
            let file = load(&file).await?;
            for column in list_columns(file.bytes(), file.name(), sheet.as_deref())? {
                println!("{column}");
            }
            Ok(())
        }
        Command::Pipelines { file } => {
            let state = CliState::load(&state_path)?;
            let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let ext = docslice_core::file_extension(&name);
            let remembered = state.pipelines.select_for(&ext);
            for pipeline in compatible_pipelines(&ext) {
                let marker = if Some(pipeline) == remembered { "*" } else { " " };
                let key = if pipeline.requires_api_key() { " (API key)" } else { "" };
                println!(
                    "{marker} {:<18} {:<6} {}{key}",
                    pipeline.as_str(),
                    pipeline.badge(),
                    pipeline.label()
                );
            }
            Ok(())
        }
    }
}

async fn load(path: &Path) -> Result<SourceFile> {
    SourceFile::load(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn run_parse(args: ParseArgs, config: &Config, state_path: &Path) -> Result<()> {
    let mut state = CliState::load(state_path)?;
    let file = load(&args.file).await?;
    let ext = file.extension();
    let Some(pipeline) = state.resolve_pipeline(&ext, args.pipeline) else {
        bail!("no pipeline accepts .{ext} files");
    };
    let params = chunking_params(&args, config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ncancelling...");
            ctrl_c.cancel();
        }
    });

    let mut opts = ParseOptions::from_config(file.clone(), pipeline, config)?
        .with_cancel(cancel.clone())
        .on_progress(print_progress);
    if let Some(column) = &args.column {
        opts = opts.with_column(column.clone());
    }
    if let Some(sheet) = &args.sheet {
        opts = opts.with_sheet(sheet.clone());
    }
    if args.stream {
        opts = opts.on_page_stream(|page, delta| {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "{delta}");
            let _ = err.flush();
            tracing::trace!(page, "page delta");
        });
    }

    let parsed = DocumentParser::default()
        .parse(&opts)
        .await
        .with_context(|| format!("failed to parse {} with {pipeline}", file.name()))?;

    state.pipelines.remember(&ext, pipeline);
    if let Err(e) = state.save(state_path) {
        warn!(error = %e, "Failed to save state");
    }

    let chunks = match chunk_parse_result(&parsed, &params, file.name()) {
        ChunkingOutcome::Chunks(chunks) => chunks,
        ChunkingOutcome::NotImplemented { placeholder } => {
            for line in placeholder {
                println!("{line}");
            }
            return Ok(());
        }
    };

    let stats = ChunkStats::from_chunks(&chunks);
    info!(
        chunks = stats.count,
        min = stats.min_chars,
        max = stats.max_chars,
        tokens = stats.total_tokens,
        "chunking done"
    );
    eprintln!(
        "{} chunks ({}..{} chars, mean {:.0}), ~{} tokens",
        stats.count, stats.min_chars, stats.max_chars, stats.mean_chars, stats.total_tokens
    );

    if args.embed {
        let batch = embed(&file, pipeline, &chunks, config, &cancel).await?;
        write_json(&batch, args.output.as_deref())
    } else {
        let json = ChunksJson::new(file.name(), pipeline, &chunks);
        write_json(&json, args.output.as_deref())
    }
}

fn chunking_params(args: &ParseArgs, config: &Config) -> Result<ChunkingParameters> {
    let mut params = ChunkingParameters::from_config(&config.chunking);
    params.set_strategy(args.strategy);
    if let Some(size) = args.chunk_size {
        params.set_chunk_size(size);
    }
    if let Some(overlap) = args.chunk_overlap {
        params.set_chunk_overlap(overlap);
    }
    if !args.separators.is_empty() {
        let separators = args
            .separators
            .iter()
            .map(|s| s.replace("\\n", "\n").replace("\\t", "\t"))
            .collect();
        params.set_separators(separators)?;
    }
    params.validate()?;
    Ok(params)
}

fn print_progress(progress: Progress) {
    eprintln!("[{}/{}]", progress.completed, progress.total);
}

async fn embed(
    file: &SourceFile,
    pipeline: docslice_core::Pipeline,
    chunks: &[Chunk],
    config: &Config,
    cancel: &CancellationToken,
) -> Result<UpsertBatch> {
    let embedder = embedder_from_config(&config.embedding).context("embedding not configured")?;
    let mut progress = ProgressReporter::new(Some(Arc::new(print_progress)));
    let vectors = embed_chunks(
        embedder.as_ref(),
        chunks,
        config.embedding.batch_size,
        cancel,
        &mut progress,
    )
    .await
    .context("embedding failed")?;
    Ok(UpsertBatch::new(file.stem(), file.name(), pipeline, chunks, vectors)?)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
