use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docslice_core::Pipeline;
use docslice_ingest::ChunkingStrategy;

/// Extract text from documents and split it into retrieval-ready chunks.
#[derive(Parser, Debug)]
#[command(name = "docslice", version, about = "Extract, chunk and embed documents")]
pub struct CliArgs {
    /// Path to the state file (default: ~/.config/docslice/state.toml)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a file through a pipeline and chunk the result
    Parse(ParseArgs),

    /// List the sheets of a workbook
    Sheets {
        file: PathBuf,
    },

    /// List the header columns of a spreadsheet
    Columns {
        file: PathBuf,

        /// Sheet to read (first sheet if not set)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// List the pipelines that accept a file
    Pipelines {
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct ParseArgs {
    pub file: PathBuf,

    /// Pipeline tag, e.g. simple-text or openrouter-pdf (remembered per extension)
    #[arg(long, short)]
    pub pipeline: Option<Pipeline>,

    /// Spreadsheet column to extract
    #[arg(long)]
    pub column: Option<String>,

    /// Spreadsheet sheet (first sheet if not set)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Maximum chunk length in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared between neighbouring chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Separator, coarsest first; repeat to replace the defaults. Accepts \n and \t escapes.
    #[arg(long = "separator")]
    pub separators: Vec<String>,

    #[arg(long, default_value_t = ChunkingStrategy::Recursive)]
    pub strategy: ChunkingStrategy,

    /// Write the chunk JSON here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Embed chunks with the configured embedding provider
    #[arg(long)]
    pub embed: bool,

    /// Echo page text as vision models produce it
    #[arg(long)]
    pub stream: bool,
}
