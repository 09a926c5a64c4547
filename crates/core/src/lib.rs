pub mod config;
pub mod error;
pub mod pipeline;

pub use config::Config;
pub use error::*;
pub use pipeline::{compatible_pipelines, file_extension, Pipeline, PipelineMemory};
