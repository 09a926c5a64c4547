//! Pipeline catalogue: which extraction strategy exists, which files it
//! accepts and whether it needs a cloud credential.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named extraction strategy mapping a file type to a local or remote
/// text-extraction procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pipeline {
    SimpleText,
    ExcelSpreadsheet,
    CsvSpreadsheet,
    OpenrouterPdf,
    OpenrouterImage,
    OpenrouterAudio,
    OpenrouterVideo,
    OllamaPdf,
    OllamaImage,
    VllmPdf,
    VllmImage,
    VllmAudio,
    VllmVideo,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

impl Pipeline {
    pub const ALL: [Pipeline; 13] = [
        Pipeline::SimpleText,
        Pipeline::ExcelSpreadsheet,
        Pipeline::CsvSpreadsheet,
        Pipeline::OpenrouterPdf,
        Pipeline::OpenrouterImage,
        Pipeline::OpenrouterAudio,
        Pipeline::OpenrouterVideo,
        Pipeline::OllamaPdf,
        Pipeline::OllamaImage,
        Pipeline::VllmPdf,
        Pipeline::VllmImage,
        Pipeline::VllmAudio,
        Pipeline::VllmVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::SimpleText => "simple-text",
            Pipeline::ExcelSpreadsheet => "excel-spreadsheet",
            Pipeline::CsvSpreadsheet => "csv-spreadsheet",
            Pipeline::OpenrouterPdf => "openrouter-pdf",
            Pipeline::OpenrouterImage => "openrouter-image",
            Pipeline::OpenrouterAudio => "openrouter-audio",
            Pipeline::OpenrouterVideo => "openrouter-video",
            Pipeline::OllamaPdf => "ollama-pdf",
            Pipeline::OllamaImage => "ollama-image",
            Pipeline::VllmPdf => "vllm-pdf",
            Pipeline::VllmImage => "vllm-image",
            Pipeline::VllmAudio => "vllm-audio",
            Pipeline::VllmVideo => "vllm-video",
        }
    }

    /// File extensions (lowercase, without dot) this pipeline accepts.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Pipeline::SimpleText => &["pdf", "docx", "txt", "md", "markdown"],
            Pipeline::ExcelSpreadsheet => &["xlsx", "xls"],
            Pipeline::CsvSpreadsheet => &["csv"],
            Pipeline::OpenrouterPdf | Pipeline::OllamaPdf | Pipeline::VllmPdf => &["pdf"],
            Pipeline::OpenrouterImage | Pipeline::OllamaImage | Pipeline::VllmImage => {
                IMAGE_EXTENSIONS
            }
            Pipeline::OpenrouterAudio | Pipeline::VllmAudio => AUDIO_EXTENSIONS,
            Pipeline::OpenrouterVideo | Pipeline::VllmVideo => VIDEO_EXTENSIONS,
        }
    }

    pub fn accepts(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.allowed_extensions().contains(&ext.as_str())
    }

    /// Only the cloud pipelines need an externally supplied API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(
            self,
            Pipeline::OpenrouterPdf
                | Pipeline::OpenrouterImage
                | Pipeline::OpenrouterAudio
                | Pipeline::OpenrouterVideo
        )
    }

    /// Tabular pipelines populate per-row text alongside the joined content.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Pipeline::ExcelSpreadsheet | Pipeline::CsvSpreadsheet)
    }

    /// Remote pipelines talk to an inference backend and honour cancellation.
    pub fn is_remote(&self) -> bool {
        !matches!(
            self,
            Pipeline::SimpleText | Pipeline::ExcelSpreadsheet | Pipeline::CsvSpreadsheet
        )
    }

    /// Human-readable name of the engine behind the pipeline.
    pub fn label(&self) -> &'static str {
        match self {
            Pipeline::SimpleText => "pdf-extract + docx-rs",
            Pipeline::ExcelSpreadsheet => "XLSX",
            Pipeline::CsvSpreadsheet => "CSV Parser",
            Pipeline::OpenrouterPdf
            | Pipeline::OpenrouterImage
            | Pipeline::OpenrouterAudio
            | Pipeline::OpenrouterVideo => "OpenRouter",
            Pipeline::OllamaPdf | Pipeline::OllamaImage => "Ollama",
            Pipeline::VllmPdf | Pipeline::VllmImage | Pipeline::VllmAudio | Pipeline::VllmVideo => {
                "vLLM"
            }
        }
    }

    pub fn badge(&self) -> &'static str {
        if self.requires_api_key() { "Cloud" } else { "Local" }
    }

    /// Fail fast if `extension` is not one this pipeline can read.
    pub fn check_extension(&self, extension: &str) -> Result<(), ValidationError> {
        if self.accepts(extension) {
            Ok(())
        } else {
            Err(ValidationError::IncompatibleExtension {
                pipeline: self.as_str().to_string(),
                extension: extension.to_lowercase(),
            })
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pipeline::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedPipeline(s.to_string()))
    }
}

/// Lowercased extension of a file name, empty if there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// All pipelines able to read files with this extension, in catalogue order.
pub fn compatible_pipelines(extension: &str) -> Vec<Pipeline> {
    Pipeline::ALL
        .iter()
        .copied()
        .filter(|p| p.accepts(extension))
        .collect()
}

/// Last pipeline chosen per file extension.
///
/// Callers own this state and pass it into selection explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMemory {
    #[serde(default)]
    last_by_ext: BTreeMap<String, Pipeline>,
}

impl PipelineMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `pipeline` for `extension`. Incompatible pairs are ignored.
    pub fn remember(&mut self, extension: &str, pipeline: Pipeline) {
        let ext = extension.to_lowercase();
        if pipeline.accepts(&ext) {
            self.last_by_ext.insert(ext, pipeline);
        }
    }

    pub fn last_for(&self, extension: &str) -> Option<Pipeline> {
        self.last_by_ext.get(&extension.to_lowercase()).copied()
    }

    /// Remembered pipeline if still compatible, else the first compatible one.
    pub fn select_for(&self, extension: &str) -> Option<Pipeline> {
        self.last_for(extension)
            .filter(|p| p.accepts(extension))
            .or_else(|| compatible_pipelines(extension).into_iter().next())
    }
}
