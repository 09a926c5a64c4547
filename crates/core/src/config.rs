use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_parsed<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

/// Prompt used by the vision and transcription pipelines when none is given.
pub const DEFAULT_EXTRACTION_PROMPT: &str = "Extract all text content from this document. \
Preserve headings, lists and tables as Markdown. Return only the extracted content.";

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub chunking: ChunkingConfig,
    pub openrouter: OpenRouterConfig,
    pub ollama: OllamaConfig,
    pub vllm: VllmConfig,
    pub embedding: EmbeddingConfig,
    /// Deadline applied to remote extraction. `None` leaves it to the caller.
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCSLICE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCSLICE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            chunking: ChunkingConfig::from_env_profiled(p),
            openrouter: OpenRouterConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            vllm: VllmConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            request_timeout_secs: profiled_env_parsed(p, "REQUEST_TIMEOUT_SECS"),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  chunking:    size={}, overlap={}", self.chunking.chunk_size, self.chunking.chunk_overlap);
        tracing::info!("  openrouter:  model={}, key={}", self.openrouter.model, if self.openrouter.is_configured() { "set" } else { "(none)" });
        tracing::info!("  ollama:      url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!("  vllm:        url={}, model={}", self.vllm.url, self.vllm.model);
        tracing::info!("  embedding:   provider={}, model={}", self.embedding.provider, self.embedding.model);
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "chunking": {
                "chunk_size": self.chunking.chunk_size,
                "chunk_overlap": self.chunking.chunk_overlap,
            },
            "openrouter": {
                "base_url": self.openrouter.base_url,
                "model": self.openrouter.model,
                "pdf_engine": self.openrouter.pdf_engine,
                "pages_per_batch": self.openrouter.pages_per_batch,
                "configured": self.openrouter.is_configured(),
            },
            "ollama": { "url": self.ollama.url, "model": self.ollama.model },
            "vllm": { "url": self.vllm.url, "model": self.vllm.model },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "configured": self.embedding.is_configured(),
            },
            "request_timeout_secs": self.request_timeout_secs,
        })
    }
}

// ── Chunking defaults ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            chunk_size: profiled_env_usize(p, "CHUNK_SIZE", 1024),
            chunk_overlap: profiled_env_usize(p, "CHUNK_OVERLAP", 200),
        }
    }
}

// ── OpenRouter (cloud multimodal) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub prompt: String,
    /// "native", "pdf-text" or "mistral-ocr"
    pub pdf_engine: String,
    pub pages_per_batch: Option<usize>,
}

impl OpenRouterConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_key: profiled_env_opt(p, "OPENROUTER_API_KEY"),
            base_url: profiled_env_or(p, "OPENROUTER_BASE_URL", "https://openrouter.ai/api"),
            model: profiled_env_or(p, "OPENROUTER_MODEL", "google/gemini-2.5-flash"),
            prompt: profiled_env_or(p, "OPENROUTER_PROMPT", DEFAULT_EXTRACTION_PROMPT),
            pdf_engine: profiled_env_or(p, "OPENROUTER_PDF_ENGINE", "native"),
            pages_per_batch: profiled_env_parsed(p, "OPENROUTER_PAGES_PER_BATCH"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Ollama (local vision models) ──────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub prompt: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2-vision"),
            prompt: profiled_env_or(p, "OLLAMA_PROMPT", DEFAULT_EXTRACTION_PROMPT),
        }
    }
}

// ── vLLM (OpenAI-compatible local server) ─────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VllmConfig {
    pub url: String,
    pub model: String,
    pub prompt: String,
}

impl VllmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "VLLM_URL", "http://localhost:8000"),
            model: profiled_env_or(p, "VLLM_MODEL", "Qwen/Qwen2.5-VL-7B-Instruct"),
            prompt: profiled_env_or(p, "VLLM_PROMPT", DEFAULT_EXTRACTION_PROMPT),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai" (any OpenAI-compatible endpoint, e.g. OpenRouter)
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "ollama"),
            model: profiled_env_or(p, "EMBEDDING_MODEL", "nomic-embed-text"),
            dimensions: profiled_env_usize(p, "EMBEDDING_DIMENSIONS", 768),
            batch_size: profiled_env_usize(p, "EMBEDDING_BATCH_SIZE", 64),
            api_key: profiled_env_opt(p, "EMBEDDING_API_KEY"),
            base_url: profiled_env_opt(p, "EMBEDDING_BASE_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}
