pub mod cancel;
pub mod provider;
pub mod providers;
mod stream;

pub use cancel::run_cancellable;
pub use provider::{
    AudioUpload, ChatBackend, ChatRequest, ContentPart, DeltaSink, LlmError, Message, Role,
    Transcriber,
};
pub use providers::{OllamaProvider, OpenAiCompatProvider};
pub use tokio_util::sync::CancellationToken;
