//! Packaging binary files for multimodal chat requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// `data:<mime>;base64,<payload>`
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", encode_base64(bytes))
}

/// Audio format tag for `input_audio` parts, derived from the file extension.
pub fn audio_format(extension: &str) -> String {
    match extension {
        "mpeg" | "mpga" => "mp3".to_string(),
        "" => "wav".to_string(),
        other => other.to_string(),
    }
}
