//! Incremental decoding of streamed chat responses: OpenAI-style server-sent
//! events and Ollama's newline-delimited JSON.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::trace;

use crate::provider::{DeltaSink, LlmError};

/// Splits a byte stream into complete lines, carrying partial lines across chunks.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Append `chunk` and return every line completed by it.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Whatever is left once the stream ends.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Result of decoding one streamed line.
#[derive(Debug, PartialEq)]
pub(crate) enum Decoded {
    Delta(String),
    Done,
    Skip,
}

/// Decode one SSE line of an OpenAI-compatible chat stream.
pub(crate) fn decode_sse_line(line: &str) -> Result<Decoded, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        // Comments (": keep-alive"), event names and blank separators.
        return Ok(Decoded::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Decoded::Done);
    }
    let parsed: Value = serde_json::from_str(data)
        .map_err(|e| LlmError::ParseError(format!("invalid SSE payload: {e}")))?;
    if let Some(message) = parsed["error"]["message"].as_str() {
        return Err(LlmError::StreamError(message.to_string()));
    }
    match parsed["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(Decoded::Delta(text.to_string())),
        _ => {
            trace!("SSE chunk without content delta");
            Ok(Decoded::Skip)
        }
    }
}

/// Decode one NDJSON line of an Ollama `/api/chat` stream.
pub(crate) fn decode_ndjson_line(line: &str) -> Result<Decoded, LlmError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Decoded::Skip);
    }
    let parsed: Value = serde_json::from_str(line)
        .map_err(|e| LlmError::ParseError(format!("invalid NDJSON line: {e}")))?;
    if let Some(message) = parsed["error"].as_str() {
        return Err(LlmError::StreamError(message.to_string()));
    }
    let text = parsed["message"]["content"].as_str().unwrap_or("");
    if parsed["done"].as_bool() == Some(true) {
        return Ok(if text.is_empty() {
            Decoded::Done
        } else {
            Decoded::Delta(text.to_string())
        });
    }
    if text.is_empty() {
        Ok(Decoded::Skip)
    } else {
        Ok(Decoded::Delta(text.to_string()))
    }
}

/// Drain `bytes`, decoding each line with `decode`, forwarding deltas to
/// `on_delta` and returning the accumulated text.
pub(crate) async fn collect_stream<S>(
    bytes: S,
    decode: fn(&str) -> Result<Decoded, LlmError>,
    on_delta: DeltaSink<'_>,
) -> Result<String, LlmError>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    let mut bytes = std::pin::pin!(bytes);
    let mut lines = LineBuffer::default();
    let mut full = String::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| LlmError::StreamError(e.to_string()))?;
        for line in lines.push(&chunk) {
            match decode(&line)? {
                Decoded::Delta(text) => {
                    on_delta(&text);
                    full.push_str(&text);
                }
                Decoded::Done => return Ok(full),
                Decoded::Skip => {}
            }
        }
    }
    if let Some(line) = lines.finish() {
        if let Decoded::Delta(text) = decode(&line)? {
            on_delta(&text);
            full.push_str(&text);
        }
    }
    Ok(full)
}
