//! User-editable chunking parameters.

use docslice_core::config::ChunkingConfig;
use docslice_core::ValidationError;
use serde::{Deserialize, Serialize};

use super::types::ChunkingStrategy;

pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const MIN_CHUNK_SIZE: usize = 128;

/// Coarsest to finest. The empty string splits between any two characters.
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", ". ", "! ", "? ", " ", ""];

const SEPARATOR_LABELS: [(&str, &str); 7] = [
    ("\n\n", "Paragraph"),
    ("\n", "Line break"),
    (". ", "Sentence (.)"),
    ("! ", "Exclamation (!)"),
    ("? ", "Question (?)"),
    (" ", "Space"),
    ("", "Character"),
];

/// Splitter settings. Every setter keeps `chunk_overlap < chunk_size` and
/// `chunk_size >= MIN_CHUNK_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParameters {
    strategy: ChunkingStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for ChunkingParameters {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Recursive,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: default_separators(),
        }
    }
}

fn default_separators() -> Vec<String> {
    DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect()
}

impl ChunkingParameters {
    /// Defaults with size and overlap taken from config, clamped like user edits.
    pub fn from_config(config: &ChunkingConfig) -> Self {
        let mut params = Self::default();
        params.set_chunk_size(config.chunk_size);
        params.set_chunk_overlap(config.chunk_overlap);
        params
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    pub fn set_strategy(&mut self, strategy: ChunkingStrategy) {
        self.strategy = strategy;
    }

    /// Sizes below the minimum are raised to it. If the overlap no longer
    /// fits, it drops to half the new size.
    pub fn set_chunk_size(&mut self, size: usize) {
        let size = size.max(MIN_CHUNK_SIZE);
        self.chunk_size = size;
        if self.chunk_overlap >= size {
            self.chunk_overlap = size / 2;
        }
    }

    /// Clamped to `chunk_size - 1`.
    pub fn set_chunk_overlap(&mut self, overlap: usize) {
        self.chunk_overlap = overlap.min(self.chunk_size - 1);
    }

    /// Remove `separator` if active, otherwise append it.
    pub fn toggle_separator(&mut self, separator: &str) {
        if !self.remove_separator(separator) {
            self.separators.push(separator.to_string());
        }
    }

    /// Append a user-typed separator. `\n` and `\t` escapes are unescaped.
    pub fn add_custom_separator(&mut self, raw: &str) -> Result<(), ValidationError> {
        let separator = raw.replace("\\n", "\n").replace("\\t", "\t");
        if separator.is_empty() {
            return Err(ValidationError::MissingParameter("separator"));
        }
        if self.separators.contains(&separator) {
            return Err(ValidationError::DuplicateSeparator(separator));
        }
        self.separators.push(separator);
        Ok(())
    }

    /// Returns whether the separator was present.
    pub fn remove_separator(&mut self, separator: &str) -> bool {
        let before = self.separators.len();
        self.separators.retain(|s| s != separator);
        self.separators.len() != before
    }

    /// Replace the separator list wholesale. Duplicates are rejected.
    pub fn set_separators(&mut self, separators: Vec<String>) -> Result<(), ValidationError> {
        check_unique(&separators)?;
        self.separators = separators;
        Ok(())
    }

    pub fn reset_defaults(&mut self) {
        *self = Self::default();
    }

    pub fn is_modified(&self) -> bool {
        *self != Self::default()
    }

    /// Separators in the active list that are not defaults.
    pub fn custom_separators(&self) -> impl Iterator<Item = &str> {
        self.separators
            .iter()
            .map(String::as_str)
            .filter(|s| !DEFAULT_SEPARATORS.contains(s))
    }

    /// Human-readable name; unknown separators are shown escaped.
    pub fn separator_label(separator: &str) -> String {
        SEPARATOR_LABELS
            .iter()
            .find(|(sep, _)| *sep == separator)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| separator.escape_debug().to_string())
    }

    /// Re-check the invariants, e.g. after deserialising.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ValidationError::ChunkSizeTooSmall {
                min: MIN_CHUNK_SIZE,
                actual: self.chunk_size,
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ValidationError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        check_unique(&self.separators)
    }
}

fn check_unique(separators: &[String]) -> Result<(), ValidationError> {
    for (i, sep) in separators.iter().enumerate() {
        if separators[..i].contains(sep) {
            return Err(ValidationError::DuplicateSeparator(sep.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = ChunkingParameters::default();
        assert_eq!(p.chunk_size(), 1024);
        assert_eq!(p.chunk_overlap(), 200);
        assert_eq!(p.separators().len(), 7);
        assert_eq!(p.separators().last().map(String::as_str), Some(""));
        assert!(!p.is_modified());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn shrinking_size_halves_overlap() {
        let mut p = ChunkingParameters::default();
        p.set_chunk_overlap(900);
        p.set_chunk_size(512);
        assert_eq!(p.chunk_size(), 512);
        assert_eq!(p.chunk_overlap(), 256);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn size_has_floor() {
        let mut p = ChunkingParameters::default();
        p.set_chunk_size(10);
        assert_eq!(p.chunk_size(), MIN_CHUNK_SIZE);
        assert_eq!(p.chunk_overlap(), 64);
    }

    #[test]
    fn overlap_clamped_below_size() {
        let mut p = ChunkingParameters::default();
        p.set_chunk_overlap(5000);
        assert_eq!(p.chunk_overlap(), 1023);
    }

    #[test]
    fn toggle_removes_then_appends() {
        let mut p = ChunkingParameters::default();
        p.toggle_separator(". ");
        assert!(!p.separators().iter().any(|s| s == ". "));
        assert!(p.is_modified());
        p.toggle_separator(". ");
        assert_eq!(p.separators().last().map(String::as_str), Some(". "));
        // Order changed, so still modified.
        assert!(p.is_modified());
    }

    #[test]
    fn custom_separator_unescapes() {
        let mut p = ChunkingParameters::default();
        p.add_custom_separator("\\n---\\n").unwrap();
        assert!(p.separators().iter().any(|s| s == "\n---\n"));
        assert_eq!(p.custom_separators().collect::<Vec<_>>(), vec!["\n---\n"]);
    }

    #[test]
    fn custom_separator_rejects_empty_and_duplicates() {
        let mut p = ChunkingParameters::default();
        assert_eq!(
            p.add_custom_separator(""),
            Err(ValidationError::MissingParameter("separator"))
        );
        assert!(matches!(
            p.add_custom_separator("\\n"),
            Err(ValidationError::DuplicateSeparator(s)) if s == "\n"
        ));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut p = ChunkingParameters::default();
        p.set_chunk_size(300);
        p.set_strategy(ChunkingStrategy::ParentChild);
        p.remove_separator(" ");
        p.reset_defaults();
        assert_eq!(p, ChunkingParameters::default());
    }

    #[test]
    fn labels() {
        assert_eq!(ChunkingParameters::separator_label("\n\n"), "Paragraph");
        assert_eq!(ChunkingParameters::separator_label(""), "Character");
        assert_eq!(ChunkingParameters::separator_label("\t|"), "\\t|");
    }

    #[test]
    fn validate_catches_bad_deserialised_values() {
        let p: ChunkingParameters = serde_json::from_str(
            r#"{"strategy":"recursive","chunk_size":100,"chunk_overlap":10,"separators":[" "]}"#,
        )
        .unwrap();
        assert!(matches!(p.validate(), Err(ValidationError::ChunkSizeTooSmall { .. })));

        let p: ChunkingParameters = serde_json::from_str(
            r#"{"strategy":"recursive","chunk_size":200,"chunk_overlap":200,"separators":[" "]}"#,
        )
        .unwrap();
        assert!(matches!(p.validate(), Err(ValidationError::OverlapTooLarge { .. })));

        let p: ChunkingParameters = serde_json::from_str(
            r#"{"strategy":"parent-child","chunk_size":200,"chunk_overlap":0,"separators":[" "," "]}"#,
        )
        .unwrap();
        assert!(matches!(p.validate(), Err(ValidationError::DuplicateSeparator(_))));
    }

    #[test]
    fn from_config_clamps() {
        let p = ChunkingParameters::from_config(&ChunkingConfig {
            chunk_size: 64,
            chunk_overlap: 500,
        });
        assert_eq!(p.chunk_size(), 128);
        assert_eq!(p.chunk_overlap(), 127);
    }
}
