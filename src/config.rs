//! Editing configuration.
//!
//! Loaded from `<config dir>/recut/config.toml` when present; every value
//! has a serde default so a missing or partial file always yields a usable
//! config. CLI flags override file values at the command layer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Minimum silence duration (seconds) that gets cut.
    pub silence_threshold: f64,
    /// Normalized text similarity above which segments count as retakes.
    pub retake_similarity: f64,
    /// Inter-segment gap (seconds) that splits recording blocks.
    pub block_boundary_gap: f64,
    /// Minimum duration for a speech segment to be considered at all.
    pub min_segment_duration: f64,
    /// Padding kept before a segment's first word.
    pub segment_start_buffer: f64,
    /// Padding kept after a segment's last word.
    pub segment_end_buffer: f64,
    /// Visual gap inserted between spliced keep-ranges in the output.
    pub segment_gap: f64,
    /// Cosmetic forward shift of displayed captions.
    pub caption_delay: f64,
    /// Maximum words per caption chunk.
    pub max_caption_words: usize,
    /// Remapped-token gap (seconds) that forces a new caption chunk.
    pub caption_chunk_gap: f64,
    /// Words whose density flags a segment as filler-heavy.
    pub filler_words: Vec<String>,
    /// Keep scratch files after export, for debugging.
    pub keep_temp: bool,
    /// Chat-completions model used for take selection.
    pub llm_model: String,
    /// Chat-completions endpoint; the API key comes from OPENAI_API_KEY.
    pub llm_endpoint: String,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 1.5,
            retake_similarity: 0.8,
            block_boundary_gap: 3.0,
            min_segment_duration: 0.5,
            segment_start_buffer: 0.1,
            segment_end_buffer: 0.15,
            segment_gap: 0.2,
            caption_delay: 0.1,
            max_caption_words: 20,
            caption_chunk_gap: 1.5,
            filler_words: vec![
                "öö".to_string(),
                "ööö".to_string(),
                "hát".to_string(),
                "izé".to_string(),
                "szóval".to_string(),
                "tehát".to_string(),
                "hmm".to_string(),
            ],
            keep_temp: false,
            llm_model: "gpt-4o-mini".to_string(),
            llm_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

impl EditConfig {
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Unable to determine config directory")?
            .join("recut");
        Ok(dir.join("config.toml"))
    }

    /// Load the config file when it exists, defaults otherwise.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }
}
