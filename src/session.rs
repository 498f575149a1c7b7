//! Edit session state.
//!
//! A session owns the raw transcript plus everything the user layered on top
//! of the automatic analysis: keep/cut overrides, text edits and highlight
//! regions. Keep-ranges and remapped tokens are never persisted; they are
//! recomputed from this state on demand, so the session file stays small and
//! the derived state can never drift.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::analysis::{Resolution, SegmentAction, buffered_keep_ranges};
use crate::config::EditConfig;
use crate::error::EditError;
use crate::timeline::range::TimeRange;
use crate::transcript::{Segment, Token};

const SESSION_VERSION: u32 = 1;

/// A user-marked region that is force-included in the final cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightRegion {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub label: String,
}

impl HighlightRegion {
    pub fn range(&self) -> Result<TimeRange, EditError> {
        TimeRange::new(self.start, self.end)
    }
}

/// The analysis verdict for one segment, as persisted in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDecision {
    pub kept: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub retake_group: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditSession {
    pub version: u32,
    pub video_path: Option<PathBuf>,
    pub video_duration: f64,
    pub segments: Vec<Segment>,
    pub tokens: Vec<Token>,
    /// Automatic per-segment decisions, parallel to `segments`.
    pub decisions: Vec<SegmentDecision>,
    pub silences: Vec<TimeRange>,
    /// Sparse user overrides by segment index; absent means "as analyzed".
    pub keep_overrides: BTreeMap<usize, bool>,
    /// Replacement text by segment index.
    pub text_edits: BTreeMap<usize, String>,
    pub highlights: Vec<HighlightRegion>,
}

impl EditSession {
    /// Build a session from a fresh analysis run.
    pub fn from_resolution(
        segments: Vec<Segment>,
        tokens: Vec<Token>,
        resolution: &Resolution,
        video_path: Option<PathBuf>,
        video_duration: f64,
    ) -> Self {
        let decisions = resolution
            .segments
            .iter()
            .map(|entry| SegmentDecision {
                kept: entry.action == SegmentAction::Keep,
                reason: entry.reason.clone(),
                retake_group: entry.retake_group,
            })
            .collect();

        Self {
            version: SESSION_VERSION,
            video_path,
            video_duration,
            segments,
            tokens,
            decisions,
            silences: resolution.silences.clone(),
            keep_overrides: BTreeMap::new(),
            text_edits: BTreeMap::new(),
            highlights: Vec::new(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Effective verdict: user override when present, analysis otherwise.
    pub fn is_segment_kept(&self, index: usize) -> bool {
        if let Some(&keep) = self.keep_overrides.get(&index) {
            return keep;
        }
        self.decisions.get(index).map(|d| d.kept).unwrap_or(true)
    }

    /// Set a keep/cut override. An override that matches the automatic
    /// decision is dropped instead of stored, so the session only records
    /// genuine disagreements.
    pub fn set_segment_kept(&mut self, index: usize, keep: bool) -> Result<()> {
        if index >= self.segments.len() {
            bail!(
                "segment index {index} out of range (session has {} segments)",
                self.segments.len()
            );
        }
        let analyzed = self.decisions.get(index).map(|d| d.kept).unwrap_or(true);
        if keep == analyzed {
            self.keep_overrides.remove(&index);
        } else {
            self.keep_overrides.insert(index, keep);
        }
        Ok(())
    }

    /// Current text of a segment, honoring edits.
    pub fn segment_text(&self, index: usize) -> Option<&str> {
        if let Some(edited) = self.text_edits.get(&index) {
            return Some(edited.as_str());
        }
        self.segments.get(index).map(|seg| seg.text.as_str())
    }

    /// Replace a segment's text. Restoring the original text removes the
    /// edit entry.
    pub fn set_segment_text(&mut self, index: usize, text: String) -> Result<()> {
        let Some(segment) = self.segments.get(index) else {
            bail!(
                "segment index {index} out of range (session has {} segments)",
                self.segments.len()
            );
        };
        if segment.text == text {
            self.text_edits.remove(&index);
        } else {
            self.text_edits.insert(index, text);
        }
        Ok(())
    }

    pub fn add_highlight(&mut self, start: f64, end: f64, label: String) -> Result<()> {
        TimeRange::new(start, end)?;
        self.highlights.push(HighlightRegion { start, end, label });
        self.highlights
            .sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        Ok(())
    }

    pub fn remove_highlight(&mut self, index: usize) -> Result<HighlightRegion> {
        if index >= self.highlights.len() {
            bail!(
                "highlight index {index} out of range (session has {} highlights)",
                self.highlights.len()
            );
        }
        Ok(self.highlights.remove(index))
    }

    /// Final keep-ranges under the current overrides and highlights, by the
    /// same buffering and merge rules the resolver uses.
    pub fn final_keep_ranges(&self, config: &EditConfig) -> Result<Vec<TimeRange>, EditError> {
        let kept: Vec<bool> = (0..self.segments.len())
            .map(|i| self.is_segment_kept(i))
            .collect();
        let highlights = self
            .highlights
            .iter()
            .map(|h| h.range())
            .collect::<Result<Vec<_>, _>>()?;
        buffered_keep_ranges(
            &self.segments,
            &kept,
            &self.silences,
            &highlights,
            self.video_duration,
            config,
        )
    }

    /// Tokens of kept segments, on the original timeline. Segments whose
    /// text was edited get their tokens regenerated by distributing the new
    /// words evenly across the segment's span, since the original word
    /// timings no longer apply.
    pub fn final_tokens(&self) -> Vec<Token> {
        let mut result = Vec::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if !self.is_segment_kept(index) {
                continue;
            }
            if let Some(edited) = self.text_edits.get(&index) {
                result.extend(evenly_spaced_tokens(edited, segment.start, segment.end));
            } else {
                result.extend(
                    self.tokens
                        .iter()
                        .filter(|t| segment.start <= t.start && t.start < segment.end)
                        .cloned(),
                );
            }
        }
        result
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, json)
            .with_context(|| format!("Failed to write session to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session from {}", path.display()))?;
        let session: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid session file {}", path.display()))?;
        if session.version != SESSION_VERSION {
            bail!(
                "session file {} has version {}, this build expects {}",
                path.display(),
                session.version,
                SESSION_VERSION
            );
        }
        Ok(session)
    }
}

/// Distribute the words of `text` evenly across `[start, end]`.
fn evenly_spaced_tokens(text: &str, start: f64, end: f64) -> Vec<Token> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let slot = (end - start) / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| Token {
            start: start + i as f64 * slot,
            end: start + (i + 1) as f64 * slot,
            text: (*word).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DurationSelector, ResolverInput, resolve};

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            confidence: 1.0,
        }
    }

    fn tok(start: f64, end: f64, text: &str) -> Token {
        Token {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn analyzed_session() -> EditSession {
        let segments = vec![
            seg(0.0, 2.0, "so today we cover traits"),
            seg(2.5, 4.5, "so today we cover traits"),
            seg(10.0, 12.0, "first a quick recap"),
        ];
        let tokens = vec![
            tok(0.0, 0.4, "so"),
            tok(0.5, 2.0, "today"),
            tok(2.5, 2.9, "so"),
            tok(3.0, 4.5, "today"),
            tok(10.0, 10.8, "first"),
            tok(11.0, 12.0, "recap"),
        ];
        let overrides = BTreeMap::new();
        let resolution = resolve(
            ResolverInput {
                segments: &segments,
                external_silences: &[],
                highlights: &[],
                overrides: &overrides,
                video_duration: 14.0,
            },
            &EditConfig::default(),
            &DurationSelector,
        )
        .unwrap();
        EditSession::from_resolution(segments, tokens, &resolution, None, 14.0)
    }

    #[test]
    fn override_beats_analysis_and_matching_override_is_dropped() {
        let mut session = analyzed_session();
        // The first take lost the retake group.
        assert!(!session.is_segment_kept(0));

        session.set_segment_kept(0, true).unwrap();
        assert!(session.is_segment_kept(0));
        assert_eq!(session.keep_overrides.len(), 1);

        // Setting it back to the analyzed verdict clears the override.
        session.set_segment_kept(0, false).unwrap();
        assert!(session.keep_overrides.is_empty());
    }

    #[test]
    fn save_load_round_trip_preserves_overrides_and_highlights() {
        let mut session = analyzed_session();
        session.set_segment_kept(2, false).unwrap();
        session.add_highlight(6.0, 7.0, "b-roll".to_string()).unwrap();
        session
            .set_segment_text(1, "so today we cover trait objects".to_string())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        session.save(&path).unwrap();

        let loaded = EditSession::load(&path).unwrap();
        assert!(!loaded.is_segment_kept(2));
        assert_eq!(loaded.highlights.len(), 1);
        assert_eq!(loaded.highlights[0].label, "b-roll");
        assert_eq!(
            loaded.segment_text(1),
            Some("so today we cover trait objects")
        );
        assert_eq!(loaded.segments.len(), session.segments.len());
    }

    #[test]
    fn text_edit_regenerates_tokens_evenly() {
        let mut session = analyzed_session();
        session
            .set_segment_text(2, "one two three four".to_string())
            .unwrap();

        let tokens = session.final_tokens();
        let regenerated: Vec<&Token> =
            tokens.iter().filter(|t| t.start >= 10.0).collect();
        assert_eq!(regenerated.len(), 4);
        assert!((regenerated[0].start - 10.0).abs() < 1e-9);
        assert!((regenerated[0].end - 10.5).abs() < 1e-9);
        assert!((regenerated[3].start - 11.5).abs() < 1e-9);
        assert!((regenerated[3].end - 12.0).abs() < 1e-9);
    }

    #[test]
    fn final_tokens_skip_cut_segments() {
        let session = analyzed_session();
        let tokens = session.final_tokens();
        // Tokens of the losing take (segment 0) are gone.
        assert!(tokens.iter().all(|t| t.start >= 2.5));
    }

    #[test]
    fn final_keep_ranges_react_to_overrides() {
        let mut session = analyzed_session();
        let before = session.final_keep_ranges(&EditConfig::default()).unwrap();

        session.set_segment_kept(2, false).unwrap();
        let after = session.final_keep_ranges(&EditConfig::default()).unwrap();
        assert!(after.len() < before.len() || after.last().unwrap().end < 10.0);
    }

    #[test]
    fn restoring_original_text_removes_the_edit() {
        let mut session = analyzed_session();
        session
            .set_segment_text(2, "changed".to_string())
            .unwrap();
        assert_eq!(session.text_edits.len(), 1);
        session
            .set_segment_text(2, "first a quick recap".to_string())
            .unwrap();
        assert!(session.text_edits.is_empty());
    }
}
