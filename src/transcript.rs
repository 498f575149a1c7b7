//! Transcript types and parsing.
//!
//! Segments and tokens arrive from an external transcription service as
//! WhisperX-style JSON (segments with optional word-level alignment). The
//! resolver and remapper treat them as read-only input.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// A transcribed utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A single word with timing. Remapping produces a new token with adjusted
/// times and identical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Token {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse a WhisperX JSON transcript into segments plus a flat token list.
///
/// Segments without word alignment still yield a single fallback token
/// covering the whole utterance, so downstream caption chunking never
/// silently loses speech.
pub fn parse_whisper_json(json_str: &str) -> Result<(Vec<Segment>, Vec<Token>)> {
    let output: WhisperOutput =
        serde_json::from_str(json_str).context("Failed to parse WhisperX JSON transcript")?;

    let mut segments = Vec::new();
    let mut tokens = Vec::new();

    for seg in output.segments {
        let text = seg.text.trim().to_string();
        if text.is_empty() && seg.words.is_empty() {
            continue;
        }

        if seg.words.is_empty() {
            tokens.push(Token {
                start: seg.start,
                end: seg.end,
                text: text.clone(),
            });
        } else {
            for word in &seg.words {
                tokens.push(Token {
                    start: word.start,
                    end: word.end,
                    text: word.word.clone(),
                });
            }
        }

        segments.push(Segment {
            start: seg.start,
            end: seg.end,
            text,
            confidence: 1.0,
        });
    }

    validate_segments(&mut segments)?;
    sort_tokens(&mut tokens);

    Ok((segments, tokens))
}

/// Defensively sort segments and reject input the resolver cannot order
/// deterministically (duplicate starts) or that violates `start < end`.
pub fn validate_segments(segments: &mut [Segment]) -> Result<(), EditError> {
    for seg in segments.iter() {
        if !seg.start.is_finite() || !seg.end.is_finite() || seg.end <= seg.start {
            return Err(EditError::InvalidRange {
                start: seg.start,
                end: seg.end,
            });
        }
    }

    segments.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for pair in segments.windows(2) {
        if pair[0].start == pair[1].start {
            return Err(EditError::UnsortedInput(format!(
                "two segments share start time {:.3}s",
                pair[0].start
            )));
        }
    }

    Ok(())
}

/// Stable deterministic token ordering: start, then end, then text.
pub fn sort_tokens(tokens: &mut [Token]) {
    tokens.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.end
                    .partial_cmp(&b.end)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| a.text.cmp(&b.text))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_word_aligned_segments() {
        let json = r#"{
            "segments": [
                {"start": 0.0, "end": 1.2, "text": " hello world",
                 "words": [
                    {"word": "hello", "start": 0.0, "end": 0.5},
                    {"word": "world", "start": 0.6, "end": 1.2}
                 ]}
            ]
        }"#;

        let (segments, tokens) = parse_whisper_json(json).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "world");
    }

    #[test]
    fn falls_back_to_segment_span_without_words() {
        let json = r#"{"segments": [{"start": 2.0, "end": 4.0, "text": "no alignment"}]}"#;
        let (segments, tokens) = parse_whisper_json(json).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].start, 2.0);
        assert_eq!(tokens[0].end, 4.0);
    }

    #[test]
    fn validation_sorts_and_rejects_duplicate_starts() {
        let mut out_of_order = vec![
            Segment {
                start: 5.0,
                end: 6.0,
                text: "b".into(),
                confidence: 1.0,
            },
            Segment {
                start: 1.0,
                end: 2.0,
                text: "a".into(),
                confidence: 1.0,
            },
        ];
        validate_segments(&mut out_of_order).unwrap();
        assert_eq!(out_of_order[0].text, "a");

        let mut duplicated = vec![
            Segment {
                start: 1.0,
                end: 2.0,
                text: "a".into(),
                confidence: 1.0,
            },
            Segment {
                start: 1.0,
                end: 3.0,
                text: "b".into(),
                confidence: 1.0,
            },
        ];
        assert!(matches!(
            validate_segments(&mut duplicated),
            Err(EditError::UnsortedInput(_))
        ));
    }

    #[test]
    fn validation_rejects_inverted_segment() {
        let mut segments = vec![Segment {
            start: 3.0,
            end: 1.0,
            text: "bad".into(),
            confidence: 1.0,
        }];
        assert!(matches!(
            validate_segments(&mut segments),
            Err(EditError::InvalidRange { .. })
        ));
    }
}
