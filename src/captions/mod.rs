//! Caption chunking and rendering.
//!
//! Captions are derived from the remapped token stream: tokens are grouped
//! into display chunks, optionally shifted by the cosmetic caption delay,
//! then rendered as SRT or as ASS karaoke. All of it is recomputed from the
//! session every time, nothing here is persisted.

pub mod ass;
pub mod srt;

use crate::transcript::Token;

/// One on-screen caption: a run of consecutive tokens.
#[derive(Debug, Clone)]
pub struct CaptionChunk {
    pub tokens: Vec<Token>,
}

impl CaptionChunk {
    pub fn start(&self) -> f64 {
        self.tokens.first().map(|t| t.start).unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.tokens.last().map(|t| t.end).unwrap_or(0.0)
    }

    /// Display text: token texts joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Group tokens into display chunks. A chunk ends when it reaches
/// `max_words` or when the gap to the next token exceeds `gap_threshold`.
pub fn chunk_tokens(tokens: &[Token], max_words: usize, gap_threshold: f64) -> Vec<CaptionChunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<Token> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        current.push(token.clone());

        let full = current.len() >= max_words.max(1);
        let gap_follows = tokens
            .get(i + 1)
            .map(|next| next.start - token.end > gap_threshold)
            .unwrap_or(false);
        let last = i == tokens.len() - 1;

        if full || gap_follows || last {
            chunks.push(CaptionChunk {
                tokens: std::mem::take(&mut current),
            });
        }
    }

    chunks
}

/// Shift token times forward by the cosmetic caption delay. Structural
/// remapping has already happened; this only affects display timing.
pub fn shift_tokens(tokens: &[Token], delay: f64) -> Vec<Token> {
    tokens
        .iter()
        .map(|t| Token {
            start: t.start + delay,
            end: t.end + delay,
            text: t.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(start: f64, end: f64, text: &str) -> Token {
        Token {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn max_words_bounds_chunk_size() {
        let tokens: Vec<Token> = (0..5)
            .map(|i| tok(i as f64, i as f64 + 0.5, "word"))
            .collect();
        let chunks = chunk_tokens(&tokens, 2, 10.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].tokens.len(), 2);
        assert_eq!(chunks[2].tokens.len(), 1);
    }

    #[test]
    fn a_long_gap_starts_a_new_chunk() {
        let tokens = vec![
            tok(0.0, 0.5, "before"),
            tok(0.6, 1.0, "gap"),
            tok(5.0, 5.5, "after"),
        ];
        let chunks = chunk_tokens(&tokens, 20, 1.5);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text(), "before gap");
        assert_eq!(chunks[1].text(), "after");
    }

    #[test]
    fn delay_shifts_times_without_touching_text() {
        let shifted = shift_tokens(&[tok(1.0, 1.4, "hi")], 0.1);
        assert!((shifted[0].start - 1.1).abs() < 1e-9);
        assert!((shifted[0].end - 1.5).abs() < 1e-9);
        assert_eq!(shifted[0].text, "hi");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_tokens(&[], 20, 1.5).is_empty());
    }
}
