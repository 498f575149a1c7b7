//! SRT rendering of caption chunks.

use std::fmt::Write;

use super::CaptionChunk;

/// `HH:MM:SS,mmm`
fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Render chunks as an SRT document, 1-indexed, blank line between cues.
pub fn render_srt(chunks: &[CaptionChunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.tokens.is_empty() {
            continue;
        }
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(chunk.start()),
            format_timestamp(chunk.end()),
            chunk.text()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Token;

    fn chunk(words: &[(f64, f64, &str)]) -> CaptionChunk {
        CaptionChunk {
            tokens: words
                .iter()
                .map(|(start, end, text)| Token {
                    start: *start,
                    end: *end,
                    text: (*text).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn timestamps_use_comma_separated_millis() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(3661.25), "01:01:01,250");
        assert_eq!(format_timestamp(59.9996), "00:01:00,000");
    }

    #[test]
    fn renders_indexed_cues() {
        let chunks = vec![
            chunk(&[(0.0, 0.5, "hello"), (0.6, 1.2, "world")]),
            chunk(&[(4.0, 5.0, "again")]),
        ];
        let srt = render_srt(&chunks);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,200\nhello world\n\n\
             2\n00:00:04,000 --> 00:00:05,000\nagain\n\n"
        );
    }
}
