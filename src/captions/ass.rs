//! ASS rendering with karaoke timing for streaming word-by-word captions.
//!
//! Each chunk becomes one Dialogue line whose words carry `\kf` tags, so the
//! renderer reveals the chunk progressively as the words are spoken.

use std::fmt::Write;

use super::CaptionChunk;

/// Linger time after a chunk's last word, so it does not vanish abruptly.
const CHUNK_TAIL_SECONDS: f64 = 0.1;

const ASS_HEADER: &str = "[Script Info]\n\
Title: Streaming Captions\n\
ScriptType: v4.00+\n\
PlayResX: 1920\n\
PlayResY: 1080\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Default,Arial,48,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,3,3,1,2,20,20,60,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

/// `H:MM:SS.CC` (centisecond precision, single-digit hours).
fn format_timestamp(seconds: f64) -> String {
    let clamped = seconds.max(0.0);
    let hours = (clamped / 3600.0) as u64;
    let minutes = ((clamped % 3600.0) / 60.0) as u64;
    let secs = (clamped % 60.0) as u64;
    let centis = ((clamped % 1.0) * 100.0) as u64;
    format!("{hours}:{minutes:02}:{secs:02}.{centis:02}")
}

/// Render chunks as a complete ASS document.
pub fn render_ass(chunks: &[CaptionChunk]) -> String {
    let mut out = String::from(ASS_HEADER);

    for chunk in chunks {
        if chunk.tokens.is_empty() {
            continue;
        }
        let chunk_end = chunk.end() + CHUNK_TAIL_SECONDS;

        // Each word's fill runs until the next word starts, the last word
        // until it ends.
        let mut karaoke = String::new();
        for (i, token) in chunk.tokens.iter().enumerate() {
            let duration = match chunk.tokens.get(i + 1) {
                Some(next) => next.start - token.start,
                None => token.end - token.start,
            };
            let centis = (duration * 100.0).max(0.0) as u64;
            let _ = write!(karaoke, "{{\\kf{centis}}}{} ", token.text.trim());
        }

        let _ = write!(
            out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_timestamp(chunk.start()),
            format_timestamp(chunk_end),
            karaoke.trim_end()
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Token;

    fn tok(start: f64, end: f64, text: &str) -> Token {
        Token {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn timestamps_use_centiseconds() {
        assert_eq!(format_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_timestamp(3723.45), "1:02:03.45");
    }

    #[test]
    fn karaoke_durations_span_word_to_word() {
        let chunks = vec![CaptionChunk {
            tokens: vec![tok(1.0, 1.4, "hello"), tok(1.5, 2.0, "world")],
        }];
        let ass = render_ass(&chunks);
        // First word fills until the second starts (0.5s), second until it
        // ends (0.5s).
        assert!(ass.contains("{\\kf50}hello {\\kf50}world"));
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:02.10,Default"));
    }

    #[test]
    fn header_declares_the_default_style() {
        let ass = render_ass(&[]);
        assert!(ass.starts_with("[Script Info]"));
        assert!(ass.contains("Style: Default,Arial,48"));
        assert!(ass.contains("[Events]"));
    }
}
