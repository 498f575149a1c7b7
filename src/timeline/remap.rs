//! Timestamp remapping from the original timeline onto the cut timeline.
//!
//! Keep-ranges are spliced back to back with a fixed visual gap between
//! consecutive ranges. Every original-timeline event whose start survives
//! the cut is translated exactly once; events starting inside removed
//! material are dropped. The pass shares a single forward-only cursor
//! between time-sorted events and time-sorted ranges, which is what keeps
//! it O(events + ranges) and makes duplicate emission impossible.

use crate::error::EditError;
use crate::timeline::range::TimeRange;
use crate::transcript::{Token, sort_tokens};

/// Result of a remap pass. `dropped` counts events that fell entirely into
/// cut material; `clipped` counts events whose tail crossed a keep-range
/// boundary and was trimmed to it.
#[derive(Debug, Clone)]
pub struct RemapOutcome {
    pub tokens: Vec<Token>,
    pub dropped: usize,
    pub clipped: usize,
}

/// Cumulative output offset of each keep-range on the cut timeline.
///
/// `offset[i]` = total duration of all prior ranges plus one `segment_gap`
/// per boundary between them. No gap before the first range or after the
/// last one.
pub fn cut_offsets(ranges: &[TimeRange], segment_gap: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(ranges.len());
    let mut cumulative = 0.0;
    for (i, range) in ranges.iter().enumerate() {
        offsets.push(cumulative);
        cumulative += range.duration();
        if i < ranges.len() - 1 {
            cumulative += segment_gap;
        }
    }
    offsets
}

/// Translate tokens onto the cut timeline.
///
/// Boundary semantics are half-open: a token starting exactly at
/// `range.start` belongs to that range, one starting exactly at `range.end`
/// does not. Durations are preserved unless the token straddles the end of
/// its keep-range, in which case it is clipped to the range's contribution.
pub fn remap_tokens(
    tokens: &[Token],
    keep_ranges: &[TimeRange],
    segment_gap: f64,
) -> Result<RemapOutcome, EditError> {
    if tokens.is_empty() || keep_ranges.is_empty() {
        return Ok(RemapOutcome {
            tokens: Vec::new(),
            dropped: tokens.len(),
            clipped: 0,
        });
    }

    let ranges = validated_ranges(keep_ranges)?;
    let offsets = cut_offsets(&ranges, segment_gap);

    let mut sorted = tokens.to_vec();
    sort_tokens(&mut sorted);

    let mut remapped = Vec::with_capacity(sorted.len());
    let mut dropped = 0usize;
    let mut clipped = 0usize;
    let mut cursor = 0usize;

    for token in sorted {
        // Ranges ending at or before this token's start can never contain
        // this token or any later one.
        while cursor < ranges.len() && ranges[cursor].end <= token.start {
            cursor += 1;
        }

        if cursor >= ranges.len() || !ranges[cursor].contains(token.start) {
            dropped += 1;
            continue;
        }

        let range = ranges[cursor];
        let new_start = offsets[cursor] + (token.start - range.start);
        let mut new_end = new_start + token.duration();

        let contribution_end = offsets[cursor] + range.duration();
        if new_end > contribution_end {
            new_end = contribution_end;
            clipped += 1;
        }

        remapped.push(Token {
            start: new_start,
            end: new_end,
            text: token.text,
        });
    }

    Ok(RemapOutcome {
        tokens: remapped,
        dropped,
        clipped,
    })
}

/// Re-validate keep-ranges before trusting them: sorted by construction in
/// the resolver, but the remapper checks the invariant rather than assuming
/// the caller held up its end.
fn validated_ranges(keep_ranges: &[TimeRange]) -> Result<Vec<TimeRange>, EditError> {
    let mut ranges = keep_ranges.to_vec();
    ranges.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for pair in ranges.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(EditError::UnsortedInput(format!(
                "keep ranges overlap: [{:.3}, {:.3}) and [{:.3}, {:.3})",
                pair[0].start, pair[0].end, pair[1].start, pair[1].end
            )));
        }
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    fn token(start: f64, end: f64, text: &str) -> Token {
        Token {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn gap_accounting_matches_expected_offsets() {
        let ranges = vec![range(0.0, 10.0), range(20.0, 25.0), range(40.0, 41.0)];
        let offsets = cut_offsets(&ranges, 0.2);
        assert!(close(offsets[0], 0.0));
        assert!(close(offsets[1], 10.2));
        assert!(close(offsets[2], 15.4));

        let outcome = remap_tokens(&[token(22.0, 22.5, "word")], &ranges, 0.2).unwrap();
        assert_eq!(outcome.tokens.len(), 1);
        assert!(close(outcome.tokens[0].start, 12.2));
        assert!(close(outcome.tokens[0].end, 12.7));
    }

    #[test]
    fn each_token_is_emitted_at_most_once() {
        let ranges = vec![range(0.0, 5.0), range(10.0, 15.0)];
        let tokens: Vec<Token> = (0..20)
            .map(|i| token(i as f64 * 0.7, i as f64 * 0.7 + 0.3, "w"))
            .collect();

        let outcome = remap_tokens(&tokens, &ranges, 0.2).unwrap();
        assert!(outcome.tokens.len() + outcome.dropped == tokens.len());
        assert!(outcome.tokens.len() <= tokens.len());
    }

    #[test]
    fn fully_kept_tokens_preserve_duration_and_order() {
        let ranges = vec![range(0.0, 5.0), range(10.0, 15.0)];
        let tokens = vec![
            token(1.0, 1.5, "a"),
            token(2.0, 2.4, "b"),
            token(11.0, 11.8, "c"),
        ];

        let outcome = remap_tokens(&tokens, &ranges, 0.2).unwrap();
        assert_eq!(outcome.tokens.len(), 3);
        assert_eq!(outcome.dropped, 0);
        for (original, mapped) in tokens.iter().zip(&outcome.tokens) {
            assert!(close(mapped.duration(), original.duration()));
        }
        for pair in outcome.tokens.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
        // Second range starts at offset 5.2 on the cut timeline.
        assert!(close(outcome.tokens[2].start, 5.2 + 1.0));
    }

    #[test]
    fn token_in_cut_gap_is_dropped_not_stitched() {
        let ranges = vec![range(0.0, 5.0), range(10.0, 15.0)];
        // Starts after the first range ends, ends inside the second one.
        let outcome = remap_tokens(&[token(6.0, 11.0, "gone")], &ranges, 0.2).unwrap();
        assert!(outcome.tokens.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn boundary_token_belongs_to_the_range_starting_there() {
        let ranges = vec![range(0.0, 5.0), range(5.0, 8.0)];
        let outcome = remap_tokens(&[token(5.0, 5.5, "edge")], &ranges, 0.2).unwrap();
        assert_eq!(outcome.tokens.len(), 1);
        // Second range's offset is 5.0 + gap 0.2.
        assert!(close(outcome.tokens[0].start, 5.2));
    }

    #[test]
    fn straddling_token_is_clipped_at_the_range_end() {
        let ranges = vec![range(0.0, 5.0), range(10.0, 15.0)];
        let outcome = remap_tokens(&[token(4.5, 6.0, "split")], &ranges, 0.2).unwrap();
        assert_eq!(outcome.tokens.len(), 1);
        assert_eq!(outcome.clipped, 1);
        assert!(close(outcome.tokens[0].start, 4.5));
        assert!(close(outcome.tokens[0].end, 5.0));
    }

    #[test]
    fn overlapping_keep_ranges_are_rejected() {
        let ranges = vec![range(0.0, 5.0), range(4.0, 8.0)];
        assert!(matches!(
            remap_tokens(&[token(1.0, 1.5, "w")], &ranges, 0.2),
            Err(EditError::UnsortedInput(_))
        ));
    }

    #[test]
    fn unsorted_tokens_are_handled_by_defensive_sort() {
        let ranges = vec![range(0.0, 10.0)];
        let tokens = vec![token(5.0, 5.5, "b"), token(1.0, 1.5, "a")];
        let outcome = remap_tokens(&tokens, &ranges, 0.2).unwrap();
        assert!(close(outcome.tokens[0].start, 1.0));
        assert!(close(outcome.tokens[1].start, 5.0));
    }
}
