//! Silence handling.
//!
//! Silence intervals come from an external audio analysis pass and are only
//! ever removal candidates between or around segments. An interval that
//! swallows a whole transcribed segment is a false positive and is vetted
//! out before the resolver trusts it.

use crate::timeline::range::{TimeRange, merge_overlapping};
use crate::transcript::Segment;

/// Drop external silence intervals that fully contain a segment, then merge
/// the survivors into an ordered disjoint list.
pub fn vet_silences(silences: &[TimeRange], segments: &[Segment]) -> Vec<TimeRange> {
    let vetted: Vec<TimeRange> = silences
        .iter()
        .filter(|silence| {
            !segments
                .iter()
                .any(|seg| silence.start <= seg.start && seg.end <= silence.end)
        })
        .copied()
        .collect();

    merge_overlapping(&vetted, 0.0)
}

/// Derive silence candidates from the transcript itself: the head gap before
/// the first segment, inter-segment gaps, and the tail gap after the last
/// segment, whenever they exceed the threshold.
pub fn silence_candidates(
    segments: &[Segment],
    video_duration: f64,
    threshold: f64,
) -> Vec<TimeRange> {
    let mut silences = Vec::new();

    let Some(first) = segments.first() else {
        return silences;
    };

    if first.start > threshold {
        silences.push(TimeRange {
            start: 0.0,
            end: first.start,
        });
    }

    for pair in segments.windows(2) {
        let gap_start = pair[0].end;
        let gap_end = pair[1].start;
        if gap_end - gap_start > threshold {
            silences.push(TimeRange {
                start: gap_start,
                end: gap_end,
            });
        }
    }

    if let Some(last) = segments.last()
        && video_duration - last.end > threshold
    {
        silences.push(TimeRange {
            start: last.end,
            end: video_duration,
        });
    }

    silences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64) -> Segment {
        Segment {
            start,
            end,
            text: "words".to_string(),
            confidence: 1.0,
        }
    }

    fn range(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    #[test]
    fn finds_head_between_and_tail_gaps() {
        let segments = vec![seg(2.0, 4.0), seg(8.0, 10.0)];
        let silences = silence_candidates(&segments, 15.0, 1.5);
        assert_eq!(silences.len(), 3);
        assert_eq!(silences[0], range(0.0, 2.0));
        assert_eq!(silences[1], range(4.0, 8.0));
        assert_eq!(silences[2], range(10.0, 15.0));
    }

    #[test]
    fn short_gaps_are_not_silences() {
        let segments = vec![seg(0.0, 4.0), seg(5.0, 10.0)];
        assert!(silence_candidates(&segments, 10.5, 1.5).is_empty());
    }

    #[test]
    fn silence_containing_a_segment_is_a_false_positive() {
        let segments = vec![seg(5.0, 6.0)];
        let vetted = vet_silences(&[range(4.0, 10.0), range(12.0, 14.0)], &segments);
        assert_eq!(vetted, vec![range(12.0, 14.0)]);
    }
}
