//! Retake detection.
//!
//! Three grouping strategies run as an ordered pipeline over the set of
//! segments no earlier strategy has claimed:
//!
//! 1. block-based — recording blocks (runs of segments separated by long
//!    pauses) whose leading text matches are alternate takes of each other;
//! 2. within-block restart — a short false start followed by a segment with
//!    a near-identical prefix;
//! 3. windowed fuzzy — leftover pairwise matches inside a bounded window.
//!
//! A segment belongs to at most one group; the earlier strategy wins.

use std::collections::HashSet;

use similar::TextDiff;

use crate::config::EditConfig;
use crate::transcript::Segment;

/// Prefix similarity above which consecutive segments count as a restart.
const RESTART_PREFIX_SIMILARITY: f64 = 0.7;
/// How far ahead (seconds) a restart partner may start.
const RESTART_LOOKAHEAD_SECONDS: f64 = 10.0;
/// How many segments ahead the restart scan looks.
const RESTART_LOOKAHEAD_SEGMENTS: usize = 3;
/// Window (seconds) for leftover pairwise matching.
const FUZZY_WINDOW_SECONDS: f64 = 60.0;
/// Leading characters of a block used as its fingerprint.
const BLOCK_FINGERPRINT_CHARS: usize = 100;

/// One alternate take: either a single segment or a whole recording block.
#[derive(Debug, Clone)]
pub struct TakeCandidate {
    /// Source segment indices covered by this take, contiguous and ordered.
    pub segment_indices: Vec<usize>,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TakeCandidate {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn from_block(segments: &[Segment], block: (usize, usize)) -> Self {
        let (first, last) = block;
        let text = segments[first..=last]
            .iter()
            .map(|seg| seg.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            segment_indices: (first..=last).collect(),
            start: segments[first].start,
            end: segments[last].end,
            text,
        }
    }

    fn from_segment(segments: &[Segment], index: usize) -> Self {
        Self {
            segment_indices: vec![index],
            start: segments[index].start,
            end: segments[index].end,
            text: segments[index].text.clone(),
        }
    }
}

/// Alternate takes of the same intended utterance. Members are ordered by
/// start time; exactly one gets selected downstream.
#[derive(Debug, Clone)]
pub struct RetakeGroup {
    pub id: usize,
    pub members: Vec<TakeCandidate>,
    pub strategy: &'static str,
}

/// Normalized fuzzy similarity of two strings in `[0, 1]`.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    TextDiff::from_chars(a, b).ratio() as f64
}

/// Partition segments into recording blocks: runs separated by gaps longer
/// than the block boundary threshold. Returns inclusive (first, last) index
/// pairs covering every segment.
pub fn recording_blocks(segments: &[Segment], boundary_gap: f64) -> Vec<(usize, usize)> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    let mut block_start = 0usize;

    for i in 0..segments.len() - 1 {
        let gap = segments[i + 1].start - segments[i].end;
        if gap > boundary_gap {
            blocks.push((block_start, i));
            block_start = i + 1;
        }
    }
    blocks.push((block_start, segments.len() - 1));

    blocks
}

fn block_fingerprint(segments: &[Segment], block: (usize, usize)) -> String {
    let (first, last) = block;
    let mut fingerprint = segments[first].text.to_lowercase();
    if last > first {
        fingerprint.push(' ');
        fingerprint.push_str(&segments[first + 1].text.to_lowercase());
    }
    fingerprint.chars().take(BLOCK_FINGERPRINT_CHARS).collect()
}

fn word_prefix(text: &str, words: usize) -> String {
    let lowered = text.to_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    if parts.len() >= words {
        parts[..words].join(" ")
    } else {
        lowered
    }
}

/// Run all three strategies in priority order.
pub fn detect_retakes(segments: &[Segment], config: &EditConfig) -> Vec<RetakeGroup> {
    let mut groups: Vec<RetakeGroup> = Vec::new();
    let mut used: HashSet<usize> = HashSet::new();

    group_retake_blocks(segments, config, &mut groups, &mut used);
    group_block_restarts(segments, &mut groups, &mut used);
    group_windowed_matches(segments, config, &mut groups, &mut used);

    groups
}

/// Strategy 1: blocks whose leading text is near-identical are retakes of
/// each other. Grouping a block claims all of its segments.
fn group_retake_blocks(
    segments: &[Segment],
    config: &EditConfig,
    groups: &mut Vec<RetakeGroup>,
    used: &mut HashSet<usize>,
) {
    let blocks = recording_blocks(segments, config.block_boundary_gap);
    if blocks.len() < 2 {
        return;
    }

    let fingerprints: Vec<String> = blocks
        .iter()
        .map(|block| block_fingerprint(segments, *block))
        .collect();

    let mut used_blocks: HashSet<usize> = HashSet::new();

    for i in 0..blocks.len() {
        if used_blocks.contains(&i) {
            continue;
        }

        let mut member_blocks = vec![blocks[i]];
        used_blocks.insert(i);

        for j in (i + 1)..blocks.len() {
            if used_blocks.contains(&j) {
                continue;
            }
            if text_similarity(&fingerprints[i], &fingerprints[j]) >= config.retake_similarity {
                member_blocks.push(blocks[j]);
                used_blocks.insert(j);
            }
        }

        if member_blocks.len() < 2 {
            continue;
        }

        let members: Vec<TakeCandidate> = member_blocks
            .iter()
            .map(|block| TakeCandidate::from_block(segments, *block))
            .collect();
        for member in &members {
            used.extend(member.segment_indices.iter().copied());
        }
        groups.push(RetakeGroup {
            id: groups.len(),
            members,
            strategy: "block",
        });
    }
}

/// Strategy 2: a false start is a segment quickly followed by another one
/// with a near-identical word prefix.
fn group_block_restarts(
    segments: &[Segment],
    groups: &mut Vec<RetakeGroup>,
    used: &mut HashSet<usize>,
) {
    for i in 0..segments.len() {
        if used.contains(&i) {
            continue;
        }

        let upper = (i + 1 + RESTART_LOOKAHEAD_SEGMENTS).min(segments.len());
        for j in (i + 1)..upper {
            if used.contains(&j) {
                continue;
            }
            if segments[j].start - segments[i].end > RESTART_LOOKAHEAD_SECONDS {
                break;
            }

            let prefix_a = word_prefix(&segments[i].text, 4);
            let prefix_b = word_prefix(&segments[j].text, 4);
            // Too little text to compare meaningfully.
            if prefix_a.len() < 10 || prefix_b.len() < 10 {
                continue;
            }

            if text_similarity(&prefix_a, &prefix_b) >= RESTART_PREFIX_SIMILARITY {
                used.insert(i);
                used.insert(j);
                groups.push(RetakeGroup {
                    id: groups.len(),
                    members: vec![
                        TakeCandidate::from_segment(segments, i),
                        TakeCandidate::from_segment(segments, j),
                    ],
                    strategy: "restart",
                });
                break;
            }
        }
    }
}

/// Strategy 3: whole-text similarity for anything left, within a bounded
/// time window.
fn group_windowed_matches(
    segments: &[Segment],
    config: &EditConfig,
    groups: &mut Vec<RetakeGroup>,
    used: &mut HashSet<usize>,
) {
    for i in 0..segments.len() {
        if used.contains(&i) {
            continue;
        }

        let mut members = vec![TakeCandidate::from_segment(segments, i)];
        let mut claimed = vec![i];

        for j in (i + 1)..segments.len() {
            if used.contains(&j) {
                continue;
            }
            if segments[j].start - segments[i].end > FUZZY_WINDOW_SECONDS {
                break;
            }

            let similarity = text_similarity(
                &segments[i].text.to_lowercase(),
                &segments[j].text.to_lowercase(),
            );
            if similarity >= config.retake_similarity {
                members.push(TakeCandidate::from_segment(segments, j));
                claimed.push(j);
            }
        }

        if members.len() < 2 {
            continue;
        }

        used.extend(claimed);
        groups.push(RetakeGroup {
            id: groups.len(),
            members,
            strategy: "windowed",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            confidence: 1.0,
        }
    }

    #[test]
    fn similarity_is_high_for_near_identical_text() {
        assert!(text_similarity("so today we talk about rust", "so today we talk about rust") > 0.99);
        assert!(text_similarity("so today we talk about rust", "completely different words") < 0.6);
    }

    #[test]
    fn blocks_split_on_long_gaps() {
        let segments = vec![
            seg(0.0, 2.0, "a"),
            seg(2.5, 4.0, "b"),
            seg(9.0, 11.0, "c"),
        ];
        let blocks = recording_blocks(&segments, 3.0);
        assert_eq!(blocks, vec![(0, 1), (2, 2)]);
    }

    #[test]
    fn block_strategy_groups_repeated_openings() {
        // Two recording attempts at the same passage, separated by a pause.
        let segments = vec![
            seg(0.0, 2.0, "Welcome to the channel everyone"),
            seg(2.2, 4.0, "today we look at lifetimes"),
            seg(10.0, 12.0, "Welcome to the channel everyone"),
            seg(12.2, 15.0, "today we look at lifetimes in depth"),
        ];
        let groups = detect_retakes(&segments, &EditConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].strategy, "block");
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].members[0].segment_indices, vec![0, 1]);
        assert_eq!(groups[0].members[1].segment_indices, vec![2, 3]);
    }

    #[test]
    fn restart_strategy_pairs_false_starts() {
        let segments = vec![
            seg(0.0, 1.2, "so the first thing we"),
            seg(1.5, 5.0, "so the first thing we need is a compiler"),
            seg(6.0, 8.0, "then install the toolchain"),
        ];
        let groups = detect_retakes(&segments, &EditConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].strategy, "restart");
        assert_eq!(groups[0].members[0].segment_indices, vec![0]);
        assert_eq!(groups[0].members[1].segment_indices, vec![1]);
    }

    #[test]
    fn a_segment_never_lands_in_two_groups() {
        let segments = vec![
            seg(0.0, 2.0, "Welcome to the channel everyone"),
            seg(6.0, 8.0, "Welcome to the channel everyone"),
            seg(14.0, 16.0, "Welcome to the channel everyone"),
        ];
        let groups = detect_retakes(&segments, &EditConfig::default());
        let mut seen = HashSet::new();
        for group in &groups {
            for member in &group.members {
                for idx in &member.segment_indices {
                    assert!(seen.insert(*idx), "segment {idx} grouped twice");
                }
            }
        }
    }

    #[test]
    fn dissimilar_segments_form_no_groups() {
        let segments = vec![
            seg(0.0, 2.0, "first topic entirely"),
            seg(3.0, 5.0, "second subject is unrelated"),
            seg(6.0, 8.0, "third point diverges again"),
        ];
        assert!(detect_retakes(&segments, &EditConfig::default()).is_empty());
    }
}
