//! Retake/keep resolution.
//!
//! Turns segments, silence intervals, retake groups, highlight regions and
//! user overrides into the final ordered, non-overlapping keep-range
//! sequence on the original timeline. Pure and synchronous: the only
//! collaborator is the take selector, and its failures are contained per
//! group.

pub mod retake;
pub mod selector;
pub mod silence;

use std::collections::BTreeMap;

use crate::config::EditConfig;
use crate::error::EditError;
use crate::timeline::range::{TimeRange, merge_overlapping};
use crate::transcript::{Segment, validate_segments};

pub use retake::{RetakeGroup, detect_retakes};
pub use selector::{DurationSelector, LlmSelector, TakeSelector, longest_member};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAction {
    Keep,
    Remove,
}

/// Per-segment resolution verdict, in time order.
#[derive(Debug, Clone)]
pub struct AnalyzedSegment {
    pub index: usize,
    pub action: SegmentAction,
    pub reason: String,
    pub retake_group: Option<usize>,
}

/// A retake group together with the selection made for it.
#[derive(Debug, Clone)]
pub struct GroupDecision {
    pub group: RetakeGroup,
    pub selected: usize,
    pub used_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    /// Final keep-ranges: strictly increasing, non-overlapping.
    pub keep_ranges: Vec<TimeRange>,
    pub segments: Vec<AnalyzedSegment>,
    pub groups: Vec<GroupDecision>,
    pub silences: Vec<TimeRange>,
    /// Resolution removed everything; valid but almost never intended.
    pub empty_keep_set: bool,
    /// Segments whose filler-word density crossed the reporting threshold.
    pub filler_heavy: Vec<usize>,
    /// Non-fatal events (selector fallbacks) for the caller to surface.
    pub warnings: Vec<String>,
}

pub struct ResolverInput<'a> {
    pub segments: &'a [Segment],
    /// External silence detector output; vetted before use.
    pub external_silences: &'a [TimeRange],
    /// User-authored force-include regions; may overlap each other.
    pub highlights: &'a [TimeRange],
    /// Sparse per-segment keep/cut overrides, by time-sorted segment index.
    pub overrides: &'a BTreeMap<usize, bool>,
    pub video_duration: f64,
}

/// Run the full resolution pipeline.
pub fn resolve(
    input: ResolverInput<'_>,
    config: &EditConfig,
    selector: &dyn TakeSelector,
) -> Result<Resolution, EditError> {
    let mut segments = input.segments.to_vec();
    validate_segments(&mut segments)?;

    let mut warnings = Vec::new();

    // Silences: vetted external intervals plus gaps the transcript implies.
    let mut silences = silence::vet_silences(input.external_silences, &segments);
    silences.extend(silence::silence_candidates(
        &segments,
        input.video_duration,
        config.silence_threshold,
    ));
    let silences = merge_overlapping(&silences, 0.0);

    // Retake grouping and take selection.
    let groups = detect_retakes(&segments, config);
    let mut decisions = Vec::with_capacity(groups.len());
    for group in groups {
        let (selected, used_fallback) = match selector.select_best(&group) {
            Ok(index) => (index, false),
            Err(err) => {
                warnings.push(format!(
                    "take selector '{}' failed for group {} ({}); falling back to longest take",
                    selector.name(),
                    group.id,
                    err
                ));
                (longest_member(&group), true)
            }
        };
        decisions.push(GroupDecision {
            group,
            selected,
            used_fallback,
        });
    }

    // Per-segment verdicts: everything starts as Keep, retake losers flip to
    // Remove, user overrides land last and always win.
    let mut analyzed: Vec<AnalyzedSegment> = (0..segments.len())
        .map(|index| AnalyzedSegment {
            index,
            action: SegmentAction::Keep,
            reason: String::new(),
            retake_group: None,
        })
        .collect();

    for decision in &decisions {
        for (member_idx, member) in decision.group.members.iter().enumerate() {
            for &seg_idx in &member.segment_indices {
                analyzed[seg_idx].retake_group = Some(decision.group.id);
                if member_idx != decision.selected {
                    analyzed[seg_idx].action = SegmentAction::Remove;
                    analyzed[seg_idx].reason = "retake".to_string();
                }
            }
        }
    }

    for (&index, &keep) in input.overrides {
        if let Some(entry) = analyzed.get_mut(index) {
            entry.action = if keep {
                SegmentAction::Keep
            } else {
                SegmentAction::Remove
            };
            entry.reason = "user-override".to_string();
        }
    }

    let kept: Vec<bool> = analyzed
        .iter()
        .map(|entry| entry.action == SegmentAction::Keep)
        .collect();
    let keep_ranges = buffered_keep_ranges(
        &segments,
        &kept,
        &silences,
        input.highlights,
        input.video_duration,
        config,
    )?;
    let empty_keep_set = keep_ranges.is_empty();

    let filler_heavy = filler_heavy_segments(&segments, &config.filler_words);

    Ok(Resolution {
        keep_ranges,
        segments: analyzed,
        groups: decisions,
        silences,
        empty_keep_set,
        filler_heavy,
        warnings,
    })
}

/// Collapse kept segments into buffered spans, union highlights, merge.
///
/// Shared by the resolver and by session recomputation, so overrides edited
/// after analysis produce ranges by exactly the same rules.
pub fn buffered_keep_ranges(
    segments: &[Segment],
    kept: &[bool],
    silences: &[TimeRange],
    highlights: &[TimeRange],
    video_duration: f64,
    config: &EditConfig,
) -> Result<Vec<TimeRange>, EditError> {
    // Spans of consecutive kept segments. A sub-threshold gap between two
    // adjacent kept segments is speech rhythm, not silence, and is kept;
    // any removed segment in between breaks the span regardless of gap.
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (idx, is_kept) in kept.iter().enumerate() {
        if !is_kept {
            continue;
        }
        match spans.last_mut() {
            Some((_, last)) if *last + 1 == idx => {
                let gap_start = segments[*last].end;
                let gap_end = segments[idx].start;
                let bridgeable = gap_end - gap_start <= config.silence_threshold
                    && !silences.iter().any(|silence| {
                        silence.start < gap_end && silence.end > gap_start
                    });
                if bridgeable {
                    *last = idx;
                    continue;
                }
                spans.push((idx, idx));
            }
            _ => spans.push((idx, idx)),
        }
    }

    let mut ranges = Vec::with_capacity(spans.len());
    for &(first, last) in &spans {
        let raw_start = segments[first].start;
        let raw_end = segments[last].end;

        // Start buffer: up to the midpoint of a removed neighbor, never into
        // a kept neighbor's content.
        let mut start_limit = 0.0f64;
        if first > 0 {
            let prev = &segments[first - 1];
            start_limit = if kept[first - 1] {
                prev.end
            } else {
                (prev.start + prev.end) / 2.0
            };
        }
        let buffered_start = (raw_start - config.segment_start_buffer)
            .max(start_limit)
            .max(0.0);

        // End buffer: symmetric, and a kept neighbor's own start buffer has
        // priority over our end buffer.
        let mut end_limit = video_duration;
        if last + 1 < segments.len() {
            let next = &segments[last + 1];
            end_limit = if kept[last + 1] {
                next.start - config.segment_start_buffer
            } else {
                (next.start + next.end) / 2.0
            };
        }
        let buffered_end = (raw_end + config.segment_end_buffer)
            .min(end_limit)
            .min(video_duration)
            .max(raw_end);

        ranges.push(TimeRange::new(buffered_start, buffered_end)?);
    }

    // Highlights are force-included as-is, no buffers. They may overlap each
    // other and anything else; the final merge resolves all of it by union.
    let highlight_ranges = merge_overlapping(highlights, 0.0);
    ranges.extend(highlight_ranges);

    Ok(merge_overlapping(&ranges, 0.0))
}

fn filler_heavy_segments(segments: &[Segment], filler_words: &[String]) -> Vec<usize> {
    let mut flagged = Vec::new();
    for (idx, seg) in segments.iter().enumerate() {
        let words: Vec<String> = seg
            .text
            .to_lowercase()
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .collect();
        if words.is_empty() {
            continue;
        }
        let fillers = words
            .iter()
            .filter(|word| filler_words.iter().any(|filler| filler == *word))
            .count();
        if fillers as f64 / words.len() as f64 > 0.3 {
            flagged.push(idx);
        }
    }
    flagged
}
