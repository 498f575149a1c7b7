use thiserror::Error;

/// Structural errors raised by the interval model, resolver and remapper.
///
/// Collaborator failures are contained per retake group and never abort a
/// resolution pass; everything else here is fatal to the call that raised it.
#[derive(Debug, Error)]
pub enum EditError {
    /// A time range or segment with `end <= start` (or a non-finite bound).
    /// Rejected at construction, never silently corrected.
    #[error("invalid time range: start {start}s, end {end}s")]
    InvalidRange { start: f64, end: f64 },

    /// Input that the linear-pass algorithms cannot order deterministically
    /// even after a defensive sort.
    #[error("unsorted input: {0}")]
    UnsortedInput(String),

    /// A take-selection collaborator (LLM call) failed or returned garbage.
    #[error("take selector failed: {0}")]
    Collaborator(String),
}
