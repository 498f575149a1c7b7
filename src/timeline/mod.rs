pub mod range;
pub mod remap;

pub use range::{TimeRange, merge_overlapping, subtract};
pub use remap::{RemapOutcome, cut_offsets, remap_tokens};
