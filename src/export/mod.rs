//! Video export via ffmpeg.
//!
//! The cut plan extracts every keep-range as a re-encoded segment, then
//! concatenates. Re-encoding is deliberate: stream copy can only cut at
//! keyframes, and the resulting timing drift desyncs the remapped captions.
//! Every non-final segment is padded with the inter-segment gap (frozen last
//! frame plus silence), so concatenated video time matches the remapper's
//! cut-timeline offsets exactly. Argument construction is pure and tested;
//! running ffmpeg is not.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use duct::cmd;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::EditConfig;
use crate::timeline::range::TimeRange;

/// Media duration in seconds, via ffprobe.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let output = cmd(
        "ffprobe",
        [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            path.to_string_lossy().as_ref(),
        ],
    )
    .read()
    .with_context(|| format!("ffprobe failed for {}", path.display()))?;

    output
        .trim()
        .parse::<f64>()
        .with_context(|| format!("ffprobe returned a non-numeric duration: {output:?}"))
}

pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// Frame-accurate extraction of one keep-range.
///
/// `trailing_gap` is the visual gap that follows this segment on the cut
/// timeline: the last frame is held and the audio padded for that long, so
/// the concatenated output lines up with the caption remap. The final
/// segment gets no gap.
pub fn cut_args(input: &Path, range: TimeRange, output: &Path, trailing_gap: f64) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.3}", range.start),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-t".to_string(),
        format!("{:.3}", range.duration()),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-crf".to_string(),
        "18".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
    ];
    if trailing_gap > 0.0 {
        args.push("-vf".to_string());
        args.push(format!(
            "tpad=stop_mode=clone:stop_duration={trailing_gap:.3}"
        ));
        args.push("-af".to_string());
        args.push(format!("apad=pad_dur={trailing_gap:.3}"));
    }
    args.push("-avoid_negative_ts".to_string());
    args.push("make_zero".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Concatenate already re-encoded segments by stream copy.
pub fn concat_args(list_file: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_file.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Burn captions into the video stream. ASS files go through the ass
/// filter, everything else through subtitles (libass renders both).
pub fn burn_args(input: &Path, captions: &Path, output: &Path) -> Vec<String> {
    let escaped = escape_filter_path(&captions.to_string_lossy());
    let filter = if captions.extension().is_some_and(|ext| ext == "ass") {
        format!("ass='{escaped}'")
    } else {
        format!("subtitles='{escaped}'")
    };
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vf".to_string(),
        filter,
        "-c:a".to_string(),
        "copy".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Attach captions as a soft subtitle track instead of burning them.
pub fn soft_caption_args(input: &Path, captions: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-i".to_string(),
        captions.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-c:s".to_string(),
        "mov_text".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Escape a path for use inside an ffmpeg filter argument.
fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace(':', "\\:").replace('\'', "\\'")
}

#[derive(Debug)]
pub struct ExportReport {
    pub segments: usize,
    /// Scratch directory, present only when `keep_temp` preserved it.
    pub temp_dir: Option<PathBuf>,
}

/// Cut the keep-ranges out of `input` and splice them into `output`.
pub fn export_video(
    input: &Path,
    ranges: &[TimeRange],
    output: &Path,
    config: &EditConfig,
) -> Result<ExportReport> {
    if ranges.is_empty() {
        bail!("nothing to export: the keep set is empty");
    }
    if !ffmpeg_available() {
        bail!("ffmpeg and ffprobe are required for export but were not found in PATH");
    }

    let temp = tempfile::Builder::new()
        .prefix("recut-")
        .tempdir()
        .context("Failed to create scratch directory")?;

    let bar = ProgressBar::new(ranges.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    bar.set_message("extracting segments");

    let mut segment_paths = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        let segment = temp.path().join(format!("segment_{i:04}.mp4"));
        // Gap after every range except the last, mirroring cut_offsets.
        let trailing_gap = if i + 1 < ranges.len() {
            config.segment_gap
        } else {
            0.0
        };
        run_ffmpeg(&cut_args(input, *range, &segment, trailing_gap))
            .with_context(|| format!("Failed to extract segment {i} ({range})"))?;
        segment_paths.push(segment);
        bar.inc(1);
    }
    bar.finish_with_message("segments extracted");

    if segment_paths.len() == 1 {
        fs::copy(&segment_paths[0], output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    } else {
        let list_file = temp.path().join("concat_list.txt");
        let list = segment_paths
            .iter()
            .map(|p| format!("file '{}'\n", p.display()))
            .collect::<String>();
        fs::write(&list_file, list).context("Failed to write concat list")?;
        run_ffmpeg(&concat_args(&list_file, output)).context("Concatenation failed")?;
    }

    let temp_dir = if config.keep_temp {
        Some(temp.keep())
    } else {
        None
    };

    Ok(ExportReport {
        segments: segment_paths.len(),
        temp_dir,
    })
}

/// Burn (or, on failure, softly attach) captions onto an exported video.
pub fn apply_captions(input: &Path, captions: &Path, output: &Path) -> Result<()> {
    if run_ffmpeg(&burn_args(input, captions, output)).is_ok() {
        return Ok(());
    }
    // Burning needs libass; fall back to a soft subtitle track.
    run_ffmpeg(&soft_caption_args(input, captions, output))
        .context("Caption burn failed and the soft-caption fallback also failed")
}

fn run_ffmpeg(args: &[String]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .context("Failed to spawn ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        bail!("ffmpeg exited with status {:?}: {tail}", output.status.code());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: f64, end: f64) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    #[test]
    fn cut_args_reencode_with_fast_seek() {
        let args = cut_args(Path::new("in.mp4"), range(1.5, 4.0), Path::new("seg.mp4"), 0.0);
        // -ss before -i seeks fast; -t carries the duration, not the end.
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i);
        assert_eq!(args[ss + 1], "1.500");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "2.500");
        assert!(args.contains(&"libx264".to_string()));
        assert!(!args.contains(&"copy".to_string()));
    }

    #[test]
    fn non_final_segments_are_padded_with_the_inter_segment_gap() {
        // The remapper inserts segment_gap between consecutive keep-ranges;
        // the extracted segment must carry the same gap as held video and
        // padded audio, or burned captions drift by one gap per boundary.
        let args = cut_args(Path::new("in.mp4"), range(0.0, 10.0), Path::new("seg.mp4"), 0.2);
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "tpad=stop_mode=clone:stop_duration=0.200");
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], "apad=pad_dur=0.200");
    }

    #[test]
    fn the_final_segment_gets_no_trailing_gap() {
        let args = cut_args(Path::new("in.mp4"), range(0.0, 10.0), Path::new("seg.mp4"), 0.0);
        assert!(!args.iter().any(|a| a.contains("tpad") || a.contains("apad")));
    }

    #[test]
    fn concat_uses_stream_copy() {
        let args = concat_args(Path::new("list.txt"), Path::new("out.mp4"));
        assert_eq!(args[args.len() - 3], "-c");
        assert_eq!(args[args.len() - 2], "copy");
        assert!(args.contains(&"concat".to_string()));
    }

    #[test]
    fn burn_picks_the_filter_by_extension() {
        let srt = burn_args(Path::new("in.mp4"), Path::new("caps.srt"), Path::new("o.mp4"));
        assert!(srt.iter().any(|a| a.starts_with("subtitles=")));
        let ass = burn_args(Path::new("in.mp4"), Path::new("caps.ass"), Path::new("o.mp4"));
        assert!(ass.iter().any(|a| a.starts_with("ass=")));
    }

    #[test]
    fn filter_paths_escape_colons() {
        assert_eq!(escape_filter_path("C:/a'b"), "C\\:/a\\'b");
    }
}
