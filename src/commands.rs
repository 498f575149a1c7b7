use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result, bail};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::json;

use crate::analysis::{
    DurationSelector, LlmSelector, ResolverInput, SegmentAction, TakeSelector, resolve,
};
use crate::captions::{ass::render_ass, chunk_tokens, shift_tokens, srt::render_srt};
use crate::cli::{
    AnalyzeArgs, CaptionFormat, CaptionsArgs, Commands, EditArgs, ExportArgs, HighlightArgs,
    HighlightCommands, MarkAction, MarkArgs, PreviewArgs,
};
use crate::config::EditConfig;
use crate::export;
use crate::session::EditSession;
use crate::timeline::range::TimeRange;
use crate::timeline::remap::remap_tokens;
use crate::transcript::{Token, parse_whisper_json};
use crate::ui::{self, Level, OutputFormat, emit};

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze(args) => handle_analyze(args),
        Commands::Preview(args) => handle_preview(args),
        Commands::Mark(args) => handle_mark(args),
        Commands::Highlight(args) => handle_highlight(args),
        Commands::Edit(args) => handle_edit(args),
        Commands::Captions(args) => handle_captions(args),
        Commands::Export(args) => handle_export(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = EditConfig::load()?;

    let raw = fs::read_to_string(&args.transcript)
        .with_context(|| format!("Failed to read transcript {}", args.transcript.display()))?;
    let (segments, tokens) = parse_whisper_json(&raw)?;
    if segments.is_empty() {
        bail!("transcript {} contains no segments", args.transcript.display());
    }

    let video_duration = match (&args.video, args.duration) {
        (Some(video), _) => export::probe_duration(video)?,
        (None, Some(duration)) => duration,
        (None, None) => {
            let end = segments.last().map(|s| s.end).unwrap_or(0.0);
            emit(
                Level::Warn,
                "duration-assumed",
                &format!(
                    "No video or --duration given; assuming the recording ends at {end:.1}s"
                ),
                None,
            );
            end
        }
    };

    let external_silences = match &args.silences {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read silence file {}", path.display()))?;
            serde_json::from_str::<Vec<TimeRange>>(&raw)
                .with_context(|| format!("Invalid silence file {}", path.display()))?
        }
        None => Vec::new(),
    };

    let llm = if args.no_llm {
        None
    } else {
        LlmSelector::from_env(&config.llm_endpoint, &config.llm_model)
    };
    let selector: &dyn TakeSelector = match &llm {
        Some(selector) => selector,
        None => &DurationSelector,
    };
    emit(
        Level::Info,
        "selector",
        &format!("Selecting takes with the {} selector", selector.name()),
        None,
    );

    let overrides = BTreeMap::new();
    let resolution = resolve(
        ResolverInput {
            segments: &segments,
            external_silences: &external_silences,
            highlights: &[],
            overrides: &overrides,
            video_duration,
        },
        &config,
        selector,
    )?;

    if ui::is_debug_enabled() {
        for decision in &resolution.groups {
            emit(
                Level::Debug,
                "retake-group",
                &format!(
                    "group {} ({}): {} takes, selected member {}{}",
                    decision.group.id,
                    decision.group.strategy,
                    decision.group.members.len(),
                    decision.selected,
                    if decision.used_fallback { " via fallback" } else { "" }
                ),
                None,
            );
        }
        for silence in &resolution.silences {
            emit(Level::Debug, "silence", &format!("silence {silence}"), None);
        }
    }

    for warning in &resolution.warnings {
        emit(Level::Warn, "selector-fallback", warning, None);
    }
    for &index in &resolution.filler_heavy {
        emit(
            Level::Warn,
            "filler-heavy",
            &format!(
                "segment {index} is mostly filler words: {:?}",
                segments[index].text
            ),
            None,
        );
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.duration() < config.min_segment_duration {
            emit(
                Level::Warn,
                "short-segment",
                &format!(
                    "segment {index} is only {:.2}s long, transcription may be unreliable",
                    segment.duration()
                ),
                None,
            );
        }
    }
    if resolution.empty_keep_set {
        emit(
            Level::Warn,
            "empty-keep-set",
            "Analysis removed everything; check the transcript and thresholds",
            None,
        );
    }

    let kept = resolution
        .segments
        .iter()
        .filter(|s| s.action == SegmentAction::Keep)
        .count();
    let cut = resolution.segments.len() - kept;
    let groups = resolution.groups.len();
    let ranges = resolution.keep_ranges.len();

    let session = EditSession::from_resolution(
        segments,
        tokens,
        &resolution,
        args.video.clone(),
        video_duration,
    );
    session.save(&args.session)?;

    print_cut_plan(&session, &config)?;
    emit(
        Level::Success,
        "analyze-complete",
        &format!(
            "Analyzed {} segments: {kept} kept, {cut} cut, {groups} retake groups, {ranges} keep ranges -> {}",
            session.segment_count(),
            args.session.display()
        ),
        Some(json!({
            "segments": session.segment_count(),
            "kept": kept,
            "cut": cut,
            "retake_groups": groups,
            "keep_ranges": ranges,
            "session": args.session,
        })),
    );
    Ok(())
}

fn handle_preview(args: PreviewArgs) -> Result<()> {
    let config = EditConfig::load()?;
    let session = EditSession::load(&args.session)?;
    print_cut_plan(&session, &config)
}

/// Per-segment verdict table plus a duration summary.
fn print_cut_plan(session: &EditSession, config: &EditConfig) -> Result<()> {
    let ranges = session.final_keep_ranges(config)?;
    let kept_duration: f64 = ranges.iter().map(|r| r.duration()).sum();
    let edited_duration =
        kept_duration + config.segment_gap * ranges.len().saturating_sub(1) as f64;

    if ui::get_output_format() == OutputFormat::Json {
        let rows: Vec<_> = (0..session.segment_count())
            .map(|i| {
                json!({
                    "index": i,
                    "kept": session.is_segment_kept(i),
                    "start": session.segments[i].start,
                    "end": session.segments[i].end,
                    "reason": segment_reason(session, i),
                    "text": session.segment_text(i),
                })
            })
            .collect();
        emit(
            Level::Info,
            "cut-plan",
            "cut plan",
            Some(json!({
                "segments": rows,
                "keep_ranges": ranges,
                "original_duration": session.video_duration,
                "edited_duration": edited_duration,
            })),
        );
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "verdict", "start", "end", "reason", "text"]);

    for i in 0..session.segment_count() {
        let segment = &session.segments[i];
        let verdict = if session.is_segment_kept(i) { "keep" } else { "cut" };
        let mut text = session.segment_text(i).unwrap_or("").to_string();
        if text.chars().count() > 60 {
            text = text.chars().take(57).collect::<String>() + "...";
        }
        table.add_row(vec![
            i.to_string(),
            verdict.to_string(),
            format!("{:.2}", segment.start),
            format!("{:.2}", segment.end),
            segment_reason(session, i),
            text,
        ]);
    }
    println!("{table}");

    emit(
        Level::Info,
        "duration-summary",
        &format!(
            "{} keep ranges; {:.1}s of {:.1}s kept ({:.1}s edited timeline)",
            ranges.len(),
            kept_duration,
            session.video_duration,
            edited_duration
        ),
        None,
    );
    Ok(())
}

fn segment_reason(session: &EditSession, index: usize) -> String {
    if session.keep_overrides.contains_key(&index) {
        return "user-override".to_string();
    }
    session
        .decisions
        .get(index)
        .map(|d| d.reason.clone())
        .unwrap_or_default()
}

fn handle_mark(args: MarkArgs) -> Result<()> {
    let mut session = EditSession::load(&args.session)?;
    let keep = matches!(args.action, MarkAction::Keep);
    session.set_segment_kept(args.index, keep)?;
    session.save(&args.session)?;
    emit(
        Level::Success,
        "mark",
        &format!(
            "Segment {} marked as {}",
            args.index,
            if keep { "keep" } else { "cut" }
        ),
        Some(json!({ "index": args.index, "keep": keep })),
    );
    Ok(())
}

fn handle_highlight(args: HighlightArgs) -> Result<()> {
    let mut session = EditSession::load(&args.session)?;
    match args.command {
        HighlightCommands::Add { start, end, label } => {
            session.add_highlight(start, end, label.clone())?;
            session.save(&args.session)?;
            emit(
                Level::Success,
                "highlight-added",
                &format!("Highlight {start:.2}s - {end:.2}s added"),
                Some(json!({ "start": start, "end": end, "label": label })),
            );
        }
        HighlightCommands::Remove { index } => {
            let removed = session.remove_highlight(index)?;
            session.save(&args.session)?;
            emit(
                Level::Success,
                "highlight-removed",
                &format!(
                    "Highlight {} ({:.2}s - {:.2}s) removed",
                    index, removed.start, removed.end
                ),
                None,
            );
        }
        HighlightCommands::List => {
            if session.highlights.is_empty() {
                emit(Level::Info, "highlights", "No highlights", None);
            }
            for (i, h) in session.highlights.iter().enumerate() {
                emit(
                    Level::Info,
                    "highlight",
                    &format!("{i}: {:.2}s - {:.2}s {}", h.start, h.end, h.label),
                    Some(json!({ "index": i, "start": h.start, "end": h.end, "label": h.label })),
                );
            }
        }
    }
    Ok(())
}

fn handle_edit(args: EditArgs) -> Result<()> {
    let mut session = EditSession::load(&args.session)?;
    session.set_segment_text(args.index, args.text.clone())?;
    session.save(&args.session)?;
    emit(
        Level::Success,
        "text-edited",
        &format!("Segment {} text replaced", args.index),
        Some(json!({ "index": args.index, "text": args.text })),
    );
    Ok(())
}

/// Remap the session's kept tokens onto the cut timeline and chunk them.
fn remapped_chunks(
    session: &EditSession,
    config: &EditConfig,
) -> Result<Vec<crate::captions::CaptionChunk>> {
    let ranges = session.final_keep_ranges(config)?;
    if ranges.is_empty() {
        bail!("the keep set is empty, nothing to caption");
    }

    let tokens: Vec<Token> = session.final_tokens();
    if ui::is_debug_enabled() {
        emit(
            Level::Debug,
            "remap",
            &format!(
                "remapping {} tokens onto {} keep ranges (gap {:.2}s)",
                tokens.len(),
                ranges.len(),
                config.segment_gap
            ),
            None,
        );
    }
    let outcome = remap_tokens(&tokens, &ranges, config.segment_gap)?;
    if outcome.dropped > 0 || outcome.clipped > 0 {
        emit(
            Level::Warn,
            "remap-stats",
            &format!(
                "{} tokens dropped (inside cuts), {} clipped at range boundaries",
                outcome.dropped, outcome.clipped
            ),
            Some(json!({ "dropped": outcome.dropped, "clipped": outcome.clipped })),
        );
    }

    let shifted = shift_tokens(&outcome.tokens, config.caption_delay);
    Ok(chunk_tokens(
        &shifted,
        config.max_caption_words,
        config.caption_chunk_gap,
    ))
}

fn caption_extension(format: CaptionFormat) -> &'static str {
    match format {
        CaptionFormat::Srt => "srt",
        CaptionFormat::Ass => "ass",
    }
}

fn handle_captions(args: CaptionsArgs) -> Result<()> {
    let config = EditConfig::load()?;
    let session = EditSession::load(&args.session)?;

    let chunks = remapped_chunks(&session, &config)?;
    let rendered = match args.format {
        CaptionFormat::Srt => render_srt(&chunks),
        CaptionFormat::Ass => render_ass(&chunks),
    };

    let out_file = args.out_file.unwrap_or_else(|| {
        args.session.with_extension(caption_extension(args.format))
    });
    fs::write(&out_file, rendered)
        .with_context(|| format!("Failed to write captions to {}", out_file.display()))?;

    emit(
        Level::Success,
        "captions-written",
        &format!("Wrote {} caption chunks to {}", chunks.len(), out_file.display()),
        Some(json!({ "chunks": chunks.len(), "file": out_file })),
    );
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<()> {
    let config = EditConfig::load()?;
    let session = EditSession::load(&args.session)?;

    let ranges = session.final_keep_ranges(&config)?;
    if ranges.is_empty() {
        bail!("the keep set is empty, nothing to export");
    }

    emit(
        Level::Info,
        "export-start",
        &format!(
            "Cutting {} ranges from {}",
            ranges.len(),
            args.video.display()
        ),
        None,
    );
    if ui::is_debug_enabled() {
        for (i, range) in ranges.iter().enumerate() {
            emit(Level::Debug, "keep-range", &format!("range {i}: {range}"), None);
        }
    }

    let report;
    if args.no_captions {
        report = export::export_video(&args.video, &ranges, &args.out_file, &config)?;
    } else {
        let scratch = tempfile::Builder::new()
            .prefix("recut-export-")
            .tempdir()
            .context("Failed to create scratch directory")?;
        let cut_path = scratch.path().join("cut.mp4");
        report = export::export_video(&args.video, &ranges, &cut_path, &config)?;

        let chunks = remapped_chunks(&session, &config)?;
        let rendered = match args.caption_format {
            CaptionFormat::Srt => render_srt(&chunks),
            CaptionFormat::Ass => render_ass(&chunks),
        };
        let caption_path = scratch
            .path()
            .join(format!("captions.{}", caption_extension(args.caption_format)));
        fs::write(&caption_path, rendered).context("Failed to write caption scratch file")?;

        export::apply_captions(&cut_path, &caption_path, &args.out_file)?;
    }

    if let Some(dir) = &report.temp_dir {
        emit(
            Level::Info,
            "temp-kept",
            &format!("Scratch files kept in {}", dir.display()),
            None,
        );
    }

    emit(
        Level::Success,
        "export-complete",
        &format!(
            "Exported {} segments to {}",
            report.segments,
            args.out_file.display()
        ),
        Some(json!({ "segments": report.segments, "output": args.out_file })),
    );
    Ok(())
}
