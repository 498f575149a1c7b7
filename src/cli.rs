use clap::{Args, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Analyze a transcript: detect retakes and silences, write a session
    Analyze(AnalyzeArgs),
    /// Show the cut plan for a session
    Preview(PreviewArgs),
    /// Override the keep/cut decision for a segment
    Mark(MarkArgs),
    /// Manage force-included highlight regions
    Highlight(HighlightArgs),
    /// Replace the text of a segment (tokens are regenerated)
    Edit(EditArgs),
    /// Render captions for the edited timeline
    Captions(CaptionsArgs),
    /// Cut the video and optionally burn captions
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// WhisperX JSON transcript
    #[arg(value_hint = ValueHint::FilePath)]
    pub transcript: PathBuf,

    /// Source video; its duration is probed with ffprobe
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub video: Option<PathBuf>,

    /// Video duration in seconds, if no video file is given
    #[arg(long)]
    pub duration: Option<f64>,

    /// JSON file with externally detected silence intervals
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub silences: Option<PathBuf>,

    /// Session file to write
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,

    /// Skip the LLM take selector even when an API key is configured
    #[arg(long)]
    pub no_llm: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum MarkAction {
    Keep,
    Cut,
}

#[derive(Args, Debug, Clone)]
pub struct MarkArgs {
    /// Whether to keep or cut the segment
    #[arg(value_enum)]
    pub action: MarkAction,

    /// Segment index as shown by preview
    pub index: usize,

    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct HighlightArgs {
    #[command(subcommand)]
    pub command: HighlightCommands,

    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath, global = true)]
    pub session: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HighlightCommands {
    /// Force-include a time range in the final cut
    Add {
        /// Start time in seconds
        start: f64,
        /// End time in seconds
        end: f64,
        /// Optional label
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Remove a highlight by its list index
    Remove { index: usize },
    /// List highlight regions
    List,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Segment index as shown by preview
    pub index: usize,

    /// Replacement text
    pub text: String,

    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    Srt,
    Ass,
}

#[derive(Args, Debug, Clone)]
pub struct CaptionsArgs {
    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,

    /// Caption format
    #[arg(long, value_enum, default_value_t = CaptionFormat::Srt)]
    pub format: CaptionFormat,

    /// Output file; defaults to the session name with the format extension
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Session file
    #[arg(short = 's', long, default_value = "recut-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,

    /// Output video file
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: PathBuf,

    /// Skip caption rendering and burning
    #[arg(long)]
    pub no_captions: bool,

    /// Caption format used when burning
    #[arg(long, value_enum, default_value_t = CaptionFormat::Ass)]
    pub caption_format: CaptionFormat,
}
