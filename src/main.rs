mod analysis;
mod captions;
mod cli;
mod commands;
mod config;
mod error;
mod export;
mod session;
mod timeline;
mod transcript;
mod ui;

use clap::Parser;

use crate::cli::Commands;
use crate::ui::{Level, OutputFormat, emit};

/// Transcript-driven editing of spoken-word recordings: cut retakes and
/// silences, keep word-level captions in sync.
#[derive(Parser, Debug)]
#[command(name = "recut", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, true);

    if let Err(err) = commands::handle_command(cli.command) {
        emit(Level::Error, "fatal", &format!("Error: {err:#}"), None);
        std::process::exit(1);
    }
}
