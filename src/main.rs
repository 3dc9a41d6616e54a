mod activation;
mod books;
mod commands;
mod config;
mod diagnostics;
mod error;
mod info;
mod lookup;
mod placement;
mod resolver;
mod scanner;
mod state;
mod toc;
mod types;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::activation::Behavior;
use crate::commands::{PlaceOptions, StateAction, TextSizeChange};
use crate::types::VerseLocator;

/// Command-line arguments.
#[derive(Parser)]
#[command(
    name = "osbref",
    about = "Annotation placement and inline reference markers for an Orthodox Study Bible reader"
)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log level for diagnostics on stderr (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

/// Top-level subcommands.
#[derive(Subcommand)]
#[allow(clippy::arbitrary_source_item_ordering, reason = "positional arguments come first")]
enum Commands {
    /// Activate one marker: navigate, preview, or show the annotation
    Activate {
        /// Marker token, e.g. "[study[f1]]"
        marker: String,
        /// Annotation dump (JSON array) to look annotations up in
        #[arg(long)]
        annotations: Option<String>,
        /// How scripture markers respond
        #[arg(long, value_enum, default_value_t = Behavior::Navigate)]
        behavior: Behavior,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Lint markers in every text file (exit 0 valid, 1 rejected, 2 broken)
    Check {
        /// Annotation dump (JSON array); annotation markers must name an entry
        #[arg(long)]
        annotations: Option<String>,
    },
    /// Output comprehensive reference documentation
    Info {
        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Place a chapter's annotations on the verses they display on
    Place {
        /// Chapter JSON as returned by the content API
        file: String,
        /// Chapter count for a book missing from the canonical table
        #[arg(long)]
        chapter_count: Option<u32>,
        /// Print previous/next chapter links
        #[arg(long)]
        chapters: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Only show this verse
        #[arg(long)]
        verse: Option<u32>,
    },
    /// Substitute markers in a text file and list their targets
    Scan {
        /// Markdown or plain-text file
        file: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change reader state
    State {
        /// State change to apply.
        #[command(subcommand)]
        action: StateCommand,
    },
    /// Print where one marker leads
    Target {
        /// Marker token, e.g. "[SCRIPTURE[genesis:1:3]]"
        marker: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a library table of contents, or one node's path and neighbors
    Toc {
        /// Table-of-contents JSON (flat node array)
        file: String,
        /// Output the tree as JSON
        #[arg(long)]
        json: bool,
        /// Node to locate
        #[arg(long)]
        node: Option<String>,
    },
}

/// `state` subcommands.
#[derive(Subcommand)]
#[allow(clippy::arbitrary_source_item_ordering, reason = "positional arguments keep their command-line order")]
enum StateCommand {
    /// Toggle a favorite verse (book:chapter:verse)
    Favorite {
        /// Verse locator, e.g. john:3:16
        locator: VerseLocator,
    },
    /// Record the last-read node of a library work
    Library {
        /// Work identifier
        work_id: String,
        /// Node identifier
        node_id: String,
    },
    /// Record the reading position (book:chapter:verse)
    Position {
        /// Verse locator, e.g. genesis:1:1
        locator: VerseLocator,
    },
    /// Print favorites, position, text size, and library positions
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the text size (small, medium, large, x-large) or step it (up, down)
    TextSize {
        /// Size name, `up`, or `down`
        change: TextSizeChange,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(format!("osbref={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one subcommand and map its outcome to an exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Activate { marker, annotations, behavior, json } => {
            commands::activate(&marker, behavior, annotations.as_deref(), json).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Check { annotations } => commands::check(annotations.as_deref()),
        Commands::Info { json } => {
            commands::info(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Place { file, chapter_count, chapters, json, verse } => commands::place(&PlaceOptions {
            chapter_count,
            chapters,
            file: &file,
            json,
            verse,
        })
        .map(|()| return ExitCode::SUCCESS),
        Commands::Scan { file, json } => commands::scan(&file, json),
        Commands::State { action } => commands::state(state_action(action)).map(|()| return ExitCode::SUCCESS),
        Commands::Target { marker, json } => commands::target(&marker, json).map(|()| return ExitCode::SUCCESS),
        Commands::Toc { file, json, node } => {
            commands::toc(&file, node.as_deref(), json).map(|()| return ExitCode::SUCCESS)
        },
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    };
}

/// Map the CLI state subcommand onto a state action.
fn state_action(command: StateCommand) -> StateAction {
    return match command {
        StateCommand::Favorite { locator } => StateAction::Favorite(locator),
        StateCommand::Library { work_id, node_id } => StateAction::Library { node_id, work_id },
        StateCommand::Position { locator } => StateAction::Position(locator),
        StateCommand::Show { json } => StateAction::Show { json },
        StateCommand::TextSize { change } => StateAction::TextSize(change),
    };
}
