mod commands;
mod config;
mod discovery;
mod error;
mod grammar;
mod history;
mod line;
mod link;
mod package;
mod source_cache;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use crate::history::RevisionIndex;
use crate::types::SymbolIdentity;

#[derive(Parser)]
#[command(
    name = "dtlink",
    version,
    about = "Deep links from docs to DefinitelyTyped source lines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// History snapshot to use instead of the built-in one
    #[arg(long, global = true, value_name = "FILE")]
    history: Option<PathBuf>,
    /// Don't warn when a package can only be linked to the default branch
    #[arg(long, global = true)]
    no_warn: bool,
    /// More logging: -v for info, -vv for debug
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Link every symbol in a JSON array of {file, qualified_name, offset?}
    Batch {
        /// JSON file to read
        input: PathBuf,
        /// Print a JSON array instead of one link per line
        #[arg(long)]
        json: bool,
    },
    /// Print the revision that was current at a Unix timestamp
    Commit {
        /// Seconds since the epoch
        #[arg(allow_negative_numbers = true)]
        timestamp: f64,
    },
    /// Print the line number of a declaration
    Line {
        /// Declaration file
        file: PathBuf,
        /// Dotted name, e.g. `__global.NodeJS.Process.exit`
        qualified_name: String,
        /// UTF-8 byte offset of the declaration in the file, when known
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Print the deep link for a declaration
    Link {
        /// Declaration file under node_modules/@types/
        file: PathBuf,
        /// Dotted name, e.g. `EventEmitter.getMaxListeners`
        qualified_name: String,
        /// UTF-8 byte offset of the declaration in the file, when known
        #[arg(long)]
        offset: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    return match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(3)
        },
    };
}

/// Route `-v` / `-vv` to the log filter; `RUST_LOG` still wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Load config and history, then dispatch.
///
/// # Errors
///
/// Returns config, history, or command errors.
fn run(cli: Cli) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let mut config = config::Config::load(&root)?;
    if cli.no_warn {
        config.warn_on_unstable_link = false;
    }

    let history = match cli.history.as_ref().or(config.history_file.as_ref()) {
        Some(path) => {
            log::info!("reading history snapshot {}", path.display());
            RevisionIndex::read(path)?
        },
        None => RevisionIndex::embedded()?,
    };
    log::debug!("loaded {} revisions", history.revision_count());

    match cli.command {
        Commands::Batch { input, json } => commands::batch(&history, &config, &input, json)?,
        Commands::Commit { timestamp } => return Ok(commands::commit(&history, &config, timestamp)),
        Commands::Line {
            file,
            qualified_name,
            offset,
        } => commands::line(file, qualified_name, offset),
        Commands::Link {
            file,
            qualified_name,
            offset,
        } => {
            let symbol = SymbolIdentity {
                file,
                offset,
                qualified_name,
            };
            commands::link(&history, &config, &symbol)?;
        },
    }

    return Ok(ExitCode::SUCCESS);
}
