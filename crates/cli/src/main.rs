// careshift CLI - inspect schedule directories without the grid UI

mod commands;
mod exit_codes;
mod logger;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use careshift_config::{ConfigError, GridSettings};
use careshift_grid::GridError;
use careshift_store::StoreError;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "cshift")]
#[command(about = "Inspect and preview careshift schedules (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log to stderr: -v for notes, -vv for debug
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to the user config directory)
    #[arg(long, env = "CSHIFT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Month of a schedule directory.
#[derive(Args)]
struct MonthArgs {
    /// Schedule directory (JSON month files)
    #[arg(long)]
    dir: PathBuf,

    #[arg(long)]
    year: i32,

    #[arg(long)]
    month: u32,

    /// Staff columns, comma-separated (default: everyone with a shift that month)
    #[arg(long, value_delimiter = ',')]
    staff: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode up to four cell lines and print the structured shift as JSON
    #[command(after_help = "\
Examples:
  cshift decode '09:30-11:30' '花子(家事)' '2' '渋谷区'
  cshift decode '13:00' '太郎(身体)' --day-off")]
    Decode {
        /// Time range, client(service), duration, area
        #[arg(num_args = 1..=4, required = true)]
        lines: Vec<String>,

        /// Decode as if the slot had a day-off request
        #[arg(long)]
        day_off: bool,

        /// Decode as if the slot were a scheduled day off
        #[arg(long)]
        scheduled_off: bool,
    },

    /// Print every occupied cell of a month as its four display lines
    Render {
        #[command(flatten)]
        month: MonthArgs,
    },

    /// Print per-staff totals by service for a month
    Totals {
        #[command(flatten)]
        month: MonthArgs,
    },

    /// Read clipboard text from stdin and print the cells a paste would write
    #[command(after_help = "\
Examples:
  pbpaste | cshift paste-preview --staff H1,H2 --dates 2026-04-05,2026-04-06
  cshift paste-preview --staff H1 --dates 2026-04-05 --anchor-row 2 < block.tsv")]
    PastePreview {
        /// Staff columns of the target grid, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        staff: Vec<String>,

        /// Dates of the target grid, comma-separated YYYY-MM-DD
        #[arg(long, value_delimiter = ',', required = true)]
        dates: Vec<NaiveDate>,

        /// Paste anchor column (default: first staff)
        #[arg(long)]
        anchor_staff: Option<String>,

        /// Paste anchor date (default: first date)
        #[arg(long)]
        anchor_date: Option<NaiveDate>,

        #[arg(long, default_value_t = 0)]
        anchor_row: u8,

        /// Schedule directory to read day-off overlays from
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\ngrid:    careshift-grid ",
        env!("CARGO_PKG_VERSION"),
        "\nformat:  store documents v1",
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let result = match cli.command {
        Commands::Decode { lines, day_off, scheduled_off } => commands::decode(&lines, day_off, scheduled_off),
        Commands::Render { month } => load_settings(cli.config).and_then(|s| commands::render(&month, s)),
        Commands::Totals { month } => load_settings(cli.config).and_then(|s| commands::totals(&month, s)),
        Commands::PastePreview { staff, dates, anchor_staff, anchor_date, anchor_row, dir, json } => {
            let anchor = commands::Anchor { staff: anchor_staff, date: anchor_date, row: anchor_row };
            commands::paste_preview(staff, dates, anchor, dir, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<GridSettings, CliError> {
    match path {
        Some(path) => GridSettings::load_from(&path)
            .map_err(|e| CliError::from(e).with_hint(format!("check {}", path.display()))),
        None => Ok(GridSettings::load()),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self { code: EXIT_STORE, message: e.to_string(), hint: None }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self { code: EXIT_CONFIG, message: e.to_string(), hint: None }
    }
}

impl From<GridError> for CliError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::Store(e) => e.into(),
            other => Self::usage(other.to_string()),
        }
    }
}
