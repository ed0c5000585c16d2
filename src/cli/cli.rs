use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Replays an edit script against a sitemap, with undo/redo and locking.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// YAML file with the sitemap entries
    pub sitemap: PathBuf,
    /// YAML file with the edit steps to replay
    pub script: PathBuf,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Directory holding the lock file and the save journal
    #[clap(long, short, default_value = ".sitemap-editor")]
    pub state_dir: PathBuf,

    /// Name recorded in the lock file, defaults to one derived from the process id
    #[clap(long)]
    pub owner: Option<String>,

    /// Disable colored output
    #[clap(long)]
    pub no_color: bool,
}
