use std::path::PathBuf;

use crate::cli::Cli;

/// Everything an editing session needs from the outside world.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub sitemap: PathBuf,
    pub script: PathBuf,
    pub state_dir: PathBuf,
    pub owner: Option<String>,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            sitemap: cli.sitemap,
            script: cli.script,
            state_dir: cli.state_dir,
            owner: cli.owner,
        }
    }
}
