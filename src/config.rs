use std::path::{Path, PathBuf};

use crate::error::Error;

/// Branch linked to when no revision can be found for a package.
const DEFAULT_BRANCH: &str = "master";

/// Repository the declaration files are published from.
const DEFAULT_REPOSITORY: &str = "https://github.com/DefinitelyTyped/DefinitelyTyped";

/// Default for `max_revision_gap_days`.
const DEFAULT_MAX_REVISION_GAP_DAYS: u32 = 7;

/// Seconds per day, for `max_revision_gap_days`.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Settings loaded from `.dtlink.toml`. Every key is optional.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Branch used when a package's publish revision is unknown.
    pub default_branch: String,
    /// External history snapshot, relative to the config's directory. The
    /// snapshot compiled into the binary is used when unset.
    pub history_file: Option<PathBuf>,
    /// Largest distance, in days, allowed between a publish date and the
    /// revision it resolves to. `0` accepts any distance.
    pub max_revision_gap_days: u32,
    /// Base URL of the upstream repository, without a trailing `/blob`.
    pub repository: String,
    /// Warn when a package can only be linked to the default branch.
    pub warn_on_unstable_link: bool,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            history_file: None,
            max_revision_gap_days: DEFAULT_MAX_REVISION_GAP_DAYS,
            repository: DEFAULT_REPOSITORY.to_string(),
            warn_on_unstable_link: true,
        };
    }
}

impl Config {
    /// Load config from `.dtlink.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist, but never falls back
    /// to them when the user wrote a file that doesn't parse.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".dtlink.toml");
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let mut config: Self = toml::from_str(&content)?;
        config.history_file = config.history_file.map(|file| return root.join(file));
        return Ok(config);
    }

    /// `max_revision_gap_days` in seconds, or `None` when unlimited.
    pub fn max_revision_gap(&self) -> Option<f64> {
        if self.max_revision_gap_days == 0 {
            return None;
        }
        return Some(f64::from(self.max_revision_gap_days) * SECONDS_PER_DAY);
    }
}
