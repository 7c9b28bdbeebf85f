//! Configuration file discovery, loading and saving.
//!
//! Load order is explicit override, then the user file, then the system file, then
//! the built-in defaults. The first file that can be read wins; a missing or
//! unreadable file is skipped without error.

use super::{ConfigError, MouseConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/headmouse.conf";
pub const USER_CONFIG_DIR: &str = "headmouse";
pub const USER_CONFIG_FILE: &str = "config.conf";

/// Where a loaded configuration came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigOrigin {
    Override(PathBuf),
    User(PathBuf),
    System(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Override(path) => write!(f, "override file {}", path.display()),
            ConfigOrigin::User(path) => write!(f, "user file {}", path.display()),
            ConfigOrigin::System(path) => write!(f, "system file {}", path.display()),
            ConfigOrigin::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// The ordered set of places configuration is read from.
///
/// Kept by the tracker so that a `reload` command walks the same chain as startup.
#[derive(Clone, Debug)]
pub struct ConfigSource {
    override_path: Option<PathBuf>,
    user_path: Option<PathBuf>,
    system_path: Option<PathBuf>,
}

impl ConfigSource {
    /// Standard chain with an optional explicit file in front.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            user_path: user_config_path(),
            system_path: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
        }
    }

    /// Chain with every location given explicitly.
    pub fn with_paths(
        override_path: Option<PathBuf>,
        user_path: Option<PathBuf>,
        system_path: Option<PathBuf>,
    ) -> Self {
        Self {
            override_path,
            user_path,
            system_path,
        }
    }

    /// Source that never touches the filesystem.
    pub fn defaults_only() -> Self {
        Self::with_paths(None, None, None)
    }

    pub fn user_path(&self) -> Option<&Path> {
        self.user_path.as_deref()
    }

    /// Walks the chain and returns the first readable configuration.
    pub fn load(&self) -> (MouseConfig, ConfigOrigin) {
        let candidates = [
            self.override_path.clone().map(ConfigOrigin::Override),
            self.user_path.clone().map(ConfigOrigin::User),
            self.system_path.clone().map(ConfigOrigin::System),
        ];

        for origin in candidates.into_iter().flatten() {
            let path = match &origin {
                ConfigOrigin::Override(p) | ConfigOrigin::User(p) | ConfigOrigin::System(p) => p,
                ConfigOrigin::Defaults => continue,
            };

            match load_config_file(path) {
                Ok(config) => {
                    info!("Loaded config from {}", origin);
                    for note in config.range_warnings() {
                        warn!("Config value out of range: {}", note);
                    }
                    return (config, origin);
                }
                Err(e) => {
                    if matches!(origin, ConfigOrigin::Override(_)) {
                        warn!("{}", e);
                    } else {
                        debug!("Skipping config candidate: {}", e);
                    }
                }
            }
        }

        info!("Using default configuration");
        (MouseConfig::default(), ConfigOrigin::Defaults)
    }

    /// Writes `config` to the user file, creating its directory.
    pub fn save_user(&self, config: &MouseConfig) -> Result<PathBuf, ConfigError> {
        let path = self.user_path.clone().ok_or(ConfigError::NoConfigDir)?;
        save_config_file(&path, config)?;
        info!("Saved config to {}", path.display());
        Ok(path)
    }
}

/// `<config dir>/headmouse/config.conf`, usually `~/.config/headmouse/config.conf`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

pub fn load_config_file(path: &Path) -> Result<MouseConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(MouseConfig::parse(&contents))
}

pub fn save_config_file(path: &Path, config: &MouseConfig) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, config.to_config_string()).map_err(write_err)
}
