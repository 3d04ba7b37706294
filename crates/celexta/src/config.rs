//! Application configuration.
//!
//! Built-in defaults are embedded as TOML. A user file,
//! `<config dir>/user_config.toml`, is merged over them section by section.
//! The user file may only set keys the defaults know about.
//!
//! ```
//! use celexta::config::Config;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = Config::load_or_init(dir.path()).unwrap();
//! assert_eq!(config.logging.level, "info");
//! assert!(dir.path().join("user_config.toml").exists());
//! ```

use std::path::{Path, PathBuf};

use celexta_core::logging::targets;
use celexta_core::LoggingOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{CelextaError, Result};
use crate::file;
use crate::items::Color;
use crate::model::ColorPool;

/// File name of the user configuration.
pub const USER_CONFIG_FILE: &str = "user_config.toml";

const DEFAULT_CONFIG: &str = r#"
[logging]
level = "info"
file = ""

[files]
last_opened = ""

[session]
restore_on_start = true
save_on_exit = true

[palette]
colors = []
"#;

const USER_CONFIG_TEMPLATE: &str = r##"# Celexta user configuration.
#
# Uncomment a key to override the built-in default.

[logging]
# level = "info"
# file = "celexta.log"

[files]
# last_opened = ""

[session]
# restore_on_start = true
# save_on_exit = true

[palette]
# colors = ["#1f77b4", "#ff7f0e"]
"##;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Log file, relative to the config directory. Empty disables it.
    pub file: String,
}

/// Recently used files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesSection {
    /// Directory or file last opened from a file dialog.
    pub last_opened: String,
}

/// Session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    /// Reload the last session at start-up.
    pub restore_on_start: bool,
    /// Save the session when the application exits.
    pub save_on_exit: bool,
}

/// Item color palette. Empty means the built-in palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteSection {
    /// Colors handed out to new items, in order.
    pub colors: Vec<Color>,
}

/// The merged configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `[logging]`
    pub logging: LoggingSection,
    /// `[files]`
    pub files: FilesSection,
    /// `[session]`
    pub session: SessionSection,
    /// `[palette]`
    pub palette: PaletteSection,
    /// Directory holding the user file, sessions and logs.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingSection {
                level: "info".to_string(),
                file: String::new(),
            },
            files: FilesSection {
                last_opened: String::new(),
            },
            session: SessionSection {
                restore_on_start: true,
                save_on_exit: true,
            },
            palette: PaletteSection { colors: Vec::new() },
            dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// The platform configuration directory, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "celexta", "celexta").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Reads the configuration from `dir`, writing the commented user file
    /// first if it does not exist.
    pub fn load_or_init(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let user_path = dir.join(USER_CONFIG_FILE);
        if !user_path.exists() {
            tracing::info!(target: targets::CONFIG, path = %user_path.display(), "creating user configuration");
            file::atomic_write(&user_path, USER_CONFIG_TEMPLATE.as_bytes())?;
        }
        Self::load(dir)
    }

    /// Reads the configuration from `dir`. A missing user file means the
    /// defaults.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let user_path = dir.join(USER_CONFIG_FILE);
        let mut merged = default_table()?;

        if user_path.exists() {
            let text = String::from_utf8_lossy(&file::read_bytes(&user_path)?).into_owned();
            let user: toml::Table = text.parse().map_err(|source| CelextaError::TomlDe {
                path: user_path.clone(),
                source,
            })?;
            merge(&mut merged, user, "", &user_path)?;
            tracing::debug!(target: targets::CONFIG, path = %user_path.display(), "merged user configuration");
        }

        let mut config: Config = toml::Value::Table(merged)
            .try_into()
            .map_err(|source| CelextaError::TomlDe {
                path: user_path.clone(),
                source,
            })?;
        config.dir = dir.to_path_buf();
        Ok(config)
    }

    /// Records `path` as the last opened location and writes it back to the
    /// user file, keeping every other key of that file.
    pub fn set_last_opened(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = file::absolute(path.as_ref());
        self.files.last_opened = path.to_string_lossy().into_owned();

        let user_path = self.dir.join(USER_CONFIG_FILE);
        let mut user = if user_path.exists() {
            let text = String::from_utf8_lossy(&file::read_bytes(&user_path)?).into_owned();
            text.parse::<toml::Table>().map_err(|source| CelextaError::TomlDe {
                path: user_path.clone(),
                source,
            })?
        } else {
            toml::Table::new()
        };

        let files = user
            .entry("files")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(files) = files {
            files.insert(
                "last_opened".to_string(),
                toml::Value::String(self.files.last_opened.clone()),
            );
        }
        file::atomic_write(&user_path, toml::to_string_pretty(&user)?.as_bytes())?;
        tracing::debug!(target: targets::CONFIG, last_opened = %self.files.last_opened, "saved last opened path");
        Ok(())
    }

    /// Logging options for [`celexta_core::logging::init`].
    pub fn logging_options(&self) -> LoggingOptions {
        let file = (!self.logging.file.is_empty()).then(|| self.dir.join(&self.logging.file));
        LoggingOptions {
            level: self.logging.level.clone(),
            file,
        }
    }

    /// A fresh color pool over the configured palette.
    pub fn color_pool(&self) -> ColorPool {
        if self.palette.colors.is_empty() {
            ColorPool::default()
        } else {
            ColorPool::new(self.palette.colors.clone())
        }
    }

    /// Where sessions are saved.
    pub fn session_dir(&self) -> PathBuf {
        self.dir.clone()
    }
}

fn default_table() -> Result<toml::Table> {
    DEFAULT_CONFIG.parse().map_err(|source| CelextaError::TomlDe {
        path: PathBuf::from("<defaults>"),
        source,
    })
}

/// Merges `user` into `base`, recursing into tables. Keys missing from
/// `base` are rejected.
fn merge(base: &mut toml::Table, user: toml::Table, prefix: &str, path: &Path) -> Result<()> {
    for (key, value) in user {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match (base.get_mut(&key), value) {
            (None, _) => {
                return Err(CelextaError::UnknownConfigKey {
                    path: path.to_path_buf(),
                    key: dotted,
                });
            }
            (Some(toml::Value::Table(base_section)), toml::Value::Table(user_section)) => {
                merge(base_section, user_section, &dotted, path)?;
            }
            (Some(slot), value) => *slot = value,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.session.restore_on_start);
        assert!(config.palette.colors.is_empty());
        assert_eq!(config.color_pool().palette().len(), 17);
        assert!(config.logging_options().file.is_none());
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded, Config { dir: dir.path().to_path_buf(), ..Config::default() });
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(USER_CONFIG_FILE),
            "[logging]\nlevel = \"debug\"\nfile = \"logs/celexta.log\"\n\n[palette]\ncolors = [\"#00FF00\", \"blue\"]\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.session.save_on_exit);
        assert_eq!(
            config.palette.colors,
            vec![Color::rgb(0, 255, 0), Color::rgb(0, 0, 255)]
        );
        assert_eq!(
            config.logging_options().file,
            Some(dir.path().join("logs/celexta.log"))
        );
        assert_eq!(config.color_pool().palette().len(), 2);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(USER_CONFIG_FILE), "[session]\nautosave = 3\n").unwrap();
        match Config::load(dir.path()) {
            Err(CelextaError::UnknownConfigKey { key, .. }) => assert_eq!(key, "session.autosave"),
            other => panic!("expected unknown key error, got {other:?}"),
        }

        std::fs::write(dir.path().join(USER_CONFIG_FILE), "[display]\ntheme = \"dark\"\n").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CelextaError::UnknownConfigKey { key, .. }) if key == "display"
        ));
    }

    #[test]
    fn test_bad_value_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(USER_CONFIG_FILE), "[session]\nsave_on_exit = \"yes\"\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(CelextaError::TomlDe { .. })));
    }

    #[test]
    fn test_load_or_init_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("celexta");
        let config = Config::load_or_init(&config_dir).unwrap();
        assert_eq!(config, Config { dir: config_dir.clone(), ..Config::default() });
        let text = std::fs::read_to_string(config_dir.join(USER_CONFIG_FILE)).unwrap();
        assert!(text.contains("# level"));
        assert!(text.trim_end().ends_with("# colors = [\"#1f77b4\", \"#ff7f0e\"]"));
    }

    #[test]
    fn test_set_last_opened_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(USER_CONFIG_FILE), "[logging]\nlevel = \"warn\"\n").unwrap();
        let mut config = Config::load(dir.path()).unwrap();
        config.set_last_opened(dir.path().join("images")).unwrap();

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.logging.level, "warn");
        assert!(reloaded.files.last_opened.ends_with("images"));
        assert_eq!(reloaded.files.last_opened, config.files.last_opened);
    }
}
