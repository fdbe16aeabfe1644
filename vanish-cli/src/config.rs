//! `vanish.toml` loading and defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use vanish_core::engine::DEFAULT_RETENTION_DAYS;
use vanish_core::paths::expand_config_path;
use vanish_core::safety::{DEFAULT_LARGE_COUNT_LIMIT, DEFAULT_LARGE_SIZE_LIMIT};
use vanish_core::{AuditLevel, EngineConfig, RestoreMatching, SafetyPolicy, TieBreak};

pub const CONFIG_FILE: &str = "vanish.toml";

/// Written on first run when no configuration exists.
pub const DEFAULT_CONFIG_TOML: &str = r#"# vanish configuration
#
# Relative paths are resolved against your home directory.

[cache]
# Where deleted files are kept
directory = ".cache/vanish"
# Days to keep files before they are removed for good
days = 10

[logging]
# Record every operation in <directory>/vanish.log
enabled = true
directory = ".cache/vanish/logs"
# "info", "debug" (also keeps vanish.json) or "error"
level = "info"

[ui]
theme = "default"
# Never ask for confirmation when nothing needs it (same as --noconfirm)
no_confirm = false

[behavior]
auto_confirm = false
# Ask before moving anything large
confirm_on_large = true
large_size_limit = 104857600  # 100 MB
large_count_limit = 1000      # entries inside a directory
# Restore each cached item once even when several patterns match it
dedupe_restore_matches = true
# When one path was deleted several times: "newest" or "all"
restore_tie_break = "newest"

[safety]
# Deleting these, or anything below them, always asks first
protected_paths = ["/", "/home", "/usr", "/etc", "/var", "/boot", "/sys", "/proc"]
# File names that always ask first
require_confirm = ["*.env", "*.key", "*.pem", "config.toml", "*.config"]
# Keep a second copy of protected items inside the cache
backup_important = false
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub ui: UiConfig,
    pub behavior: BehaviorConfig,
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
    pub days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".cache/vanish"),
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(".cache/vanish/logs"),
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn audit_level(&self) -> AuditLevel {
        self.level.parse().unwrap_or_default()
    }

    pub fn resolved_directory(&self) -> PathBuf {
        expand_config_path(&self.directory)
    }
}

/// Colour keys of older configuration files are accepted and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    pub no_confirm: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            no_confirm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TieBreakSetting {
    #[default]
    Newest,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub auto_confirm: bool,
    pub confirm_on_large: bool,
    pub large_size_limit: u64,
    pub large_count_limit: u64,
    pub dedupe_restore_matches: bool,
    pub restore_tie_break: TieBreakSetting,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            auto_confirm: false,
            confirm_on_large: true,
            large_size_limit: DEFAULT_LARGE_SIZE_LIMIT,
            large_count_limit: DEFAULT_LARGE_COUNT_LIMIT,
            dedupe_restore_matches: true,
            restore_tie_break: TieBreakSetting::Newest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub protected_paths: Vec<PathBuf>,
    pub require_confirm: Vec<String>,
    pub backup_important: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            protected_paths: ["/", "/home", "/usr", "/etc", "/var", "/boot", "/sys", "/proc"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            require_confirm: ["*.env", "*.key", "*.pem", "config.toml", "*.config"]
                .into_iter()
                .map(String::from)
                .collect(),
            backup_important: false,
        }
    }
}

/// How the configuration was obtained, reported once logging is up.
#[derive(Debug)]
pub enum ConfigSource {
    File,
    CreatedDefault,
    /// Defaults in use, the template could not be written
    DefaultUnwritten(io::Error),
    /// Explicit `--config` file that does not exist
    Missing,
}

/// `~/.config/vanish/vanish.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("vanish").join(CONFIG_FILE))
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).wrap_err("invalid configuration")
    }

    /// Read `path`. When it does not exist and `create` is set, write the
    /// commented default file there; either way the defaults are used.
    pub fn load_or_init(path: &Path, create: bool) -> Result<(Self, ConfigSource)> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::parse(&text)
                    .wrap_err_with(|| format!("failed to load {}", path.display()))?;
                Ok((config, ConfigSource::File))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if !create {
                    return Ok((Self::default(), ConfigSource::Missing));
                }
                let source = match write_default(path) {
                    Ok(()) => ConfigSource::CreatedDefault,
                    Err(err) => ConfigSource::DefaultUnwritten(err),
                };
                Ok((Self::default(), source))
            }
            Err(err) => Err(err).wrap_err_with(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        expand_config_path(&self.cache.directory)
    }

    /// Build the engine's view. `no_confirm` is the command-line override.
    pub fn engine_config(&self, no_confirm: bool) -> Result<EngineConfig> {
        let protected = self
            .safety
            .protected_paths
            .iter()
            .map(|p| expand_config_path(p))
            .collect();
        let policy = SafetyPolicy::new(protected, &self.safety.require_confirm)
            .wrap_err("invalid [safety] require_confirm pattern")?
            .with_large_limits(
                self.behavior.large_size_limit,
                self.behavior.large_count_limit,
            )
            .with_confirm_on_large(self.behavior.confirm_on_large);

        Ok(EngineConfig {
            cache_dir: self.cache_dir(),
            retention_days: self.cache.days,
            policy,
            auto_confirm: no_confirm || self.ui.no_confirm || self.behavior.auto_confirm,
            backup_important: self.safety.backup_important,
            restore_matching: RestoreMatching {
                dedupe: self.behavior.dedupe_restore_matches,
                tie_break: match self.behavior.restore_tie_break {
                    TieBreakSetting::Newest => TieBreak::Newest,
                    TieBreakSetting::All => TieBreak::All,
                },
            },
        })
    }
}

fn write_default(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)
}
