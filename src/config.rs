//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--sort`, `--look-ahead`, etc.)
//! 2. `$IMAGE_PAGER_CONFIG` environment variable (path to config file)
//! 3. Project-local `.image-pager.toml` in the current working directory
//! 4. Global `~/.config/image-pager/config.toml`
//! 5. Built-in defaults
//!
//! The paging engine never reads this directly. It receives a
//! [`ViewerSettings`] value built from the merged configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::provider::default_extensions;
use crate::fs::sorting::SortOrder;
use crate::query::staged::DEFAULT_INITIAL_BATCH;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting folder (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Start the session with decode-failure notices silenced.
    pub suppress_decode_errors: Option<bool>,
}

/// Sort preferences.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SortConfig {
    /// File order within a folder: "name", "name_desc", "modified",
    /// "modified_desc" or "random".
    pub files: Option<String>,
    /// Sibling folder order, same spellings.
    pub folders: Option<String>,
}

/// Background prefetch window.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Sibling folders built ahead of the current one.
    pub look_ahead: Option<usize>,
    /// Sibling folders built behind the current one.
    pub look_behind: Option<usize>,
}

/// Folder query settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct QueryConfig {
    /// Size of the fast first batch of a staged folder query.
    pub initial_batch: Option<usize>,
    /// Image extensions to list, without the dot.
    pub extensions: Option<Vec<String>>,
}

/// Output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DisplayConfig {
    /// Images per page.
    pub page_size: Option<usize>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub sort: SortConfig,
    pub prefetch: PrefetchConfig,
    pub query: QueryConfig,
    pub display: DisplayConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_LOOK_AHEAD: usize = 4;
pub const DEFAULT_LOOK_BEHIND: usize = 2;
pub const DEFAULT_PAGE_SIZE: usize = 4;

/// Name of the environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "IMAGE_PAGER_CONFIG";

// ── Engine settings ──────────────────────────────────────────────────────────

/// Preferences the paging engine embeds in every collection it builds.
///
/// Changing any of them means rebuilding the navigator's cache, since cached
/// collections were built with the old values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSettings {
    pub file_order: SortOrder,
    pub folder_order: SortOrder,
    pub look_ahead: usize,
    pub look_behind: usize,
    pub initial_batch: usize,
    pub extensions: Vec<String>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            file_order: SortOrder::default(),
            folder_order: SortOrder::default(),
            look_ahead: DEFAULT_LOOK_AHEAD,
            look_behind: DEFAULT_LOOK_BEHIND,
            initial_batch: DEFAULT_INITIAL_BATCH,
            extensions: default_extensions(),
        }
    }
}

impl ViewerSettings {
    /// Collections kept in memory: room for the whole prefetch window on
    /// both sides, and never fewer than two.
    pub fn cache_capacity(&self) -> usize {
        (2 * (self.look_ahead + self.look_behind)).max(2)
    }
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".image-pager.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("image-pager").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a logged warning).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => {
            log::debug!("loaded config from {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            log::warn!("failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse a sort order value, warning about unknown spellings.
fn parse_order(value: Option<&str>, what: &str) -> SortOrder {
    match value {
        None => SortOrder::default(),
        Some(s) => SortOrder::parse(s).unwrap_or_else(|| {
            log::warn!("unknown {} sort order {:?}, using name", what, s);
            SortOrder::default()
        }),
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                suppress_decode_errors: other
                    .general
                    .suppress_decode_errors
                    .or(self.general.suppress_decode_errors),
            },
            sort: SortConfig {
                files: other.sort.files.clone().or(self.sort.files),
                folders: other.sort.folders.clone().or(self.sort.folders),
            },
            prefetch: PrefetchConfig {
                look_ahead: other.prefetch.look_ahead.or(self.prefetch.look_ahead),
                look_behind: other.prefetch.look_behind.or(self.prefetch.look_behind),
            },
            query: QueryConfig {
                initial_batch: other.query.initial_batch.or(self.query.initial_batch),
                extensions: other.query.extensions.clone().or(self.query.extensions),
            },
            display: DisplayConfig {
                page_size: other.display.page_size.or(self.display.page_size),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn default_path(&self) -> Option<&str> {
        self.general.default_path.as_deref()
    }

    pub fn suppress_decode_errors(&self) -> bool {
        self.general.suppress_decode_errors.unwrap_or(false)
    }

    pub fn file_order(&self) -> SortOrder {
        parse_order(self.sort.files.as_deref(), "file")
    }

    pub fn folder_order(&self) -> SortOrder {
        parse_order(self.sort.folders.as_deref(), "folder")
    }

    pub fn look_ahead(&self) -> usize {
        self.prefetch.look_ahead.unwrap_or(DEFAULT_LOOK_AHEAD)
    }

    pub fn look_behind(&self) -> usize {
        self.prefetch.look_behind.unwrap_or(DEFAULT_LOOK_BEHIND)
    }

    /// Initial batch size, at least one.
    pub fn initial_batch(&self) -> usize {
        self.query
            .initial_batch
            .unwrap_or(DEFAULT_INITIAL_BATCH)
            .max(1)
    }

    /// Lowercased extensions to list; the built-in image set when unset.
    pub fn extensions(&self) -> Vec<String> {
        match &self.query.extensions {
            Some(exts) => exts
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => default_extensions(),
        }
    }

    /// Images per page, at least one.
    pub fn page_size(&self) -> usize {
        self.display.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    /// The settings value handed to the paging engine.
    pub fn viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            file_order: self.file_order(),
            folder_order: self.folder_order(),
            look_ahead: self.look_ahead(),
            look_behind: self.look_behind(),
            initial_batch: self.initial_batch(),
            extensions: self.extensions(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
