//! Simulation settings.
//!
//! The simulator runs with built-in defaults; an optional YAML settings file
//! (`-c <path>`) overrides them. Every field is optional so partial files are
//! accepted gracefully:
//!
//! ```yaml
//! arena_size: 1024
//! event_log: scheduler.log
//! perf_log: scheduler.perf
//! memory_log: memory.log
//! ```
//!
//! The arena must be a power of two; other values are rounded up with a
//! warning rather than rejected.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default arena size in bytes.
pub const DEFAULT_ARENA_SIZE: u64 = 1024;

/// A settings file the simulator cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("arena_size must be positive")]
    ZeroArenaSize,
}

// ── Private YAML deserialization type ─────────────────────────────────────────

/// File layout as written on disk. Kept private — callers work with the
/// validated [`SimConfig`].
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    arena_size: Option<u64>,
    event_log: Option<PathBuf>,
    perf_log: Option<PathBuf>,
    memory_log: Option<PathBuf>,
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Validated simulation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Memory arena size in bytes. Always a power of two.
    pub arena_size: u64,
    /// Event log path (`scheduler.log`).
    pub event_log: PathBuf,
    /// Performance summary path (`scheduler.perf`).
    pub perf_log: PathBuf,
    /// Memory trace path (`memory.log`).
    pub memory_log: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            event_log: PathBuf::from("scheduler.log"),
            perf_log: PathBuf::from("scheduler.perf"),
            memory_log: PathBuf::from("memory.log"),
        }
    }
}

impl SimConfig {
    /// Parse `path` and merge it over the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, or `arena_size` is zero.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("loading simulation settings from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open settings file: {}", path.display()))?;
        let file: SettingsFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))?;

        let defaults = Self::default();
        let mut cfg = Self {
            arena_size: file.arena_size.unwrap_or(defaults.arena_size),
            event_log: file.event_log.unwrap_or(defaults.event_log),
            perf_log: file.perf_log.unwrap_or(defaults.perf_log),
            memory_log: file.memory_log.unwrap_or(defaults.memory_log),
        };

        if cfg.arena_size == 0 {
            return Err(ConfigError::ZeroArenaSize.into());
        }
        if !cfg.arena_size.is_power_of_two() {
            let rounded = cfg.arena_size.next_power_of_two();
            warn!(
                requested = cfg.arena_size,
                rounded, "arena size is not a power of two; rounding up"
            );
            cfg.arena_size = rounded;
        }

        info!(
            arena_size = cfg.arena_size,
            event_log = %cfg.event_log.display(),
            "settings loaded"
        );
        Ok(cfg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
