//! On-disk configuration (SPEC_FULL.md §A "Configuration").
//!
//! A `BarConfig` persisted as JSON under the platform config directory,
//! following the same `serde_json` + `dirs::config_dir()` + `0600`
//! permission pattern as the teacher's `config.rs` `Config`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::Alignment;

/// Module roster and adapter settings plus the compose/throttle/click
/// knobs the aggregator actually consumes (spec §4.8, §4.6; SPEC_FULL.md
/// §A: "alignment padding/separators, throttle limit/window, double-click
/// debounce, socket directory override, and the list of configured module
/// names per alignment").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarConfig {
    /// Separator string inserted between modules within one alignment.
    pub separator: String,
    /// Drawn before the first module of each alignment section.
    pub padding_start: String,
    /// Drawn after the last module of each alignment section.
    pub padding_end: String,
    /// Maximum redraws the [`crate::throttle::Throttler`] permits per
    /// `throttle_window_ms` (spec §4.6 default: 3).
    pub throttle_limit: usize,
    /// Sliding window size, in milliseconds, for the redraw throttler
    /// (spec §4.6 default: 60).
    pub throttle_window_ms: u64,
    /// Double-click debounce, in milliseconds (SPEC_FULL.md §D open
    /// question 3; default 250, the OS double-click threshold spec §4.8
    /// cites).
    pub double_click_ms: u64,
    /// Override for the IPC runtime directory; `None` uses the
    /// `$XDG_RUNTIME_DIR/polybar`-or-`/tmp/polybar-<uid>` resolution in
    /// [`crate::ipc::dispatcher::runtime_dir`].
    pub socket_dir_override: Option<PathBuf>,
    /// Whether to also serve the legacy named-pipe fallback (SPEC_FULL.md
    /// §D open question 4; default `false`).
    pub enable_legacy_fifo: bool,
    /// Module names configured per alignment, in display order.
    pub modules: HashMap<Alignment, Vec<String>>,
    /// Opaque adapter-specific settings (ALSA device, MPD host, interface
    /// name, ...) handed verbatim to each module's constructor; this
    /// layer never interprets them (spec §1 non-goals).
    pub module_settings: HashMap<String, HashMap<String, String>>,
}

impl Default for BarConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert(Alignment::Left, Vec::new());
        modules.insert(Alignment::Center, Vec::new());
        modules.insert(Alignment::Right, Vec::new());
        Self {
            separator: String::new(),
            padding_start: String::new(),
            padding_end: String::new(),
            throttle_limit: 3,
            throttle_window_ms: 60,
            double_click_ms: 250,
            socket_dir_override: None,
            enable_legacy_fifo: false,
            modules,
            module_settings: HashMap::new(),
        }
    }
}

impl BarConfig {
    /// The directory `config.json` lives under, creating it if missing.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("could not determine platform config directory")?.join("bard");
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(dir)
    }

    /// Load from `path` if given, else from the platform config
    /// directory's `config.json`; falls back to [`BarConfig::default`] if
    /// no file exists.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir()?.join("config.json"),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Persist to `path` if given, else to the platform config
    /// directory's `config.json`, with `0600` permissions (spec: "kept
    /// for backward compatibility" pattern from the teacher's `save`).
    pub fn save(&self, path: Option<&std::path::Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir()?.join("config.json"),
        };
        fs::write(&path, serde_json::to_string_pretty(self)?).with_context(|| format!("writing {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// The socket directory the IPC dispatcher should use: the config
    /// override if set, else [`crate::ipc::dispatcher::runtime_dir`]'s
    /// resolution.
    pub fn socket_dir(&self) -> Result<PathBuf> {
        match &self.socket_dir_override {
            Some(dir) => {
                fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
                Ok(dir.clone())
            }
            None => crate::ipc::dispatcher::runtime_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_sensible_throttle_and_debounce() {
        let config = BarConfig::default();
        assert_eq!(config.throttle_limit, 3);
        assert_eq!(config.throttle_window_ms, 60);
        assert_eq!(config.double_click_ms, 250);
        assert!(!config.enable_legacy_fifo);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut config = BarConfig::default();
        config.separator = " | ".to_string();
        config.modules.get_mut(&Alignment::Left).unwrap().push("time".to_string());
        config.save(Some(&path)).unwrap();

        let loaded = BarConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.separator, " | ");
        assert_eq!(loaded.modules[&Alignment::Left], vec!["time".to_string()]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nonexistent.json");
        let config = BarConfig::load(Some(&path)).unwrap();
        assert_eq!(config.throttle_limit, BarConfig::default().throttle_limit);
    }

    #[test]
    fn socket_dir_override_is_created_and_returned() {
        let tmp = tempfile::TempDir::new().unwrap();
        let override_dir = tmp.path().join("sockets");
        let mut config = BarConfig::default();
        config.socket_dir_override = Some(override_dir.clone());
        assert_eq!(config.socket_dir().unwrap(), override_dir);
        assert!(override_dir.exists());
    }
}
