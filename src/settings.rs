use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::capture::GateProfiles;
use crate::models::InteractionMode;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

const ENV_MODE: &str = "COMPANION_MODE";
const ENV_POLL_MS: &str = "COMPANION_POLL_MS";
const ENV_OVERLAY: &str = "COMPANION_OVERLAY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanionSettings {
    pub interaction_mode: InteractionMode,
    pub poll_interval_ms: u64,
    pub overlay_enabled: bool,
    pub voice_enabled: bool,
    pub notifications_enabled: bool,
    pub gate_profiles: GateProfiles,
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            interaction_mode: InteractionMode::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            overlay_enabled: true,
            voice_enabled: true,
            notifications_enabled: true,
            gate_profiles: GateProfiles::default(),
        }
    }
}

impl CompanionSettings {
    /// Sampling period; zero is bumped to 1ms so the interval timer stays valid.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MODE) {
            match raw.parse::<InteractionMode>() {
                Ok(mode) => self.interaction_mode = mode,
                Err(err) => log::warn!("Ignoring {}: {}", ENV_MODE, err),
            }
        }

        if let Some(raw) = lookup(ENV_POLL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(err) => log::warn!("Ignoring {}={:?}: {}", ENV_POLL_MS, raw, err),
            }
        }

        if let Some(raw) = lookup(ENV_OVERLAY) {
            match parse_flag(&raw) {
                Some(enabled) => self.overlay_enabled = enabled,
                None => log::warn!("Ignoring {}={:?}: expected a boolean", ENV_OVERLAY, raw),
            }
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CompanionSettings>,
}

impl SettingsStore {
    /// Loads settings from `path` with process-environment overrides applied.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: impl Into<PathBuf>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.into();
        let mut data = read_settings(&path)?;
        data.apply_overrides(lookup);

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> CompanionSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reload(&self) -> Result<()> {
        self.reload_with(|key| std::env::var(key).ok())
    }

    pub fn reload_with<F>(&self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut data = read_settings(&self.path)?;
        data.apply_overrides(lookup);
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<CompanionSettings> {
    if !path.exists() {
        return Ok(CompanionSettings::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;

    match serde_json::from_str(&contents) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            log::warn!(
                "Malformed settings in {}, using defaults: {}",
                path.display(),
                err
            );
            Ok(CompanionSettings::default())
        }
    }
}
