use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::comments::OrphanPolicy;

/// Overrides `tickIntervalMs`; handy for fast-forwarding timers in demos.
pub const TICK_ENV_VAR: &str = "RECIPE_SESSION_TICK_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChimeSettings {
    pub enabled: bool,
    pub volume: f32,
    pub frequency_hz: f32,
}

impl Default for ChimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.6,
            frequency_hz: 880.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Wall-clock spacing of timer ticks. Every tick removes one second.
    pub tick_interval_ms: u64,
    pub orphan_policy: OrphanPolicy,
    pub chime: ChimeSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            orphan_policy: OrphanPolicy::Drop,
            chime: ChimeSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = std::env::var(TICK_ENV_VAR)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            self.tick_interval_ms = ms;
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<SessionConfig>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            SessionConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> SessionConfig {
        self.data
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn chime(&self) -> ChimeSettings {
        self.config().chime
    }

    pub fn update_chime(&self, mut settings: ChimeSettings) -> Result<()> {
        settings.volume = settings.volume.clamp(0.0, 1.0);
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        guard.chime = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &SessionConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.config(), SessionConfig::default());
    }

    #[test]
    fn partial_file_fills_remaining_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"orphanPolicy":"promoteToRoot","chime":{"volume":0.2}}"#).unwrap();

        let config = SettingsStore::new(path).unwrap().config();
        assert_eq!(config.orphan_policy, OrphanPolicy::PromoteToRoot);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.chime.volume, 0.2);
        assert!(config.chime.enabled);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert_eq!(SettingsStore::new(path).unwrap().config(), SessionConfig::default());
    }

    #[test]
    fn chime_update_is_clamped_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .update_chime(ChimeSettings {
                enabled: false,
                volume: 3.0,
                frequency_hz: 440.0,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap().chime();
        assert!(!reloaded.enabled);
        assert_eq!(reloaded.volume, 1.0);
        assert_eq!(reloaded.frequency_hz, 440.0);
    }

    #[test]
    fn tick_interval_never_zero() {
        let config = SessionConfig {
            tick_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }
}
