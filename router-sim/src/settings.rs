//! Simulator settings

use std::path::PathBuf;

use anyhow::Context;
use audio_sim::SimConfig;
use serde::{Deserialize, Serialize};

/// Simulator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Router configuration and the producers to simulate
    #[serde(default)]
    pub sim: SimConfig,
    /// Capacity of the actor command channel
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Capacity of the event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Scenario replayed when none is given on the command line
    #[serde(default)]
    pub default_scenario: Option<PathBuf>,
}

fn default_command_buffer() -> usize {
    64
}

fn default_event_buffer() -> usize {
    256
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            command_buffer: default_command_buffer(),
            event_buffer: default_event_buffer(),
            default_scenario: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for the simulator
    /// Uses $XDG_CONFIG_HOME/earbud-router, falls back to ~/.config/earbud-router
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("earbud-router"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("earbud-router"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, defaulting when absent or unreadable
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| Self::from_json(&s).ok())
            .unwrap_or_default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path().context("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_json(r#"{"event_buffer": 8}"#).unwrap();

        assert_eq!(settings.event_buffer, 8);
        assert_eq!(settings.command_buffer, 64);
        assert_eq!(settings.sim, SimConfig::default());
        assert!(settings.default_scenario.is_none());
    }

    #[test]
    fn test_settings_survive_json() {
        let mut settings = Settings::default();
        settings.sim.router.le_audio_routable = true;
        settings.default_scenario = Some(PathBuf::from("/tmp/call.json"));

        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
