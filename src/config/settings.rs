// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Rostrum
//!
//! Handles loading and saving settings from ~/.rostrum/settings.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Environment variable consulted when no user credential is stored
pub const CREDENTIAL_ENV_VAR: &str = "GEMINI_API_KEY";

/// Main settings structure, stored in ~/.rostrum/settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// User-supplied API credential; the process environment is the fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for debater and judge calls
    #[serde(default = "default_model")]
    pub model: String,

    /// Whether debater turns stream partial content as it is generated
    #[serde(default = "default_streaming")]
    pub streaming: bool,

    /// Retry and resilience settings for API calls
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            streaming: default_streaming(),
            resilience: ResilienceConfig::default(),
        }
    }
}

/// Retry configuration for model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter percentage (0.0 to 1.0) for randomizing delays
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_streaming() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_jitter() -> f64 {
    0.0
}

impl Settings {
    /// Get the rostrum home directory (~/.rostrum)
    pub fn rostrum_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rostrum")
    }

    /// Path to the settings file
    pub fn settings_path() -> PathBuf {
        Self::rostrum_home().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path())
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content).unwrap_or_default())
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to disk, creating the home directory if needed
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path())
    }

    /// Save settings to an explicit path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the effective credential: stored key first, process env second.
    ///
    /// Returns `None` when neither is usable; callers treat that as a hard
    /// precondition failure for model invocation.
    pub fn effective_credential(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            let trimmed = key.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        std::env::var(CREDENTIAL_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_string())
    }

    /// Store a user credential; an empty string clears it
    pub fn set_credential(&mut self, key: &str) {
        let trimmed = key.trim();
        self.api_key = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert!(settings.streaming);
        assert_eq!(settings.resilience.max_attempts, 3);
        assert_eq!(settings.resilience.base_delay_ms, 100);
    }

    #[test]
    fn test_settings_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.set_credential("my-key");
        settings.model = "gemini-2.5-pro".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("my-key"));
        assert_eq!(loaded.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_settings_load_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.json");

        let loaded = Settings::load_from(&path).unwrap();
        assert!(loaded.api_key.is_none());
    }

    #[test]
    fn test_settings_load_garbage_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_set_credential_trims_and_clears() {
        let mut settings = Settings::default();
        settings.set_credential("  key-123  ");
        assert_eq!(settings.api_key.as_deref(), Some("key-123"));

        settings.set_credential("   ");
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_effective_credential_prefers_stored_key() {
        let mut settings = Settings::default();
        settings.set_credential("stored-key");
        assert_eq!(settings.effective_credential().as_deref(), Some("stored-key"));
    }

    #[test]
    fn test_resilience_config_deserialize_partial() {
        let json = r#"{"max_attempts": 5}"#;
        let config: ResilienceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 100);
    }
}
