//! Rendering preferences.
//!
//! Preferences are stored in TOML format at:
//! - Linux: `~/.config/midimaker/preferences.toml`
//! - macOS: `~/Library/Application Support/midimaker/preferences.toml`
//! - Windows: `%APPDATA%\midimaker\preferences.toml`
//!
//! A score can override any of them in its own `[preferences]` table.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunable parameters for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Chance that an improvised note reuses the previous duration.
    pub improv_repeat: f64,
    /// Chance that a random rhythm slot reuses the previous duration.
    pub rhythm_repeat: f64,
    /// Chance that a random rhythm slot is a rest.
    pub rhythm_rest: f64,
    /// Level of the `default` volume name and of every track at the start.
    pub default_volume: i32,
    /// Maximum jitter of note starts, in ticks.
    pub err_tim: u32,
    /// Maximum jitter of note lengths, in ticks.
    pub err_dur: u32,
    /// Maximum jitter of velocities.
    pub err_vol: u32,
    /// Seed for improvised melodies and jitter.
    pub seed: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            improv_repeat: 0.3,
            rhythm_repeat: 0.3,
            rhythm_rest: 0.5,
            default_volume: 100,
            err_tim: 10,
            err_dur: 10,
            err_vol: 5,
            seed: 12345,
        }
    }
}

impl Preferences {
    /// Preferences with every jitter magnitude set to zero.
    pub fn without_jitter(mut self) -> Self {
        self.err_tim = 0;
        self.err_dur = 0;
        self.err_vol = 0;
        self
    }

    /// Load preferences from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::from_path(&path)
        } else {
            Err(Error::Config(format!("Preferences file not found at {:?}", path)))
        }
    }

    /// Load preferences or return the defaults if there are none.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load preferences from a specific file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let prefs: Preferences = toml::from_str(&content)?;
        prefs.validated()
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default preferences file path.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "midimaker") {
            Ok(proj_dirs.config_dir().join("preferences.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default preferences file with comments.
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# midimaker preferences

# Probability (0.0-1.0) that an improvised note keeps the previous duration
improv_repeat = 0.3

# Random rhythms: probability of reusing the previous duration, and of a rest
rhythm_repeat = 0.3
rhythm_rest = 0.5

# Starting volume of every voice (0-127)
default_volume = 100

# Humanizing: maximum random change to note start (ticks), length (ticks)
# and velocity. 0 turns it off.
err_tim = 10
err_dur = 10
err_vol = 5

# Seed for improvisation and humanizing
seed = 12345
"#;

        fs::write(&path, content)?;
        Ok(path)
    }

    /// Overlay the keys of `table` on these preferences.
    pub fn merged(&self, table: &toml::Table) -> Result<Self> {
        let mut base = toml::Value::try_from(self)?;
        if let Some(fields) = base.as_table_mut() {
            for (key, value) in table {
                if !fields.contains_key(key) {
                    log::warn!("Unknown preference '{}'", key);
                    continue;
                }
                fields.insert(key.clone(), value.clone());
            }
        }
        let merged: Preferences = base.try_into()?;
        merged.validated()
    }

    fn validated(self) -> Result<Self> {
        for (name, value) in [
            ("improv_repeat", self.improv_repeat),
            ("rhythm_repeat", self.rhythm_repeat),
            ("rhythm_rest", self.rhythm_rest),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid(name, format!("{value} is not between 0 and 1")));
            }
        }
        if !(0..=127).contains(&self.default_volume) {
            return Err(Error::invalid(
                "default_volume",
                format!("{} is not between 0 and 127", self.default_volume),
            ));
        }
        Ok(self)
    }
}
