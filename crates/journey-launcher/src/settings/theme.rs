//! Theme preference shared by the launcher and its apps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SettingsStore;
use crate::error::Result;

/// Settings key holding the theme.
pub const THEME_KEY: &str = "ui/theme";

/// UI theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark palette.
    #[default]
    Dark,
    /// Light palette.
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dark => write!(f, "dark"),
            Self::Light => write!(f, "light"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

impl Theme {
    /// Read the stored theme. Missing or unknown values fall back to dark.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: &dyn SettingsStore) -> Result<Self> {
        Ok(store
            .get(THEME_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    /// Persist this theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save(self, store: &dyn SettingsStore) -> Result<()> {
        store.set(THEME_KEY, &self.to_string())
    }
}
