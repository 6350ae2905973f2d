//! Per-user preferences

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::Unit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Theme::System),
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{other}' (expected system, dark or light)")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub theme: Theme,
    pub default_unit: Unit,
    /// Start the rest timer as soon as a set is logged
    pub auto_rest_on_set_done: bool,
    pub focus_mode: bool,
}

impl UserSettings {
    /// Build settings from stored text columns.
    ///
    /// An unknown theme discards the whole row; an unknown unit only
    /// resets the unit.
    pub fn from_stored(theme: Option<&str>, unit: Option<&str>, auto_rest: bool, focus_mode: bool) -> Self {
        let Ok(theme) = theme.unwrap_or("system").parse::<Theme>() else {
            return Self::default();
        };
        let default_unit = unit.unwrap_or("kg").parse::<Unit>().unwrap_or_default();
        Self { theme, default_unit, auto_rest_on_set_done: auto_rest, focus_mode }
    }
}
