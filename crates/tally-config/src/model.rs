use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tally_domain::HabitColor;

pub const DEFAULT_DISPLAY_NAME: &str = "User";
const DATA_DIR_NAME: &str = "tally";

/// User profile and preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_display_name")]
    pub display_name: String,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    #[serde(default = "Config::default_locale")]
    pub locale: String,
    #[serde(default)]
    pub default_habit_color: HabitColor,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for tracker data. Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_name: Self::default_display_name(),
            currency: Self::default_currency(),
            locale: Self::default_locale(),
            default_habit_color: HabitColor::default(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn default_display_name() -> String {
        DEFAULT_DISPLAY_NAME.into()
    }

    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn default_locale() -> String {
        "en-US".into()
    }

    /// Blank input falls back to the default name.
    pub fn set_display_name(&mut self, input: &str) {
        let trimmed = input.trim();
        self.display_name = if trimmed.is_empty() {
            Self::default_display_name()
        } else {
            trimmed.to_string()
        };
    }

    /// Avatar text: first two characters of the display name, uppercased.
    pub fn initials(&self) -> String {
        self.display_name
            .trim()
            .chars()
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DATA_DIR_NAME)
    }

    pub(crate) fn normalized(mut self) -> Self {
        let name = self.display_name.clone();
        self.set_display_name(&name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_take_two_uppercased_chars() {
        let mut cfg = Config::default();
        cfg.set_display_name("  ada lovelace");
        assert_eq!(cfg.initials(), "AD");
        cfg.set_display_name("q");
        assert_eq!(cfg.initials(), "Q");
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        let mut cfg = Config::default();
        cfg.set_display_name("Grace");
        cfg.set_display_name("   ");
        assert_eq!(cfg.display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(cfg.initials(), "US");
    }

    #[test]
    fn explicit_data_dir_wins() {
        let cfg = Config {
            data_dir: Some(PathBuf::from("/srv/tally")),
            ..Config::default()
        };
        assert_eq!(cfg.resolve_data_dir(), PathBuf::from("/srv/tally"));
    }
}
