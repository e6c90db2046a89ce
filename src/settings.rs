use crate::dispatcher::{
    HotkeyBindings, DEFAULT_ANSWERS_CHAR, DEFAULT_CAPTURE_CHAR, DEFAULT_RESET_CHAR,
    DEFAULT_RESULTS_CHAR, DEFAULT_SETTINGS_CHAR,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "quizlens_settings.json";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Trigger characters for the Alt-gated hotkeys. Invalid characters fall
    /// back to the defaults with a warning when the binding table is built.
    #[serde(default = "default_capture_key")]
    pub capture_key: char,
    #[serde(default = "default_results_key")]
    pub results_key: char,
    #[serde(default = "default_answers_key")]
    pub answers_key: char,
    #[serde(default = "default_reset_key")]
    pub reset_key: char,
    #[serde(default = "default_settings_key")]
    pub settings_key: char,
    /// Answer tokens per line in the answers popup.
    #[serde(default = "default_answers_per_line")]
    pub answers_per_line: usize,
    /// Popup window opacity, 0-255.
    #[serde(default = "default_popup_opacity")]
    pub popup_opacity: u8,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Upper bound in seconds for one analysis call.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

fn default_capture_key() -> char {
    DEFAULT_CAPTURE_CHAR
}

fn default_results_key() -> char {
    DEFAULT_RESULTS_CHAR
}

fn default_answers_key() -> char {
    DEFAULT_ANSWERS_CHAR
}

fn default_reset_key() -> char {
    DEFAULT_RESET_CHAR
}

fn default_settings_key() -> char {
    DEFAULT_SETTINGS_CHAR
}

fn default_answers_per_line() -> usize {
    10
}

fn default_popup_opacity() -> u8 {
    230
}

fn default_api_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture_key: default_capture_key(),
            results_key: default_results_key(),
            answers_key: default_answers_key(),
            reset_key: default_reset_key(),
            settings_key: default_settings_key(),
            answers_per_line: default_answers_per_line(),
            popup_opacity: default_popup_opacity(),
            debug_logging: false,
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn bindings(&self) -> HotkeyBindings {
        HotkeyBindings::with_chars(
            self.capture_key,
            self.results_key,
            self.answers_key,
            self.reset_key,
            self.settings_key,
        )
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs.max(1))
    }

    /// One-line hotkey reference for the startup log and tray tooltip.
    pub fn hotkey_summary(&self) -> String {
        format!(
            "Alt+{} capture, Alt+{} results, Alt+{} answers, Alt+{} reset, Alt+{} settings, ` exit",
            self.capture_key, self.results_key, self.answers_key, self.reset_key, self.settings_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.capture_key, 'z');
        assert_eq!(settings.answers_per_line, 10);
        assert_eq!(settings.api_timeout_secs, 30);
        assert!(!settings.debug_logging);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"capture_key":"q","debug_logging":true}"#).unwrap();
        assert_eq!(settings.capture_key, 'q');
        assert!(settings.debug_logging);
        assert_eq!(settings.results_key, 'x');
    }

    #[test]
    fn timeout_has_a_floor_of_one_second() {
        let settings = Settings {
            api_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.api_timeout(), Duration::from_secs(1));
    }
}
