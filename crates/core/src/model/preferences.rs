use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const THEME_KEY: &str = "pref.theme";
pub const LANGUAGE_KEY: &str = "pref.language";
pub const NOTIFICATIONS_KEY: &str = "pref.notifications";

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreferenceError {
    #[error("unknown theme: {0}")]
    InvalidTheme(String),
    #[error("invalid language tag: {0}")]
    InvalidLanguage(String),
    #[error("invalid toggle value: {0}")]
    InvalidToggle(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(PreferenceError::InvalidTheme(s.to_string())),
        }
    }
}

/// Local, per-device preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    theme: Theme,
    language: String,
    notifications_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            notifications_enabled: true,
        }
    }
}

impl Preferences {
    /// Build preferences from raw stored values.
    ///
    /// `lookup` returns the stored string for a key, if any. Each field that is missing
    /// or fails to parse falls back to its own default.
    pub fn from_entries<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let theme = lookup(THEME_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.theme);
        let language = lookup(LANGUAGE_KEY)
            .and_then(|raw| normalize_language(&raw).ok())
            .unwrap_or(defaults.language);
        let notifications_enabled = lookup(NOTIFICATIONS_KEY)
            .and_then(|raw| parse_toggle(&raw).ok())
            .unwrap_or(defaults.notifications_enabled);

        Self {
            theme,
            language,
            notifications_enabled,
        }
    }

    /// Key/value pairs suitable for a string store.
    #[must_use]
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (THEME_KEY, self.theme.as_str().to_string()),
            (LANGUAGE_KEY, self.language.clone()),
            (
                NOTIFICATIONS_KEY,
                if self.notifications_enabled { "on" } else { "off" }.to_string(),
            ),
        ]
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// # Errors
    ///
    /// Returns `PreferenceError::InvalidLanguage` if `language` is not a short language tag.
    pub fn set_language(&mut self, language: &str) -> Result<(), PreferenceError> {
        self.language = normalize_language(language)?;
        Ok(())
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }
}

/// Accept tags such as `en`, `de`, `pt-BR`; lowercase the primary subtag.
fn normalize_language(raw: &str) -> Result<String, PreferenceError> {
    let trimmed = raw.trim();
    let mut parts = trimmed.split('-');
    let primary = parts.next().unwrap_or_default();
    let region = parts.next();

    let primary_ok = (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic());
    let region_ok = region.is_none_or(|r| {
        (2..=3).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if !primary_ok || !region_ok || parts.next().is_some() {
        return Err(PreferenceError::InvalidLanguage(raw.to_string()));
    }

    Ok(match region {
        Some(region) => format!(
            "{}-{}",
            primary.to_ascii_lowercase(),
            region.to_ascii_uppercase()
        ),
        None => primary.to_ascii_lowercase(),
    })
}

/// Parse an on/off style toggle.
///
/// # Errors
///
/// Returns `PreferenceError::InvalidToggle` for anything that is not a recognised boolean.
pub fn parse_toggle(raw: &str) -> Result<bool, PreferenceError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(PreferenceError::InvalidToggle(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_entries_fall_back_to_defaults() {
        let prefs = Preferences::from_entries(|_| None);
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn bad_values_only_reset_their_own_field() {
        let stored: HashMap<&str, &str> = HashMap::from([
            (THEME_KEY, "neon"),
            (LANGUAGE_KEY, "pt-br"),
            (NOTIFICATIONS_KEY, "off"),
        ]);
        let prefs = Preferences::from_entries(|key| stored.get(key).map(ToString::to_string));

        assert_eq!(prefs.theme(), Theme::System);
        assert_eq!(prefs.language(), "pt-BR");
        assert!(!prefs.notifications_enabled());
    }

    #[test]
    fn entries_round_trip() {
        let mut prefs = Preferences::default();
        prefs.set_theme(Theme::Dark);
        prefs.set_language("DE").unwrap();
        prefs.set_notifications_enabled(false);

        let stored: HashMap<&str, String> = prefs.to_entries().into_iter().collect();
        let restored = Preferences::from_entries(|key| stored.get(key).cloned());
        assert_eq!(restored, prefs);
    }

    #[test]
    fn rejects_malformed_language() {
        let mut prefs = Preferences::default();
        assert!(prefs.set_language("english").is_err());
        assert!(prefs.set_language("en-US-x").is_err());
        assert_eq!(prefs.language(), DEFAULT_LANGUAGE);
    }
}
