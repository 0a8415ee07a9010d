use std::collections::HashMap;
use std::sync::Arc;

use lingo_core::model::{
    LANGUAGE_KEY, NOTIFICATIONS_KEY, PreferenceError, Preferences, THEME_KEY, Theme,
};
use storage::repository::PreferenceStore;

/// Local preferences with graceful degradation.
///
/// Storage failures are logged and never reach the caller: reads fall back to defaults,
/// writes are dropped.
#[derive(Clone)]
pub struct PreferencesService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Load persisted preferences, substituting defaults for anything unreadable.
    pub async fn load(&self) -> Preferences {
        let mut stored = HashMap::new();
        for key in [THEME_KEY, LANGUAGE_KEY, NOTIFICATIONS_KEY] {
            match self.store.get(key).await {
                Ok(Some(value)) => {
                    stored.insert(key, value);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(key, error = %err, "preference read failed, using default");
                }
            }
        }
        Preferences::from_entries(|key| stored.remove(key))
    }

    /// Persist every preference entry. Returns whether all writes succeeded.
    pub async fn save(&self, preferences: &Preferences) -> bool {
        let mut all_saved = true;
        for (key, value) in preferences.to_entries() {
            all_saved &= self.write(key, &value).await;
        }
        all_saved
    }

    /// Setters only write their own key, so a value that failed to load is never
    /// replaced by its default.
    pub async fn set_theme(&self, theme: Theme) -> Preferences {
        let mut preferences = self.load().await;
        preferences.set_theme(theme);
        self.write_entry(&preferences, THEME_KEY).await;
        preferences
    }

    /// # Errors
    ///
    /// Returns `PreferenceError::InvalidLanguage` for a malformed tag; nothing is written.
    pub async fn set_language(&self, language: &str) -> Result<Preferences, PreferenceError> {
        let mut preferences = self.load().await;
        preferences.set_language(language)?;
        self.write_entry(&preferences, LANGUAGE_KEY).await;
        Ok(preferences)
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> Preferences {
        let mut preferences = self.load().await;
        preferences.set_notifications_enabled(enabled);
        self.write_entry(&preferences, NOTIFICATIONS_KEY).await;
        preferences
    }

    async fn write_entry(&self, preferences: &Preferences, key: &str) -> bool {
        match preferences
            .to_entries()
            .into_iter()
            .find(|(entry_key, _)| *entry_key == key)
        {
            Some((key, value)) => self.write(key, &value).await,
            None => false,
        }
    }

    async fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "preference write failed");
                false
            }
        }
    }
}
