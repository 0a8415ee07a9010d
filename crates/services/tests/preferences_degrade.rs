use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lingo_core::model::{LANGUAGE_KEY, Preferences, THEME_KEY, Theme};
use services::PreferencesService;
use storage::repository::{InMemoryPreferenceStore, PreferenceStore, StorageError};

/// Store that can be switched into a failing mode.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryPreferenceStore,
    broken: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StorageError::Connection("disk unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PreferenceStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.remove(key).await
    }
}

/// Store whose reads of one key always fail.
struct UnreadableKeyStore {
    inner: InMemoryPreferenceStore,
    unreadable: &'static str,
}

#[async_trait]
impl PreferenceStore for UnreadableKeyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if key == self.unreadable {
            return Err(StorageError::Connection("row locked".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn preferences_persist_through_service() {
    let store = Arc::new(InMemoryPreferenceStore::new());
    let service = PreferencesService::new(store.clone());

    service.set_theme(Theme::Dark).await;
    service.set_language("es").await.unwrap();
    service.set_notifications_enabled(false).await;

    let loaded = service.load().await;
    assert_eq!(loaded.theme(), Theme::Dark);
    assert_eq!(loaded.language(), "es");
    assert!(!loaded.notifications_enabled());
    assert_eq!(store.get(THEME_KEY).await.unwrap().as_deref(), Some("dark"));
}

#[tokio::test]
async fn unreadable_store_yields_defaults() {
    let store = Arc::new(FlakyStore::default());
    store.inner.set(THEME_KEY, "dark").await.unwrap();
    store.broken.store(true, Ordering::SeqCst);

    let service = PreferencesService::new(store);
    assert_eq!(service.load().await, Preferences::default());
}

#[tokio::test]
async fn failed_writes_are_swallowed() {
    let store = Arc::new(FlakyStore::default());
    store.broken.store(true, Ordering::SeqCst);
    let service = PreferencesService::new(store.clone());

    let prefs = service.set_theme(Theme::Light).await;
    assert_eq!(prefs.theme(), Theme::Light);
    assert!(!service.save(&prefs).await);

    store.broken.store(false, Ordering::SeqCst);
    assert_eq!(service.load().await.theme(), Theme::System);
}

#[tokio::test]
async fn invalid_language_is_not_written() {
    let store = Arc::new(InMemoryPreferenceStore::new());
    let service = PreferencesService::new(store);

    assert!(service.set_language("klingon-empire").await.is_err());
    assert_eq!(service.load().await.language(), "en");
}

#[tokio::test]
async fn setter_keeps_unreadable_values_intact() {
    let store = Arc::new(UnreadableKeyStore {
        inner: InMemoryPreferenceStore::new(),
        unreadable: THEME_KEY,
    });
    store.inner.set(THEME_KEY, "dark").await.unwrap();
    let service = PreferencesService::new(store.clone());

    let prefs = service.set_language("de").await.unwrap();
    assert_eq!(prefs.theme(), Theme::System);
    assert_eq!(prefs.language(), "de");

    assert_eq!(store.inner.get(THEME_KEY).await.unwrap().as_deref(), Some("dark"));
    assert_eq!(store.inner.get(LANGUAGE_KEY).await.unwrap().as_deref(), Some("de"));
}
