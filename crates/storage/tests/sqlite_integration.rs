use storage::repository::{PreferenceStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_upserts_and_reads_preferences() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_prefs_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("pref.theme").await.unwrap(), None);

    repo.set("pref.theme", "dark").await.unwrap();
    repo.set("pref.theme", "light").await.unwrap();
    repo.set("pref.language", "de").await.unwrap();

    assert_eq!(repo.get("pref.theme").await.unwrap().as_deref(), Some("light"));
    assert_eq!(repo.get("pref.language").await.unwrap().as_deref(), Some("de"));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM preferences")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn sqlite_remove_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_prefs_remove?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.set("pref.notifications", "off").await.unwrap();
    repo.remove("pref.notifications").await.unwrap();
    repo.remove("pref.notifications").await.unwrap();

    assert_eq!(repo.get("pref.notifications").await.unwrap(), None);
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_prefs_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn storage_sqlite_wires_preferences() {
    let storage = Storage::sqlite("sqlite:file:memdb_prefs_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.preferences.set("pref.language", "fr").await.unwrap();
    assert_eq!(
        storage.preferences.get("pref.language").await.unwrap().as_deref(),
        Some("fr")
    );
}

#[tokio::test]
async fn file_database_is_created_in_wal_mode() {
    let path = std::env::temp_dir().join(format!("lingo-prefs-{}.sqlite3", std::process::id()));
    let url = format!("sqlite://{}", path.display());

    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo.set("pref.theme", "dark").await.unwrap();

    let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(mode, "wal");
    assert!(path.exists());

    repo.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
