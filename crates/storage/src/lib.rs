#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryPreferenceStore, PreferenceStore, Storage, StorageError};
