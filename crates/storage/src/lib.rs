#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, KeyValueStore, LastWatchedSlot, Storage, StorageError, last_watched_key,
};
