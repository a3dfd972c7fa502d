//! Durable storage backed by the filesystem

mod file_store;

pub use file_store::FileStore;
