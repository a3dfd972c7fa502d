//! Durable key/value storage port and an in-memory implementation

pub mod memory;
pub mod ports;

pub use memory::MemoryStore;
pub use ports::{DurableStore, StoreError};
