//! Persistence Adapters
//!
//! Implementations of `StoragePort`.

pub mod in_memory;

pub use in_memory::InMemoryStorage;
