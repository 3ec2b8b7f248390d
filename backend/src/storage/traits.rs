//! # Storage Traits
//!
//! The store persists through a plain key-value surface so the domain layer
//! does not care whether records end up in files, in memory, or somewhere
//! else entirely.

use anyhow::Result;

/// Trait defining the interface for key-value persistence
///
/// Values are complete serialized documents. Implementations must make a
/// successful `set` durable before returning; the store relies on that to
/// guarantee every mutation is persisted when the call completes.
pub trait KeyValueStorage {
    /// Read the value stored under `key`, `None` if nothing is stored
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`
    /// Returns true if a value was stored and has been removed
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// List all stored keys in ascending order
    fn keys(&self) -> Result<Vec<String>>;
}
