//! # Storage Module
//!
//! Handles all data persistence for BudgetIT.
//!
//! The store only ever needs to read and write whole documents under a couple
//! of well-known keys, so persistence is modelled as a synchronous key-value
//! surface ([`KeyValueStorage`]). The file-backed implementation is what the
//! app uses; the in-memory one backs tests and throwaway stores.
//!
//! - **traits**: the `KeyValueStorage` abstraction
//! - **file_storage**: one JSON file per key, atomic writes
//! - **memory_storage**: map-backed storage
//! - **data_directory**: where the files live (env override, redirect file)

pub mod data_directory;
pub mod file_storage;
pub mod memory_storage;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use data_directory::resolve_data_directory;
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use traits::KeyValueStorage;
