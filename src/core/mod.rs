//! Core logic: encryption, locking, the store file, and the records manager.

pub mod encryption;
pub mod file_lock;
pub mod paths;
pub mod record_store;
pub mod records_manager;
