//! git credential helper with a local, encrypted, multi-process-safe store.
//!
//! Answers git's `get`/`store`/`erase` helper operations (plus `list`) from
//! a single TOML file, with passwords sealed under a per-user key held by
//! the OS keyring.
//!
//! ## Modules
//! - `cli` — Argument parsing and the stdin/stdout helper protocol
//! - `core` — Encryption, store lock, store file, records manager
//! - `models` — Credential records and the store file model
//! - `util` — User identity, filesystem, logging

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;
