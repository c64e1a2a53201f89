//! Utility modules for user identity, filesystem, and logging.

pub mod fs;
pub mod logging;
pub mod user;
