//! Data structures for credential records and the store file.

pub mod record;
pub mod record_info;
pub mod records_file;
