//! Data structures for credentials and the on-disk snapshot.

pub mod credential;
pub mod store_file;
