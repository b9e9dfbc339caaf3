//! Core logic: persistence, the gated store, session locking, audit trail.

pub mod audit_log;
pub mod file_lock;
pub mod paths;
pub mod persistence;
pub mod store;
