//! Local credential store gated by a master password.
//!
//! Username/secret pairs live in a single versioned JSON file. A session
//! authenticates once against the stored SHA-256 gate, then adds, reads,
//! lists, or deletes entries; every mutation rewrites the file atomically.
//!
//! ## Modules
//! - `cli` — Command-line surface and interactive shell
//! - `core` — Store, persistence, session lock, audit trail
//! - `models` — Credential and on-disk data structures
//! - `util` — Filesystem helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;

pub use crate::core::store::{CredentialStore, GateState};
pub use crate::error::StoreError;
