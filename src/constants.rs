//! Centralized constants for paths, permissions, and limits.

/// Default backing file, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "passwords.json";

/// Environment variable overriding the backing file path.
pub const STORE_FILE_ENV: &str = "LOCKBOX_FILE";

/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_ENV: &str = "LOCKBOX_LOG";

/// Current on-disk format version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Suffix appended to the store path for the session lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Suffix appended to the store path for the audit log.
pub const AUDIT_SUFFIX: &str = ".audit";

/// Permission mode for the backing file.
pub const STORE_FILE_MODE: u32 = 0o600;

/// Permission mode for the audit log.
pub const AUDIT_LOG_MODE: u32 = 0o600;

/// Maximum secret size in bytes (1 MiB).
pub const MAX_SECRET_SIZE: usize = 1_048_576;

/// Default length for generated secrets.
pub const DEFAULT_GENERATED_LENGTH: usize = 24;

/// Length of a hex-encoded SHA-256 digest.
pub const MASTER_HASH_HEX_LEN: usize = 64;
