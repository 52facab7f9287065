//! # System Constants
//!
//! Core constants that define the operational defaults of the task dispatch
//! subsystem. Everything here can be overridden through
//! [`RelayConfig`](crate::config::RelayConfig); these are the values used when
//! no configuration is supplied.

/// System-wide defaults
pub mod system {
    /// Default namespace prefixed onto queue hook names
    pub const DEFAULT_NAMESPACE: &str = "relay";

    /// Infix joining the namespace and the task type id in a hook name
    pub const HOOK_INFIX: &str = "_task_";

    /// Default idempotency lock TTL. Bounds how long a crashed or hung
    /// execution can block a redelivery-driven retry.
    pub const DEFAULT_LOCK_TTL_SECONDS: u64 = 600;

    /// Minimum TTL accepted for lock and done entries
    pub const MIN_TTL_SECONDS: u64 = 1;

    /// Default key prefix for idempotency store entries
    pub const DEFAULT_IDEMPOTENCY_PREFIX: &str = "relay";

    /// Length of the hex digest embedded in idempotency keys. Keeps keys
    /// short and free of raw payload content.
    pub const IDEMPOTENCY_DIGEST_LENGTH: usize = 40;

    /// Default TTL for cache entries when a caller supplies none (7 days)
    pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 604_800;

    /// Environment variable the default secret provider reads
    pub const DEFAULT_SECRET_ENV_VAR: &str = "RELAY_TASK_SECRET";
}
