// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Defaults for persistence bounds, batch purging, sequence pacing and service identity

//! Constants module
//!
//! Constants are grouped by domain. Every runtime-tunable value here is only a
//! default; the effective value comes from [`crate::config::environment::ServerConfig`].

/// Service identity used in structured logs
pub mod service_names {
    /// Service name reported at startup
    pub const WORKOUT_SEQUENCER: &str = "workout-sequencer";
}

/// Persistence transaction bounds
pub mod transactions {
    /// Maximum time to wait for a transaction to be acquired (milliseconds)
    pub const DEFAULT_MAX_WAIT_MS: u64 = 10_000;
    /// Maximum time a transaction may run before it is rolled back (milliseconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
    /// Default size of the `SQLite` connection pool
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
}

/// Bounded deletion of child collections
pub mod purge {
    /// Sets deleted per statement when purging an exercise
    pub const DEFAULT_BATCH_SIZE: u32 = 100;
}

/// Sequence playback
pub mod sequence {
    /// Rest between sets when a set does not specify its own transition time
    pub const DEFAULT_TRANSITION_SECS: u64 = 30;
    /// Wall-clock length of one programmed second (milliseconds)
    pub const DEFAULT_TICK_MS: u64 = 1_000;
}

/// Environment variable names
pub mod env_vars {
    /// Database connection string
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Connection pool size
    pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
    /// Purge batch size
    pub const PURGE_BATCH_SIZE: &str = "PURGE_BATCH_SIZE";
    /// Transaction acquire bound
    pub const TRANSACTION_MAX_WAIT_MS: &str = "TRANSACTION_MAX_WAIT_MS";
    /// Transaction execution bound
    pub const TRANSACTION_TIMEOUT_MS: &str = "TRANSACTION_TIMEOUT_MS";
    /// Default rest between sets
    pub const DEFAULT_TRANSITION_SECS: &str = "DEFAULT_TRANSITION_SECS";
    /// Length of one programmed second
    pub const SEQUENCE_TICK_MS: &str = "SEQUENCE_TICK_MS";
}
