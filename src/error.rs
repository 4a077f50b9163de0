use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `groupwarden`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum WardenError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Browser client / transport ──────────────────────────────────────
    #[error("client: {0}")]
    Client(#[from] ClientError),

    // ── Persisted safety state ──────────────────────────────────────────
    #[error("state: {0}")]
    State(#[from] StateError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

/// Raised during startup validation. A config error always blocks the run;
/// no session is ever started on top of an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid value for {key}: {message}")]
    Parse { key: String, message: String },
}

// ─── Browser client errors ──────────────────────────────────────────────────

/// Transport-level failures raised by the browser collaborator.
///
/// The `Display` text of these variants is what the retry classifier
/// substring-matches against, so driver responses are passed through
/// verbatim in the payload.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("webdriver session: {0}")]
    Session(String),

    #[error("http transport: {0}")]
    Http(String),

    #[error("webdriver protocol: {0}")]
    Protocol(String),

    #[error("comment submission: {0}")]
    Comment(String),
}

// ─── Persisted state errors ─────────────────────────────────────────────────

/// Failures of the durable safety record. Callers log these and continue
/// with in-memory counters; persistence must never abort a session.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize: {0}")]
    Serialize(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, WardenError>;
