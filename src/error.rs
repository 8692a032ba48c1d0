use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourierError {
    // Connectivity errors
    #[error("Cannot resolve hostname {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("Connection to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    #[error("Connection to {host} timed out after {seconds}s")]
    ConnectTimeout { host: String, seconds: u64 },

    // Authentication errors
    #[error("SSH handshake with {host} failed: {reason}")]
    Handshake { host: String, reason: String },

    #[error("SSH authentication failed for {user}@{host}")]
    Auth { user: String, host: String },

    #[error("SSH key unusable: {path}: {reason}")]
    KeyInvalid { path: String, reason: String },

    // Protocol errors
    #[error("SFTP subsystem initialization failed: {reason}")]
    Subsystem { reason: String },

    #[error("SFTP error: {reason}")]
    Sftp { reason: String },

    // Transfer errors
    #[error("Transfer cancelled: {remote_path}")]
    Cancelled { remote_path: String },

    // Session state errors
    #[error("Not connected: {profile}")]
    NotConnected { profile: String },

    #[error("Already connected: {profile}")]
    AlreadyConnected { profile: String },

    #[error("Unknown profile: {profile}")]
    UnknownProfile { profile: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CourierError {
    /// Cancellation is a terminal outcome, not a failure; callers use this
    /// to decide between `warn!` and `error!` reporting.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
