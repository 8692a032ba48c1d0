use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// A saved remote host definition.
///
/// Sensitive fields (`password`) are wrapped in [`Zeroizing`] so they are
/// securely erased from memory when the profile is dropped.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionProfile {
    /// Unique profile name, used as the session identity
    pub name: String,

    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    /// Password for password authentication. Ignored when `key_path` is set.
    #[serde(default)]
    pub password: Option<Zeroizing<String>>,

    /// Path to a private key file. When set, public-key authentication
    /// is attempted instead of password authentication.
    #[serde(default)]
    pub key_path: Option<String>,

    /// Initial remote working directory
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    /// Runtime connection state, never persisted
    #[serde(skip)]
    pub state: ConnectionState,
}

impl ConnectionProfile {
    /// Create a profile with defaults for everything but the identity fields.
    #[must_use]
    pub fn new(name: &str, hostname: &str, username: &str) -> Self {
        Self {
            name: name.to_string(),
            hostname: hostname.to_string(),
            port: default_port(),
            username: username.to_string(),
            password: None,
            key_path: None,
            remote_dir: default_remote_dir(),
            state: ConnectionState::default(),
        }
    }
}

/// Lifecycle state of a profile's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last connection attempt failed
    Error,
}

const fn default_port() -> u16 {
    22
}

fn default_remote_dir() -> String {
    "/".to_string()
}

/// Application settings, persisted separately from the profile list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Upload local files automatically after a successful sync comparison
    #[serde(default)]
    pub auto_upload: bool,

    /// Include dot-prefixed entries in directory listings
    #[serde(default)]
    pub show_hidden_files: bool,

    /// Connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_upload: false,
            show_hidden_files: false,
            default_timeout: default_timeout(),
        }
    }
}

const fn default_timeout() -> u64 {
    30
}
