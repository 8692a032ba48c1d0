//! Configuration: connection profiles, settings, and persistence.

mod loader;
mod ssh_config;
mod types;

pub use loader::{config_dir, load_profiles, load_settings, save_profiles, save_settings};
pub use ssh_config::{SshConfigEntry, scan_ssh_config, scan_ssh_config_content};
pub use types::{ConnectionProfile, ConnectionState, Settings};
