//! SSH config scanner for pre-filling new connection profiles.
//!
//! Parses standard SSH config directives (`Host`, `HostName`, `Port`, `User`,
//! `IdentityFile`) from `~/.ssh/config` into [`SshConfigEntry`] values.

use std::fs;
use std::path::Path;

use tracing::warn;

/// A host block discovered in an SSH config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfigEntry {
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub identity_file: Option<String>,
}

/// Parse an SSH config file and return the discovered host entries.
///
/// Hosts with wildcard patterns (containing `*` or `?`) are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn scan_ssh_config(path: &Path) -> std::io::Result<Vec<SshConfigEntry>> {
    let content = fs::read_to_string(path)?;
    Ok(scan_ssh_config_content(&content))
}

/// Parse SSH config content into host entries, preserving file order.
#[must_use]
pub fn scan_ssh_config_content(content: &str) -> Vec<SshConfigEntry> {
    let mut entries = Vec::new();
    let mut current_alias: Option<String> = None;
    let mut current = PartialEntry::default();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse key-value (supports both "Key Value" and "Key=Value")
        let Some((key, value)) = parse_directive(line) else {
            continue;
        };

        if key.eq_ignore_ascii_case("Host") {
            // Finalize previous host block
            if let Some(alias) = current_alias.take()
                && let Some(entry) = current.to_entry(alias)
            {
                entries.push(entry);
            }
            current = PartialEntry::default();

            // Skip wildcard patterns
            let alias = value.to_string();
            if alias.contains('*') || alias.contains('?') {
                continue;
            }

            current_alias = Some(alias);
        } else if current_alias.is_some() {
            apply_directive(&mut current, &key, value);
        }
    }

    // Finalize last host block
    if let Some(alias) = current_alias
        && let Some(entry) = current.to_entry(alias)
    {
        entries.push(entry);
    }

    entries
}

/// Intermediate representation during parsing
#[derive(Default)]
struct PartialEntry {
    hostname: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    identity_file: Option<String>,
}

impl PartialEntry {
    /// Convert to a full entry. Returns `None` when no `HostName` was seen;
    /// a bare alias is not enough to pre-fill a profile.
    fn to_entry(&self, alias: String) -> Option<SshConfigEntry> {
        let hostname = self.hostname.clone()?;
        Some(SshConfigEntry {
            alias,
            hostname,
            port: self.port.unwrap_or(22),
            username: self.username.clone(),
            identity_file: self.identity_file.clone(),
        })
    }
}

/// Parse a single SSH config directive line into (key, value).
fn parse_directive(line: &str) -> Option<(String, &str)> {
    // Handle "Key=Value" format
    if let Some((key, value)) = line.split_once('=') {
        let key = key.trim().to_string();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            return Some((key, value));
        }
    }

    // Handle "Key Value" format (split on first whitespace)
    let mut parts = line.splitn(2, char::is_whitespace);
    let key = parts.next()?.trim().to_string();
    let value = parts.next()?.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Apply a parsed directive to a `PartialEntry`.
fn apply_directive(entry: &mut PartialEntry, key: &str, value: &str) {
    match key.to_ascii_lowercase().as_str() {
        "hostname" => entry.hostname = Some(value.to_string()),
        "port" => {
            if let Ok(port) = value.parse() {
                entry.port = Some(port);
            } else {
                warn!(value = %value, "Invalid port number in SSH config");
            }
        }
        "user" => entry.username = Some(value.to_string()),
        "identityfile" => entry.identity_file = Some(value.to_string()),
        _ => {
            // Ignore unsupported directives (ProxyJump, ForwardAgent, etc.)
        }
    }
}
