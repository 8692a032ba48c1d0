//! Live sessions and the connection manager.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use russh_sftp::client::SftpSession;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::config::{ConnectionProfile, ConnectionState, Settings};
use crate::error::{CourierError, Result};
use crate::ssh::endpoint::{self, Transport};

/// A live connection to one profile.
///
/// The transport is held behind a mutex so disconnect can take it out
/// exactly once; transfer workers serialize on `transfer_lock` so only
/// one of them drives I/O against the session at a time.
pub struct Session {
    profile_name: String,
    transport: Mutex<Option<Transport>>,
    active: AtomicBool,
    transfer_lock: Mutex<()>,
    scratch_dir: PathBuf,
}

impl Session {
    pub(crate) fn new(profile_name: String, transport: Transport) -> Self {
        let scratch_dir =
            std::env::temp_dir().join(format!("sftp-courier-{}", uuid::Uuid::new_v4()));
        Self {
            profile_name,
            transport: Mutex::new(Some(transport)),
            active: AtomicBool::new(true),
            transfer_lock: Mutex::new(()),
            scratch_dir,
        }
    }

    /// A session with no transport, for exercising failure paths in tests.
    #[cfg(test)]
    pub(crate) fn inactive(profile_name: &str) -> Self {
        let scratch_dir =
            std::env::temp_dir().join(format!("sftp-courier-{}", uuid::Uuid::new_v4()));
        Self {
            profile_name: profile_name.to_string(),
            transport: Mutex::new(None),
            active: AtomicBool::new(false),
            transfer_lock: Mutex::new(()),
            scratch_dir,
        }
    }

    #[must_use]
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Scratch directory for materializing remote files (diff views).
    /// Created lazily by the first operation that needs it.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Get a handle to the SFTP session, failing fast when disconnected.
    pub(crate) async fn sftp(&self) -> Result<Arc<SftpSession>> {
        let guard = self.transport.lock().await;
        guard
            .as_ref()
            .map(|t| Arc::clone(&t.sftp))
            .ok_or_else(|| CourierError::NotConnected {
                profile: self.profile_name.clone(),
            })
    }

    /// Serialize transfer I/O on this session.
    pub(crate) async fn transfer_guard(&self) -> MutexGuard<'_, ()> {
        self.transfer_lock.lock().await
    }

    /// Tear down the connection. Safe to call more than once; the second
    /// call finds no transport and returns.
    pub async fn disconnect(&self) {
        self.active.store(false, Ordering::Release);
        let transport = self.transport.lock().await.take();
        if let Some(transport) = transport {
            endpoint::disconnect(transport).await;
            info!(profile = %self.profile_name, "Disconnected");
        }
        if self.scratch_dir.exists() {
            let _ = std::fs::remove_dir_all(&self.scratch_dir);
        }
    }
}

/// Owns the profile set and enforces at most one session per profile.
pub struct ConnectionManager {
    profiles: Mutex<Vec<ConnectionProfile>>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    settings: Settings,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(profiles: Vec<ConnectionProfile>, settings: Settings) -> Self {
        Self {
            profiles: Mutex::new(profiles),
            sessions: Mutex::new(HashMap::new()),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Snapshot of all profiles with their current state.
    pub async fn profiles(&self) -> Vec<ConnectionProfile> {
        self.profiles.lock().await.clone()
    }

    pub async fn add_profile(&self, profile: ConnectionProfile) {
        self.profiles.lock().await.push(profile);
    }

    pub async fn profile_state(&self, name: &str) -> Option<ConnectionState> {
        self.profiles
            .lock()
            .await
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.state)
    }

    /// The live session for a profile, if one exists.
    pub async fn session(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(name).cloned()
    }

    /// Connect a profile and register its session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProfile` for an unregistered name, `AlreadyConnected`
    /// when a session exists, or the connect-phase error; on failure the
    /// profile state is left at `Error` and no session is registered.
    pub async fn connect(&self, name: &str) -> Result<Arc<Session>> {
        if self.sessions.lock().await.contains_key(name) {
            return Err(CourierError::AlreadyConnected {
                profile: name.to_string(),
            });
        }

        let profile = {
            let mut profiles = self.profiles.lock().await;
            let profile =
                profiles
                    .iter_mut()
                    .find(|p| p.name == name)
                    .ok_or_else(|| CourierError::UnknownProfile {
                        profile: name.to_string(),
                    })?;
            profile.state = ConnectionState::Connecting;
            profile.clone()
        };

        match endpoint::connect(&profile, self.settings.default_timeout).await {
            Ok(transport) => {
                let session = Arc::new(Session::new(name.to_string(), transport));
                let installed = {
                    let mut sessions = self.sessions.lock().await;
                    Self::install_session(&mut sessions, name, Arc::clone(&session))
                };
                if !installed {
                    // A concurrent connect for this profile won the race;
                    // tear down the extra connection and keep the winner.
                    session.disconnect().await;
                    return Err(CourierError::AlreadyConnected {
                        profile: name.to_string(),
                    });
                }
                self.set_state(name, ConnectionState::Connected).await;
                Ok(session)
            }
            Err(e) => {
                warn!(profile = %name, error = %e, "Connection failed");
                self.set_state(name, ConnectionState::Error).await;
                Err(e)
            }
        }
    }

    /// Disconnect a profile's session, if any. Idempotent.
    pub async fn disconnect(&self, name: &str) {
        let session = self.sessions.lock().await.remove(name);
        if let Some(session) = session {
            session.disconnect().await;
        }
        self.set_state(name, ConnectionState::Disconnected).await;
    }

    /// Register a session for `name` unless one is already present.
    /// Connecting releases the sessions lock while the handshake runs, so
    /// the pre-connect check must be repeated at insert time; only one of
    /// two racing connects may keep its session.
    fn install_session(
        sessions: &mut HashMap<String, Arc<Session>>,
        name: &str,
        session: Arc<Session>,
    ) -> bool {
        match sessions.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    async fn set_state(&self, name: &str, state: ConnectionState) {
        if let Some(profile) = self
            .profiles
            .lock()
            .await
            .iter_mut()
            .find(|p| p.name == name)
        {
            profile.state = state;
        }
    }
}
