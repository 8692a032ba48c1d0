//! Connection establishment and teardown.
//!
//! Connecting walks distinct phases (resolve, TCP connect, SSH handshake,
//! authentication, SFTP subsystem) and reports a typed error for whichever
//! phase fails. Resources acquired by earlier phases are released on every
//! failure branch by dropping the handle.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config, Handle, Handler};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PublicKey, load_secret_key};
use russh_sftp::client::SftpSession;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::ConnectionProfile;
use crate::error::{CourierError, Result};

/// SSH client handler for russh.
///
/// Server keys are accepted without verification; the engine keeps no
/// known-hosts database.
pub(crate) struct ClientHandler {
    hostname: String,
}

impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(host = %self.hostname, "Accepting server host key");
        Ok(true)
    }
}

/// Live transport for one connected profile: the SSH handle plus the
/// SFTP session multiplexed over it.
pub(crate) struct Transport {
    pub(crate) handle: Handle<ClientHandler>,
    pub(crate) sftp: Arc<SftpSession>,
}

/// Connect a profile end to end and return the live transport.
///
/// # Errors
///
/// Returns a phase-specific error: `Resolve`, `Connect`/`ConnectTimeout`,
/// `Handshake`, `Auth`/`KeyInvalid`, or `Subsystem`.
pub(crate) async fn connect(profile: &ConnectionProfile, timeout_secs: u64) -> Result<Transport> {
    let host = profile.hostname.as_str();

    // Phase 1: resolve
    let addr = resolve(host, profile.port).await?;
    debug!(host = %host, addr = %addr, "Resolved");

    // Phase 2: TCP connect with bounded timeout
    let connect_timeout = Duration::from_secs(timeout_secs);
    let stream = timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| CourierError::ConnectTimeout {
            host: host.to_string(),
            seconds: timeout_secs,
        })?
        .map_err(|e| CourierError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    // Phase 3: SSH handshake
    let config = Arc::new(Config::default());
    let handler = ClientHandler {
        hostname: host.to_string(),
    };
    let handle = client::connect_stream(config, stream, handler)
        .await
        .map_err(|e| CourierError::Handshake {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    // Phase 4: authenticate (public key when a key path is configured,
    // password otherwise)
    let handle = authenticate(handle, profile).await?;

    // Phase 5: SFTP subsystem
    let sftp = open_sftp(&handle).await?;

    info!(host = %host, user = %profile.username, "Connected");

    Ok(Transport {
        handle,
        sftp: Arc::new(sftp),
    })
}

/// Tear down a transport: SFTP close, polite SSH disconnect, socket drop,
/// in that order. Errors from an already-torn-down peer are ignored.
pub(crate) async fn disconnect(transport: Transport) {
    let _ = transport.sftp.close().await;
    let _ = transport
        .handle
        .disconnect(russh::Disconnect::ByApplication, "", "en")
        .await;
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| CourierError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| CourierError::Resolve {
        host: host.to_string(),
        reason: "no addresses returned".to_string(),
    })
}

async fn authenticate(
    mut handle: Handle<ClientHandler>,
    profile: &ConnectionProfile,
) -> Result<Handle<ClientHandler>> {
    let host = profile.hostname.as_str();
    let user = profile.username.as_str();

    let auth_result = if let Some(ref key_path) = profile.key_path {
        let expanded = shellexpand::tilde(key_path);
        let key_pair = load_secret_key(Path::new(expanded.as_ref()), None).map_err(|e| {
            CourierError::KeyInvalid {
                path: key_path.clone(),
                reason: e.to_string(),
            }
        })?;

        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();

        handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg))
            .await
            .map_err(|e| {
                tracing::error!(host = %host, user = %user, error = %e, method = "key", "Authentication error");
                CourierError::Auth {
                    user: user.to_string(),
                    host: host.to_string(),
                }
            })?
    } else if let Some(ref password) = profile.password {
        handle
            .authenticate_password(user, password.as_str())
            .await
            .map_err(|e| {
                tracing::error!(host = %host, user = %user, error = %e, method = "password", "Authentication error");
                CourierError::Auth {
                    user: user.to_string(),
                    host: host.to_string(),
                }
            })?
    } else {
        return Err(CourierError::Config(format!(
            "profile {} has neither key_path nor password",
            profile.name
        )));
    };

    if !auth_result.success() {
        tracing::error!(host = %host, user = %user, "Authentication rejected");
        return Err(CourierError::Auth {
            user: user.to_string(),
            host: host.to_string(),
        });
    }

    Ok(handle)
}

async fn open_sftp(handle: &Handle<ClientHandler>) -> Result<SftpSession> {
    let channel =
        handle
            .channel_open_session()
            .await
            .map_err(|e| CourierError::Subsystem {
                reason: format!("Failed to open channel: {e}"),
            })?;

    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| CourierError::Subsystem {
            reason: format!("Failed to request SFTP subsystem: {e}"),
        })?;

    SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| CourierError::Subsystem {
            reason: format!("Failed to initialize SFTP session: {e}"),
        })
}
