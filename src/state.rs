//! Shared application state.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;

/// Errors returned when a WebSocket connection slot cannot be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    /// The global connection limit has been reached
    GlobalLimitReached,
    /// The per-IP connection limit has been reached
    PerIpLimitReached,
}

/// Application state shared across all request handlers.
///
/// Owns the server configuration and the WebSocket connection accounting
/// used by the connection-limit middleware.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Current number of active WebSocket connections
    ws_connections: AtomicUsize,
    /// Active connections per client IP
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Create application state from configuration.
    pub async fn new(config: ServerConfig) -> Self {
        Self {
            config,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }
    }

    /// Current number of active WebSocket connections.
    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    /// Current number of active connections for a specific IP.
    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }

    /// Try to acquire a WebSocket connection slot for `ip`.
    ///
    /// Checks the global limit first, then the per-IP limit. On success
    /// both counters are incremented; the caller must pair this with
    /// `release_connection` when the socket closes.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        if let Some(max) = self.config.max_websocket_connections {
            if self.ws_connections.load(Ordering::SeqCst) >= max {
                return Err(ConnectionLimitError::GlobalLimitReached);
            }
        }

        let mut entry = self.ip_connections.entry(ip).or_insert(0);
        if *entry >= self.config.max_connections_per_ip as usize {
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *entry += 1;
        drop(entry);

        self.ws_connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Release a previously acquired WebSocket connection slot.
    pub fn release_connection(&self, ip: IpAddr) {
        if let Some(mut entry) = self.ip_connections.get_mut(&ip) {
            if *entry > 0 {
                *entry -= 1;
            }
            let empty = *entry == 0;
            drop(entry);
            // Drop empty entries so the map does not grow unboundedly
            if empty {
                self.ip_connections.remove_if(&ip, |_, count| *count == 0);
            }
        }

        let _ =
            self.ws_connections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    current.checked_sub(1)
                });
    }
}
