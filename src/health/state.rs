//! Connectivity state machine.
//!
//! # States
//! - Connected: initial state, calls are flowing
//! - Disconnected: the last classified transport failure signalled lost connectivity
//!
//! # State Transitions
//! ```text
//! Connected → Disconnected: disconnect-classified error (fires on_disconnect once)
//! Disconnected → Connected: any call that returns a response (fires on_reconnect once)
//! ```
//!
//! Transitions are edge-triggered. The lock covers only the read-modify-write;
//! callbacks run after it is released.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::health::passive::DisconnectKind;
use crate::observability::metrics;

/// Callback fired on a connectivity edge.
pub type ConnectivityCallback = Arc<dyn Fn() + Send + Sync>;

/// Shared connectivity flag of one composed transport.
pub struct ConnectivityState {
    connected: Mutex<bool>,
    on_disconnect: Option<ConnectivityCallback>,
    on_reconnect: Option<ConnectivityCallback>,
}

impl ConnectivityState {
    /// Create a state that starts connected.
    pub fn new() -> Self {
        Self {
            connected: Mutex::new(true),
            on_disconnect: None,
            on_reconnect: None,
        }
    }

    pub fn with_on_disconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    pub fn with_on_reconnect(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnect = Some(Arc::new(callback));
        self
    }

    pub fn is_connected(&self) -> bool {
        *self.lock()
    }

    /// Record a disconnect. Returns true if this call flipped the state.
    pub fn mark_disconnected(&self, kind: DisconnectKind) -> bool {
        if !self.transition(false) {
            return false;
        }
        tracing::warn!(kind = %kind, "Connection lost");
        metrics::record_connectivity(false);
        if let Some(callback) = &self.on_disconnect {
            callback();
        }
        true
    }

    /// Record a successful round trip. Returns true if this call flipped the state.
    pub fn mark_reconnected(&self) -> bool {
        if !self.transition(true) {
            return false;
        }
        tracing::info!("Connection restored");
        metrics::record_connectivity(true);
        if let Some(callback) = &self.on_reconnect {
            callback();
        }
        true
    }

    fn transition(&self, to: bool) -> bool {
        let mut connected = self.lock();
        if *connected == to {
            return false;
        }
        *connected = to;
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.connected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityState")
            .field("connected", &self.is_connected())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_reconnect", &self.on_reconnect.is_some())
            .finish()
    }
}
