//! Connectivity tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive tracking (passive.rs):
//!     Call outcome observed
//!     → Classify transport error as a disconnect
//!     → Update state.rs
//!
//! Active probing (active.rs):
//!     Periodic timer while disconnected
//!     → Probe the base transport
//!     → Update state.rs on the first response
//!
//! State machine (state.rs):
//!     Connected ←→ Disconnected
//!     Edge-triggered callbacks
//! ```
//!
//! # Design Decisions
//! - Passive tracking is the source of truth; probing is optional
//! - One state per composed transport, shared by concurrent calls
//! - Callbacks never run under the state lock

pub mod active;
pub mod passive;
pub mod state;

pub use active::ReconnectProbe;
pub use passive::{classify_disconnect, ConnectivityLayer, ConnectivityService, DisconnectKind};
pub use state::{ConnectivityCallback, ConnectivityState};
