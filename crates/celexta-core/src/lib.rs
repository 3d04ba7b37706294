//! Core systems for Celexta.
//!
//! This crate provides the domain-free plumbing the application is built on:
//!
//! - **Signal/Slot System**: synchronous, ordered, panic-isolated
//!   notification ([`Signal`])
//! - **Logging**: subscriber setup and per-subsystem targets ([`logging`])
//!
//! # Signal/Slot Example
//!
//! ```
//! use celexta_core::Signal;
//!
//! let visibility_changed = Signal::<bool>::new();
//!
//! let conn_id = visibility_changed.connect(|visible| {
//!     println!("Now visible: {}", visible);
//! });
//!
//! visibility_changed.emit(false);
//! visibility_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{CoreError, CoreResult};
pub use logging::{LoggingOptions, PerfSpan};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
