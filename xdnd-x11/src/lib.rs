//! # X11
//!
//! The x11rb backend of `xdnd-bridge`.
//!
//! [`XdndConnection`] wraps an x11rb connection together with the atoms the protocol needs. It is
//! shared by the three collaborators a drag session is built from:
//!
//! - [`X11Wire`] decodes and encodes XDND client messages and selection events, and implements
//!   the nested selection pump.
//! - [`X11Registry`] keeps track of our windows and reads the XDND properties of foreign ones.
//! - [`CalloopTimer`] drives the session tick from a calloop event loop.
//!
//! The host keeps dispatching its own events; every X event is offered to
//! [`X11Wire::translate`] first and, when it yields a [`WireEvent`](xdnd_core::event::WireEvent),
//! fed to the session.

use std::fmt;

use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::x11_utils::X11Error as LogicalError;

pub use crate::registry::X11Registry;
pub use crate::timer::CalloopTimer;
pub use crate::util::GetPropertyError;
pub use crate::wire::X11Wire;
pub use crate::xconn::XdndConnection;

macro_rules! wire_error {
    ($error:expr) => {{
        xdnd_core::wire_error!($crate::X11Error::from($error))
    }};
}

mod atoms;
mod client_msg;
mod registry;
mod timer;
mod util;
mod wire;
mod xconn;

/// Generic sum error type for X11 errors.
#[derive(Debug)]
pub enum X11Error {
    /// An error that occurred over the connection medium.
    Connection(ConnectionError),

    /// An error that occurred logically on the X11 end.
    X11(LogicalError),

    /// Failed to get property.
    GetProperty(GetPropertyError),

    /// The screen requested does not exist.
    NoSuchScreen(usize),
}

impl fmt::Display for X11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X11Error::Connection(e) => write!(f, "X11 connection error: {e}"),
            X11Error::X11(e) => write!(f, "X11 error: {e:?}"),
            X11Error::GetProperty(e) => write!(f, "Failed to get X property {e}"),
            X11Error::NoSuchScreen(screen) => write!(f, "X11 screen {screen} does not exist"),
        }
    }
}

impl std::error::Error for X11Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            X11Error::Connection(e) => Some(e),
            X11Error::GetProperty(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConnectionError> for X11Error {
    fn from(e: ConnectionError) -> Self {
        X11Error::Connection(e)
    }
}

impl From<LogicalError> for X11Error {
    fn from(e: LogicalError) -> Self {
        X11Error::X11(e)
    }
}

impl From<ReplyError> for X11Error {
    fn from(value: ReplyError) -> Self {
        match value {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => e.into(),
        }
    }
}

impl From<GetPropertyError> for X11Error {
    fn from(value: GetPropertyError) -> Self {
        Self::GetProperty(value)
    }
}
