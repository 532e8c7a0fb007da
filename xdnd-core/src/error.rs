//! Common error types.

use std::{error, fmt};

use crate::window::WindowId;

/// An error raised by one of the session's collaborators, such as a failed request on the
/// window-system connection.
///
/// Use the [`wire_error!`](crate::wire_error) macro to create one, it records the call site.
#[derive(Debug)]
pub struct WireError {
    line: u32,
    file: &'static str,
    error: Box<dyn error::Error + Send + Sync + 'static>,
}

impl WireError {
    #[inline]
    pub fn new(
        line: u32,
        file: &'static str,
        error: impl Into<Box<dyn error::Error + Send + Sync + 'static>>,
    ) -> WireError {
        WireError { line, file, error: error.into() }
    }

    /// The backend error wrapped by this value.
    pub fn inner(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        &*self.error
    }
}

/// Create a [`WireError`] pointing at the current source location.
#[macro_export]
macro_rules! wire_error {
    ($error:expr) => {{
        $crate::error::WireError::new(line!(), file!(), $error)
    }};
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.pad(&format!("wire error at {}:{}: {}", self.file, self.line, self.error))
    }
}

impl error::Error for WireError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&*self.error)
    }
}

/// A failure detected while driving a drag session.
///
/// Every variant is recovered locally: the session resets to idle before the error is
/// reported, so the caller only has to surface feedback.
#[derive(Debug)]
pub enum SessionError {
    /// A message arrived that is not valid in the current state, e.g. `XdndDrop` while idle.
    ProtocolViolation(&'static str),
    /// The peers have no data type in common.
    NegotiationFailure,
    /// A `SelectionNotify` or `XdndFinished` reply never arrived.
    Timeout,
    /// The event references a window the registry does not know.
    UnknownWindow(WindowId),
    /// A collaborator failed.
    Wire(WireError),
}

impl From<WireError> for SessionError {
    fn from(value: WireError) -> Self {
        Self::Wire(value)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            SessionError::ProtocolViolation(what) => write!(f, "XDND protocol violation: {what}"),
            SessionError::NegotiationFailure => write!(f, "no common data type between peers"),
            SessionError::Timeout => write!(f, "timed out waiting for the peer"),
            SessionError::UnknownWindow(window) => write!(f, "unknown window {window:?}"),
            SessionError::Wire(e) => e.fmt(f),
        }
    }
}

impl error::Error for SessionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SessionError::Wire(e) => Some(e),
            _ => None,
        }
    }
}
