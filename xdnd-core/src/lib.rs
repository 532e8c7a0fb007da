//! Base types for an XDND drag-and-drop bridge.
//!
//! This crate contains the platform independent vocabulary of [`xdnd-bridge`]: window
//! identifiers, drag actions, the decoded wire events of the XDND protocol and the traits
//! through which a drag session talks to its collaborators. It is intended to allow backends
//! (such as the x11rb backend in `xdnd-x11`) and test doubles to be written without pulling
//! in the session state machine itself.
//!
//! [`xdnd-bridge`]: https://docs.rs/xdnd-bridge

pub mod action;
pub mod error;
pub mod event;
pub mod session_type;
pub mod services;
pub mod window;

pub use smol_str::SmolStr;

/// The highest XDND protocol version understood by this crate.
pub const XDND_VERSION: u8 = 5;

/// The lowest XDND protocol version a peer may announce and still be talked to.
pub const XDND_MIN_VERSION: u8 = 3;

/// Number of type slots carried inline by an `XdndEnter` message.
pub const INLINE_TYPE_SLOTS: usize = 3;
