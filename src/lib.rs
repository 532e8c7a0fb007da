//! xdnd-bridge is a drag-and-drop session that speaks the X11 XDND protocol on one side and a
//! native toolkit's pasteboard on the other.
//!
//! # Building a session
//!
//! A [`DragSession`] is an explicitly constructed object composed of four collaborators (see
//! [`services`]):
//!
//! - a [`WireEventSource`](services::WireEventSource), which sends XDND messages and selection
//!   events;
//! - a [`TimerService`](services::TimerService), which ticks while a gesture needs it;
//! - a [`PasteboardSink`](services::PasteboardSink), where dropped data ends up;
//! - a [`WindowRegistry`](services::WindowRegistry), which knows our windows.
//!
//! The `x11` feature provides all of them but the pasteboard for an x11rb connection, in the
//! [`x11`] module.
//!
//! ```no_run
//! # use xdnd_bridge::services::*;
//! # fn collaborators() -> (Box<dyn WireEventSource>, Box<dyn TimerService>,
//! #     Box<dyn PasteboardSink>, Box<dyn WindowRegistry>) { unimplemented!() }
//! use xdnd_bridge::{DragSession, SessionConfig};
//!
//! let (wire, timer, pasteboard, registry) = collaborators();
//! let config = SessionConfig::from_env();
//! let mut session = DragSession::new(config, wire, timer, pasteboard, registry);
//! ```
//!
//! # Driving a session
//!
//! Everything happens on the thread dispatching window-system events:
//!
//! - every decoded [`WireEvent`](event::WireEvent) goes to [`DragSession::receive`], which tells
//!   whether the event was part of a drag;
//! - every timer tick goes to [`DragSession::on_timer_tick`];
//! - every pasteboard data request goes to [`DragSession::provide_data`].
//!
//! Drags out of our own windows are driven with [`DragSession::begin_drag`],
//! [`DragSession::pointer_moved`], [`DragSession::end_drag`] and [`DragSession::cancel_drag`].
//!
//! Failures never leave a gesture half alive: the session resets to idle, stops its timer and
//! gives up the selection before reporting a [`SessionError`](error::SessionError).
//!
//! # Cargo Features
//!
//! Those are the available features and their default states:
//!
//! - `x11` (enabled by default): the x11rb backend in [`x11`].
//! - `serde`: Enables serialization/deserialization of the wire events, the protocol state and
//!   the configuration.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use dpi;
pub use xdnd_core::{
    action, error, event, services, session_type, window, wire_error, SmolStr, INLINE_TYPE_SLOTS,
    XDND_MIN_VERSION, XDND_VERSION,
};
#[cfg(all(
    feature = "x11",
    unix,
    not(any(
        target_os = "redox",
        target_family = "wasm",
        target_os = "android",
        target_vendor = "apple"
    ))
))]
pub use xdnd_x11 as x11;

pub use crate::config::{
    SessionConfig, FINISH_TIMEOUT_ENV_VAR, POLL_INTERVAL_ENV_VAR, SELECTION_TIMEOUT_ENV_VAR,
};
pub use crate::session::{DragSession, Phase, WireState};

mod config;
mod session;
