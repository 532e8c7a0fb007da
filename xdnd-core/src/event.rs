//! Decoded XDND wire events.
//!
//! A [`WireEvent`] is what a backend produces after decoding an X `ClientMessage`,
//! `SelectionRequest` or `SelectionNotify` event, and what a drag session hands back to the
//! backend for sending. Data types are carried by name (`text/plain`), the backend owns the
//! mapping to atoms.
//!
//! Every XDND client message names the drag source and the drop target. For messages flowing
//! from the source to the target (`Enter`, `Position`, `Leave`, `Drop`) the target is the
//! addressee; for the replies (`Status`, `Finished`) the source is.

use dpi::PhysicalPosition;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::action::DndAction;
use crate::window::WindowId;

/// Timestamp of an X event. Zero stands for `CurrentTime`.
pub type Timestamp = u32;

/// The `CurrentTime` timestamp.
pub const CURRENT_TIME: Timestamp = 0;

/// One XDND protocol message or selection event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WireEvent {
    /// `XdndEnter`: the pointer entered `target` while dragging from `source`.
    Enter {
        source: WindowId,
        target: WindowId,
        version: u8,
        /// Up to three types, in the source's preference order.
        types: Vec<SmolStr>,
        /// The source has more than three types; the full list is in its `XdndTypeList`
        /// property.
        more_types: bool,
    },
    /// `XdndPosition`: the pointer moved to `position` (root coordinates).
    Position {
        source: WindowId,
        target: WindowId,
        position: PhysicalPosition<i16>,
        time: Timestamp,
        action: DndAction,
    },
    /// `XdndLeave`: the pointer left `target`, or the drag was cancelled.
    Leave { source: WindowId, target: WindowId },
    /// `XdndDrop`: the user released the pointer over `target`.
    Drop { source: WindowId, target: WindowId, time: Timestamp },
    /// `XdndStatus`: the target's reply to a `Position`.
    Status {
        source: WindowId,
        target: WindowId,
        accept: bool,
        /// The target wants a `Position` for every motion, not only when leaving its rect.
        want_position: bool,
        action: DndAction,
    },
    /// `XdndFinished`: the target is done with the drop.
    Finished { source: WindowId, target: WindowId, accepted: bool, action: DndAction },
    /// `SelectionRequest` on `XdndSelection`: `requestor` wants our data as `target_type`.
    SelectionRequest {
        owner: WindowId,
        requestor: WindowId,
        target_type: SmolStr,
        time: Timestamp,
    },
    /// `SelectionNotify` on `XdndSelection`: the reply to a conversion request. `data` is
    /// `None` when the owner refused the conversion.
    SelectionNotify {
        requestor: WindowId,
        target_type: SmolStr,
        data: Option<Vec<u8>>,
        time: Timestamp,
    },
}

impl WireEvent {
    /// The short protocol name of the message, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            WireEvent::Enter { .. } => "XdndEnter",
            WireEvent::Position { .. } => "XdndPosition",
            WireEvent::Leave { .. } => "XdndLeave",
            WireEvent::Drop { .. } => "XdndDrop",
            WireEvent::Status { .. } => "XdndStatus",
            WireEvent::Finished { .. } => "XdndFinished",
            WireEvent::SelectionRequest { .. } => "SelectionRequest",
            WireEvent::SelectionNotify { .. } => "SelectionNotify",
        }
    }

    /// The window this event is delivered to.
    pub fn addressee(&self) -> WindowId {
        match *self {
            WireEvent::Enter { target, .. }
            | WireEvent::Position { target, .. }
            | WireEvent::Leave { target, .. }
            | WireEvent::Drop { target, .. } => target,
            WireEvent::Status { source, .. } | WireEvent::Finished { source, .. } => source,
            WireEvent::SelectionRequest { owner, .. } => owner,
            WireEvent::SelectionNotify { requestor, .. } => requestor,
        }
    }

    /// Whether this is one of the selection events used for the data transfer.
    pub fn is_selection(&self) -> bool {
        matches!(self, WireEvent::SelectionRequest { .. } | WireEvent::SelectionNotify { .. })
    }
}
