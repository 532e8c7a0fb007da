//! The collaborators a drag session is composed with.
//!
//! A session never touches the window system directly. Decoded events are pushed into it by
//! the dispatch layer, and everything it needs in return goes through one of these traits:
//!
//! - [`WireEventSource`] sends XDND messages and selection events, and pumps the connection
//!   while a data request is in flight.
//! - [`TimerService`] drives the periodic tick used for pointer polling and reply deadlines.
//! - [`PasteboardSink`] is the native data-transfer object.
//! - [`WindowRegistry`] knows our windows, their drop targets and the XDND properties of
//!   foreign ones.
//!
//! All methods are called from the single event-dispatch thread.

use std::time::Duration;

use dpi::PhysicalPosition;
use smol_str::SmolStr;

use crate::error::WireError;
use crate::event::{Timestamp, WireEvent};
use crate::window::{DropTarget, PointerSample, WindowId};

/// The window-system side of the protocol.
pub trait WireEventSource {
    /// Send `event` to its addressee immediately.
    fn send(&mut self, event: WireEvent) -> Result<(), WireError>;

    /// Claim (or, with `None`, release) ownership of the `XdndSelection` selection.
    fn set_selection_owner(
        &mut self,
        owner: Option<WindowId>,
        time: Timestamp,
    ) -> Result<(), WireError>;

    /// Publish the complete list of offered types on `source` (`XdndTypeList`), or remove the
    /// property when `types` is empty.
    fn publish_type_list(&mut self, source: WindowId, types: &[SmolStr]) -> Result<(), WireError>;

    /// Wait at most `timeout` for the next selection event addressed to us.
    ///
    /// This is a nested pump: it processes exactly the events needed to unblock a pending data
    /// request and leaves every other event queued for the regular dispatch. `Ok(None)` means
    /// nothing arrived in time.
    fn next_selection_event(&mut self, timeout: Duration) -> Result<Option<WireEvent>, WireError>;
}

/// A recurring tick. The owner of the timer calls the session's `on_timer_tick` every time it
/// fires.
pub trait TimerService {
    /// Start ticking every `interval`. Starting a running timer restarts it.
    ///
    /// On error the timer is left stopped.
    fn start(&mut self, interval: Duration) -> Result<(), WireError>;

    /// Stop ticking. Cancelling a stopped timer does nothing.
    fn cancel(&mut self);
}

/// The native pasteboard the dragged data ends up in.
pub trait PasteboardSink {
    /// Register the session as lazy provider for `types`.
    fn offer_types(&mut self, types: &[SmolStr]);

    /// Store the payload of `type_name`.
    fn write(&mut self, type_name: &str, bytes: Vec<u8>);
}

/// The data-producing callback of a drag source.
pub trait DataProvider {
    /// The payload for `type_name`, or `None` if it cannot be produced.
    fn provide(&mut self, type_name: &str) -> Option<Vec<u8>>;
}

impl<F> DataProvider for F
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    fn provide(&mut self, type_name: &str) -> Option<Vec<u8>> {
        self(type_name)
    }
}

/// Window-level knowledge: ownership, hit testing and XDND capability properties.
pub trait WindowRegistry {
    /// Whether `window` belongs to this process.
    fn is_own_window(&self, window: WindowId) -> bool;

    /// Whether `window` is run by the same toolkit, possibly in another process.
    fn is_native_window(&self, window: WindowId) -> bool {
        self.is_own_window(window)
    }

    /// The XDND version advertised by `window` through `XdndAware`, if it is aware at all.
    fn xdnd_version(&self, window: WindowId) -> Option<u8>;

    /// The full list of types offered by the drag source `window` (`XdndTypeList`).
    fn supported_types(&self, window: WindowId) -> Result<Vec<SmolStr>, WireError>;

    /// Mark our `window` as XDND aware with `version`, accepting `types`.
    fn set_aware(
        &mut self,
        window: WindowId,
        version: u8,
        types: &[SmolStr],
    ) -> Result<(), WireError>;

    /// The view of our `window` under the root coordinates `position`, if it takes drops.
    fn drop_target_at(
        &self,
        window: WindowId,
        position: PhysicalPosition<i16>,
    ) -> Option<DropTarget>;

    /// Sample the pointer. Used while polling a drag we initiated.
    fn pointer(&self) -> Option<PointerSample>;
}
