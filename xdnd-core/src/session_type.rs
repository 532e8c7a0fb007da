//! Classification of a drag by which side is native.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which peers of a drag are native to this toolkit and which are foreign X clients.
///
/// The type selects which half of the session state machine drives the gesture and whether
/// data has to be fetched over the X selection mechanism at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionType {
    /// Source and target are windows of this very process. No wire traffic happens, the data
    /// moves through the native pasteboard directly.
    Local,
    /// Both peers are native but the other one is only known by its window id, so the wire
    /// protocol is still spoken.
    NativeToNative,
    /// We drag into a foreign client.
    NativeToForeign,
    /// A foreign client drags into one of our windows.
    ForeignToNative,
}

impl SessionType {
    /// Classify a drag from the nature of both ends.
    ///
    /// `same_instance` tells whether both ends live in this process and can reach each other
    /// without the wire protocol; it only matters when both are native. Returns `None` when
    /// neither end is native, such drags are none of our business.
    pub const fn resolve(
        source_native: bool,
        target_native: bool,
        same_instance: bool,
    ) -> Option<SessionType> {
        match (source_native, target_native) {
            (true, true) if same_instance => Some(SessionType::Local),
            (true, true) => Some(SessionType::NativeToNative),
            (true, false) => Some(SessionType::NativeToForeign),
            (false, true) => Some(SessionType::ForeignToNative),
            (false, false) => None,
        }
    }

    /// Whether the gesture is carried by the XDND wire protocol.
    pub const fn uses_wire(self) -> bool {
        !matches!(self, SessionType::Local)
    }

    /// Whether the drag source is a foreign client, so data must come through the selection.
    pub const fn foreign_source(self) -> bool {
        matches!(self, SessionType::ForeignToNative)
    }
}
