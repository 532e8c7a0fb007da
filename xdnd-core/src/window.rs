//! Window identifiers and the per-window drag capabilities.

use std::fmt;

use dpi::PhysicalPosition;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::action::DndActions;

/// Identifier of a window on the X server, ours or a foreign client's.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowId(u32);

impl WindowId {
    /// Convert the `WindowId` into the underlying X window id.
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    /// Construct a `WindowId` from the underlying X window id.
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({:#x})", self.0)
    }
}

impl From<u32> for WindowId {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl From<WindowId> for u32 {
    fn from(window: WindowId) -> Self {
        window.into_raw()
    }
}

/// A view inside one of our windows that is able to take a drop.
///
/// Returned by the registry's hit test; its types are matched against the types the drag
/// source offers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DropTarget {
    /// Data types the view accepts, any order.
    pub types: Vec<SmolStr>,
    /// Actions the view is able to perform.
    pub actions: DndActions,
}

impl DropTarget {
    pub fn new(types: impl IntoIterator<Item = impl Into<SmolStr>>, actions: DndActions) -> Self {
        Self { types: types.into_iter().map(Into::into).collect(), actions }
    }

    /// The first of `offered` that this view accepts. The order of `offered` is the peer's
    /// preference order and is never rearranged.
    pub fn settle<'a>(&self, offered: &'a [SmolStr]) -> Option<&'a SmolStr> {
        offered.iter().find(|offered| self.types.iter().any(|ours| ours == *offered))
    }
}

/// Pointer location sampled while polling a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointerSample {
    /// Root window coordinates.
    pub position: PhysicalPosition<i16>,
    /// The deepest XDND aware window under the pointer, if any.
    pub window: Option<WindowId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_follows_peer_order() {
        let view = DropTarget::new(["text/plain", "text/uri-list"], DndActions::COPY);
        let offered: Vec<SmolStr> =
            vec!["text/html".into(), "text/uri-list".into(), "text/plain".into()];
        assert_eq!(view.settle(&offered).map(SmolStr::as_str), Some("text/uri-list"));
    }

    #[test]
    fn settle_without_overlap() {
        let view = DropTarget::new(["image/png"], DndActions::COPY);
        let offered: Vec<SmolStr> = vec!["text/plain".into()];
        assert_eq!(view.settle(&offered), None);
    }

    #[test]
    fn window_id_debug_is_hex() {
        assert_eq!(format!("{:?}", WindowId::from_raw(0x2a)), "WindowId(0x2a)");
    }
}
