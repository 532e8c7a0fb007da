//! Drag actions.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The action a drag source proposes, or a drop target agrees to perform.
///
/// Maps directly to the `XdndAction*` atoms. [`DndAction::None`] is what a target echoes back
/// when it rejects the drop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DndAction {
    /// `XdndActionCopy`. Every XDND target must support it.
    #[default]
    Copy,
    /// `XdndActionMove`.
    Move,
    /// `XdndActionLink`.
    Link,
    /// `XdndActionAsk`.
    Ask,
    /// `XdndActionPrivate`.
    Private,
    /// No action; the drop is rejected.
    None,
}

impl DndAction {
    /// The set flag corresponding to this action, empty for [`DndAction::None`].
    pub const fn as_flag(self) -> DndActions {
        match self {
            DndAction::Copy => DndActions::COPY,
            DndAction::Move => DndActions::MOVE,
            DndAction::Link => DndActions::LINK,
            DndAction::Ask => DndActions::ASK,
            DndAction::Private => DndActions::PRIVATE,
            DndAction::None => DndActions::empty(),
        }
    }

    /// Pick the action to echo back for `proposed`, given what the drop target supports.
    ///
    /// The proposal wins when supported, otherwise the target falls back to a copy. Returns
    /// [`DndAction::None`] when neither is possible.
    pub fn negotiate(proposed: DndAction, supported: DndActions) -> DndAction {
        if proposed != DndAction::None && supported.contains(proposed.as_flag()) {
            proposed
        } else if supported.contains(DndActions::COPY) {
            DndAction::Copy
        } else {
            DndAction::None
        }
    }
}

bitflags! {
    /// The set of actions a view or a drag source supports.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct DndActions: u8 {
        const COPY = 1 << 0;
        const MOVE = 1 << 1;
        const LINK = 1 << 2;
        const ASK = 1 << 3;
        const PRIVATE = 1 << 4;
    }
}

impl DndActions {
    /// The action a drag source proposes first: copy when possible, then move, then link.
    pub fn preferred(self) -> DndAction {
        if self.contains(DndActions::COPY) {
            DndAction::Copy
        } else if self.contains(DndActions::MOVE) {
            DndAction::Move
        } else if self.contains(DndActions::LINK) {
            DndAction::Link
        } else if self.contains(DndActions::ASK) {
            DndAction::Ask
        } else if self.contains(DndActions::PRIVATE) {
            DndAction::Private
        } else {
            DndAction::None
        }
    }
}
