//! Atom management.

use std::collections::HashMap;

use smol_str::SmolStr;
use x11rb::atom_manager;
use x11rb::protocol::xproto;
use xdnd_core::action::DndAction;

atom_manager! {
    /// The atoms used by the XDND protocol, interned in a single round trip.
    pub(crate) Atoms: AtomsCookie {
        XdndAware,
        XdndEnter,
        XdndPosition,
        XdndStatus,
        XdndLeave,
        XdndDrop,
        XdndFinished,
        XdndSelection,
        XdndTypeList,
        XdndProxy,
        XdndActionCopy,
        XdndActionMove,
        XdndActionLink,
        XdndActionAsk,
        XdndActionPrivate,
        TARGETS,
        TextUriList: b"text/uri-list",
        TextPlain: b"text/plain",
        UTF8_STRING,
    }
}

impl Atoms {
    /// The atom naming `action`, `NONE` for [`DndAction::None`].
    pub(crate) fn action(&self, action: DndAction) -> xproto::Atom {
        match action {
            DndAction::Copy => self.XdndActionCopy,
            DndAction::Move => self.XdndActionMove,
            DndAction::Link => self.XdndActionLink,
            DndAction::Ask => self.XdndActionAsk,
            DndAction::Private => self.XdndActionPrivate,
            DndAction::None => x11rb::NONE,
        }
    }

    /// The action named by `atom`. Unknown atoms do not name any action.
    pub(crate) fn action_from(&self, atom: xproto::Atom) -> DndAction {
        match atom {
            a if a == x11rb::NONE => DndAction::None,
            a if a == self.XdndActionCopy => DndAction::Copy,
            a if a == self.XdndActionMove => DndAction::Move,
            a if a == self.XdndActionLink => DndAction::Link,
            a if a == self.XdndActionAsk => DndAction::Ask,
            a if a == self.XdndActionPrivate => DndAction::Private,
            _ => DndAction::None,
        }
    }
}

/// Data type names and their atoms, learned lazily in both directions.
#[derive(Debug, Default)]
pub(crate) struct AtomNames {
    by_name: HashMap<SmolStr, xproto::Atom>,
    by_atom: HashMap<xproto::Atom, SmolStr>,
}

impl AtomNames {
    /// A cache that already knows the data types interned with `atoms`.
    pub(crate) fn seeded(atoms: &Atoms) -> Self {
        let mut names = Self::default();
        names.insert("text/uri-list", atoms.TextUriList);
        names.insert("text/plain", atoms.TextPlain);
        names.insert("UTF8_STRING", atoms.UTF8_STRING);
        names.insert("TARGETS", atoms.TARGETS);
        names
    }

    pub(crate) fn insert(&mut self, name: &str, atom: xproto::Atom) {
        let name = SmolStr::new(name);
        self.by_atom.insert(atom, name.clone());
        self.by_name.insert(name, atom);
    }

    pub(crate) fn atom(&self, name: &str) -> Option<xproto::Atom> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn name(&self, atom: xproto::Atom) -> Option<&SmolStr> {
        self.by_atom.get(&atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_cached_both_ways() {
        let mut names = AtomNames::default();
        names.insert("image/png", 301);
        assert_eq!(names.atom("image/png"), Some(301));
        assert_eq!(names.name(301).map(SmolStr::as_str), Some("image/png"));
        assert_eq!(names.atom("image/gif"), None);
        assert_eq!(names.name(302), None);
    }
}
