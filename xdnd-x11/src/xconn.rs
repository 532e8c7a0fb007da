use std::fmt;
use std::sync::{Mutex, PoisonError};

use bytemuck::Pod;
use smol_str::SmolStr;
use tracing::trace;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};

use crate::atoms::{AtomNames, Atoms};
use crate::util::{self, GetPropertyError};
use crate::X11Error;

/// An x11rb connection with the XDND atoms interned.
pub struct XdndConnection<C> {
    conn: C,
    root: xproto::Window,
    atoms: Atoms,
    names: Mutex<AtomNames>,
}

impl<C> fmt::Debug for XdndConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XdndConnection").field("root", &self.root).finish_non_exhaustive()
    }
}

impl<C: Connection> XdndConnection<C> {
    /// Intern the protocol atoms on `conn`, dragging on the screen `screen_num`.
    pub fn new(conn: C, screen_num: usize) -> Result<Self, X11Error> {
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or(X11Error::NoSuchScreen(screen_num))?;
        let atoms = Atoms::new(&conn)?.reply()?;
        let names = Mutex::new(AtomNames::seeded(&atoms));
        Ok(Self { conn, root, atoms, names })
    }

    #[inline]
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// The root window of the screen we drag on.
    #[inline]
    pub fn root(&self) -> xproto::Window {
        self.root
    }

    #[inline]
    pub(crate) fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// The atom of the data type `name`, interned on first use.
    pub(crate) fn atom(&self, name: &str) -> Result<xproto::Atom, X11Error> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(atom) = names.atom(name) {
            return Ok(atom);
        }
        let atom = self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom;
        trace!("interned {name} as {atom}");
        names.insert(name, atom);
        Ok(atom)
    }

    /// The name of the data type `atom`.
    pub(crate) fn atom_name(&self, atom: xproto::Atom) -> Result<SmolStr, X11Error> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(name) = names.name(atom) {
            return Ok(name.clone());
        }
        let reply = self.conn.get_atom_name(atom)?.reply()?;
        let name = SmolStr::new(String::from_utf8_lossy(&reply.name));
        names.insert(&name, atom);
        Ok(name)
    }

    pub(crate) fn get_property<T: Pod>(
        &self,
        window: xproto::Window,
        property: xproto::Atom,
        property_type: impl Into<xproto::Atom>,
    ) -> Result<Vec<T>, GetPropertyError> {
        util::get_property(&self.conn, window, property, property_type.into())
    }

    /// The XDND version `window` advertises, `None` if it is not aware.
    pub(crate) fn xdnd_version(&self, window: xproto::Window) -> Result<Option<u8>, X11Error> {
        match self.get_property::<u32>(window, self.atoms.XdndAware, xproto::AtomEnum::ATOM) {
            Ok(version) => Ok(version.first().map(|v| (*v).min(u32::from(u8::MAX)) as u8)),
            Err(err) if err.is_actual_property_type(x11rb::NONE) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Where messages for `window` go: its `XdndProxy` when it has a valid one.
    ///
    /// A proxy is valid when its own `XdndProxy` points to itself.
    pub(crate) fn proxy_for(&self, window: xproto::Window) -> xproto::Window {
        let proxy = |window| {
            self.get_property::<u32>(window, self.atoms.XdndProxy, xproto::AtomEnum::WINDOW)
                .ok()
                .and_then(|proxy| proxy.first().copied())
        };
        match proxy(window) {
            Some(target) if proxy(target) == Some(target) => {
                trace!("messages for {window:#x} go through proxy {target:#x}");
                target
            },
            _ => window,
        }
    }
}
