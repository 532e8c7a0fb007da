use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use dpi::PhysicalPosition;
use smol_str::SmolStr;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _, PropMode};
use x11rb::wrapper::ConnectionExt as _;
use xdnd_core::action::DndActions;
use xdnd_core::error::WireError;
use xdnd_core::services::WindowRegistry;
use xdnd_core::window::{DropTarget, PointerSample, WindowId};

use crate::xconn::XdndConnection;
use crate::X11Error;

/// How deep the pointer search descends the window tree.
const MAX_SEARCH_DEPTH: usize = 32;

type HitTest = dyn Fn(WindowId, PhysicalPosition<i16>) -> Option<DropTarget>;

/// Our windows and what they accept, on top of the XDND properties of the X server.
pub struct X11Registry<C> {
    xconn: Arc<XdndConnection<C>>,
    /// Our windows, with the types they were declared to accept.
    windows: HashMap<WindowId, Vec<SmolStr>>,
    /// Windows of other processes running the same toolkit.
    native: HashSet<WindowId>,
    /// The actions a drop target takes when no hit test is installed.
    actions: DndActions,
    hit_test: Option<Box<HitTest>>,
}

impl<C> fmt::Debug for X11Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Registry")
            .field("windows", &self.windows)
            .field("native", &self.native)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> X11Registry<C> {
    pub fn new(xconn: Arc<XdndConnection<C>>) -> Self {
        Self {
            xconn,
            windows: HashMap::new(),
            native: HashSet::new(),
            actions: DndActions::COPY | DndActions::MOVE,
            hit_test: None,
        }
    }

    /// Claim `window` as one of ours.
    pub fn add_window(&mut self, window: WindowId) {
        self.windows.entry(window).or_default();
    }

    pub fn remove_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
    }

    /// Mark `window` as run by the same toolkit in another process.
    pub fn add_native_window(&mut self, window: WindowId) {
        self.native.insert(window);
    }

    /// Sets the actions our windows take when no hit test is installed.
    ///
    /// The default is copy and move.
    pub fn with_actions(mut self, actions: DndActions) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the function finding the view under the pointer.
    ///
    /// By default a window is a single drop target accepting the types it was declared with.
    pub fn with_hit_test(
        mut self,
        hit_test: impl Fn(WindowId, PhysicalPosition<i16>) -> Option<DropTarget> + 'static,
    ) -> Self {
        self.hit_test = Some(Box::new(hit_test));
        self
    }

    fn query_pointer(&self) -> Result<Option<PointerSample>, X11Error> {
        let conn = self.xconn.connection();
        let root = self.xconn.root();
        let pointer = conn.query_pointer(root)?.reply()?;
        if !pointer.same_screen {
            return Ok(None);
        }
        let position = PhysicalPosition::new(pointer.root_x, pointer.root_y);

        // Descend from the root until a window speaks XDND.
        let mut window = root;
        for _ in 0..MAX_SEARCH_DEPTH {
            let child = conn
                .translate_coordinates(root, window, pointer.root_x, pointer.root_y)?
                .reply()?
                .child;
            if child == x11rb::NONE {
                break;
            }
            if self.windows.contains_key(&WindowId::from(child))
                || self.xconn.xdnd_version(child)?.is_some()
            {
                return Ok(Some(PointerSample { position, window: Some(child.into()) }));
            }
            window = child;
        }
        Ok(Some(PointerSample { position, window: None }))
    }
}

impl<C: Connection> WindowRegistry for X11Registry<C> {
    fn is_own_window(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    fn is_native_window(&self, window: WindowId) -> bool {
        self.is_own_window(window) || self.native.contains(&window)
    }

    fn xdnd_version(&self, window: WindowId) -> Option<u8> {
        match self.xconn.xdnd_version(window.into_raw()) {
            Ok(version) => version,
            Err(err) => {
                debug!("failed to read XdndAware of {window:?}: {err}");
                None
            },
        }
    }

    fn supported_types(&self, window: WindowId) -> Result<Vec<SmolStr>, WireError> {
        let type_list = self.xconn.atoms().XdndTypeList;
        let atoms = self
            .xconn
            .get_property::<u32>(window.into_raw(), type_list, xproto::AtomEnum::ATOM)
            .map_err(|err| wire_error!(err))?;
        atoms
            .into_iter()
            .map(|atom| self.xconn.atom_name(atom).map_err(|err| wire_error!(err)))
            .collect()
    }

    fn set_aware(
        &mut self,
        window: WindowId,
        version: u8,
        types: &[SmolStr],
    ) -> Result<(), WireError> {
        let aware = self.xconn.atoms().XdndAware;
        let conn = self.xconn.connection();
        conn.change_property32(
            PropMode::REPLACE,
            window.into_raw(),
            aware,
            xproto::AtomEnum::ATOM,
            &[u32::from(version)],
        )
        .map_err(|err| wire_error!(err))?;
        conn.flush().map_err(|err| wire_error!(err))?;
        self.windows.insert(window, types.to_vec());
        Ok(())
    }

    fn drop_target_at(
        &self,
        window: WindowId,
        position: PhysicalPosition<i16>,
    ) -> Option<DropTarget> {
        if let Some(hit_test) = &self.hit_test {
            return hit_test(window, position);
        }
        let types = self.windows.get(&window).filter(|types| !types.is_empty())?;
        Some(DropTarget::new(types.iter().cloned(), self.actions))
    }

    fn pointer(&self) -> Option<PointerSample> {
        self.query_pointer().unwrap_or_else(|err| {
            warn!("failed to query the pointer: {err}");
            None
        })
    }
}
