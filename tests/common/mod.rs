//! Recording doubles of the session's collaborators.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use xdnd_bridge::action::{DndAction, DndActions};
use xdnd_bridge::dpi::PhysicalPosition;
use xdnd_bridge::error::{SessionError, WireError};
use xdnd_bridge::event::{Timestamp, WireEvent};
use xdnd_bridge::services::{
    DataProvider, PasteboardSink, TimerService, WindowRegistry, WireEventSource,
};
use xdnd_bridge::window::{DropTarget, PointerSample, WindowId};
use xdnd_bridge::{wire_error, DragSession, SessionConfig, SmolStr};

/// Our main window.
pub const OURS: WindowId = WindowId::from_raw(0x100);
/// A second window of ours.
pub const OURS_TOO: WindowId = WindowId::from_raw(0x101);
/// A foreign client dragging into us, or being dragged into.
pub const FOREIGN: WindowId = WindowId::from_raw(7);
pub const OTHER_FOREIGN: WindowId = WindowId::from_raw(8);
/// A window of the same toolkit in another process.
pub const NATIVE_PEER: WindowId = WindowId::from_raw(11);

/// A view of one of our windows, covering root coordinates `[min, max)`.
#[derive(Debug, Clone)]
pub struct View {
    pub window: WindowId,
    pub min: (i16, i16),
    pub max: (i16, i16),
    pub target: DropTarget,
}

/// Everything the collaborators saw, and the world they report.
#[derive(Debug, Default)]
pub struct Log {
    pub sent: Vec<WireEvent>,
    pub writes: Vec<(String, Vec<u8>)>,
    pub offered: Vec<Vec<SmolStr>>,
    pub selection_owner: Option<WindowId>,
    pub type_lists: HashMap<WindowId, Vec<SmolStr>>,
    pub timer_running: bool,
    pub timer_starts: usize,
    pub timer_cancels: usize,

    pub own: HashSet<WindowId>,
    pub native: HashSet<WindowId>,
    pub versions: HashMap<WindowId, u8>,
    pub views: Vec<View>,
    pub pointer: Option<PointerSample>,
    /// How the drag source answers conversions, by type. Unlisted types get no answer at all.
    pub replies: HashMap<SmolStr, Option<Vec<u8>>>,
    /// Selection events waiting to be pumped.
    pub incoming: VecDeque<WireEvent>,
    pub fail_sends: bool,
    pub fail_timer: bool,
}

impl Log {
    pub fn last_sent(&self) -> Option<&WireEvent> {
        self.sent.last()
    }

    pub fn count_sent(&self, name: &str) -> usize {
        self.sent.iter().filter(|event| event.name() == name).count()
    }
}

pub type Shared = Rc<RefCell<Log>>;

#[derive(Debug)]
struct Refused;

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("refused by the mock")
    }
}

impl std::error::Error for Refused {}

pub struct MockWire(pub Shared);

impl WireEventSource for MockWire {
    fn send(&mut self, event: WireEvent) -> Result<(), WireError> {
        let mut log = self.0.borrow_mut();
        if log.fail_sends {
            return Err(wire_error!(Refused));
        }
        if let WireEvent::SelectionRequest { requestor, target_type, time, .. } = &event {
            if let Some(data) = log.replies.get(target_type).cloned() {
                log.incoming.push_back(WireEvent::SelectionNotify {
                    requestor: *requestor,
                    target_type: target_type.clone(),
                    data,
                    time: *time,
                });
            }
        }
        log.sent.push(event);
        Ok(())
    }

    fn set_selection_owner(
        &mut self,
        owner: Option<WindowId>,
        _time: Timestamp,
    ) -> Result<(), WireError> {
        self.0.borrow_mut().selection_owner = owner;
        Ok(())
    }

    fn publish_type_list(&mut self, source: WindowId, types: &[SmolStr]) -> Result<(), WireError> {
        let mut log = self.0.borrow_mut();
        if types.is_empty() {
            log.type_lists.remove(&source);
        } else {
            log.type_lists.insert(source, types.to_vec());
        }
        Ok(())
    }

    fn next_selection_event(&mut self, timeout: Duration) -> Result<Option<WireEvent>, WireError> {
        let event = self.0.borrow_mut().incoming.pop_front();
        if event.is_none() {
            std::thread::sleep(timeout.min(Duration::from_millis(2)));
        }
        Ok(event)
    }
}

pub struct MockTimer(pub Shared);

impl TimerService for MockTimer {
    fn start(&mut self, _interval: Duration) -> Result<(), WireError> {
        let mut log = self.0.borrow_mut();
        if log.fail_timer {
            return Err(wire_error!(Refused));
        }
        log.timer_running = true;
        log.timer_starts += 1;
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.0.borrow_mut();
        log.timer_running = false;
        log.timer_cancels += 1;
    }
}

pub struct MockPasteboard(pub Shared);

impl PasteboardSink for MockPasteboard {
    fn offer_types(&mut self, types: &[SmolStr]) {
        self.0.borrow_mut().offered.push(types.to_vec());
    }

    fn write(&mut self, type_name: &str, bytes: Vec<u8>) {
        self.0.borrow_mut().writes.push((type_name.to_owned(), bytes));
    }
}

pub struct MockRegistry(pub Shared);

impl WindowRegistry for MockRegistry {
    fn is_own_window(&self, window: WindowId) -> bool {
        self.0.borrow().own.contains(&window)
    }

    fn is_native_window(&self, window: WindowId) -> bool {
        let log = self.0.borrow();
        log.own.contains(&window) || log.native.contains(&window)
    }

    fn xdnd_version(&self, window: WindowId) -> Option<u8> {
        self.0.borrow().versions.get(&window).copied()
    }

    fn supported_types(&self, window: WindowId) -> Result<Vec<SmolStr>, WireError> {
        self.0.borrow().type_lists.get(&window).cloned().ok_or_else(|| wire_error!(Refused))
    }

    fn set_aware(
        &mut self,
        window: WindowId,
        version: u8,
        types: &[SmolStr],
    ) -> Result<(), WireError> {
        let mut log = self.0.borrow_mut();
        log.versions.insert(window, version);
        log.views.push(View {
            window,
            min: (i16::MIN, i16::MIN),
            max: (i16::MAX, i16::MAX),
            target: DropTarget::new(types.iter().cloned(), DndActions::COPY),
        });
        Ok(())
    }

    fn drop_target_at(
        &self,
        window: WindowId,
        position: PhysicalPosition<i16>,
    ) -> Option<DropTarget> {
        self.0
            .borrow()
            .views
            .iter()
            .find(|view| {
                view.window == window
                    && (view.min.0..view.max.0).contains(&position.x)
                    && (view.min.1..view.max.1).contains(&position.y)
            })
            .map(|view| view.target.clone())
    }

    fn pointer(&self) -> Option<PointerSample> {
        self.0.borrow().pointer
    }
}

pub struct Harness {
    pub session: DragSession,
    pub log: Shared,
}

impl Harness {
    /// A session with our windows [`OURS`] and [`OURS_TOO`], and an XDND v5 aware
    /// [`FOREIGN`] window.
    pub fn new(config: SessionConfig) -> Self {
        init_logging();
        let mut log = Log::default();
        log.own.extend([OURS, OURS_TOO]);
        log.versions.insert(FOREIGN, 5);
        let log = Rc::new(RefCell::new(log));
        let session = DragSession::new(
            config,
            Box::new(MockWire(log.clone())),
            Box::new(MockTimer(log.clone())),
            Box::new(MockPasteboard(log.clone())),
            Box::new(MockRegistry(log.clone())),
        );
        Self { session, log }
    }

    /// Install a view of `window` accepting `types` for `actions` over the whole window.
    pub fn view(&self, window: WindowId, types: &[&str], actions: DndActions) {
        self.view_in(window, (i16::MIN, i16::MIN), (i16::MAX, i16::MAX), types, actions);
    }

    pub fn view_in(
        &self,
        window: WindowId,
        min: (i16, i16),
        max: (i16, i16),
        types: &[&str],
        actions: DndActions,
    ) {
        let target = DropTarget::new(types.iter().copied(), actions);
        self.log.borrow_mut().views.push(View { window, min, max, target });
    }

    pub fn sent(&self) -> Vec<WireEvent> {
        self.log.borrow().sent.clone()
    }

    pub fn last_sent(&self) -> Option<WireEvent> {
        self.log.borrow().last_sent().cloned()
    }

    pub fn clear_sent(&self) {
        self.log.borrow_mut().sent.clear();
    }

    pub fn timer_running(&self) -> bool {
        self.log.borrow().timer_running
    }

    /// `XdndEnter` from [`FOREIGN`] into [`OURS`], version 5.
    pub fn enter(&mut self, types: &[&str]) -> bool {
        self.session.receive(enter(FOREIGN, OURS, 5, types, false))
    }

    /// `XdndPosition` from [`FOREIGN`] over [`OURS`].
    pub fn position(&mut self, x: i16, y: i16, action: DndAction) -> bool {
        self.session.receive(WireEvent::Position {
            source: FOREIGN,
            target: OURS,
            position: PhysicalPosition::new(x, y),
            time: 1,
            action,
        })
    }

    pub fn leave(&mut self) -> bool {
        self.session.receive(WireEvent::Leave { source: FOREIGN, target: OURS })
    }

    /// `XdndDrop` from [`FOREIGN`] on [`OURS`].
    pub fn release(&mut self) -> bool {
        self.session.receive(WireEvent::Drop { source: FOREIGN, target: OURS, time: 2 })
    }
}

pub fn enter(
    source: WindowId,
    target: WindowId,
    version: u8,
    types: &[&str],
    more_types: bool,
) -> WireEvent {
    WireEvent::Enter {
        source,
        target,
        version,
        types: types.iter().map(|t| SmolStr::new(t)).collect(),
        more_types,
    }
}

pub fn types(types: &[&str]) -> Vec<SmolStr> {
    types.iter().map(|t| SmolStr::new(t)).collect()
}

pub fn sample(x: i16, y: i16, window: Option<WindowId>) -> PointerSample {
    PointerSample { position: PhysicalPosition::new(x, y), window }
}

/// A drag source able to produce `text/plain` only.
pub fn payload_provider() -> Box<dyn DataProvider> {
    Box::new(|type_name: &str| (type_name == "text/plain").then(|| b"payload".to_vec()))
}

pub fn is_timeout(err: &SessionError) -> bool {
    matches!(err, SessionError::Timeout)
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
