//! The drag session state machine.

use std::fmt;
use std::time::Instant;

use dpi::PhysicalPosition;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use xdnd_core::action::{DndAction, DndActions};
use xdnd_core::error::SessionError;
use xdnd_core::event::{Timestamp, WireEvent, CURRENT_TIME};
use xdnd_core::services::{
    DataProvider, PasteboardSink, TimerService, WindowRegistry, WireEventSource,
};
use xdnd_core::session_type::SessionType;
use xdnd_core::window::{PointerSample, WindowId};

use crate::config::SessionConfig;

mod source;
mod target;
mod transfer;

use self::transfer::Waiters;

/// Where the session currently is in a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No gesture.
    Idle,
    /// A foreign drag is over one of our windows.
    Tracking,
    /// A foreign drag was dropped on us, the data is on its way.
    Resolving,
    /// We are dragging.
    Dragging,
    /// We dropped and wait for the target to finish.
    Dropped,
}

/// Protocol context of a gesture carried over the wire.
///
/// Reinitialized for every gesture and every target window the gesture engages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WireState {
    /// The window on the other end.
    pub peer: WindowId,
    /// Our window taking part in the exchange.
    pub local: WindowId,
    /// Protocol version both sides speak.
    pub version: u8,
    /// The types the drag source offers, in its preference order.
    pub offered: Vec<SmolStr>,
    /// The action the drag source currently proposes.
    pub proposed_action: DndAction,
    /// Timestamp of the last message carrying one.
    pub timestamp: Timestamp,
    /// The last pointer position exchanged.
    pub last_position: Option<PhysicalPosition<i16>>,
    /// A `Position` was sent and its `Status` is outstanding.
    pub awaiting_status: bool,
    /// The newest position produced while waiting for a `Status`.
    pub pending_position: Option<PhysicalPosition<i16>>,
}

impl WireState {
    fn new(peer: WindowId, local: WindowId, version: u8, offered: Vec<SmolStr>) -> Self {
        Self {
            peer,
            local,
            version,
            offered,
            proposed_action: DndAction::Copy,
            timestamp: CURRENT_TIME,
            last_position: None,
            awaiting_status: false,
            pending_position: None,
        }
    }
}

pub(crate) struct Gesture {
    session_type: SessionType,
    wire_state: Option<WireState>,
    /// The negotiated data type.
    settled: Option<SmolStr>,
    action: DndAction,
    accepted: bool,
    role: Role,
}

pub(crate) enum Role {
    Target(TargetPhase),
    Source(SourceDrag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetPhase {
    Tracking,
    /// The drop's conversion to `type_name` is outstanding.
    Resolving { deadline: Instant, type_name: SmolStr },
}

pub(crate) struct SourceDrag {
    window: WindowId,
    types: Vec<SmolStr>,
    actions: DndActions,
    provider: Box<dyn DataProvider>,
    /// The window under the pointer we talk to.
    target: Option<WindowId>,
    last_sample: Option<PointerSample>,
    type_list_published: bool,
    phase: SourcePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourcePhase {
    Dragging,
    Dropped { deadline: Instant },
}

impl Gesture {
    fn phase(&self) -> Phase {
        match &self.role {
            Role::Target(TargetPhase::Tracking) => Phase::Tracking,
            Role::Target(TargetPhase::Resolving { .. }) => Phase::Resolving,
            Role::Source(drag) => match drag.phase {
                SourcePhase::Dragging => Phase::Dragging,
                SourcePhase::Dropped { .. } => Phase::Dropped,
            },
        }
    }

    /// Whether this gesture needs the timer: to poll the pointer, or to enforce a reply
    /// deadline.
    fn needs_timer(&self, config: &SessionConfig) -> bool {
        match &self.role {
            Role::Target(TargetPhase::Tracking) => false,
            Role::Target(TargetPhase::Resolving { .. }) => true,
            Role::Source(drag) => match drag.phase {
                SourcePhase::Dragging => config.poll_pointer,
                SourcePhase::Dropped { .. } => true,
            },
        }
    }

    /// Whether `source` dragging over `target` is what this gesture tracks as drop target.
    fn is_target_of(&self, source: WindowId, target: WindowId) -> bool {
        matches!(self.role, Role::Target(_))
            && self.wire_state.as_ref().is_some_and(|w| w.peer == source && w.local == target)
    }

    /// Whether `target` is the wire peer this gesture drags over from our `source`.
    fn is_source_of(&self, source: WindowId, target: WindowId) -> bool {
        matches!(self.role, Role::Source(_))
            && self.wire_state.as_ref().is_some_and(|w| w.local == source && w.peer == target)
    }
}

/// Bridges XDND drags with the native drag-and-drop of the toolkit.
///
/// A session is dormant until a gesture starts, either from an incoming `XdndEnter` or from
/// [`DragSession::begin_drag`], and goes back to idle when the gesture ends. Only one gesture
/// is ever active.
///
/// The session is fed from the application's single dispatch thread: decoded window-system
/// events go to [`DragSession::receive`], timer ticks to [`DragSession::on_timer_tick`] and
/// pasteboard requests to [`DragSession::provide_data`].
pub struct DragSession {
    config: SessionConfig,
    wire: Box<dyn WireEventSource>,
    timer: Box<dyn TimerService>,
    pasteboard: Box<dyn PasteboardSink>,
    registry: Box<dyn WindowRegistry>,
    gesture: Option<Gesture>,
    timer_running: bool,
    waiters: Waiters,
    last_error: Option<SessionError>,
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("phase", &self.phase())
            .field("session_type", &self.session_type())
            .field("wire_state", &self.wire_state())
            .field("timer_running", &self.timer_running)
            .finish_non_exhaustive()
    }
}

impl DragSession {
    pub fn new(
        config: SessionConfig,
        wire: Box<dyn WireEventSource>,
        timer: Box<dyn TimerService>,
        pasteboard: Box<dyn PasteboardSink>,
        registry: Box<dyn WindowRegistry>,
    ) -> Self {
        Self {
            config,
            wire,
            timer,
            pasteboard,
            registry,
            gesture: None,
            timer_running: false,
            waiters: Waiters::default(),
            last_error: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.gesture.as_ref().map_or(Phase::Idle, Gesture::phase)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// The classification of the active gesture.
    ///
    /// A gesture coming over the wire keeps its classification until it ends. A drag we started
    /// is classified against the window under the pointer, so it follows the pointer from one
    /// target to the next and reads [`SessionType::Local`] while no other client is engaged.
    pub fn session_type(&self) -> Option<SessionType> {
        self.gesture.as_ref().map(|g| g.session_type)
    }

    /// The protocol context, present only while the gesture goes over the wire.
    pub fn wire_state(&self) -> Option<&WireState> {
        self.gesture.as_ref().and_then(|g| g.wire_state.as_ref())
    }

    /// The data type negotiated for the active gesture.
    pub fn settled_type(&self) -> Option<&str> {
        self.gesture.as_ref().and_then(|g| g.settled.as_deref())
    }

    /// The action the drop target agreed to, [`DndAction::None`] when it rejects the drop.
    pub fn current_action(&self) -> DndAction {
        self.gesture.as_ref().filter(|g| g.accepted).map_or(DndAction::None, |g| g.action)
    }

    /// Whether the drop target under the pointer accepts the drop.
    pub fn target_accepts(&self) -> bool {
        self.gesture.as_ref().is_some_and(|g| g.accepted)
    }

    /// The types offered by a drag source on the other end of the wire.
    pub fn available_types(&self) -> Option<&[SmolStr]> {
        let gesture = self.gesture.as_ref()?;
        match gesture.role {
            Role::Target(_) => gesture.wire_state.as_ref().map(|w| w.offered.as_slice()),
            Role::Source(_) => None,
        }
    }

    /// Whether the drag comes from a foreign X client.
    pub fn is_foreign_dragger(&self) -> bool {
        self.session_type().is_some_and(SessionType::foreign_source)
    }

    #[inline]
    pub fn is_timer_running(&self) -> bool {
        self.timer_running
    }

    /// Take the failure that made the session reset most recently, if any.
    pub fn take_last_error(&mut self) -> Option<SessionError> {
        self.last_error.take()
    }

    /// Declare our `window` as a drop target accepting `types`.
    pub fn register_drop_window(
        &mut self,
        window: WindowId,
        types: &[SmolStr],
    ) -> Result<(), SessionError> {
        if !self.registry.is_own_window(window) {
            return Err(SessionError::UnknownWindow(window));
        }
        self.registry.set_aware(window, self.config.version, types)?;
        debug!("registered drop window {window:?} for {types:?}");
        Ok(())
    }

    /// Feed a decoded window-system event to the session.
    ///
    /// Returns `false` when the event is not part of a drag we are involved in, the session is
    /// then left untouched. Events that end a gesture because of an error still return `true`,
    /// see [`DragSession::take_last_error`].
    pub fn receive(&mut self, event: WireEvent) -> bool {
        trace!("received {}: {:?}", event.name(), event);
        let handled = match event {
            WireEvent::Enter { source, target, version, types, more_types } => {
                self.handle_enter(source, target, version, types, more_types)
            },
            WireEvent::Position { source, target, position, time, action } => {
                self.handle_position(source, target, position, time, action)
            },
            WireEvent::Leave { source, target } => self.handle_leave(source, target),
            WireEvent::Drop { source, target, time } => self.handle_drop(source, target, time),
            WireEvent::Status { source, target, accept, want_position, action } => {
                self.handle_status(source, target, accept, want_position, action)
            },
            WireEvent::Finished { source, target, accepted, action } => {
                self.handle_finished(source, target, accepted, action)
            },
            WireEvent::SelectionRequest { owner, requestor, target_type, time } => {
                self.handle_selection_request(owner, requestor, target_type, time)
            },
            WireEvent::SelectionNotify { requestor, target_type, data, time: _ } => {
                self.handle_selection_notify(requestor, target_type, data)
            },
        };
        self.sync_timer();
        handled
    }

    /// Called by the timer service on every tick.
    pub fn on_timer_tick(&mut self) {
        let now = Instant::now();
        let Some(gesture) = self.gesture.as_ref() else {
            debug!("timer tick while idle");
            self.sync_timer();
            return;
        };

        match &gesture.role {
            Role::Target(TargetPhase::Resolving { deadline, .. }) if now >= *deadline => {
                warn!("no SelectionNotify for the dropped data in time");
                self.last_error = Some(SessionError::Timeout);
                self.finish_target(false);
            },
            Role::Target(_) => (),
            Role::Source(drag) => match drag.phase {
                SourcePhase::Dragging if self.config.poll_pointer => {
                    let last_sample = drag.last_sample;
                    if let Some(sample) = self.registry.pointer() {
                        if last_sample != Some(sample) {
                            if let Err(err) = self.pointer_moved(sample) {
                                self.last_error = Some(err);
                            }
                        }
                    }
                },
                SourcePhase::Dropped { deadline } if now >= deadline => {
                    warn!("no XdndFinished from the drop target in time");
                    self.last_error = Some(SessionError::Timeout);
                    self.reset();
                },
                _ => (),
            },
        }
        self.sync_timer();
    }

    /// Abandon the current gesture and go back to idle.
    ///
    /// Stops the timer, gives up the selection and wakes any pending data request with an
    /// error. Resetting an idle session does nothing.
    pub fn reset(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            if let Role::Source(drag) = &gesture.role {
                if drag.type_list_published {
                    if let Err(err) = self.wire.publish_type_list(drag.window, &[]) {
                        warn!("failed to remove XdndTypeList: {err}");
                    }
                }
                if let Err(err) = self.wire.set_selection_owner(None, CURRENT_TIME) {
                    warn!("failed to release XdndSelection: {err}");
                }
            }
            debug!("drag session reset from {:?}", gesture.phase());
        }
        self.waiters.clear();
        self.sync_timer();
    }

    /// Record `error`, reset, and report the event as handled.
    fn fail(&mut self, error: SessionError) -> bool {
        warn!("drag session failed: {error}");
        self.last_error = Some(error);
        self.reset();
        true
    }

    /// Keep the timer running exactly while the active gesture needs it.
    fn sync_timer(&mut self) {
        let wanted = self.gesture.as_ref().is_some_and(|g| g.needs_timer(&self.config));
        if wanted && !self.timer_running {
            trace!("starting drag timer every {:?}", self.config.poll_interval);
            match self.timer.start(self.config.poll_interval) {
                Ok(()) => self.timer_running = true,
                Err(err) => {
                    warn!("failed to start the drag timer: {err}");
                    self.last_error = Some(err.into());
                },
            }
        } else if !wanted && self.timer_running {
            trace!("stopping drag timer");
            self.timer.cancel();
            self.timer_running = false;
        }
    }

    /// Reset and hand `error` back to the caller of a public operation.
    fn abort(&mut self, error: SessionError) -> SessionError {
        warn!("drag session aborted: {error}");
        self.reset();
        error
    }
}

fn send_event(wire: &mut dyn WireEventSource, event: WireEvent) -> Result<(), SessionError> {
    trace!("sending {}: {:?}", event.name(), event);
    wire.send(event).map_err(SessionError::from)
}

/// Accept or reject for a pointer position, computed against the view under it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    settled: Option<SmolStr>,
    action: DndAction,
}

impl Verdict {
    fn reject() -> Self {
        Self { settled: None, action: DndAction::None }
    }

    fn accepts(&self) -> bool {
        self.settled.is_some() && self.action != DndAction::None
    }
}

/// Decide what the view of our `window` at `position` does with a drag offering `offered`.
fn evaluate(
    registry: &dyn WindowRegistry,
    window: WindowId,
    position: PhysicalPosition<i16>,
    offered: &[SmolStr],
    proposed: DndAction,
) -> Verdict {
    let Some(view) = registry.drop_target_at(window, position) else {
        return Verdict::reject();
    };
    let Some(settled) = view.settle(offered) else {
        return Verdict::reject();
    };
    match DndAction::negotiate(proposed, view.actions) {
        DndAction::None => Verdict::reject(),
        action => Verdict { settled: Some(settled.clone()), action },
    }
}
