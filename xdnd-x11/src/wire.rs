use std::collections::{HashMap, VecDeque};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dpi::PhysicalPosition;
use rustix::event::{self, PollFd, PollFlags};
use rustix::io::Errno;
use smol_str::SmolStr;
use tracing::{debug, trace};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{self, ConnectionExt as _, EventMask, PropMode};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;
use xdnd_core::error::WireError;
use xdnd_core::event::{Timestamp, WireEvent};
use xdnd_core::services::WireEventSource;
use xdnd_core::window::WindowId;

use crate::client_msg::{MessageKind, XdndMessage};
use crate::xconn::XdndConnection;
use crate::X11Error;

/// The XDND side of an x11rb connection.
///
/// Turns X events into [`WireEvent`]s with [`X11Wire::translate`], and sends the session's
/// messages back out.
#[derive(Debug)]
pub struct X11Wire<C> {
    xconn: Arc<XdndConnection<C>>,
    /// The property each pending `SelectionRequest` wants its answer in.
    reply_properties: HashMap<(xproto::Window, xproto::Atom), xproto::Atom>,
    /// Events read by the selection pump that belong to the host.
    deferred: VecDeque<Event>,
}

impl<C: Connection> X11Wire<C> {
    pub fn new(xconn: Arc<XdndConnection<C>>) -> Self {
        Self { xconn, reply_properties: HashMap::new(), deferred: VecDeque::new() }
    }

    /// Decode `event` if it belongs to the XDND protocol.
    ///
    /// `SelectionNotify` payloads are read from, and then removed off, the requestor's property.
    pub fn translate(&mut self, event: &Event) -> Result<Option<WireEvent>, X11Error> {
        let atoms = *self.xconn.atoms();
        match event {
            Event::ClientMessage(msg) if msg.format == 32 => {
                let kind = match msg.type_ {
                    t if t == atoms.XdndEnter => MessageKind::Enter,
                    t if t == atoms.XdndPosition => MessageKind::Position,
                    t if t == atoms.XdndStatus => MessageKind::Status,
                    t if t == atoms.XdndLeave => MessageKind::Leave,
                    t if t == atoms.XdndDrop => MessageKind::Drop,
                    t if t == atoms.XdndFinished => MessageKind::Finished,
                    _ => return Ok(None),
                };
                let message = XdndMessage::decode(kind, msg.data.as_data32());
                self.to_wire_event(msg.window, message).map(Some)
            },
            Event::SelectionRequest(request) if request.selection == atoms.XdndSelection => {
                // Obsolete clients leave the property out; they expect the target instead.
                let property = if request.property == x11rb::NONE {
                    request.target
                } else {
                    request.property
                };
                self.reply_properties.insert((request.requestor, request.target), property);
                Ok(Some(WireEvent::SelectionRequest {
                    owner: request.owner.into(),
                    requestor: request.requestor.into(),
                    target_type: self.xconn.atom_name(request.target)?,
                    time: request.time,
                }))
            },
            Event::SelectionNotify(notify) if notify.selection == atoms.XdndSelection => {
                let data = if notify.property == x11rb::NONE {
                    None
                } else {
                    let data = self.xconn.get_property::<u8>(
                        notify.requestor,
                        notify.property,
                        xproto::AtomEnum::ANY,
                    );
                    self.xconn
                        .connection()
                        .delete_property(notify.requestor, notify.property)?;
                    match data {
                        Ok(data) => Some(data),
                        Err(err) => {
                            debug!("unreadable selection data: {err}");
                            None
                        },
                    }
                };
                Ok(Some(WireEvent::SelectionNotify {
                    requestor: notify.requestor.into(),
                    target_type: self.xconn.atom_name(notify.target)?,
                    data,
                    time: notify.time,
                }))
            },
            _ => Ok(None),
        }
    }

    /// The events the selection pump read on behalf of the host, oldest first.
    pub fn take_deferred_events(&mut self) -> Vec<Event> {
        self.deferred.drain(..).collect()
    }

    fn to_wire_event(
        &self,
        addressee: xproto::Window,
        message: XdndMessage,
    ) -> Result<WireEvent, X11Error> {
        let atoms = self.xconn.atoms();
        let addressee = WindowId::from(addressee);
        let event = match message {
            XdndMessage::Enter { source, version, more_types, types } => {
                let types = types
                    .into_iter()
                    .filter(|atom| *atom != x11rb::NONE)
                    .map(|atom| self.xconn.atom_name(atom))
                    .collect::<Result<Vec<SmolStr>, _>>()?;
                WireEvent::Enter {
                    source: source.into(),
                    target: addressee,
                    version,
                    types,
                    more_types,
                }
            },
            XdndMessage::Position { source, x, y, time, action } => WireEvent::Position {
                source: source.into(),
                target: addressee,
                position: PhysicalPosition::new(x, y),
                time,
                action: atoms.action_from(action),
            },
            XdndMessage::Status { target, accept, want_position, action } => WireEvent::Status {
                source: addressee,
                target: target.into(),
                accept,
                want_position,
                action: atoms.action_from(action),
            },
            XdndMessage::Leave { source } => {
                WireEvent::Leave { source: source.into(), target: addressee }
            },
            XdndMessage::Drop { source, time } => {
                WireEvent::Drop { source: source.into(), target: addressee, time }
            },
            XdndMessage::Finished { target, accepted, action } => WireEvent::Finished {
                source: addressee,
                target: target.into(),
                accepted,
                action: atoms.action_from(action),
            },
        };
        Ok(event)
    }

    fn send_message(
        &self,
        addressee: WindowId,
        message: XdndMessage,
    ) -> Result<(), X11Error> {
        let atoms = self.xconn.atoms();
        let type_ = match message.kind() {
            MessageKind::Enter => atoms.XdndEnter,
            MessageKind::Position => atoms.XdndPosition,
            MessageKind::Status => atoms.XdndStatus,
            MessageKind::Leave => atoms.XdndLeave,
            MessageKind::Drop => atoms.XdndDrop,
            MessageKind::Finished => atoms.XdndFinished,
        };
        let window = addressee.into_raw();
        // Only drop targets hide behind a proxy, the replies go to the source directly.
        let destination = match message.kind() {
            MessageKind::Status | MessageKind::Finished => window,
            _ => self.xconn.proxy_for(window),
        };
        let event = xproto::ClientMessageEvent::new(32, window, type_, message.encode());
        self.xconn.connection().send_event(false, destination, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_event(&mut self, event: WireEvent) -> Result<(), X11Error> {
        let atoms = *self.xconn.atoms();
        match event {
            WireEvent::Enter { source, target, version, types, more_types } => {
                let mut slots = [x11rb::NONE; 3];
                for (slot, name) in slots.iter_mut().zip(&types) {
                    *slot = self.xconn.atom(name)?;
                }
                let source = source.into_raw();
                let message = XdndMessage::Enter { source, version, more_types, types: slots };
                self.send_message(target, message)?;
            },
            WireEvent::Position { source, target, position, time, action } => {
                let message = XdndMessage::Position {
                    source: source.into_raw(),
                    x: position.x,
                    y: position.y,
                    time,
                    action: atoms.action(action),
                };
                self.send_message(target, message)?;
            },
            WireEvent::Leave { source, target } => {
                self.send_message(target, XdndMessage::Leave { source: source.into_raw() })?;
            },
            WireEvent::Drop { source, target, time } => {
                self.send_message(target, XdndMessage::Drop { source: source.into_raw(), time })?;
            },
            WireEvent::Status { source, target, accept, want_position, action } => {
                let message = XdndMessage::Status {
                    target: target.into_raw(),
                    accept,
                    want_position,
                    action: atoms.action(action),
                };
                self.send_message(source, message)?;
            },
            WireEvent::Finished { source, target, accepted, action } => {
                let message = XdndMessage::Finished {
                    target: target.into_raw(),
                    accepted,
                    action: atoms.action(action),
                };
                self.send_message(source, message)?;
            },
            WireEvent::SelectionRequest { requestor, target_type, time, .. } => {
                let target = self.xconn.atom(&target_type)?;
                self.xconn.connection().convert_selection(
                    requestor.into_raw(),
                    atoms.XdndSelection,
                    target,
                    atoms.XdndSelection,
                    time,
                )?;
            },
            WireEvent::SelectionNotify { requestor, target_type, data, time } => {
                let requestor = requestor.into_raw();
                let target = self.xconn.atom(&target_type)?;
                let reply_property = self.reply_properties.remove(&(requestor, target));
                let property = match (data, reply_property) {
                    (Some(data), Some(property)) => {
                        self.xconn.connection().change_property8(
                            PropMode::REPLACE,
                            requestor,
                            property,
                            target,
                            &data,
                        )?;
                        property
                    },
                    _ => x11rb::NONE,
                };
                let notify = xproto::SelectionNotifyEvent {
                    response_type: xproto::SELECTION_NOTIFY_EVENT,
                    sequence: 0,
                    time,
                    requestor,
                    selection: atoms.XdndSelection,
                    target,
                    property,
                };
                self.xconn.connection().send_event(false, requestor, EventMask::NO_EVENT, notify)?;
            },
        }
        self.xconn.connection().flush()?;
        Ok(())
    }

    fn is_selection_event(&self, event: &Event) -> bool {
        let selection = self.xconn.atoms().XdndSelection;
        match event {
            Event::SelectionRequest(request) => request.selection == selection,
            Event::SelectionNotify(notify) => notify.selection == selection,
            _ => false,
        }
    }
}

impl<C: Connection + AsFd> X11Wire<C> {
    /// Block until the connection has something to read, or `timeout` passes.
    fn wait_readable(&self, timeout: Duration) -> Result<(), ConnectionError> {
        let mut fds = [PollFd::new(self.xconn.connection(), PollFlags::IN)];
        // Rounded up, an almost expired deadline must not turn into a zero timeout.
        let timeout = i32::try_from(timeout.as_millis() + 1).unwrap_or(i32::MAX);
        match event::poll(&mut fds, timeout) {
            Ok(_) | Err(Errno::INTR) => Ok(()),
            Err(err) => Err(ConnectionError::IoError(err.into())),
        }
    }
}

impl<C: Connection + AsFd> WireEventSource for X11Wire<C> {
    fn send(&mut self, event: WireEvent) -> Result<(), WireError> {
        self.send_event(event).map_err(|err| wire_error!(err))
    }

    fn set_selection_owner(
        &mut self,
        owner: Option<WindowId>,
        time: Timestamp,
    ) -> Result<(), WireError> {
        let owner = owner.map_or(x11rb::NONE, WindowId::into_raw);
        let selection = self.xconn.atoms().XdndSelection;
        if owner == x11rb::NONE {
            // Whatever the requestors still wait for, the drag that could answer is over.
            self.reply_properties.clear();
        }
        let conn = self.xconn.connection();
        conn.set_selection_owner(owner, selection, time).map_err(|err| wire_error!(err))?;
        conn.flush().map_err(|err| wire_error!(err))
    }

    fn publish_type_list(&mut self, source: WindowId, types: &[SmolStr]) -> Result<(), WireError> {
        let type_list = self.xconn.atoms().XdndTypeList;
        let conn = self.xconn.connection();
        if types.is_empty() {
            conn.delete_property(source.into_raw(), type_list).map_err(|err| wire_error!(err))?;
        } else {
            let atoms = types
                .iter()
                .map(|name| self.xconn.atom(name))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| wire_error!(err))?;
            conn.change_property32(
                PropMode::REPLACE,
                source.into_raw(),
                type_list,
                xproto::AtomEnum::ATOM,
                &atoms,
            )
            .map_err(|err| wire_error!(err))?;
        }
        conn.flush().map_err(|err| wire_error!(err))
    }

    fn next_selection_event(&mut self, timeout: Duration) -> Result<Option<WireEvent>, WireError> {
        let deadline = Instant::now() + timeout;
        loop {
            loop {
                let event =
                    self.xconn.connection().poll_for_event().map_err(|err| wire_error!(err))?;
                let Some(event) = event else {
                    break;
                };
                if !self.is_selection_event(&event) {
                    self.deferred.push_back(event);
                    continue;
                }
                trace!("selection pump got {event:?}");
                if let Some(event) = self.translate(&event).map_err(|err| wire_error!(err))? {
                    return Ok(Some(event));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.wait_readable(deadline - now).map_err(|err| wire_error!(err))?;
        }
    }
}
