//! Pasteboard data requests, and the rendezvous that turns a selection reply into a return
//! value.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::time::Instant;

use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use xdnd_core::error::SessionError;
use xdnd_core::event::WireEvent;
use xdnd_core::window::WindowId;

use super::{send_event, DragSession, Role, TargetPhase};

/// Pending data requests, keyed by the identity of the `SelectionNotify` that answers them.
#[derive(Debug, Default)]
pub(super) struct Waiters {
    pending: HashMap<(WindowId, SmolStr), SyncSender<Option<Vec<u8>>>>,
}

impl Waiters {
    fn register(&mut self, requestor: WindowId, type_name: &str) -> Receiver<Option<Vec<u8>>> {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.pending.insert((requestor, SmolStr::new(type_name)), sender);
        receiver
    }

    /// Hand `data` to the request waiting for it. Returns whether there was one.
    pub(super) fn deliver(
        &mut self,
        requestor: WindowId,
        type_name: &str,
        data: Option<&[u8]>,
    ) -> bool {
        match self.pending.remove(&(requestor, SmolStr::new(type_name))) {
            Some(sender) => {
                // The receiver is gone when the wait already gave up.
                let _ = sender.try_send(data.map(<[u8]>::to_vec));
                true
            },
            None => false,
        }
    }

    /// Drop every pending request, their waits end with a disconnect.
    pub(super) fn clear(&mut self) {
        self.pending.clear();
    }
}

impl DragSession {
    /// Produce the payload of `type_name` for the native pasteboard.
    ///
    /// When we are the drag source, the data comes straight from its provider. When a foreign
    /// client is, the data is converted from its `XdndSelection`: this blocks until the reply
    /// arrives, pumping only selection events in the meantime, for at most
    /// [`SessionConfig::selection_timeout`](crate::SessionConfig::selection_timeout).
    ///
    /// Every error resets the session.
    pub fn provide_data(&mut self, type_name: &str) -> Result<Vec<u8>, SessionError> {
        let Some(gesture) = self.gesture.as_mut() else {
            return Err(SessionError::ProtocolViolation("data requested without a drag"));
        };

        let request = match &mut gesture.role {
            Role::Source(drag) => {
                let data = if drag.types.iter().any(|t| t == type_name) {
                    drag.provider.provide(type_name)
                } else {
                    None
                };
                return match data {
                    Some(bytes) => {
                        gesture.settled = Some(SmolStr::new(type_name));
                        Ok(bytes)
                    },
                    None => Err(self.abort(SessionError::NegotiationFailure)),
                };
            },
            Role::Target(phase) => {
                let Some(wire) = gesture.wire_state.as_ref() else {
                    let error = SessionError::ProtocolViolation("no drag source to ask");
                    return Err(self.abort(error));
                };
                if !wire.offered.iter().any(|t| t == type_name) {
                    debug!("{type_name} is not offered by {:?}", wire.peer);
                    return Err(self.abort(SessionError::NegotiationFailure));
                }

                // Joining the conversion of a drop in progress rather than asking twice.
                let in_flight = matches!(phase, TargetPhase::Resolving { type_name: dropped, .. }
                    if dropped.as_str() == type_name);
                let requestor = wire.local;
                let request = (!in_flight).then(|| WireEvent::SelectionRequest {
                    owner: wire.peer,
                    requestor,
                    target_type: SmolStr::new(type_name),
                    time: wire.timestamp,
                });
                // Once dropped, the settled type is the one the drop resolves to.
                if matches!(phase, TargetPhase::Tracking) {
                    gesture.settled = Some(SmolStr::new(type_name));
                }
                (requestor, request)
            },
        };

        let (requestor, request) = request;
        let receiver = self.waiters.register(requestor, type_name);
        match request {
            Some(request) => {
                if let Err(err) = send_event(self.wire.as_mut(), request) {
                    return Err(self.abort(err));
                }
            },
            None => trace!("joining the pending conversion to {type_name}"),
        }

        self.await_data(type_name, &receiver)
    }

    /// Pump selection events until `receiver` yields or the selection timeout passes.
    fn await_data(
        &mut self,
        type_name: &str,
        receiver: &Receiver<Option<Vec<u8>>>,
    ) -> Result<Vec<u8>, SessionError> {
        let deadline = Instant::now() + self.config.selection_timeout;
        loop {
            match receiver.try_recv() {
                Ok(Some(bytes)) => {
                    trace!("received {} bytes of {type_name}", bytes.len());
                    return Ok(bytes);
                },
                Ok(None) => {
                    warn!("drag source refused to convert to {type_name}");
                    return Err(self.abort(SessionError::NegotiationFailure));
                },
                Err(TryRecvError::Disconnected) => {
                    // The session was reset while waiting.
                    return Err(self
                        .last_error
                        .take()
                        .unwrap_or(SessionError::ProtocolViolation("drag ended before the data")));
                },
                Err(TryRecvError::Empty) => (),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("no SelectionNotify for {type_name} in time");
                return Err(self.abort(SessionError::Timeout));
            }
            match self.wire.next_selection_event(deadline - now) {
                Ok(Some(event)) => {
                    self.receive(event);
                },
                Ok(None) => (),
                Err(err) => return Err(self.abort(err.into())),
            }
        }
    }
}
