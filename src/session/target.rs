//! The drop target half: a drag from another client over one of our windows.

use std::time::Instant;

use dpi::PhysicalPosition;
use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use xdnd_core::action::DndAction;
use xdnd_core::error::SessionError;
use xdnd_core::event::{Timestamp, WireEvent};
use xdnd_core::session_type::SessionType;
use xdnd_core::window::WindowId;

use super::{evaluate, send_event, DragSession, Gesture, Role, TargetPhase, WireState};

impl DragSession {
    pub(super) fn handle_enter(
        &mut self,
        source: WindowId,
        target: WindowId,
        version: u8,
        types: Vec<SmolStr>,
        more_types: bool,
    ) -> bool {
        if !self.registry.is_own_window(target) {
            debug!("XdndEnter for unknown window {target:?}");
            self.last_error = Some(SessionError::UnknownWindow(target));
            return false;
        }

        if let Some(gesture) = &self.gesture {
            warn!("XdndEnter from {source:?} while a {:?} gesture is active", gesture.phase());
            self.last_error =
                Some(SessionError::ProtocolViolation("XdndEnter during an active drag"));
            self.reset();
        }

        if version < self.config.min_version || version > self.config.version {
            debug!(
                "refusing XdndEnter from {source:?} with version {version}, supported are {}..={}",
                self.config.min_version, self.config.version
            );
            return true;
        }

        let offered = if more_types {
            match self.registry.supported_types(source) {
                Ok(types) => types,
                Err(err) => {
                    warn!("failed to read XdndTypeList of {source:?}: {err}");
                    self.last_error = Some(err.into());
                    return true;
                },
            }
        } else {
            types
        };

        // Anything arriving here went over the wire, so the peer is never the same instance.
        let source_native = self.registry.is_native_window(source);
        let Some(session_type) = SessionType::resolve(source_native, true, false) else {
            return false;
        };

        debug!(
            "drag from {source:?} entered {target:?} as {session_type:?}, offering {offered:?}"
        );
        self.pasteboard.offer_types(&offered);
        self.gesture = Some(Gesture {
            session_type,
            wire_state: Some(WireState::new(source, target, version, offered)),
            settled: None,
            action: DndAction::None,
            accepted: false,
            role: Role::Target(TargetPhase::Tracking),
        });
        true
    }

    pub(super) fn handle_position(
        &mut self,
        source: WindowId,
        target: WindowId,
        position: PhysicalPosition<i16>,
        time: Timestamp,
        action: DndAction,
    ) -> bool {
        let Some(gesture) = self.gesture.as_mut().filter(|g| g.is_target_of(source, target))
        else {
            debug!("XdndPosition from {source:?} without a matching XdndEnter");
            return false;
        };
        if let Role::Target(TargetPhase::Resolving { .. }) = gesture.role {
            debug!("ignoring XdndPosition after XdndDrop");
            return true;
        }
        let Some(wire) = gesture.wire_state.as_mut() else {
            return false;
        };

        wire.timestamp = time;
        wire.last_position = Some(position);
        // Actions were introduced in version 2.
        wire.proposed_action = if wire.version >= 2 { action } else { DndAction::Copy };

        let verdict =
            evaluate(self.registry.as_ref(), target, position, &wire.offered, wire.proposed_action);
        let accept = verdict.accepts();
        trace!("drop at {position:?} on {target:?}: {verdict:?}");
        gesture.settled = verdict.settled;
        gesture.action = verdict.action;
        gesture.accepted = accept;

        let status = WireEvent::Status {
            source,
            target,
            accept,
            want_position: true,
            action: if accept { gesture.action } else { DndAction::None },
        };
        match send_event(self.wire.as_mut(), status) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub(super) fn handle_leave(&mut self, source: WindowId, target: WindowId) -> bool {
        if !self.gesture.as_ref().is_some_and(|g| g.is_target_of(source, target)) {
            debug!("spurious XdndLeave from {source:?}");
            return false;
        }
        debug!("drag from {source:?} left {target:?}");
        self.reset();
        true
    }

    pub(super) fn handle_drop(
        &mut self,
        source: WindowId,
        target: WindowId,
        time: Timestamp,
    ) -> bool {
        let Some(gesture) = self.gesture.as_mut() else {
            debug!("XdndDrop from {source:?} while idle");
            self.last_error = Some(SessionError::ProtocolViolation("XdndDrop without a drag"));
            return false;
        };
        if !gesture.is_target_of(source, target) {
            debug!("XdndDrop from {source:?} for another drag");
            return false;
        }
        if let Role::Target(TargetPhase::Resolving { .. }) = gesture.role {
            debug!("duplicate XdndDrop from {source:?}");
            return true;
        }

        let Some(settled) = gesture.settled.clone().filter(|_| gesture.accepted) else {
            debug!("drop from {source:?} rejected");
            self.finish_target(false);
            self.last_error = Some(SessionError::NegotiationFailure);
            return true;
        };

        if let Some(wire) = gesture.wire_state.as_mut() {
            wire.timestamp = time;
        }
        let deadline = Instant::now() + self.config.selection_timeout;
        gesture.role =
            Role::Target(TargetPhase::Resolving { deadline, type_name: settled.clone() });

        let request = WireEvent::SelectionRequest {
            owner: source,
            requestor: target,
            target_type: settled,
            time,
        };
        match send_event(self.wire.as_mut(), request) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub(super) fn handle_selection_notify(
        &mut self,
        requestor: WindowId,
        target_type: SmolStr,
        data: Option<Vec<u8>>,
    ) -> bool {
        let delivered = self.waiters.deliver(requestor, &target_type, data.as_deref());

        // Only the conversion the drop asked for resolves it, not one a data request started.
        let resolving = self.gesture.as_ref().is_some_and(|g| {
            matches!(&g.role, Role::Target(TargetPhase::Resolving { type_name, .. })
                if *type_name == target_type)
                && g.wire_state.as_ref().is_some_and(|w| w.local == requestor)
        });
        if !resolving {
            if !delivered {
                debug!("SelectionNotify for {requestor:?} without a pending request");
            }
            return delivered;
        }

        match data {
            Some(bytes) => {
                trace!("dropped {} bytes of {target_type}", bytes.len());
                self.pasteboard.write(&target_type, bytes);
                self.finish_target(true);
            },
            None => {
                warn!("drag source refused to convert to {target_type}");
                self.finish_target(false);
                self.last_error = Some(SessionError::NegotiationFailure);
            },
        }
        true
    }

    /// Tell the drag source we are done with the drop and go back to idle.
    pub(super) fn finish_target(&mut self, accepted: bool) {
        let finished = self.gesture.as_ref().and_then(|g| {
            let wire = g.wire_state.as_ref()?;
            // The accept flag and action exist since version 5, before that they are reserved.
            let (accepted, action) = if wire.version >= 5 && accepted {
                (true, g.action)
            } else {
                (false, DndAction::None)
            };
            Some(WireEvent::Finished { source: wire.peer, target: wire.local, accepted, action })
        });
        if let Some(finished) = finished {
            if let Err(err) = send_event(self.wire.as_mut(), finished) {
                warn!("failed to send XdndFinished: {err}");
            }
        }
        self.reset();
    }
}
