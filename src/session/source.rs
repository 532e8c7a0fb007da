//! The drag source half: a drag started in one of our windows.

use std::time::Instant;

use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use xdnd_core::action::{DndAction, DndActions};
use xdnd_core::error::SessionError;
use xdnd_core::event::{Timestamp, WireEvent, CURRENT_TIME};
use xdnd_core::services::DataProvider;
use xdnd_core::session_type::SessionType;
use xdnd_core::window::{PointerSample, WindowId};
use xdnd_core::INLINE_TYPE_SLOTS;

use super::{
    evaluate, send_event, DragSession, Gesture, Role, SourceDrag, SourcePhase, WireState,
};

impl DragSession {
    /// Start dragging `types` out of our `source` window.
    ///
    /// Takes ownership of `XdndSelection` for the duration of the drag. Data is pulled lazily from
    /// `provider`, only once a drop target asks for a type. Fails when a drag is already in
    /// progress.
    pub fn begin_drag(
        &mut self,
        source: WindowId,
        types: Vec<SmolStr>,
        actions: DndActions,
        provider: Box<dyn DataProvider>,
    ) -> Result<(), SessionError> {
        if self.gesture.is_some() {
            return Err(SessionError::ProtocolViolation("a drag is already in progress"));
        }
        if !self.registry.is_own_window(source) {
            return Err(SessionError::UnknownWindow(source));
        }
        if types.is_empty() || actions.is_empty() {
            return Err(SessionError::NegotiationFailure);
        }

        self.wire.set_selection_owner(Some(source), CURRENT_TIME)?;
        let type_list_published = types.len() > INLINE_TYPE_SLOTS;
        if type_list_published {
            if let Err(err) = self.wire.publish_type_list(source, &types) {
                if let Err(err) = self.wire.set_selection_owner(None, CURRENT_TIME) {
                    warn!("failed to release XdndSelection: {err}");
                }
                return Err(err.into());
            }
        }

        debug!("drag started from {source:?} with {types:?}, {actions:?}");
        self.pasteboard.offer_types(&types);
        self.gesture = Some(Gesture {
            session_type: SessionType::Local,
            wire_state: None,
            settled: None,
            action: actions.preferred(),
            accepted: false,
            role: Role::Source(SourceDrag {
                window: source,
                types,
                actions,
                provider,
                target: None,
                last_sample: None,
                type_list_published,
                phase: SourcePhase::Dragging,
            }),
        });
        self.sync_timer();
        Ok(())
    }

    /// The pointer of a drag we started moved.
    ///
    /// Called by the host for every motion it sees, and by the session itself when polling.
    /// On error the drag is abandoned.
    pub fn pointer_moved(&mut self, sample: PointerSample) -> Result<(), SessionError> {
        if !matches!(
            self.gesture.as_ref().map(|g| &g.role),
            Some(Role::Source(SourceDrag { phase: SourcePhase::Dragging, .. }))
        ) {
            return Err(SessionError::ProtocolViolation("pointer motion without a drag"));
        }

        let result = self.drag_to(sample);
        match result {
            Ok(()) => {
                self.sync_timer();
                Ok(())
            },
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Drop at the current pointer position.
    ///
    /// On a target across the wire the drop completes asynchronously, once the target sends
    /// `XdndFinished` or the finish timeout passes. Fails with
    /// [`SessionError::NegotiationFailure`] when nothing under the pointer accepts the drop, the
    /// drag is then over.
    pub fn end_drag(&mut self) -> Result<(), SessionError> {
        let Some(Gesture {
            wire_state,
            accepted,
            role: Role::Source(drag @ SourceDrag { phase: SourcePhase::Dragging, .. }),
            ..
        }) = self.gesture.as_mut()
        else {
            return Err(SessionError::ProtocolViolation("drop without a drag"));
        };

        if let Some(wire) = wire_state.as_ref() {
            let (source, target, time) = (drag.window, wire.peer, wire.timestamp);
            if !*accepted {
                debug!("{target:?} rejects the drop");
                let leave = WireEvent::Leave { source, target };
                if let Err(err) = send_event(self.wire.as_mut(), leave) {
                    warn!("failed to send XdndLeave: {err}");
                }
                return Err(self.abort(SessionError::NegotiationFailure));
            }

            trace!("dropping on {target:?}");
            let deadline = Instant::now() + self.config.finish_timeout;
            drag.phase = SourcePhase::Dropped { deadline };
            let result = send_event(self.wire.as_mut(), WireEvent::Drop { source, target, time });
            return match result {
                Ok(()) => {
                    self.sync_timer();
                    Ok(())
                },
                Err(err) => Err(self.abort(err)),
            };
        }

        // Dropping on ourselves, or on nothing.
        let Some(target) = drag.target else {
            return Err(self.abort(SessionError::NegotiationFailure));
        };
        let position = drag.last_sample.map(|sample| sample.position).unwrap_or_default();
        let verdict = evaluate(
            self.registry.as_ref(),
            target,
            position,
            &drag.types,
            drag.actions.preferred(),
        );
        let Some(settled) = verdict.settled.clone().filter(|_| verdict.accepts()) else {
            return Err(self.abort(SessionError::NegotiationFailure));
        };

        debug!("local drop of {settled} on {target:?}");
        let bytes = self.provide_data(&settled)?;
        self.pasteboard.write(&settled, bytes);
        self.reset();
        Ok(())
    }

    /// Abandon a drag we started, telling the target under the pointer.
    pub fn cancel_drag(&mut self) {
        let Some(Gesture { wire_state: Some(wire), role: Role::Source(drag), .. }) = &self.gesture
        else {
            if matches!(self.gesture, Some(Gesture { role: Role::Source(_), .. })) {
                self.reset();
            }
            return;
        };

        if drag.phase == SourcePhase::Dragging {
            let leave = WireEvent::Leave { source: drag.window, target: wire.peer };
            if let Err(err) = send_event(self.wire.as_mut(), leave) {
                warn!("failed to send XdndLeave: {err}");
            }
        }
        debug!("drag cancelled");
        self.reset();
    }

    /// Follow the pointer to `sample`, engaging whatever drop target lies under it.
    fn drag_to(&mut self, sample: PointerSample) -> Result<(), SessionError> {
        let Self { gesture, wire, registry, config, .. } = self;
        let Some(gesture) = gesture.as_mut() else {
            return Ok(());
        };
        let Role::Source(drag) = &mut gesture.role else {
            return Ok(());
        };

        let previous = drag.last_sample.replace(sample);
        if previous.map(|p| p.window) != Some(sample.window) {
            // Leave the old target before engaging the new one.
            if let (Some(old), Some(_)) = (drag.target, gesture.wire_state.as_ref()) {
                trace!("leaving {old:?}");
                send_event(wire.as_mut(), WireEvent::Leave { source: drag.window, target: old })?;
            }
            drag.target = None;
            gesture.wire_state = None;
            gesture.session_type = SessionType::Local;
            gesture.settled = None;
            gesture.accepted = false;

            if let Some(window) = sample.window {
                let own = registry.is_own_window(window);
                let version = if own {
                    Some(config.version)
                } else {
                    registry.xdnd_version(window).filter(|v| *v >= config.min_version)
                };
                match version {
                    Some(version) => {
                        let native = registry.is_native_window(window);
                        // `resolve` is total when the source is native.
                        let session_type = SessionType::resolve(true, native, own)
                            .unwrap_or(SessionType::NativeToForeign);
                        drag.target = Some(window);
                        gesture.session_type = session_type;
                        debug!(
                            "drag from {:?} engages {window:?} as {session_type:?}",
                            drag.window
                        );

                        if session_type.uses_wire() {
                            let version = version.min(config.version);
                            let mut state =
                                WireState::new(window, drag.window, version, drag.types.clone());
                            state.proposed_action = drag.actions.preferred();
                            let enter = WireEvent::Enter {
                                source: drag.window,
                                target: window,
                                version,
                                types: drag.types.iter().take(INLINE_TYPE_SLOTS).cloned().collect(),
                                more_types: drag.types.len() > INLINE_TYPE_SLOTS,
                            };
                            gesture.wire_state = Some(state);
                            send_event(wire.as_mut(), enter)?;
                        }
                    },
                    None => trace!("{window:?} is not XDND aware"),
                }
            }
        }

        let Some(target) = drag.target else {
            return Ok(());
        };
        match gesture.wire_state.as_mut() {
            Some(state) if state.awaiting_status => {
                // One position in flight at a time, the newest one goes out with the next status.
                state.pending_position = Some(sample.position);
            },
            Some(state) => {
                state.awaiting_status = true;
                state.last_position = Some(sample.position);
                let position = WireEvent::Position {
                    source: drag.window,
                    target,
                    position: sample.position,
                    time: state.timestamp,
                    action: state.proposed_action,
                };
                send_event(wire.as_mut(), position)?;
            },
            None => {
                let verdict = evaluate(
                    registry.as_ref(),
                    target,
                    sample.position,
                    &drag.types,
                    drag.actions.preferred(),
                );
                gesture.accepted = verdict.accepts();
                gesture.action = verdict.action;
                gesture.settled = verdict.settled;
            },
        }
        Ok(())
    }

    pub(super) fn handle_status(
        &mut self,
        source: WindowId,
        target: WindowId,
        accept: bool,
        _want_position: bool,
        action: DndAction,
    ) -> bool {
        let Some(gesture) = self.gesture.as_mut().filter(|g| g.is_source_of(source, target))
        else {
            debug!("XdndStatus from {target:?} for no drag of ours");
            return false;
        };
        let Role::Source(drag) = &gesture.role else {
            return false;
        };
        if drag.phase != SourcePhase::Dragging {
            trace!("ignoring XdndStatus after XdndDrop");
            return true;
        }
        let Some(state) = gesture.wire_state.as_mut() else {
            return false;
        };

        state.awaiting_status = false;
        gesture.accepted = accept;
        gesture.action = match (accept, state.version >= 2) {
            (false, _) => DndAction::None,
            (true, true) => action,
            (true, false) => DndAction::Copy,
        };
        let verb = if accept { "accepts" } else { "rejects" };
        trace!("{target:?} {verb} the drop with {:?}", gesture.action);

        let Some(pending) = state.pending_position.take() else {
            return true;
        };
        state.awaiting_status = true;
        state.last_position = Some(pending);
        let position = WireEvent::Position {
            source,
            target,
            position: pending,
            time: state.timestamp,
            action: state.proposed_action,
        };
        match send_event(self.wire.as_mut(), position) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub(super) fn handle_finished(
        &mut self,
        source: WindowId,
        target: WindowId,
        accepted: bool,
        action: DndAction,
    ) -> bool {
        let Some(gesture) = self.gesture.as_ref().filter(|g| g.is_source_of(source, target))
        else {
            debug!("XdndFinished from {target:?} for no drag of ours");
            return false;
        };
        let dropped = matches!(
            gesture.role,
            Role::Source(SourceDrag { phase: SourcePhase::Dropped { .. }, .. })
        );
        if !dropped {
            return self.fail(SessionError::ProtocolViolation("XdndFinished before XdndDrop"));
        }

        debug!("{target:?} finished the drop: accepted {accepted}, {action:?}");
        self.reset();
        true
    }

    pub(super) fn handle_selection_request(
        &mut self,
        owner: WindowId,
        requestor: WindowId,
        target_type: SmolStr,
        time: Timestamp,
    ) -> bool {
        let Some(gesture) = self.gesture.as_mut() else {
            debug!("SelectionRequest from {requestor:?} while idle");
            return self.refuse_selection_request(requestor, target_type, time);
        };
        let Role::Source(drag) = &mut gesture.role else {
            debug!("SelectionRequest from {requestor:?} while we are the drop target");
            return self.refuse_selection_request(requestor, target_type, time);
        };
        if drag.window != owner {
            debug!("SelectionRequest for {owner:?}, not our drag source");
            return self.refuse_selection_request(requestor, target_type, time);
        }

        let data = if drag.types.contains(&target_type) {
            drag.provider.provide(&target_type)
        } else {
            None
        };
        match &data {
            Some(bytes) => {
                trace!("serving {} bytes of {target_type} to {requestor:?}", bytes.len());
                gesture.settled = Some(target_type.clone());
            },
            None => debug!("refusing to convert to {target_type} for {requestor:?}"),
        }

        let notify = WireEvent::SelectionNotify { requestor, target_type, data, time };
        match send_event(self.wire.as_mut(), notify) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    /// Answer a `SelectionRequest` outside of our drag with an empty `SelectionNotify`, so the
    /// requestor does not wait for a conversion that never comes.
    ///
    /// The request is still not ours, this always returns `false`.
    fn refuse_selection_request(
        &mut self,
        requestor: WindowId,
        target_type: SmolStr,
        time: Timestamp,
    ) -> bool {
        let refusal = WireEvent::SelectionNotify { requestor, target_type, data: None, time };
        if let Err(err) = send_event(self.wire.as_mut(), refusal) {
            warn!("failed to refuse the SelectionRequest of {requestor:?}: {err}");
        }
        false
    }
}
