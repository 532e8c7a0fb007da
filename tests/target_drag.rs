//! Drags from a foreign client into our windows.

mod common;

use std::time::Duration;

use common::*;
use xdnd_bridge::action::{DndAction, DndActions};
use xdnd_bridge::error::SessionError;
use xdnd_bridge::event::WireEvent;
use xdnd_bridge::session_type::SessionType;
use xdnd_bridge::{Phase, SessionConfig};

#[test]
fn plain_text_drop() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY);

    assert!(h.enter(&["text/uri-list", "text/plain"]));
    assert_eq!(h.session.phase(), Phase::Tracking);
    assert_eq!(h.session.session_type(), Some(SessionType::ForeignToNative));
    assert!(h.session.is_foreign_dragger());
    assert_eq!(h.session.available_types(), Some(&types(&["text/uri-list", "text/plain"])[..]));
    assert_eq!(h.log.borrow().offered, vec![types(&["text/uri-list", "text/plain"])]);
    assert!(!h.timer_running());

    assert!(h.position(10, 10, DndAction::Copy));
    assert_eq!(
        h.last_sent(),
        Some(WireEvent::Status {
            source: FOREIGN,
            target: OURS,
            accept: true,
            want_position: true,
            action: DndAction::Copy,
        })
    );
    assert_eq!(h.session.settled_type(), Some("text/plain"));
    assert_eq!(h.session.current_action(), DndAction::Copy);

    assert!(h.release());
    assert_eq!(
        h.last_sent(),
        Some(WireEvent::SelectionRequest {
            owner: FOREIGN,
            requestor: OURS,
            target_type: "text/plain".into(),
            time: 2,
        })
    );
    assert_eq!(h.session.phase(), Phase::Resolving);
    assert!(h.timer_running());

    assert!(h.session.receive(WireEvent::SelectionNotify {
        requestor: OURS,
        target_type: "text/plain".into(),
        data: Some(b"hello".to_vec()),
        time: 2,
    }));
    assert_eq!(h.log.borrow().writes, vec![("text/plain".to_owned(), b"hello".to_vec())]);
    assert_eq!(
        h.last_sent(),
        Some(WireEvent::Finished {
            source: FOREIGN,
            target: OURS,
            accepted: true,
            action: DndAction::Copy,
        })
    );
    assert_eq!(h.log.borrow().count_sent("XdndFinished"), 1);
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(!h.timer_running());
    assert!(h.session.take_last_error().is_none());
}

#[test]
fn no_common_type() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["image/png"], DndActions::COPY);

    assert!(h.enter(&["text/uri-list", "text/plain"]));
    for x in [10, 20, 30] {
        assert!(h.position(x, 10, DndAction::Copy));
        assert_eq!(
            h.last_sent(),
            Some(WireEvent::Status {
                source: FOREIGN,
                target: OURS,
                accept: false,
                want_position: true,
                action: DndAction::None,
            })
        );
    }
    assert_eq!(h.session.settled_type(), None);

    assert!(h.release());
    assert_eq!(h.session.phase(), Phase::Idle);
    assert_eq!(h.log.borrow().count_sent("SelectionRequest"), 0);
    assert_eq!(
        h.last_sent(),
        Some(WireEvent::Finished {
            source: FOREIGN,
            target: OURS,
            accepted: false,
            action: DndAction::None,
        })
    );
    assert!(matches!(h.session.take_last_error(), Some(SessionError::NegotiationFailure)));
}

#[test]
fn position_outside_every_view_is_rejected() {
    let mut h = Harness::new(SessionConfig::default());
    h.view_in(OURS, (0, 0), (50, 50), &["text/plain"], DndActions::COPY);

    assert!(h.enter(&["text/plain"]));
    assert!(h.position(100, 100, DndAction::Copy));
    assert!(matches!(h.last_sent(), Some(WireEvent::Status { accept: false, .. })));
    assert_eq!(h.session.phase(), Phase::Tracking);
    assert!(h.session.take_last_error().is_none());

    // Back inside.
    assert!(h.position(25, 25, DndAction::Copy));
    assert!(matches!(h.last_sent(), Some(WireEvent::Status { accept: true, .. })));
}

#[test]
fn leave_before_drop() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY);

    assert!(h.enter(&["text/plain"]));
    assert!(h.position(10, 10, DndAction::Copy));
    assert!(h.leave());

    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.log.borrow().writes.is_empty());
    assert!(!h.timer_running());

    // The drop of a gesture that already left is not ours anymore.
    assert!(!h.release());
    assert!(h.log.borrow().writes.is_empty());
}

#[test]
fn spurious_second_leave() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(h.enter(&["text/plain"]));
    assert!(h.leave());
    let cancels = h.log.borrow().timer_cancels;

    assert!(!h.leave());
    assert_eq!(h.session.phase(), Phase::Idle);
    assert_eq!(h.log.borrow().timer_cancels, cancels);
    assert!(h.session.take_last_error().is_none());
}

#[test]
fn stray_position_is_not_ours() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(!h.position(10, 10, DndAction::Copy));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.sent().is_empty());
}

#[test]
fn drop_while_idle() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(!h.release());
    assert!(matches!(h.session.take_last_error(), Some(SessionError::ProtocolViolation(_))));
    assert!(h.sent().is_empty());
}

#[test]
fn enter_while_active_starts_over() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(h.enter(&["text/plain"]));

    assert!(h.session.receive(enter(OTHER_FOREIGN, OURS, 4, &["image/png"], false)));
    assert!(matches!(h.session.take_last_error(), Some(SessionError::ProtocolViolation(_))));
    let wire = h.session.wire_state().unwrap();
    assert_eq!(wire.peer, OTHER_FOREIGN);
    assert_eq!(wire.version, 4);
    assert_eq!(wire.offered, types(&["image/png"]));

    // The first source is forgotten.
    assert!(!h.position(10, 10, DndAction::Copy));
}

#[test]
fn enter_for_unknown_window() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(!h.session.receive(enter(FOREIGN, OTHER_FOREIGN, 5, &["text/plain"], false)));
    assert!(matches!(
        h.session.take_last_error(),
        Some(SessionError::UnknownWindow(window)) if window == OTHER_FOREIGN
    ));
    assert_eq!(h.session.phase(), Phase::Idle);
}

#[test]
fn unsupported_version_is_refused() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(h.session.receive(enter(FOREIGN, OURS, 2, &["text/plain"], false)));
    assert_eq!(h.session.phase(), Phase::Idle);

    let mut h = Harness::new(SessionConfig::default().with_version(4));
    assert!(h.session.receive(enter(FOREIGN, OURS, 5, &["text/plain"], false)));
    assert_eq!(h.session.phase(), Phase::Idle);
}

#[test]
fn long_type_lists_are_read_from_the_property() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY);
    let offered = types(&["image/png", "image/jpeg", "text/html", "text/uri-list", "text/plain"]);
    h.log.borrow_mut().type_lists.insert(FOREIGN, offered.clone());

    assert!(h.session.receive(enter(
        FOREIGN,
        OURS,
        5,
        &["image/png", "image/jpeg", "text/html"],
        true
    )));
    assert_eq!(h.session.available_types(), Some(&offered[..]));

    assert!(h.position(10, 10, DndAction::Copy));
    assert!(matches!(h.last_sent(), Some(WireEvent::Status { accept: true, .. })));
    assert_eq!(h.session.settled_type(), Some("text/plain"));
}

#[test]
fn unreadable_type_list_starts_nothing() {
    let mut h = Harness::new(SessionConfig::default());
    assert!(h.session.receive(enter(FOREIGN, OURS, 5, &["a", "b", "c"], true)));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(matches!(h.session.take_last_error(), Some(SessionError::Wire(_))));
}

#[test]
fn first_match_in_source_order() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain", "text/uri-list"], DndActions::COPY);

    assert!(h.enter(&["text/uri-list", "text/plain"]));
    assert!(h.position(10, 10, DndAction::Copy));
    assert_eq!(h.session.settled_type(), Some("text/uri-list"));
}

#[test]
fn action_negotiation() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY | DndActions::MOVE);
    assert!(h.enter(&["text/plain"]));

    assert!(h.position(10, 10, DndAction::Move));
    assert!(matches!(
        h.last_sent(),
        Some(WireEvent::Status { accept: true, action: DndAction::Move, .. })
    ));

    assert!(h.position(10, 10, DndAction::Link));
    assert!(matches!(
        h.last_sent(),
        Some(WireEvent::Status { accept: true, action: DndAction::Copy, .. })
    ));
}

#[test]
fn dropped_data_never_arrives() {
    let config = SessionConfig::default().with_selection_timeout(Duration::ZERO);
    let mut h = Harness::new(config);
    h.view(OURS, &["text/plain"], DndActions::COPY);

    assert!(h.enter(&["text/plain"]));
    assert!(h.position(10, 10, DndAction::Copy));
    assert!(h.release());
    assert!(h.timer_running());

    h.session.on_timer_tick();
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(!h.timer_running());
    assert!(matches!(h.session.take_last_error(), Some(SessionError::Timeout)));
    assert!(matches!(h.last_sent(), Some(WireEvent::Finished { accepted: false, .. })));
    assert!(h.log.borrow().writes.is_empty());
}

#[test]
fn refused_conversion() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY);

    assert!(h.enter(&["text/plain"]));
    assert!(h.position(10, 10, DndAction::Copy));
    assert!(h.release());
    assert!(h.session.receive(WireEvent::SelectionNotify {
        requestor: OURS,
        target_type: "text/plain".into(),
        data: None,
        time: 2,
    }));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(matches!(h.last_sent(), Some(WireEvent::Finished { accepted: false, .. })));
    assert!(matches!(h.session.take_last_error(), Some(SessionError::NegotiationFailure)));
}

#[test]
fn failing_wire_resets() {
    let mut h = Harness::new(SessionConfig::default());
    h.view(OURS, &["text/plain"], DndActions::COPY);
    assert!(h.enter(&["text/plain"]));

    h.log.borrow_mut().fail_sends = true;
    assert!(h.position(10, 10, DndAction::Copy));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(matches!(h.session.take_last_error(), Some(SessionError::Wire(_))));
}

#[test]
fn register_drop_window() {
    let mut h = Harness::new(SessionConfig::default().with_version(4));
    h.session.register_drop_window(OURS, &types(&["text/plain"])).unwrap();
    assert_eq!(h.log.borrow().versions.get(&OURS), Some(&4));

    let err = h.session.register_drop_window(FOREIGN, &types(&["text/plain"])).unwrap_err();
    assert!(matches!(err, SessionError::UnknownWindow(window) if window == FOREIGN));

    // The registered types are what the window accepts.
    assert!(h.session.receive(enter(FOREIGN, OURS, 4, &["text/plain"], false)));
    assert!(h.position(10, 10, DndAction::Copy));
    assert!(matches!(h.last_sent(), Some(WireEvent::Status { accept: true, .. })));
}
