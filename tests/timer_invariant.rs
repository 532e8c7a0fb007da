//! The timer runs exactly while the active gesture needs it, whatever the event sequence.

mod common;

use std::time::Duration;

use common::*;
use xdnd_bridge::action::{DndAction, DndActions};
use xdnd_bridge::error::SessionError;
use xdnd_bridge::event::WireEvent;
use xdnd_bridge::window::WindowId;
use xdnd_bridge::{Phase, SessionConfig};

/// Deterministic pseudo random numbers, so failures replay.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as u32) % bound
    }
}

fn window(rng: &mut Lcg) -> Option<WindowId> {
    [None, Some(FOREIGN), Some(OTHER_FOREIGN), Some(OURS_TOO)][rng.next(4) as usize]
}

fn step(h: &mut Harness, rng: &mut Lcg) {
    match rng.next(14) {
        0 => {
            h.enter(&["text/plain", "text/uri-list"]);
        },
        1 | 2 => {
            h.position(rng.next(100) as i16, rng.next(100) as i16, DndAction::Copy);
        },
        3 => {
            h.leave();
        },
        4 => {
            h.release();
        },
        5 => {
            h.session.receive(WireEvent::SelectionNotify {
                requestor: OURS,
                target_type: "text/plain".into(),
                data: (rng.next(2) == 0).then(|| b"data".to_vec()),
                time: 2,
            });
        },
        6 => {
            let _ = h.session.begin_drag(
                OURS,
                types(&["text/plain"]),
                DndActions::COPY | DndActions::MOVE,
                payload_provider(),
            );
        },
        7 | 8 => {
            let sample = sample(rng.next(100) as i16, 0, window(rng));
            let _ = h.session.pointer_moved(sample);
        },
        9 => {
            // Mostly the target we talk to, sometimes a stale one.
            let peer = h.session.wire_state().map(|wire| wire.peer);
            let target = match peer {
                Some(peer) if rng.next(4) != 0 => peer,
                _ => window(rng).unwrap_or(FOREIGN),
            };
            h.session.receive(WireEvent::Status {
                source: OURS,
                target,
                accept: rng.next(3) != 0,
                want_position: true,
                action: DndAction::Copy,
            });
        },
        10 => {
            let _ = h.session.end_drag();
        },
        11 => {
            h.session.receive(WireEvent::Finished {
                source: OURS,
                target: FOREIGN,
                accepted: true,
                action: DndAction::Copy,
            });
        },
        12 => {
            if rng.next(2) == 0 {
                h.session.cancel_drag();
            } else {
                h.session.reset();
            }
        },
        _ => {
            h.log.borrow_mut().pointer = Some(sample(rng.next(100) as i16, 0, window(rng)));
            h.session.on_timer_tick();
        },
    }
}

fn check(h: &Harness, step: usize, phases_seen: &mut Vec<Phase>) {
    let phase = h.session.phase();
    let running = h.session.is_timer_running();
    assert_eq!(running, h.timer_running(), "step {step}: session and timer service disagree");
    assert_eq!(
        running,
        matches!(phase, Phase::Resolving | Phase::Dragging | Phase::Dropped),
        "step {step}: timer {running} in {phase:?}"
    );
    if !phases_seen.contains(&phase) {
        phases_seen.push(phase);
    }
}

#[test]
fn timer_follows_the_phase() {
    let config = SessionConfig::default()
        .with_selection_timeout(Duration::ZERO)
        .with_finish_timeout(Duration::ZERO);
    let mut h = Harness::new(config);
    h.view(OURS, &["text/plain"], DndActions::COPY);
    h.view(OURS_TOO, &["text/plain"], DndActions::COPY);
    h.log.borrow_mut().versions.insert(OTHER_FOREIGN, 4);
    let mut phases_seen = Vec::new();

    // One pass through every phase first.
    let script: [fn(&mut Harness); 9] = [
        |h| assert!(h.enter(&["text/plain"])),
        |h| assert!(h.position(1, 1, DndAction::Copy)),
        |h| assert!(h.release()),
        |h| h.session.on_timer_tick(),
        |h| {
            h.session
                .begin_drag(OURS, types(&["text/plain"]), DndActions::COPY, payload_provider())
                .unwrap()
        },
        |h| h.session.pointer_moved(sample(1, 1, Some(FOREIGN))).unwrap(),
        |h| {
            assert!(h.session.receive(WireEvent::Status {
                source: OURS,
                target: FOREIGN,
                accept: true,
                want_position: true,
                action: DndAction::Copy,
            }))
        },
        |h| h.session.end_drag().unwrap(),
        |h| h.session.on_timer_tick(),
    ];
    for (i, op) in script.iter().enumerate() {
        op(&mut h);
        check(&h, i, &mut phases_seen);
    }
    assert_eq!(phases_seen.len(), 5, "{phases_seen:?}");
    assert_eq!(h.session.phase(), Phase::Idle);

    let mut rng = Lcg(0x5eed);
    for i in 0..5_000 {
        step(&mut h, &mut rng);
        check(&h, script.len() + i, &mut phases_seen);
    }
}

#[test]
fn reset_is_idempotent() {
    let mut h = Harness::new(SessionConfig::default());
    h.session.reset();
    assert_eq!(h.log.borrow().timer_cancels, 0);

    h.session
        .begin_drag(OURS, types(&["text/plain"]), DndActions::COPY, payload_provider())
        .unwrap();
    h.session.reset();
    h.session.reset();
    assert_eq!(h.session.phase(), Phase::Idle);
    assert_eq!(h.log.borrow().timer_starts, 1);
    assert_eq!(h.log.borrow().timer_cancels, 1);
    assert_eq!(h.log.borrow().selection_owner, None);
}

#[test]
fn failed_start_leaves_the_timer_stopped() {
    let mut h = Harness::new(SessionConfig::default());
    h.log.borrow_mut().fail_timer = true;

    h.session
        .begin_drag(OURS, types(&["text/plain"]), DndActions::COPY, payload_provider())
        .unwrap();
    assert_eq!(h.session.phase(), Phase::Dragging);
    assert!(!h.session.is_timer_running());
    assert!(matches!(h.session.take_last_error(), Some(SessionError::Wire(_))));

    // The next event that wants the timer tries again.
    h.log.borrow_mut().fail_timer = false;
    h.session.pointer_moved(sample(1, 1, None)).unwrap();
    assert!(h.session.is_timer_running());
    assert!(h.timer_running());
    assert_eq!(h.log.borrow().timer_starts, 1);

    h.session.reset();
    assert_eq!(h.log.borrow().timer_cancels, 1);
}
