#![cfg(feature = "serde")]

use serde::{Deserialize, Serialize};
use xdnd_bridge::action::{DndAction, DndActions};
use xdnd_bridge::event::WireEvent;
use xdnd_bridge::session_type::SessionType;
use xdnd_bridge::window::{DropTarget, PointerSample, WindowId};
use xdnd_bridge::{SessionConfig, WireState};

#[allow(dead_code)]
fn needs_serde<S: Serialize + Deserialize<'static>>() {}

#[test]
fn wire_serde() {
    needs_serde::<WireEvent>();
    needs_serde::<WireState>();
    needs_serde::<WindowId>();
}

#[test]
fn negotiation_serde() {
    needs_serde::<DndAction>();
    needs_serde::<DndActions>();
    needs_serde::<SessionType>();
    needs_serde::<DropTarget>();
    needs_serde::<PointerSample>();
}

#[test]
fn config_serde() {
    needs_serde::<SessionConfig>();

    let json = serde_json::to_string(&SessionConfig::default()).unwrap();
    let config: SessionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, SessionConfig::default());
}
