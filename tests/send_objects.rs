#[allow(dead_code)]
fn needs_send<T: Send + ?Sized>() {}

#[allow(dead_code)]
fn needs_sync<T: Sync + ?Sized>() {}

#[test]
fn events_send() {
    needs_send::<xdnd_bridge::event::WireEvent>();
    needs_sync::<xdnd_bridge::event::WireEvent>();
}

#[test]
fn errors_send() {
    needs_send::<xdnd_bridge::error::WireError>();
    needs_send::<xdnd_bridge::error::SessionError>();
    needs_sync::<xdnd_bridge::error::SessionError>();
}

#[test]
fn state_send() {
    needs_send::<xdnd_bridge::SessionConfig>();
    needs_send::<xdnd_bridge::WireState>();
    needs_send::<xdnd_bridge::Phase>();
    needs_send::<xdnd_bridge::session_type::SessionType>();
    needs_send::<xdnd_bridge::window::DropTarget>();
}
