//! The XDND client messages, bit for bit.
//!
//! Every message is a `ClientMessage` of format 32. The first data word always holds the window
//! of the sender; the addressee is the `window` field of the event itself.

use bitflags::bitflags;
use x11rb::protocol::xproto;

bitflags! {
    /// `data.l[1]` of `XdndEnter`, below the version byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct EnterFlags: u32 {
        /// The source offers more than three types, see `XdndTypeList`.
        const MORE_TYPES = 1 << 0;
    }

    /// `data.l[1]` of `XdndStatus`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct StatusFlags: u32 {
        const ACCEPT = 1 << 0;
        /// Send `XdndPosition` for every motion, even inside the rectangle.
        const WANT_POSITION = 1 << 1;
    }

    /// `data.l[1]` of `XdndFinished`, version 5.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct FinishedFlags: u32 {
        const ACCEPTED = 1 << 0;
    }
}

const VERSION_SHIFT: u32 = 24;

/// Which XDND message a `ClientMessage` carries, from its type atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Enter,
    Position,
    Status,
    Leave,
    Drop,
    Finished,
}

/// A decoded XDND message, still in atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XdndMessage {
    Enter { source: xproto::Window, version: u8, more_types: bool, types: [xproto::Atom; 3] },
    Position {
        source: xproto::Window,
        x: i16,
        y: i16,
        time: xproto::Timestamp,
        action: xproto::Atom,
    },
    Status { target: xproto::Window, accept: bool, want_position: bool, action: xproto::Atom },
    Leave { source: xproto::Window },
    Drop { source: xproto::Window, time: xproto::Timestamp },
    Finished { target: xproto::Window, accepted: bool, action: xproto::Atom },
}

impl XdndMessage {
    pub(crate) fn kind(&self) -> MessageKind {
        match self {
            XdndMessage::Enter { .. } => MessageKind::Enter,
            XdndMessage::Position { .. } => MessageKind::Position,
            XdndMessage::Status { .. } => MessageKind::Status,
            XdndMessage::Leave { .. } => MessageKind::Leave,
            XdndMessage::Drop { .. } => MessageKind::Drop,
            XdndMessage::Finished { .. } => MessageKind::Finished,
        }
    }

    pub(crate) fn decode(kind: MessageKind, data: [u32; 5]) -> XdndMessage {
        match kind {
            MessageKind::Enter => {
                let flags = EnterFlags::from_bits_truncate(data[1]);
                XdndMessage::Enter {
                    source: data[0],
                    version: (data[1] >> VERSION_SHIFT) as u8,
                    more_types: flags.contains(EnterFlags::MORE_TYPES),
                    types: [data[2], data[3], data[4]],
                }
            },
            MessageKind::Position => {
                // Root coordinates, packed as `x << 16 | y`.
                let x = (data[2] >> 16) as u16 as i16;
                let y = (data[2] & 0xffff) as u16 as i16;
                XdndMessage::Position { source: data[0], x, y, time: data[3], action: data[4] }
            },
            MessageKind::Status => {
                let flags = StatusFlags::from_bits_truncate(data[1]);
                XdndMessage::Status {
                    target: data[0],
                    accept: flags.contains(StatusFlags::ACCEPT),
                    want_position: flags.contains(StatusFlags::WANT_POSITION),
                    action: data[4],
                }
            },
            MessageKind::Leave => XdndMessage::Leave { source: data[0] },
            MessageKind::Drop => XdndMessage::Drop { source: data[0], time: data[2] },
            MessageKind::Finished => {
                let flags = FinishedFlags::from_bits_truncate(data[1]);
                XdndMessage::Finished {
                    target: data[0],
                    accepted: flags.contains(FinishedFlags::ACCEPTED),
                    action: data[2],
                }
            },
        }
    }

    pub(crate) fn encode(&self) -> [u32; 5] {
        match *self {
            XdndMessage::Enter { source, version, more_types, types } => {
                let mut flags = EnterFlags::empty();
                flags.set(EnterFlags::MORE_TYPES, more_types);
                let version = u32::from(version) << VERSION_SHIFT;
                [source, version | flags.bits(), types[0], types[1], types[2]]
            },
            XdndMessage::Position { source, x, y, time, action } => {
                let position = (u32::from(x as u16) << 16) | u32::from(y as u16);
                [source, 0, position, time, action]
            },
            XdndMessage::Status { target, accept, want_position, action } => {
                let mut flags = StatusFlags::empty();
                flags.set(StatusFlags::ACCEPT, accept);
                flags.set(StatusFlags::WANT_POSITION, want_position);
                // An empty rectangle: no area where positions may be skipped.
                [target, flags.bits(), 0, 0, action]
            },
            XdndMessage::Leave { source } => [source, 0, 0, 0, 0],
            XdndMessage::Drop { source, time } => [source, 0, time, 0, 0],
            XdndMessage::Finished { target, accepted, action } => {
                let mut flags = FinishedFlags::empty();
                flags.set(FinishedFlags::ACCEPTED, accepted);
                [target, flags.bits(), action, 0, 0]
            },
        }
    }
}
