use std::error::Error;
use std::fmt;
use std::mem;
use std::sync::Arc;

use bytemuck::Pod;
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{self, ConnectionExt as _};

#[derive(Debug, Clone)]
pub enum GetPropertyError {
    X11rbError(Arc<ReplyError>),
    TypeMismatch(xproto::Atom),
    FormatMismatch(u8),
}

impl GetPropertyError {
    /// Whether the property turned out to be of type `t`. A missing property has type `NONE`.
    pub fn is_actual_property_type(&self, t: xproto::Atom) -> bool {
        if let GetPropertyError::TypeMismatch(actual_type) = *self {
            actual_type == t
        } else {
            false
        }
    }
}

impl<T: Into<ReplyError>> From<T> for GetPropertyError {
    fn from(e: T) -> Self {
        Self::X11rbError(Arc::new(e.into()))
    }
}

impl fmt::Display for GetPropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GetPropertyError::X11rbError(err) => err.fmt(f),
            GetPropertyError::TypeMismatch(err) => write!(f, "type mismatch: {err}"),
            GetPropertyError::FormatMismatch(err) => write!(f, "format mismatch: {err}"),
        }
    }
}

impl Error for GetPropertyError {}

// Number of 32-bit chunks to retrieve per iteration of get_property's inner loop.
const PROPERTY_BUFFER_SIZE: u32 = 1024;

/// Read the whole of `property` on `window`.
///
/// With `property_type` set to `AnyPropertyType` the property is read whatever its type, as done
/// for selection payloads.
pub(crate) fn get_property<C: Connection + ?Sized, T: Pod>(
    conn: &C,
    window: xproto::Window,
    property: xproto::Atom,
    property_type: xproto::Atom,
) -> Result<Vec<T>, GetPropertyError> {
    let mut iter = PropIterator::new(conn, window, property, property_type);
    let mut data = vec![];

    while iter.next_window(&mut data)? {}

    Ok(data)
}

/// An iterator over the "windows" of the property that we are fetching.
struct PropIterator<'a, C: ?Sized, T> {
    conn: &'a C,
    window: xproto::Window,
    property: xproto::Atom,
    property_type: xproto::Atom,

    /// The offset of the next window, in 32-bit chunks.
    offset: u32,

    /// The format of the type.
    format: u8,

    _phantom: std::marker::PhantomData<T>,
}

impl<'a, C: Connection + ?Sized, T: Pod> PropIterator<'a, C, T> {
    fn new(
        conn: &'a C,
        window: xproto::Window,
        property: xproto::Atom,
        property_type: xproto::Atom,
    ) -> Self {
        let format = match mem::size_of::<T>() {
            1 => 8,
            2 => 16,
            4 => 32,
            _ => unreachable!(),
        };

        Self {
            conn,
            window,
            property,
            property_type,
            offset: 0,
            format,
            _phantom: Default::default(),
        }
    }

    /// Get the next window and append it to `data`.
    ///
    /// Returns whether there are more windows to fetch.
    fn next_window(&mut self, data: &mut Vec<T>) -> Result<bool, GetPropertyError> {
        let reply = self
            .conn
            .get_property(
                false,
                self.window,
                self.property,
                self.property_type,
                self.offset,
                PROPERTY_BUFFER_SIZE,
            )?
            .reply()?;

        let any_type = self.property_type == u32::from(xproto::AtomEnum::ANY);
        if reply.type_ == x11rb::NONE || (!any_type && reply.type_ != self.property_type) {
            return Err(GetPropertyError::TypeMismatch(reply.type_));
        }

        if reply.format != self.format {
            return Err(GetPropertyError::FormatMismatch(reply.format));
        }

        if mem::size_of::<T>() == 1 && mem::align_of::<T>() == 1 {
            data.extend_from_slice(bytemuck::cast_slice(&reply.value));
        } else {
            // Copy through a zeroed buffer, `reply.value` is not aligned for `T`.
            let old_len = data.len();
            let added_len = reply.value.len() / mem::size_of::<T>();
            data.resize(old_len + added_len, T::zeroed());
            bytemuck::cast_slice_mut::<T, u8>(&mut data[old_len..])
                .copy_from_slice(&reply.value[..added_len * mem::size_of::<T>()]);
        }

        self.offset += PROPERTY_BUFFER_SIZE;
        Ok(reply.bytes_after != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_property_is_type_none() {
        let err = GetPropertyError::TypeMismatch(x11rb::NONE);
        assert!(err.is_actual_property_type(x11rb::NONE));
        assert!(!GetPropertyError::FormatMismatch(8).is_actual_property_type(x11rb::NONE));
    }
}
