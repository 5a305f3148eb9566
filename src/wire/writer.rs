//! Bounded, position-aware writer used to serialize DNS messages.

use crate::error::Error;
use crate::wire::MAX_MESSAGE_LEN;

/// A fixed-capacity message writer.
///
/// Every write checks the remaining capacity before touching the buffer, so
/// an overflowing write fails cleanly and never leaves a half-written field
/// behind.
#[derive(Debug)]
pub struct MessageWriter {
    buf: [u8; MAX_MESSAGE_LEN],
    len: usize,
}

impl MessageWriter {
    #[must_use]
    pub fn new() -> Self {
        MessageWriter {
            buf: [0; MAX_MESSAGE_LEN],
            len: 0,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Errors
    ///
    /// Returns [`Error::BufferOverflow`] when the byte would not fit.
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.write_bytes(&[value])
    }

    /// # Errors
    ///
    /// Returns [`Error::BufferOverflow`] when the big-endian value would not fit.
    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// # Errors
    ///
    /// Returns [`Error::BufferOverflow`] when the big-endian value would not fit.
    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// # Errors
    ///
    /// Returns [`Error::BufferOverflow`] when the bytes would not fit; the
    /// buffer and write position are left untouched in that case.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self
            .len
            .checked_add(bytes.len())
            .filter(|end| *end <= MAX_MESSAGE_LEN)
            .ok_or(Error::BufferOverflow {
                capacity: MAX_MESSAGE_LEN,
            })?;
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    /// Consume the writer, returning only the bytes actually written.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf[..self.len].to_vec()
    }
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}
