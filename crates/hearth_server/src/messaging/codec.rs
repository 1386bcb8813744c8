//! Fixed-size binary message buffer.
//!
//! A [`MessageBuffer`] is the unit exchanged with game clients: one buffer is
//! one WebSocket frame. The first two bytes are always the message id; the rest
//! is the handler-defined body. All integers are little-endian.
//!
//! # Text
//!
//! Strings are encoded as an `i32` character count followed by that many
//! single-byte characters. Only ASCII is supported; any other input is rejected
//! with [`CodecError::NonAscii`] instead of being silently rewritten.

use crate::error::CodecError;

/// Hard per-message size ceiling in bytes.
pub const MESSAGE_CAPACITY: usize = 4 * 1024;

/// Integer vector used for positions on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector3i {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vector3i {
    /// The origin.
    pub const ZERO: Vector3i = Vector3i { x: 0, y: 0, z: 0 };

    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }
}

/// A message buffer with independent read and write cursors.
///
/// Writes append at the write cursor, reads consume at the read cursor. Reads
/// are bounded by the populated length, which is the high-water mark of all
/// writes (or the size of the frame received into the buffer).
pub struct MessageBuffer {
    buffer: Box<[u8; MESSAGE_CAPACITY]>,
    read_position: usize,
    write_position: usize,
    len: usize,
}

impl MessageBuffer {
    /// Creates an empty buffer with both cursors at zero.
    pub fn new() -> Self {
        Self {
            buffer: Box::new([0; MESSAGE_CAPACITY]),
            read_position: 0,
            write_position: 0,
            len: 0,
        }
    }

    /// Current read cursor.
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Current write cursor.
    pub fn write_position(&self) -> usize {
        self.write_position
    }

    /// Number of populated bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Zeroes both cursors and forgets the populated length.
    ///
    /// The underlying bytes are left as they are.
    pub fn reset_position(&mut self) {
        self.read_position = 0;
        self.write_position = 0;
        self.len = 0;
    }

    /// The region a send transmits: `0..write_position`.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.write_position]
    }

    /// Replaces the contents with a received frame.
    ///
    /// Cursors are reset, the frame is copied to the start of the buffer and
    /// the write cursor is left at its end.
    pub fn fill_from(&mut self, frame: &[u8]) -> Result<(), CodecError> {
        self.reset_position();
        self.put(frame)
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// Reads a length-prefixed single-byte string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let length = self.read_i32()?;
        let length = usize::try_from(length).map_err(|_| CodecError::InvalidLength(length))?;
        self.ensure_readable(length)?;

        let bytes = &self.buffer[self.read_position..self.read_position + length];
        if !bytes.is_ascii() {
            return Err(CodecError::NonAscii);
        }
        let text = bytes.iter().map(|&b| b as char).collect();
        self.read_position += length;
        Ok(text)
    }

    pub fn read_vector3i(&mut self) -> Result<Vector3i, CodecError> {
        let x = self.read_i16()?;
        let y = self.read_i16()?;
        let z = self.read_i16()?;
        Ok(Vector3i { x, y, z })
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), CodecError> {
        self.put(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
        self.put(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.put(&value.to_le_bytes())
    }

    /// Writes a length-prefixed single-byte string.
    ///
    /// Fails without writing anything if the text is not ASCII or does not fit.
    pub fn write_string(&mut self, text: &str) -> Result<(), CodecError> {
        if !text.is_ascii() {
            return Err(CodecError::NonAscii);
        }
        let length = i32::try_from(text.len()).map_err(|_| CodecError::Overflow {
            needed: text.len(),
            remaining: self.remaining_capacity(),
        })?;
        self.ensure_writable(4 + text.len())?;
        self.put(&length.to_le_bytes())?;
        self.put(text.as_bytes())
    }

    pub fn write_vector3i(&mut self, vector: Vector3i) -> Result<(), CodecError> {
        self.ensure_writable(6)?;
        self.write_i16(vector.x)?;
        self.write_i16(vector.y)?;
        self.write_i16(vector.z)
    }

    fn remaining_capacity(&self) -> usize {
        MESSAGE_CAPACITY - self.write_position
    }

    fn ensure_writable(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining_capacity();
        if needed > remaining {
            return Err(CodecError::Overflow { needed, remaining });
        }
        Ok(())
    }

    fn ensure_readable(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.len.saturating_sub(self.read_position);
        if needed > remaining {
            return Err(CodecError::Underflow { needed, remaining });
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.ensure_writable(bytes.len())?;
        let end = self.write_position + bytes.len();
        self.buffer[self.write_position..end].copy_from_slice(bytes);
        self.write_position = end;
        self.len = self.len.max(end);
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.ensure_readable(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.read_position..self.read_position + N]);
        self.read_position += N;
        Ok(out)
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("read_position", &self.read_position)
            .field("write_position", &self.write_position)
            .field("len", &self.len)
            .finish()
    }
}
