//! Low-level byte stream parser for module image decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary
//! data parser for reading the structures of a serialized module image. It offers
//! bounds-checked access to binary data: all read operations validate availability
//! before touching the buffer, so malformed or truncated images surface as
//! [`crate::Error::OutOfBounds`] instead of panics.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor model that maintains a position within a
//! byte slice:
//!
//! - **Position tracking** - maintains the current offset for sequential parsing
//! - **Bounds checking** - every operation validates data availability before reading
//! - **Type-safe reading** - strongly typed methods for the primitive widths the
//!   image format uses (all little-endian)
//!
//! # Usage
//!
//! ```rust
//! use snrekey::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! let value = parser.read_u16()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), snrekey::Error>(())
//! ```

use crate::Result;

/// A bounds-checked cursor over binary data.
///
/// `Parser` provides sequential and random access to a byte slice in little-endian
/// format. It maintains an internal position cursor and validates every access to
/// prevent buffer overruns when reading malformed or truncated data.
pub struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the given data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, pos: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// `true` while the cursor has not reached the end of the data.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Number of bytes left between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }
        self.pos = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the step would leave the buffer.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let Some(new_pos) = self.pos.checked_add(step) else {
            return Err(crate::Error::OutOfBounds);
        };
        if new_pos > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }
        self.pos = new_pos;
        Ok(())
    }

    /// Verify that at least `needed` bytes remain.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `needed` bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(crate::Error::OutOfBounds);
        }
        Ok(())
    }

    /// Read a single byte and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Read a little-endian `u16` and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    /// Read a little-endian `u32` and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian `u64` and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure_remaining(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read `length` raw bytes and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(length)?;
        let slice = &self.data[self.pos..self.pos + length];
        self.pos += length;
        Ok(slice)
    }

    /// Read a `u32`-length-prefixed UTF-8 string and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data, or
    /// [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| malformed_error!("String at offset {} is not valid UTF-8", self.pos))
    }
}
