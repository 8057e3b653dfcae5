//! Cursor over packet bytes with a per-layer start marker
//!
//! A [`Buffer`] is used by every protocol codec for both encoding and
//! decoding. It keeps a cursor and a "layer start" marker that the
//! composition driver moves each time it begins a new layer; checksum
//! patching addresses bytes relative to that marker.
//!
//! A buffer packs into owned, pre-sized storage ([`Buffer::zeroed`]) or reads
//! out of a borrowed slice without copying ([`Buffer::view`]).

use bytes::BytesMut;

use crate::error::{Error, Result};

enum Inner<'a> {
    Owned(BytesMut),
    View(&'a [u8]),
}

/// Cursor over a fixed-size run of packet bytes.
///
/// Invariant: `0 <= layer_start <= offset <= len`.
pub struct Buffer<'a> {
    data: Inner<'a>,
    off: usize,
    layer_off: usize,
}

impl Buffer<'static> {
    /// Create an owned, zero-filled buffer of `len` bytes for packing.
    ///
    /// Packing assumes the caller has sized the buffer to the chain's total
    /// wire length; writes past the end fail instead of growing.
    pub fn zeroed(len: usize) -> Buffer<'static> {
        Buffer {
            data: Inner::Owned(BytesMut::zeroed(len)),
            off: 0,
            layer_off: 0,
        }
    }
}

impl<'a> Buffer<'a> {
    /// Create a read-only view over an existing slice for unpacking. No copy
    /// is made; the decoded layers borrow nothing and outlive the buffer.
    pub fn view(data: &'a [u8]) -> Buffer<'a> {
        Buffer {
            data: Inner::View(data),
            off: 0,
            layer_off: 0,
        }
    }

    fn slice(&self) -> &[u8] {
        match &self.data {
            Inner::Owned(b) => b,
            Inner::View(b) => b,
        }
    }

    fn slice_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.data {
            Inner::Owned(b) => Ok(&mut b[..]),
            Inner::View(_) => Err(Error::Unsupported("write into read-only buffer")),
        }
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.slice().len()
    }

    /// Whether the buffer holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.slice().is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.off
    }

    /// Number of bytes between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.len() - self.off
    }

    /// Move the cursor to an absolute position. Used by the inside-out
    /// packing order, which seats each layer at `total - wire_len(layer)`.
    pub fn set_offset(&mut self, off: usize) {
        debug_assert!(off <= self.len());
        self.off = off;
        if self.layer_off > self.off {
            self.layer_off = self.off;
        }
    }

    /// Mark the current cursor position as the start of a new layer.
    pub fn begin_layer(&mut self) {
        self.layer_off = self.off;
    }

    /// Bytes from the layer marker to the end of the buffer.
    ///
    /// During an inside-out pack this includes the already-encoded inner
    /// layers, which is exactly what a transport checksum must cover.
    pub fn layer_bytes(&self) -> &[u8] {
        &self.slice()[self.layer_off..]
    }

    /// Number of bytes from the layer marker to the end of the buffer.
    pub fn layer_len(&self) -> usize {
        self.len() - self.layer_off
    }

    /// The whole buffer as a slice.
    pub fn bytes(&self) -> &[u8] {
        self.slice()
    }

    /// Consume the buffer and return its contents.
    pub fn into_vec(self) -> Vec<u8> {
        match self.data {
            Inner::Owned(b) => b.to_vec(),
            Inner::View(b) => b.to_vec(),
        }
    }

    fn check_read(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                need: n,
                have: self.remaining(),
            });
        }

        Ok(())
    }

    /// Read one byte, advancing the cursor.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.check_read(1)?;
        let v = self.slice()[self.off];
        self.off += 1;
        Ok(v)
    }

    /// Read a big-endian u16, advancing the cursor.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.check_read(2)?;
        let s = self.slice();
        let v = u16::from_be_bytes([s[self.off], s[self.off + 1]]);
        self.off += 2;
        Ok(v)
    }

    /// Read a big-endian u32, advancing the cursor.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.check_read(4)?;
        let s = self.slice();
        let v = u32::from_be_bytes([s[self.off], s[self.off + 1], s[self.off + 2], s[self.off + 3]]);
        self.off += 4;
        Ok(v)
    }

    /// Read a little-endian u16, advancing the cursor.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.check_read(2)?;
        let s = self.slice();
        let v = u16::from_le_bytes([s[self.off], s[self.off + 1]]);
        self.off += 2;
        Ok(v)
    }

    /// Read a little-endian u32, advancing the cursor.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.check_read(4)?;
        let s = self.slice();
        let v = u32::from_le_bytes([s[self.off], s[self.off + 1], s[self.off + 2], s[self.off + 3]]);
        self.off += 4;
        Ok(v)
    }

    /// Take the next `n` bytes as a slice, advancing the cursor. Truncated
    /// to whatever remains; callers that need an exact count check the
    /// returned length.
    pub fn next(&mut self, n: usize) -> &[u8] {
        let n = n.min(self.remaining());
        let start = self.off;
        self.off += n;
        &self.slice()[start..start + n]
    }

    fn check_write(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::Overflow {
                need: n,
                have: self.remaining(),
            });
        }

        Ok(())
    }

    /// Write a raw byte sequence at the cursor.
    pub fn write_slice(&mut self, src: &[u8]) -> Result<()> {
        self.check_write(src.len())?;
        let off = self.off;
        self.slice_mut()?[off..off + src.len()].copy_from_slice(src);
        self.off += src.len();
        Ok(())
    }

    /// Write one byte at the cursor.
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_slice(&[v])
    }

    /// Write a big-endian u16 at the cursor.
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_slice(&v.to_be_bytes())
    }

    /// Write a big-endian u32 at the cursor.
    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_slice(&v.to_be_bytes())
    }

    /// Write a little-endian u16 at the cursor.
    pub fn write_u16_le(&mut self, v: u16) -> Result<()> {
        self.write_slice(&v.to_le_bytes())
    }

    /// Write a little-endian u32 at the cursor.
    pub fn write_u32_le(&mut self, v: u32) -> Result<()> {
        self.write_slice(&v.to_le_bytes())
    }

    /// Patch a big-endian u16 at `off` bytes past the layer marker, without
    /// moving the cursor. This is how checksums land in their slot after the
    /// surrounding bytes have been encoded.
    pub fn patch_u16(&mut self, off: usize, v: u16) -> Result<()> {
        let at = self.layer_off + off;
        if at + 2 > self.len() {
            return Err(Error::Overflow {
                need: at + 2 - self.len(),
                have: 0,
            });
        }

        self.slice_mut()?[at..at + 2].copy_from_slice(&v.to_be_bytes());
        Ok(())
    }
}
