//! Big-endian cursor over ROOT's streamer encoding.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the leading u32 of objects streamed with a byte count.
pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;

const IS_REFERENCED: u32 = 0x0000_0010;

macro_rules! be_reader {
    ($(#[$doc:meta] $name:ident -> $ty:ty),* $(,)?) => {
        $(
            #[$doc]
            pub fn $name(&mut self) -> Result<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let b = self.read_bytes(N)?;
                let mut raw = [0u8; N];
                raw.copy_from_slice(b);
                Ok(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

/// A cursor-based reader over a byte slice.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Version header of a streamed object.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    /// Class version.
    pub version: u16,
    /// Absolute position one past the object, when a byte count was written.
    pub end: Option<usize>,
}

impl<'a> RBuffer<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute position.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advance by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    be_reader! {
        /// Read a u8.
        read_u8 -> u8,
        /// Read a big-endian u16.
        read_u16 -> u16,
        /// Read a big-endian i16.
        read_i16 -> i16,
        /// Read a big-endian u32.
        read_u32 -> u32,
        /// Read a big-endian i32.
        read_i32 -> i32,
        /// Read a big-endian u64.
        read_u64 -> u64,
        /// Read a big-endian f32.
        read_f32 -> f32,
        /// Read a big-endian f64.
        read_f64 -> f64,
    }

    /// Read a 32-bit seek pointer, or a 64-bit one for large files.
    pub fn read_seek(&mut self, large: bool) -> Result<u64> {
        if large { self.read_u64() } else { self.read_u32().map(u64::from) }
    }

    /// Read a `TString`: one length byte, or 255 followed by a u32 length.
    pub fn read_string(&mut self) -> Result<String> {
        let len = match self.read_u8()? {
            255 => self.read_u32()? as usize,
            n => n as usize,
        };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a streamer version header.
    ///
    /// When the first u32 carries [`BYTE_COUNT_MASK`], the low bits count the
    /// bytes that follow it (version included). Otherwise only a u16 version
    /// was written and the cursor backs up to just after it.
    pub fn read_version(&mut self) -> Result<Version> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & BYTE_COUNT_MASK != 0 {
            let count = (raw & !BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok(Version { version, end: Some(start + 4 + count) })
        } else {
            self.pos = start + 2;
            Ok(Version { version: (raw >> 16) as u16, end: None })
        }
    }

    /// Jump to the end of an object when its byte count is known.
    pub fn seek_end(&mut self, v: Version) {
        if let Some(end) = v.end
            && end > self.pos
        {
            self.pos = end;
        }
    }

    /// Skip an embedded object that was streamed with a byte count.
    pub fn skip_object(&mut self) -> Result<u16> {
        let v = self.read_version()?;
        if let Some(end) = v.end {
            if end > self.data.len() {
                return Err(RootError::BufferUnderflow {
                    offset: self.pos,
                    need: end - self.pos,
                    have: self.remaining(),
                });
            }
            self.pos = end;
        }
        Ok(v.version)
    }

    /// Read a `TObject` body: version, fUniqueID and fBits.
    pub fn read_tobject(&mut self) -> Result<(u32, u32)> {
        let _version = self.read_u16()?;
        let unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & IS_REFERENCED != 0 {
            // process id of the referenced object
            self.skip(2)?;
        }
        Ok((unique_id, bits))
    }

    /// Read a `TNamed`, returning `(name, title)`.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let v = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.seek_end(v);
        Ok((name, title))
    }

    /// Read `n` f64 values.
    pub fn read_array_f64(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.read_f64()).collect()
    }

    /// Read `n` f32 values widened to f64.
    pub fn read_array_f32(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.read_f32().map(f64::from)).collect()
    }

    /// Read `n` i32 values widened to f64.
    pub fn read_array_i32(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.read_i32().map(f64::from)).collect()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.saturating_add(n) > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}
