//! TKey records: the header ROOT writes in front of every stored object.

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;

/// Key versions above this use 64-bit seek pointers.
const LARGE_KEY_VERSION: u16 = 1000;

/// A parsed TKey header.
#[derive(Debug, Clone)]
pub struct Key {
    /// Bytes on disk: key header plus (possibly compressed) object.
    pub n_bytes: u32,
    /// Key class version.
    pub version: u16,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Length of the key header.
    pub key_len: u16,
    /// Cycle number within the directory.
    pub cycle: u16,
    /// Absolute file offset of this key.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

/// Public summary of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Class name, e.g. `TH1D` or `TDirectoryFile`.
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
}

impl KeyInfo {
    /// Whether the object is a histogram class this crate can stream.
    pub fn is_histogram(&self) -> bool {
        crate::objects::is_supported(&self.class_name)
    }
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

impl Key {
    /// Read a key header at the cursor.
    pub fn read(r: &mut RBuffer, file_is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;
        let large = file_is_large || version > LARGE_KEY_VERSION;
        let seek_key = r.read_seek(large)?;
        let _seek_pdir = r.read_seek(large)?;
        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;
        Ok(Self { n_bytes, version, obj_len, key_len, cycle, seek_key, class_name, name, title })
    }

    /// Whether the key points at a (sub)directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectory" | "TDirectoryFile")
    }

    /// Whether the key points at a histogram class this crate can stream.
    pub fn is_histogram(&self) -> bool {
        crate::objects::is_supported(&self.class_name)
    }

    /// Slice the object bytes out of `file` and decompress them if needed.
    pub fn payload(&self, file: &[u8]) -> Result<Vec<u8>> {
        let start = self.seek_key as usize;
        let end = start.saturating_add(self.n_bytes as usize);
        if end > file.len() {
            return Err(RootError::BufferUnderflow {
                offset: start,
                need: self.n_bytes as usize,
                have: file.len().saturating_sub(start),
            });
        }
        let key_len = usize::from(self.key_len);
        if key_len > self.n_bytes as usize {
            return Err(RootError::Deserialization(format!(
                "key '{}' header ({key_len} bytes) longer than record ({} bytes)",
                self.name, self.n_bytes
            )));
        }
        let stored = &file[start + key_len..end];
        if stored.len() == self.obj_len as usize {
            Ok(stored.to_vec())
        } else {
            decompress(stored, self.obj_len as usize)
        }
    }
}
