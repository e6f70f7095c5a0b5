//! TDirectory streamers and key lists.

use crate::error::Result;
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Directory versions above this use 64-bit seek pointers.
const LARGE_DIRECTORY_VERSION: u16 = 1000;

/// Location of a directory's key list, as recorded in its streamer.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryHeader {
    /// Offset of the key list record.
    pub seek_keys: u64,
    /// Size of the key list record.
    pub nbytes_keys: u32,
}

impl DirectoryHeader {
    /// Parse a TDirectory streamer at the cursor.
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let _ctime = r.read_u32()?;
        let _mtime = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;
        let large = version > LARGE_DIRECTORY_VERSION;
        let _seek_dir = r.read_seek(large)?;
        let _seek_parent = r.read_seek(large)?;
        let seek_keys = r.read_seek(large)?;
        Ok(Self { seek_keys, nbytes_keys })
    }
}

/// The ordered keys of one directory.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list a header points at.
    ///
    /// The list is itself stored behind a TKey header, followed by a u32 key
    /// count and that many key headers.
    pub fn read(file: &[u8], header: DirectoryHeader, file_is_large: bool) -> Result<Self> {
        if header.seek_keys == 0 {
            return Ok(Self::default());
        }
        let mut r = RBuffer::new(file);
        r.set_pos(header.seek_keys as usize);
        let _list_key = Key::read(&mut r, file_is_large)?;
        let n = r.read_u32()? as usize;
        let keys = (0..n).map(|_| Key::read(&mut r, file_is_large)).collect::<Result<_>>()?;
        Ok(Self { keys })
    }

    /// Read a subdirectory from the payload of its TDirectoryFile key.
    pub fn from_payload(file: &[u8], payload: &[u8], file_is_large: bool) -> Result<Self> {
        let header = DirectoryHeader::read(&mut RBuffer::new(payload))?;
        Self::read(file, header, file_is_large)
    }

    /// All keys in storage order, every cycle included.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Highest-cycle key of every distinct name, in first-seen order.
    pub fn latest_keys(&self) -> Vec<&Key> {
        let mut out: Vec<&Key> = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            match out.iter_mut().find(|k| k.name == key.name) {
                Some(slot) if slot.cycle < key.cycle => *slot = key,
                Some(_) => {}
                None => out.push(key),
            }
        }
        out
    }

    /// Find the highest cycle of a key by name.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
