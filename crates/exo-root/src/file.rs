//! TFile header parsing and the read-only file interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::directory::{Directory, DirectoryHeader};
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;

const ROOT_MAGIC: &[u8; 4] = b"root";

/// Smallest byte count that can hold a file header.
const MIN_FILE_LEN: usize = 64;

/// Parsed file header.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    /// Whether the file uses 64-bit seek pointers (version >= 1000000).
    is_large: bool,
    /// Key list of the top directory.
    top: DirectoryHeader,
}

/// File bytes: mapped for `open`, owned for `from_bytes`.
enum Bytes {
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Mapped(m) => m,
            Bytes::Owned(v) => v,
        }
    }
}

/// A ROOT file opened for reading histograms.
pub struct RootFile {
    data: Bytes,
    header: FileHeader,
    path: PathBuf,
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .field("is_large", &self.header.is_large)
            .finish()
    }
}

impl RootFile {
    /// Open and parse a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the mapping is read-only; template files are not rewritten
        // while a run reads them.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        tracing::debug!(path = %path.display(), bytes = mmap.len(), "opened ROOT file");
        Self::from_data(Bytes::Mapped(mmap), path)
    }

    /// Parse a ROOT file held in memory.
    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_data(Bytes::Owned(data), path.into())
    }

    fn from_data(data: Bytes, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = Self::parse_header(&data)?;
        Ok(Self { data, header, path })
    }

    /// Parse the file header and the top directory streamer.
    ///
    /// ```text
    /// offset  size  field
    ///    0      4   magic "root"
    ///    4      4   fVersion
    ///    8      4   fBEGIN
    ///   12    4/8   fEND
    ///         4/8   fSeekFree
    ///           4   fNbytesFree
    ///           4   nfree
    ///           4   fNbytesName
    /// ```
    ///
    /// The TDirectory streamer sits at `fBEGIN + fNbytesName`.
    fn parse_header(data: &[u8]) -> Result<FileHeader> {
        let mut r = RBuffer::new(data);
        r.skip(4)?;
        let version = r.read_u32()?;
        let is_large = version >= 1_000_000;
        let begin = r.read_u32()? as usize;
        let _end = r.read_seek(is_large)?;
        let _seek_free = r.read_seek(is_large)?;
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;

        let dir_offset = begin.saturating_add(nbytes_name);
        if dir_offset >= data.len() {
            return Err(RootError::Deserialization("TDirectory offset past end of file".into()));
        }
        r.set_pos(dir_offset);
        let top = DirectoryHeader::read(&mut r)?;
        Ok(FileHeader { is_large, top })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.header.is_large
    }

    /// Keys of the top directory, latest cycle of each name.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.top_directory()?;
        Ok(dir.latest_keys().into_iter().map(KeyInfo::from).collect())
    }

    /// Get a histogram by path, e.g. `"jet1/pt"` or `"/mttbar"`.
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let mut dir = self.top_directory()?;
        for part in dirs {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{part} (in path {path})")))?;
            if !key.is_directory() {
                return Err(RootError::Deserialization(format!(
                    "'{part}' is not a directory (class: {})",
                    key.class_name
                )));
            }
            dir = self.subdirectory(key)?;
        }

        let key = dir.find_key(last).ok_or_else(|| RootError::KeyNotFound(path.to_string()))?;
        self.read_histogram(key, &format!("/{}", parts.join("/")))
    }

    /// Every supported histogram in the file, depth first, in key order.
    ///
    /// Paths are absolute (`/dir/name`). Objects of other classes are skipped.
    pub fn histograms(&self) -> Result<Vec<Histogram>> {
        let mut out = Vec::new();
        self.visit_histograms(|h| {
            out.push(h);
            Ok(())
        })?;
        Ok(out)
    }

    /// Call `f` on every supported histogram, depth first.
    pub fn visit_histograms<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(Histogram) -> Result<()>,
    {
        let top = self.top_directory()?;
        self.walk(&top, "", &mut f)
    }

    fn walk<F>(&self, dir: &Directory, prefix: &str, f: &mut F) -> Result<()>
    where
        F: FnMut(Histogram) -> Result<()>,
    {
        for key in dir.latest_keys() {
            let path = format!("{prefix}/{}", key.name);
            if key.is_directory() {
                let sub = self.subdirectory(key)?;
                self.walk(&sub, &path, f)?;
            } else if key.is_histogram() {
                f(self.read_histogram(key, &path)?)?;
            } else {
                tracing::trace!(path, class = %key.class_name, "skipping object");
            }
        }
        Ok(())
    }

    fn top_directory(&self) -> Result<Directory> {
        Directory::read(&self.data, self.header.top, self.header.is_large)
    }

    fn subdirectory(&self, key: &Key) -> Result<Directory> {
        let payload = key.payload(&self.data)?;
        Directory::from_payload(&self.data, &payload, self.header.is_large)
    }

    fn read_histogram(&self, key: &Key, path: &str) -> Result<Histogram> {
        let payload = key.payload(&self.data)?;
        let mut h = objects::read_histogram(&payload, &key.class_name)?;
        h.name = key.name.clone();
        h.path = path.to_string();
        Ok(h)
    }
}
