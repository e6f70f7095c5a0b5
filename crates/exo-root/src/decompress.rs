//! ROOT compressed-record decoding.
//!
//! A compressed object is a sequence of blocks, each preceded by a 9-byte
//! header: a two-letter algorithm tag, one method byte, then the compressed
//! and uncompressed sizes as 3-byte little-endian integers.

use std::io::Read;

use crate::error::{Result, RootError};

const HEADER_LEN: usize = 9;

/// Compression algorithm named by a block tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// `ZL`: zlib (deflate).
    Zlib,
    /// `L4`: LZ4 with an 8-byte checksum prefix.
    Lz4,
    /// `ZS`: Zstandard.
    Zstd,
    /// `XZ`: LZMA/xz.
    Xz,
}

impl Algorithm {
    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"ZL" => Ok(Self::Zlib),
            b"L4" => Ok(Self::Lz4),
            b"ZS" => Ok(Self::Zstd),
            b"XZ" => Ok(Self::Xz),
            other => Err(RootError::Decompression(format!(
                "unsupported compression tag {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockHeader {
    algorithm: Algorithm,
    compressed: usize,
    uncompressed: usize,
}

impl BlockHeader {
    fn parse(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            algorithm: Algorithm::from_tag(&raw[0..2])?,
            compressed: le24(&raw[3..6]),
            uncompressed: le24(&raw[6..9]),
        })
    }
}

/// Decode a compressed record into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut rest = src;

    while out.len() < expected_len && rest.len() >= HEADER_LEN {
        let header = BlockHeader::parse(&rest[..HEADER_LEN])?;
        rest = &rest[HEADER_LEN..];
        if header.compressed > rest.len() {
            return Err(RootError::Decompression(format!(
                "block claims {} compressed bytes, {} available",
                header.compressed,
                rest.len()
            )));
        }
        let (payload, tail) = rest.split_at(header.compressed);
        let block = decode_block(header, payload)?;
        if block.len() != header.uncompressed {
            return Err(RootError::Decompression(format!(
                "{:?} block produced {} bytes, header says {}",
                header.algorithm,
                block.len(),
                header.uncompressed
            )));
        }
        out.extend_from_slice(&block);
        rest = tail;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "decoded {} bytes, key expects {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

fn decode_block(header: BlockHeader, payload: &[u8]) -> Result<Vec<u8>> {
    let expected = header.uncompressed;
    match header.algorithm {
        Algorithm::Zlib => {
            let mut out = Vec::with_capacity(expected);
            flate2::read::ZlibDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
            Ok(out)
        }
        Algorithm::Lz4 => {
            // xxhash64 of the payload precedes the LZ4 stream; not verified.
            let body = payload.get(8..).ok_or_else(|| {
                RootError::Decompression("lz4 block shorter than its checksum".into())
            })?;
            lz4_flex::decompress(body, expected)
                .map_err(|e| RootError::Decompression(format!("lz4: {e}")))
        }
        Algorithm::Zstd => {
            let mut out = vec![0u8; expected];
            let mut decoder = ruzstd::decoding::FrameDecoder::new();
            let n = decoder
                .decode_all(payload, &mut out)
                .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
            out.truncate(n);
            Ok(out)
        }
        Algorithm::Xz => {
            let mut out = Vec::with_capacity(expected);
            lzma_rs::xz_decompress(&mut std::io::BufReader::new(payload), &mut out)
                .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
            Ok(out)
        }
    }
}

fn le24(b: &[u8]) -> usize {
    usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16
}

/// Wrap `compressed` in a ROOT block header (test helper).
#[cfg(test)]
pub(crate) fn block(tag: &[u8; 2], compressed: &[u8], uncompressed_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(tag);
    out.push(0);
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes()[..3]);
    out.extend_from_slice(&(uncompressed_len as u32).to_le_bytes()[..3]);
    out.extend_from_slice(compressed);
    out
}
