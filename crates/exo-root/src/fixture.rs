//! Minimal ROOT file writer for tests.
//!
//! Produces small-format (32-bit seek) files holding TH1D/TH2D objects in
//! nested directories, optionally zlib-compressed. Only the fields the reader
//! needs are meaningful; everything else is written with ROOT's defaults.

use std::io::Write;
use std::path::Path;

use crate::histogram::{Histogram, Style};
use crate::rbuffer::BYTE_COUNT_MASK;

const FILE_VERSION: i32 = 62206;
const BEGIN: usize = 100;
const KEY_VERSION: u16 = 4;
const DIRECTORY_VERSION: u16 = 5;
/// Bytes reserved for a TDirectory streamer.
const DIRECTORY_STREAMER_LEN: usize = 2 + 4 * 8 + 18;

#[derive(Default)]
struct WBuffer {
    buf: Vec<u8>,
}

impl WBuffer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }
    fn string(&mut self, s: &str) {
        if s.len() < 255 {
            self.u8(s.len() as u8);
        } else {
            self.u8(255);
            self.u32(s.len() as u32);
        }
        self.buf.extend_from_slice(s.as_bytes());
    }
    fn array_f64(&mut self, values: &[f64]) {
        self.u32(values.len() as u32);
        values.iter().for_each(|&v| self.f64(v));
    }

    /// Start an object with a byte count; returns the patch position.
    fn begin(&mut self, version: u16) -> usize {
        let at = self.buf.len();
        self.u32(0);
        self.u16(version);
        at
    }
    fn end(&mut self, at: usize) {
        let count = (self.buf.len() - at - 4) as u32 | BYTE_COUNT_MASK;
        self.buf[at..at + 4].copy_from_slice(&count.to_be_bytes());
    }

    fn tobject(&mut self) {
        self.u16(1);
        self.u32(0);
        self.u32(0x0300_0000);
    }
    fn tnamed(&mut self, name: &str, title: &str) {
        let at = self.begin(1);
        self.tobject();
        self.string(name);
        self.string(title);
        self.end(at);
    }
}

/// Contents of one histogram to encode.
#[derive(Debug, Clone)]
pub struct HistogramSpec {
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
    /// X binning: bins, low, high.
    pub x: (usize, f64, f64),
    /// Variable x edges; empty for uniform binning.
    pub x_edges: Vec<f64>,
    /// Y binning for 2-D histograms.
    pub y: Option<(usize, f64, f64)>,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// All cells, flows included.
    pub contents: Vec<f64>,
    /// Per-cell sum of squared weights; `None` writes an empty fSumw2.
    pub sumw2: Option<Vec<f64>>,
    /// fEntries.
    pub entries: f64,
    /// Drawing attributes.
    pub style: Style,
}

impl HistogramSpec {
    /// Empty uniform 1-D histogram.
    pub fn uniform_1d(name: &str, bins: usize, lo: f64, hi: f64) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            x: (bins, lo, hi),
            x_edges: Vec::new(),
            y: None,
            x_title: String::new(),
            y_title: String::new(),
            contents: vec![0.0; bins + 2],
            sumw2: None,
            entries: 0.0,
            style: Style::default(),
        }
    }

    /// Empty uniform 2-D histogram.
    pub fn uniform_2d(name: &str, x: (usize, f64, f64), y: (usize, f64, f64)) -> Self {
        let mut spec = Self::uniform_1d(name, x.0, x.1, x.2);
        spec.y = Some(y);
        spec.contents = vec![0.0; (x.0 + 2) * (y.0 + 2)];
        spec
    }

    /// Spec reproducing an in-memory histogram.
    pub fn from_histogram(h: &Histogram) -> Self {
        let edges = h.x.edges();
        let n = h.x.n_bins();
        Self {
            name: h.name.clone(),
            title: h.title.clone(),
            x: (n, edges[0], edges[n]),
            x_edges: edges.to_vec(),
            y: h.y.as_ref().map(|y| {
                let e = y.edges();
                (y.n_bins(), e[0], e[y.n_bins()])
            }),
            x_title: h.x.title.clone(),
            y_title: h.y.as_ref().map_or_else(|| h.y_title.clone(), |y| y.title.clone()),
            contents: h.contents().to_vec(),
            sumw2: Some(h.sumw2().to_vec()),
            entries: h.entries,
            style: h.style,
        }
    }

    fn class_name(&self) -> &'static str {
        if self.y.is_some() { "TH2D" } else { "TH1D" }
    }

    fn n_cells(&self) -> usize {
        (self.x.0 + 2) * self.y.map_or(1, |y| y.0 + 2)
    }
}

fn write_taxis(
    w: &mut WBuffer,
    name: &str,
    title: &str,
    binning: (usize, f64, f64),
    edges: &[f64],
) {
    let at = w.begin(10);
    w.tnamed(name, title);

    let att = w.begin(4);
    w.i32(510);
    for v in [1i16, 1, 42] {
        w.i16(v);
    }
    for v in [0.005f32, 0.035, 0.03, 1.0, 0.035] {
        w.f32(v);
    }
    w.i16(1);
    w.i16(42);
    w.end(att);

    w.i32(binning.0 as i32);
    w.f64(binning.1);
    w.f64(binning.2);
    w.array_f64(edges);
    w.i32(0); // fFirst
    w.i32(0); // fLast
    w.u16(0); // fBits2
    w.u8(0); // fTimeDisplay
    w.string("");
    w.end(at);
}

/// Encode a histogram object payload (uncompressed).
pub fn encode_histogram(spec: &HistogramSpec) -> Vec<u8> {
    let mut w = WBuffer::default();
    let outer = w.begin(3);
    let th2 = spec.y.map(|_| w.begin(5));

    let th1 = w.begin(8);
    w.tnamed(&spec.name, &spec.title);

    let s = spec.style;
    let line = w.begin(2);
    w.i16(s.line_color as i16);
    w.i16(s.line_style as i16);
    w.i16(s.line_width as i16);
    w.end(line);
    let fill = w.begin(2);
    w.i16(s.fill_color as i16);
    w.i16(s.fill_style as i16);
    w.end(fill);
    let marker = w.begin(2);
    w.i16(s.marker_color as i16);
    w.i16(s.marker_style as i16);
    w.f32(s.marker_size as f32);
    w.end(marker);

    w.i32(spec.n_cells() as i32);
    write_taxis(&mut w, "xaxis", &spec.x_title, spec.x, &spec.x_edges);
    write_taxis(&mut w, "yaxis", &spec.y_title, spec.y.unwrap_or((1, 0.0, 1.0)), &[]);
    write_taxis(&mut w, "zaxis", "", (1, 0.0, 1.0), &[]);

    w.i16(0); // fBarOffset
    w.i16(1000); // fBarWidth
    w.f64(spec.entries);
    for _ in 0..4 {
        w.f64(0.0);
    }
    w.f64(-1111.0); // fMaximum
    w.f64(-1111.0); // fMinimum
    w.f64(0.0); // fNormFactor
    w.array_f64(&[]); // fContour
    w.array_f64(spec.sumw2.as_deref().unwrap_or(&[]));
    w.string(""); // fOption

    let functions = w.begin(5);
    w.tobject();
    w.string("");
    w.i32(0);
    w.end(functions);
    w.i32(0); // fBufferSize
    w.u8(0); // fBuffer
    w.i32(0); // fBinStatErrOpt
    w.i32(2); // fStatOverflows
    w.end(th1);

    if let Some(th2) = th2 {
        w.f64(1.0);
        for _ in 0..3 {
            w.f64(0.0);
        }
        w.end(th2);
    }

    w.array_f64(&spec.contents);
    w.end(outer);
    w.buf
}

enum Node {
    Directory { name: String, children: Vec<Node> },
    Histogram(HistogramSpec),
}

/// Builds an in-memory ROOT file.
///
/// ```ignore
/// let bytes = FileBuilder::new()
///     .histogram("jet1", HistogramSpec::uniform_1d("pt", 10, 0.0, 500.0))
///     .build();
/// ```
#[derive(Default)]
pub struct FileBuilder {
    children: Vec<Node>,
    compress: bool,
}

struct WrittenKey {
    seek: usize,
    header: Vec<u8>,
}

impl FileBuilder {
    /// Empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zlib-compress object payloads.
    pub fn compressed(mut self, on: bool) -> Self {
        self.compress = on;
        self
    }

    /// Add a histogram under `dir` (`""` for the top directory, `"a/b"` nested).
    pub fn histogram(mut self, dir: &str, spec: HistogramSpec) -> Self {
        let mut level = &mut self.children;
        for part in dir.split('/').filter(|s| !s.is_empty()) {
            let idx = match level
                .iter()
                .position(|n| matches!(n, Node::Directory { name, .. } if name == part))
            {
                Some(i) => i,
                None => {
                    level.push(Node::Directory { name: part.to_string(), children: Vec::new() });
                    level.len() - 1
                }
            };
            level = match &mut level[idx] {
                Node::Directory { children, .. } => children,
                Node::Histogram(_) => unreachable!("position matched a directory"),
            };
        }
        level.push(Node::Histogram(spec));
        self
    }

    /// Add an in-memory histogram under `dir`.
    pub fn with(self, dir: &str, h: &Histogram) -> Self {
        self.histogram(dir, HistogramSpec::from_histogram(h))
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; BEGIN];

        // TFile key: name and title strings, then the top TDirectory streamer.
        let mut names = WBuffer::default();
        names.string("fixture.root");
        names.string("");
        let mut body = names.buf.clone();
        body.resize(names.buf.len() + DIRECTORY_STREAMER_LEN, 0);
        let top = write_record(&mut out, "TFile", "fixture.root", "", &body, 0, false);
        let nbytes_name = top.header.len() + names.buf.len();

        let (seek_keys, nbytes_keys) =
            self.write_directory(&mut out, &self.children, top.seek, "fixture.root");
        let streamer = directory_streamer(top.seek, 0, seek_keys, nbytes_keys, nbytes_name);
        patch(&mut out, top.seek + nbytes_name, &streamer);

        let mut h = WBuffer::default();
        h.buf.extend_from_slice(b"root");
        h.i32(FILE_VERSION);
        h.i32(BEGIN as i32);
        h.u32(out.len() as u32); // fEND
        h.u32(0); // fSeekFree
        h.u32(0); // fNbytesFree
        h.i32(0); // nfree
        h.u32(nbytes_name as u32);
        h.u8(4); // fUnits
        h.i32(if self.compress { 101 } else { 0 });
        h.u32(0); // fSeekInfo
        h.u32(0); // fNbytesInfo
        patch(&mut out, 0, &h.buf);
        out
    }

    /// Serialize the file to disk.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }

    fn write_directory(
        &self,
        out: &mut Vec<u8>,
        children: &[Node],
        dir_seek: usize,
        dir_name: &str,
    ) -> (usize, usize) {
        let mut keys = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::Histogram(spec) => {
                    let payload = encode_histogram(spec);
                    keys.push(write_record(
                        out,
                        spec.class_name(),
                        &spec.name,
                        &spec.title,
                        &payload,
                        dir_seek,
                        self.compress,
                    ));
                }
                Node::Directory { name, children } => {
                    let placeholder = vec![0u8; DIRECTORY_STREAMER_LEN];
                    let class = "TDirectoryFile";
                    let key = write_record(out, class, name, name, &placeholder, dir_seek, false);
                    let (seek_keys, nbytes_keys) =
                        self.write_directory(out, children, key.seek, name);
                    let streamer =
                        directory_streamer(key.seek, dir_seek, seek_keys, nbytes_keys, 0);
                    patch(out, key.seek + key.header.len(), &streamer);
                    keys.push(key);
                }
            }
        }

        let mut list = WBuffer::default();
        list.u32(keys.len() as u32);
        for key in &keys {
            list.buf.extend_from_slice(&key.header);
        }
        let seek = out.len();
        write_record(out, "TDirectory", dir_name, "", &list.buf, dir_seek, false);
        (seek, out.len() - seek)
    }
}

fn directory_streamer(
    seek_dir: usize,
    seek_parent: usize,
    seek_keys: usize,
    nbytes_keys: usize,
    nbytes_name: usize,
) -> Vec<u8> {
    let mut w = WBuffer::default();
    w.u16(DIRECTORY_VERSION);
    w.u32(0); // fDatimeC
    w.u32(0); // fDatimeM
    w.u32(nbytes_keys as u32);
    w.u32(nbytes_name as u32);
    w.u32(seek_dir as u32);
    w.u32(seek_parent as u32);
    w.u32(seek_keys as u32);
    w.buf.resize(DIRECTORY_STREAMER_LEN, 0);
    w.buf
}

fn write_record(
    out: &mut Vec<u8>,
    class_name: &str,
    name: &str,
    title: &str,
    payload: &[u8],
    dir_seek: usize,
    compress: bool,
) -> WrittenKey {
    let stored = if compress { zlib_block(payload) } else { None };
    let stored = stored.as_deref().unwrap_or(payload);

    let mut strings = WBuffer::default();
    strings.string(class_name);
    strings.string(name);
    strings.string(title);
    let key_len = 26 + strings.buf.len();

    let seek = out.len();
    let mut h = WBuffer::default();
    h.u32((key_len + stored.len()) as u32);
    h.u16(KEY_VERSION);
    h.u32(payload.len() as u32);
    h.u32(0); // fDatime
    h.u16(key_len as u16);
    h.u16(1); // fCycle
    h.u32(seek as u32);
    h.u32(dir_seek as u32);
    h.buf.extend_from_slice(&strings.buf);

    out.extend_from_slice(&h.buf);
    out.extend_from_slice(stored);
    WrittenKey { seek, header: h.buf }
}

/// One `ZL` block, or `None` when compression does not shrink the payload.
fn zlib_block(payload: &[u8]) -> Option<Vec<u8>> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(payload).ok()?;
    let compressed = enc.finish().ok()?;
    if compressed.len() + 9 >= payload.len() || payload.len() > 0xff_ffff {
        return None;
    }
    let mut out = Vec::with_capacity(9 + compressed.len());
    out.extend_from_slice(b"ZL");
    out.push(8);
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes()[..3]);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
    out.extend_from_slice(&compressed);
    Some(out)
}

fn patch(out: &mut [u8], at: usize, bytes: &[u8]) {
    out[at..at + bytes.len()].copy_from_slice(bytes);
}
