//! TH1 and TH2 deserialization.
//!
//! ROOT serialization layout (simplified):
//! ```text
//! TH1x / TH2x
//!   ├─ TH2 (2-D only): TH1 base, then fScalefactor, fTsumwy, fTsumwy2, fTsumwxy
//!   └─ TH1 (base)
//!        ├─ TNamed (name, title)
//!        ├─ TAttLine   (color i16, style i16, width i16)
//!        ├─ TAttFill   (color i16, style i16)
//!        ├─ TAttMarker (color i16, style i16, size f32)
//!        ├─ fNcells (i32)
//!        ├─ fXaxis, fYaxis, fZaxis (TAxis)
//!        ├─ scalar stats (fBarOffset, fBarWidth, fEntries, fTsumw, ...)
//!        ├─ fContour, fSumw2 (TArrayD)
//!        ├─ fOption (TString)
//!        └─ fFunctions (TList), buffer and options, skipped via byte count
//!   └─ TArrayD / TArrayF / TArrayI (cell contents, flows included)
//! ```

use crate::error::{Result, RootError};
use crate::histogram::{Axis, Histogram, Style};
use crate::rbuffer::RBuffer;

/// Element type of the trailing content array.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Storage {
    F64,
    F32,
    I32,
}

struct AxisInfo {
    title: String,
    n_bins: usize,
    min: f64,
    max: f64,
    edges: Vec<f64>,
    first: i32,
    last: i32,
}

impl AxisInfo {
    fn into_axis(self) -> Result<Axis> {
        let mut axis = if self.edges.len() == self.n_bins + 1 && self.n_bins > 0 {
            Axis::variable(self.edges)?
        } else {
            Axis::uniform(self.n_bins, self.min, self.max)
        };
        axis.title = self.title;
        let n = axis.n_bins() as i32;
        if self.first > 0 && self.last >= self.first && (self.first, self.last) != (1, n) {
            let lo = axis.low_edge(self.first as usize);
            let hi = axis.up_edge(self.last as usize);
            axis.set_range_user(lo, hi);
        }
        Ok(axis)
    }
}

struct Th1Base {
    name: String,
    title: String,
    style: Style,
    n_cells: usize,
    x: AxisInfo,
    y: AxisInfo,
    entries: f64,
    sumw2: Vec<f64>,
}

/// Read a 1-D histogram from decompressed object bytes.
pub(crate) fn read_th1(data: &[u8], storage: Storage) -> Result<Histogram> {
    let mut r = RBuffer::new(data);
    let v = r.read_version()?;
    if v.version < 1 {
        return Err(RootError::Deserialization(format!(
            "unsupported TH1 subclass version: {}",
            v.version
        )));
    }
    let base = read_th1_base(&mut r)?;
    let contents = read_contents(&mut r, storage, base.n_cells)?;

    let y_title = base.y.title.clone();
    let mut h = Histogram::from_cells(
        base.name,
        base.x.into_axis()?,
        None,
        contents,
        Some(base.sumw2),
    )?;
    h.title = base.title;
    h.y_title = y_title;
    h.style = base.style;
    h.entries = base.entries;
    Ok(h)
}

/// Read a 2-D histogram from decompressed object bytes.
pub(crate) fn read_th2(data: &[u8], storage: Storage) -> Result<Histogram> {
    let mut r = RBuffer::new(data);
    let v = r.read_version()?;
    if v.version < 1 {
        return Err(RootError::Deserialization(format!(
            "unsupported TH2 subclass version: {}",
            v.version
        )));
    }

    let th2 = r.read_version()?;
    let base = read_th1_base(&mut r)?;
    // fScalefactor, fTsumwy, fTsumwy2, fTsumwxy
    r.skip(4 * 8)?;
    r.seek_end(th2);

    let contents = read_contents(&mut r, storage, base.n_cells)?;
    let mut h = Histogram::from_cells(
        base.name,
        base.x.into_axis()?,
        Some(base.y.into_axis()?),
        contents,
        Some(base.sumw2),
    )?;
    h.title = base.title;
    h.style = base.style;
    h.entries = base.entries;
    Ok(h)
}

fn read_contents(r: &mut RBuffer, storage: Storage, n_cells: usize) -> Result<Vec<f64>> {
    let n = r.read_u32()? as usize;
    if n != n_cells {
        return Err(RootError::Deserialization(format!(
            "content array size {n} != fNcells {n_cells}"
        )));
    }
    match storage {
        Storage::F64 => r.read_array_f64(n),
        Storage::F32 => r.read_array_f32(n),
        Storage::I32 => r.read_array_i32(n),
    }
}

fn read_th1_base(r: &mut RBuffer) -> Result<Th1Base> {
    let th1 = r.read_version()?;
    let (name, title) = r.read_tnamed()?;

    let mut style = Style::default();
    read_att_line(r, &mut style)?;
    read_att_fill(r, &mut style)?;
    read_att_marker(r, &mut style)?;

    let n_cells = r.read_i32()?;
    if n_cells < 0 {
        return Err(RootError::Deserialization(format!("negative fNcells: {n_cells}")));
    }

    let x = read_taxis(r)?;
    let y = read_taxis(r)?;
    let _z = read_taxis(r)?;

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    r.skip(4 * 8)?;
    if th1.version >= 2 {
        // fMaximum, fMinimum
        r.skip(2 * 8)?;
    }
    if th1.version >= 3 {
        let _norm_factor = r.read_f64()?;
    }

    let contour_n = r.read_u32()? as usize;
    r.skip(contour_n * 8)?;

    let sumw2_n = r.read_u32()? as usize;
    let sumw2 = r.read_array_f64(sumw2_n)?;

    let _option = r.read_string()?;

    // fFunctions, fBuffer and error options are not needed
    r.seek_end(th1);

    Ok(Th1Base { name, title, style, n_cells: n_cells as usize, x, y, entries, sumw2 })
}

fn read_att_line(r: &mut RBuffer, style: &mut Style) -> Result<()> {
    let v = r.read_version()?;
    style.line_color = i32::from(r.read_i16()?);
    style.line_style = i32::from(r.read_i16()?);
    style.line_width = i32::from(r.read_i16()?);
    r.seek_end(v);
    Ok(())
}

fn read_att_fill(r: &mut RBuffer, style: &mut Style) -> Result<()> {
    let v = r.read_version()?;
    style.fill_color = i32::from(r.read_i16()?);
    style.fill_style = i32::from(r.read_i16()?);
    r.seek_end(v);
    Ok(())
}

fn read_att_marker(r: &mut RBuffer, style: &mut Style) -> Result<()> {
    let v = r.read_version()?;
    style.marker_color = i32::from(r.read_i16()?);
    style.marker_style = i32::from(r.read_i16()?);
    style.marker_size = f64::from(r.read_f32()?);
    r.seek_end(v);
    Ok(())
}

fn read_taxis(r: &mut RBuffer) -> Result<AxisInfo> {
    let v = r.read_version()?;
    let (_name, title) = r.read_tnamed()?;
    r.skip_object()?; // TAttAxis

    let n_bins = r.read_i32()?;
    if n_bins < 0 {
        return Err(RootError::Deserialization(format!("negative axis bin count: {n_bins}")));
    }
    let min = r.read_f64()?;
    let max = r.read_f64()?;
    let edges_n = r.read_u32()? as usize;
    let edges = r.read_array_f64(edges_n)?;

    let (mut first, mut last) = (0, 0);
    let room = v.end.map_or(r.remaining(), |end| end.saturating_sub(r.pos()));
    if room >= 8 {
        first = r.read_i32()?;
        last = r.read_i32()?;
    }
    r.seek_end(v);

    Ok(AxisInfo { title, n_bins: n_bins as usize, min, max, edges, first, last })
}
