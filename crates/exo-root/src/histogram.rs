//! Owned 1-D and 2-D histograms.
//!
//! Cells follow ROOT's layout: index 0 is the underflow, `1..=n` are the
//! visible bins and `n + 1` is the overflow. A 2-D histogram stores
//! `(nx + 2) * (ny + 2)` cells with x varying fastest.
//!
//! Every operation either mutates `self` through `&mut` or returns a new
//! value; there is no sharing between histograms.

use serde::Serialize;

use crate::error::{Result, RootError};

/// Binning and presentation of one axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    /// Axis title shown on plots.
    pub title: String,
    edges: Vec<f64>,
    /// User-visible range, if narrowed.
    pub range: Option<(f64, f64)>,
}

impl Axis {
    /// `n_bins` equal-width bins over `[lo, hi)`.
    pub fn uniform(n_bins: usize, lo: f64, hi: f64) -> Self {
        let n = n_bins.max(1);
        let width = (hi - lo) / n as f64;
        let edges = (0..=n).map(|i| lo + width * i as f64).collect();
        Self { title: String::new(), edges, range: None }
    }

    /// Variable-width bins; `edges` must be strictly increasing.
    pub fn variable(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(RootError::InvalidOperation(format!(
                "axis needs at least two edges, got {}",
                edges.len()
            )));
        }
        if edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(RootError::InvalidOperation(format!(
                "axis edges are not increasing: {edges:?}"
            )));
        }
        Ok(Self { title: String::new(), edges, range: None })
    }

    /// Number of visible bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// All bin edges (`n_bins + 1` values).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of bin `bin` (1-based). The overflow bin starts at the
    /// last edge.
    pub fn low_edge(&self, bin: usize) -> f64 {
        let i = bin.clamp(1, self.n_bins() + 1) - 1;
        self.edges[i]
    }

    /// Upper edge of bin `bin` (1-based).
    pub fn up_edge(&self, bin: usize) -> f64 {
        self.edges[bin.clamp(1, self.n_bins())]
    }

    /// Center of bin `bin` (1-based).
    pub fn center(&self, bin: usize) -> f64 {
        0.5 * (self.low_edge(bin) + self.up_edge(bin))
    }

    /// Bin containing `x`: 0 below the axis, `n_bins + 1` at or above its end.
    pub fn find_bin(&self, x: f64) -> usize {
        let n = self.n_bins();
        if x < self.edges[0] {
            0
        } else if x >= self.edges[n] {
            n + 1
        } else {
            self.edges.partition_point(|&e| e <= x)
        }
    }

    /// Narrow the visible range (ROOT `SetRangeUser`).
    pub fn set_range_user(&mut self, lo: f64, hi: f64) {
        self.range = Some((lo.min(hi), lo.max(hi)));
    }

    /// First and last visible bins, honoring the user range.
    pub fn visible_bins(&self) -> (usize, usize) {
        let n = self.n_bins();
        match self.range {
            None => (1, n),
            Some((lo, hi)) => {
                let first = self.find_bin(lo).clamp(1, n);
                let last = self.find_bin(hi).clamp(1, n);
                (first, last.max(first))
            }
        }
    }

    /// Whether both axes have the same edges.
    pub fn same_binning(&self, other: &Axis) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }

    /// Axis with every `group` consecutive bins merged; leftover bins fall
    /// outside the new axis.
    fn grouped(&self, group: usize) -> Axis {
        let n = self.n_bins() / group;
        let edges = (0..=n).map(|i| self.edges[i * group]).collect();
        Axis { title: self.title.clone(), edges, range: self.range }
    }

    /// Cell of the regrouped axis that old cell `cell` falls into.
    fn grouped_cell(&self, cell: usize, group: usize) -> usize {
        let n_new = self.n_bins() / group;
        match cell {
            0 => 0,
            c if c > self.n_bins() => n_new + 1,
            c => ((c - 1) / group + 1).min(n_new + 1),
        }
    }
}

/// Line, fill and marker attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    /// Line color index.
    pub line_color: i32,
    /// Line style (1 = solid).
    pub line_style: i32,
    /// Line width in pixels.
    pub line_width: i32,
    /// Fill color index.
    pub fill_color: i32,
    /// Fill style (0 = hollow, 1001 = solid, 3xxx = hatched).
    pub fill_style: i32,
    /// Marker color index.
    pub marker_color: i32,
    /// Marker style.
    pub marker_style: i32,
    /// Marker size.
    pub marker_size: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            line_color: 602,
            line_style: 1,
            line_width: 1,
            fill_color: 0,
            fill_style: 1001,
            marker_color: 1,
            marker_style: 1,
            marker_size: 1.0,
        }
    }
}

/// Which axis an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisId {
    /// The x axis.
    X,
    /// The y axis (2-D only).
    Y,
}

/// A binned histogram with per-cell sum of weights and sum of squared weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Object name.
    pub name: String,
    /// Full path inside the source file, e.g. `/jet1/pt`.
    pub path: String,
    /// Object title.
    pub title: String,
    /// X axis.
    pub x: Axis,
    /// Y axis for 2-D histograms.
    pub y: Option<Axis>,
    /// Y-axis title of 1-D histograms.
    pub y_title: String,
    contents: Vec<f64>,
    sumw2: Vec<f64>,
    /// Number of entries.
    pub entries: f64,
    /// Drawing attributes.
    pub style: Style,
}

impl Histogram {
    /// Empty 1-D histogram.
    pub fn new_1d(name: impl Into<String>, x: Axis) -> Self {
        let cells = x.n_bins() + 2;
        Self::with_cells(name.into(), x, None, vec![0.0; cells], vec![0.0; cells])
    }

    /// Empty 2-D histogram.
    pub fn new_2d(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        let cells = (x.n_bins() + 2) * (y.n_bins() + 2);
        Self::with_cells(name.into(), x, Some(y), vec![0.0; cells], vec![0.0; cells])
    }

    /// 1-D histogram from visible-bin contents; errors are Poisson (`sumw2 = |content|`).
    pub fn from_contents(name: impl Into<String>, x: Axis, bins: &[f64]) -> Result<Self> {
        let mut h = Self::new_1d(name, x);
        if bins.len() != h.x.n_bins() {
            return Err(RootError::InvalidOperation(format!(
                "'{}' has {} bins, got {} contents",
                h.name,
                h.x.n_bins(),
                bins.len()
            )));
        }
        for (i, &v) in bins.iter().enumerate() {
            h.contents[i + 1] = v;
            h.sumw2[i + 1] = v.abs();
        }
        h.entries = bins.iter().sum();
        Ok(h)
    }

    /// Histogram from full cell arrays (flows included).
    ///
    /// Without `sumw2` the errors default to `sqrt(|content|)`.
    pub fn from_cells(
        name: impl Into<String>,
        x: Axis,
        y: Option<Axis>,
        contents: Vec<f64>,
        sumw2: Option<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        let expected = (x.n_bins() + 2) * y.as_ref().map_or(1, |a| a.n_bins() + 2);
        if contents.len() != expected {
            return Err(RootError::Deserialization(format!(
                "'{name}' stores {} cells, binning needs {expected}",
                contents.len()
            )));
        }
        let sumw2 = match sumw2 {
            Some(w) if w.len() == expected => w,
            Some(w) if !w.is_empty() => {
                return Err(RootError::Deserialization(format!(
                    "'{name}' sumw2 has {} cells, binning needs {expected}",
                    w.len()
                )));
            }
            _ => contents.iter().map(|v| v.abs()).collect(),
        };
        Ok(Self::with_cells(name, x, y, contents, sumw2))
    }

    fn with_cells(
        name: String,
        x: Axis,
        y: Option<Axis>,
        contents: Vec<f64>,
        sumw2: Vec<f64>,
    ) -> Self {
        Self {
            path: format!("/{name}"),
            title: name.clone(),
            name,
            x,
            y,
            y_title: String::new(),
            contents,
            sumw2,
            entries: 0.0,
            style: Style::default(),
        }
    }

    /// 1 or 2.
    pub fn dimension(&self) -> usize {
        if self.y.is_some() { 2 } else { 1 }
    }

    /// Total number of cells, flows included.
    pub fn n_cells(&self) -> usize {
        self.contents.len()
    }

    /// Global cell index of `(ix, iy)`; `iy` is ignored for 1-D histograms.
    pub fn cell(&self, ix: usize, iy: usize) -> usize {
        match &self.y {
            None => ix,
            Some(_) => ix + (self.x.n_bins() + 2) * iy,
        }
    }

    /// Content of a cell; 0 outside the histogram.
    pub fn bin_content(&self, cell: usize) -> f64 {
        self.contents.get(cell).copied().unwrap_or(0.0)
    }

    /// Statistical error of a cell.
    pub fn bin_error(&self, cell: usize) -> f64 {
        self.sumw2.get(cell).map_or(0.0, |w| w.max(0.0).sqrt())
    }

    /// Set the content of a cell; out-of-range cells are ignored.
    pub fn set_bin_content(&mut self, cell: usize, value: f64) {
        if let Some(c) = self.contents.get_mut(cell) {
            *c = value;
        }
    }

    /// Set the error of a cell; out-of-range cells are ignored.
    pub fn set_bin_error(&mut self, cell: usize, error: f64) {
        if let Some(w) = self.sumw2.get_mut(cell) {
            *w = error * error;
        }
    }

    /// All cell contents, flows included.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// All cell sums of squared weights, flows included.
    pub fn sumw2(&self) -> &[f64] {
        &self.sumw2
    }

    /// Visible x-bin contents of a 1-D histogram.
    pub fn bin_contents(&self) -> Vec<f64> {
        (1..=self.x.n_bins()).map(|b| self.bin_content(b)).collect()
    }

    /// Visible x-bin errors of a 1-D histogram.
    pub fn bin_errors(&self) -> Vec<f64> {
        (1..=self.x.n_bins()).map(|b| self.bin_error(b)).collect()
    }

    /// Bin containing `x` on the x axis (1-D cell index).
    pub fn find_bin(&self, x: f64) -> usize {
        self.x.find_bin(x)
    }

    /// Cell indices of every visible bin, x fastest; `(1..=nx)` for 1-D.
    pub fn visible_cells(&self) -> impl Iterator<Item = usize> + '_ {
        let ny = self.y.as_ref().map_or(0, Axis::n_bins);
        let ys = if self.y.is_some() { 1..=ny } else { 0..=0 };
        ys.flat_map(move |iy| (1..=self.x.n_bins()).map(move |ix| self.cell(ix, iy)))
    }

    /// Sum of visible-bin contents.
    pub fn integral(&self) -> f64 {
        self.visible_cells().map(|c| self.contents[c]).sum()
    }

    /// Sum of contents over x bins `first..=last` and its error (1-D).
    ///
    /// Bounds are clamped to the underflow/overflow cells.
    pub fn integral_and_error(&self, first: usize, last: usize) -> (f64, f64) {
        let last = last.min(self.x.n_bins() + 1);
        if first > last {
            return (0.0, 0.0);
        }
        let (sum, w2) = (first..=last)
            .fold((0.0, 0.0), |(s, w), b| (s + self.contents[b], w + self.sumw2[b]));
        (sum, w2.max(0.0).sqrt())
    }

    /// Largest content among visible bins, honoring user ranges.
    pub fn maximum(&self) -> f64 {
        let (x0, x1) = self.x.visible_bins();
        let (y0, y1) = match &self.y {
            Some(y) => y.visible_bins(),
            None => (0, 0),
        };
        let mut max = f64::NEG_INFINITY;
        for iy in y0..=y1 {
            for ix in x0..=x1 {
                max = max.max(self.contents[self.cell(ix, iy)]);
            }
        }
        if max.is_finite() { max } else { 0.0 }
    }

    /// Zero all contents, errors and entries.
    pub fn reset(&mut self) {
        self.contents.iter_mut().for_each(|c| *c = 0.0);
        self.sumw2.iter_mut().for_each(|w| *w = 0.0);
        self.entries = 0.0;
    }

    /// Copy with contents reset, keeping binning, titles and style.
    pub fn empty_like(&self) -> Self {
        let mut h = self.clone();
        h.reset();
        h
    }

    /// Multiply every cell by `factor`; errors scale accordingly.
    pub fn scale(&mut self, factor: f64) {
        self.contents.iter_mut().for_each(|c| *c *= factor);
        self.sumw2.iter_mut().for_each(|w| *w *= factor * factor);
    }

    /// Fail unless `other` has the same dimension and binning.
    pub fn check_compatible(&self, other: &Histogram) -> Result<()> {
        let reason = if self.dimension() != other.dimension() {
            Some(format!("{}-D vs {}-D", self.dimension(), other.dimension()))
        } else if !self.x.same_binning(&other.x) {
            Some("x binning differs".to_string())
        } else if let (Some(a), Some(b)) = (&self.y, &other.y)
            && !a.same_binning(b)
        {
            Some("y binning differs".to_string())
        } else {
            None
        };
        match reason {
            None => Ok(()),
            Some(reason) => Err(RootError::Incompatible {
                left: self.name.clone(),
                right: other.name.clone(),
                reason,
            }),
        }
    }

    /// Bin-wise `self += other`.
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        self.add_scaled(other, 1.0)
    }

    /// Bin-wise `self += factor * other`.
    pub fn add_scaled(&mut self, other: &Histogram, factor: f64) -> Result<()> {
        self.check_compatible(other)?;
        for (c, o) in self.contents.iter_mut().zip(&other.contents) {
            *c += factor * o;
        }
        for (w, o) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *w += factor * factor * o;
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Bin-wise `self /= other` with uncorrelated error propagation.
    ///
    /// Cells with a zero denominator get zero content and error.
    pub fn divide(&mut self, other: &Histogram) -> Result<()> {
        self.check_compatible(other)?;
        for i in 0..self.contents.len() {
            let (c1, c2) = (self.contents[i], other.contents[i]);
            if c2 == 0.0 {
                self.contents[i] = 0.0;
                self.sumw2[i] = 0.0;
                continue;
            }
            let c2sq = c2 * c2;
            self.sumw2[i] = (self.sumw2[i] * c2sq + other.sumw2[i] * c1 * c1) / (c2sq * c2sq);
            self.contents[i] = c1 / c2;
        }
        Ok(())
    }

    /// Merge every `group` consecutive x bins (ROOT `Rebin`/`RebinX`).
    pub fn rebin(&mut self, group: usize) -> Result<()> {
        self.rebin_axis(AxisId::X, group)
    }

    /// Merge every `group` consecutive bins of one axis.
    ///
    /// Bins left over when `group` does not divide the bin count move into
    /// the overflow.
    pub fn rebin_axis(&mut self, axis: AxisId, group: usize) -> Result<()> {
        let target = match axis {
            AxisId::X => &self.x,
            AxisId::Y => self.y.as_ref().ok_or_else(|| {
                RootError::InvalidOperation(format!("'{}' has no y axis", self.name))
            })?,
        };
        if group == 0 || group > target.n_bins() {
            return Err(RootError::InvalidOperation(format!(
                "cannot group {} bins of '{}' by {group}",
                target.n_bins(),
                self.name
            )));
        }
        if group == 1 {
            return Ok(());
        }
        let (new_x, new_y) = match axis {
            AxisId::X => (self.x.grouped(group), self.y.clone()),
            AxisId::Y => (self.x.clone(), self.y.as_ref().map(|y| y.grouped(group))),
        };
        let (old_x, old_y) = (self.x.clone(), self.y.clone());
        *self = self.remap(new_x, new_y, |ix, iy| match axis {
            AxisId::X => (old_x.grouped_cell(ix, group), iy),
            AxisId::Y => (ix, old_y.as_ref().map_or(iy, |y| y.grouped_cell(iy, group))),
        });
        Ok(())
    }

    /// Copy of a 1-D histogram on variable `edges`.
    ///
    /// Every old bin lands in the new bin containing its center; old flows
    /// stay flows.
    pub fn rebinned(&self, edges: &[f64]) -> Result<Histogram> {
        if self.y.is_some() {
            return Err(RootError::InvalidOperation(format!(
                "variable rebinning of 2-D histogram '{}'",
                self.name
            )));
        }
        let mut axis = Axis::variable(edges.to_vec())?;
        axis.title = self.x.title.clone();
        let n_old = self.x.n_bins();
        let n_new = axis.n_bins();
        let old = self.x.clone();
        let target = axis.clone();
        Ok(self.remap(axis, None, |ix, iy| {
            let cell = match ix {
                0 => 0,
                c if c > n_old => n_new + 1,
                c => target.find_bin(old.center(c)),
            };
            (cell, iy)
        }))
    }

    fn remap(
        &self,
        x: Axis,
        y: Option<Axis>,
        map: impl Fn(usize, usize) -> (usize, usize),
    ) -> Histogram {
        let mut out = match y {
            Some(y) => Histogram::new_2d(self.name.clone(), x, y),
            None => Histogram::new_1d(self.name.clone(), x),
        };
        let ny_cells = self.y.as_ref().map_or(1, |a| a.n_bins() + 2);
        for iy in 0..ny_cells {
            for ix in 0..self.x.n_bins() + 2 {
                let from = self.cell(ix, iy);
                let (nx, ny) = map(ix, iy);
                let to = out.cell(nx, ny);
                out.contents[to] += self.contents[from];
                out.sumw2[to] += self.sumw2[from];
            }
        }
        out.path = self.path.clone();
        out.title = self.title.clone();
        out.y_title = self.y_title.clone();
        out.entries = self.entries;
        out.style = self.style;
        out
    }
}
