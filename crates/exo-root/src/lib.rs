//! # exo-root
//!
//! Native ROOT histogram reader for the exo template tools.
//!
//! Reads TH1/TH2 histograms (double, float and int storage) from `.root`
//! files, walking nested directories, without Python or ROOT libraries.
//! Supports zlib, LZ4, ZSTD and XZ compressed records. The owned
//! [`Histogram`] type carries the arithmetic the template pipeline needs:
//! add, scale, divide, rebin and integrals with errors.
//!
//! ## Example
//!
//! ```no_run
//! use exo_root::RootFile;
//!
//! let f = RootFile::open("cms.2011.ttbar.root").unwrap();
//! for h in f.histograms().unwrap() {
//!     println!("{} ({} bins, {:.1} events)", h.path, h.x.n_bins(), h.integral());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
#[cfg(any(test, feature = "fixture"))]
#[doc(hidden)]
pub mod fixture;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;

pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::{Axis, AxisId, Histogram, Style};
pub use key::KeyInfo;
