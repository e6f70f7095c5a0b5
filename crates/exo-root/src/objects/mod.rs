//! ROOT object deserialization dispatch.

mod th1;

use crate::error::{Result, RootError};
use crate::histogram::Histogram;

/// Histogram classes this crate can stream.
pub const SUPPORTED_CLASSES: &[&str] = &["TH1D", "TH1F", "TH1I", "TH2D", "TH2F", "TH2I"];

/// Whether `class_name` names a streamable histogram class.
pub fn is_supported(class_name: &str) -> bool {
    SUPPORTED_CLASSES.contains(&class_name)
}

/// Read a histogram from a decompressed object payload, given its class name.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    use th1::Storage;
    match class_name {
        "TH1D" => th1::read_th1(payload, Storage::F64),
        "TH1F" => th1::read_th1(payload, Storage::F32),
        "TH1I" => th1::read_th1(payload, Storage::I32),
        "TH2D" => th1::read_th2(payload, Storage::F64),
        "TH2F" => th1::read_th2(payload, Storage::F32),
        "TH2I" => th1::read_th2(payload, Storage::I32),
        _ => Err(RootError::UnsupportedClass(class_name.to_string())),
    }
}
