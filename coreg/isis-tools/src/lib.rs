//! The two external collaborators of control network post-processing.
//!
//! [GeometryService] converts between pixel and ground coordinates of an
//! image and reports the image serial number. [NetworkConverter] converts a
//! control network between its text (PVL) and binary forms. Both are traits
//! so that tests and other hosts can substitute their own implementations;
//! [IsisCampt] and [IsisCnetConverter] run the ISIS programs `campt`,
//! `getsn`, `cnetpvl2bin` and `cnetbin2pvl`.
//!
//! Calls are synchronous and not retried. ISIS programs are not safe to run
//! concurrently on the same files; callers which share these types between
//! threads must serialize calls themselves.

use std::path::{Path, PathBuf};

mod campt;
mod cnet;
mod process;

pub use campt::IsisCampt;
pub use cnet::IsisCnetConverter;
pub use process::{IsisBin, ProcessError};

/// A location on the target body in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPoint {
    /// Planetocentric latitude.
    pub latitude: f64,
    /// Positive east longitude in 0..360.
    pub longitude: f64,
}

/// A pixel location in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    pub sample: f64,
    pub line: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: pvl_blocks::Error,
    },
    #[error("{path} has no numeric \"{key}\" in group GroundPoint")]
    MissingKey { path: PathBuf, key: String },
    #[error("no serial number for {image}")]
    EmptySerialNumber { image: PathBuf },
    #[error("{0}")]
    Rejected(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("conversion produced no output at {path}")]
    MissingOutput { path: PathBuf },
}

/// Coordinate conversions in the geometry of one image.
pub trait GeometryService {
    /// Ground location seen at `pixel` in `image`.
    fn ground_from_pixel(
        &self,
        image: &Path,
        pixel: ImagePoint,
    ) -> Result<GroundPoint, GeometryError>;

    /// Pixel of `image` at which `ground` is seen.
    fn pixel_from_ground(
        &self,
        image: &Path,
        ground: GroundPoint,
    ) -> Result<ImagePoint, GeometryError>;

    /// The identifier used for `image` in control networks.
    fn serial_number(&self, image: &Path) -> Result<String, GeometryError>;
}

/// Conversion of control networks between text and binary form.
pub trait NetworkConverter {
    fn text_to_binary(&self, text: &Path, binary: &Path) -> Result<(), ConversionError>;
    fn binary_to_text(&self, binary: &Path, text: &Path) -> Result<(), ConversionError>;
}
