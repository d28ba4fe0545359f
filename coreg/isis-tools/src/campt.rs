use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use pvl_blocks::{PvlCursor, decode, leading_real};

use crate::{
    GeometryError, GeometryService, GroundPoint, ImagePoint,
    process::{IsisBin, arg, path_arg},
};

/// [GeometryService] backed by the ISIS programs `campt` and `getsn`.
///
/// `campt` writes its result as PVL to a scratch file created in
/// `scratch_dir`, which is removed after each call.
#[derive(Debug, Clone)]
pub struct IsisCampt {
    bin: IsisBin,
    scratch_dir: PathBuf,
}

impl IsisCampt {
    pub fn new<P: Into<PathBuf>>(bin: IsisBin, scratch_dir: P) -> Self {
        Self {
            bin,
            scratch_dir: scratch_dir.into(),
        }
    }

    fn campt(&self, mut args: Vec<String>) -> Result<BTreeMap<String, String>, GeometryError> {
        let scratch = tempfile::Builder::new()
            .prefix("campt")
            .suffix(".pvl")
            .tempfile_in(&self.scratch_dir)?;
        args.push(path_arg("to", scratch.path()));
        args.push(arg("append", "false"));
        self.bin.run("campt", &args)?;
        read_ground_point(scratch.path())
    }
}

/// Decode the `GroundPoint` group of a `campt` output file.
pub(crate) fn read_ground_point(path: &Path) -> Result<BTreeMap<String, String>, GeometryError> {
    let parse_err = |source| GeometryError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut cursor = PvlCursor::open(path).map_err(parse_err)?;
    cursor
        .read_block(&["Group", "=", "GroundPoint"])
        .map_err(parse_err)?;
    let group = cursor.read_block(&["End_Group"]).map_err(parse_err)?;
    Ok(decode(&group.lines))
}

fn real(group: &BTreeMap<String, String>, key: &str, path: &Path) -> Result<f64, GeometryError> {
    group
        .get(key)
        .and_then(|v| leading_real(v))
        .ok_or_else(|| GeometryError::MissingKey {
            path: path.to_path_buf(),
            key: key.to_string(),
        })
}

impl GeometryService for IsisCampt {
    fn ground_from_pixel(
        &self,
        image: &Path,
        pixel: ImagePoint,
    ) -> Result<GroundPoint, GeometryError> {
        let group = self.campt(vec![
            path_arg("from", image),
            arg("type", "image"),
            arg("sample", pixel.sample),
            arg("line", pixel.line),
        ])?;
        Ok(GroundPoint {
            latitude: real(&group, "PlanetocentricLatitude", image)?,
            longitude: real(&group, "PositiveEast360Longitude", image)?,
        })
    }

    fn pixel_from_ground(
        &self,
        image: &Path,
        ground: GroundPoint,
    ) -> Result<ImagePoint, GeometryError> {
        let group = self.campt(vec![
            path_arg("from", image),
            arg("type", "ground"),
            arg("latitude", ground.latitude),
            arg("longitude", ground.longitude),
        ])?;
        Ok(ImagePoint {
            sample: real(&group, "Sample", image)?,
            line: real(&group, "Line", image)?,
        })
    }

    fn serial_number(&self, image: &Path) -> Result<String, GeometryError> {
        let output = self
            .bin
            .run("getsn", &[path_arg("from", image), arg("format", "flat")])?;
        let sn = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if sn.is_empty() {
            return Err(GeometryError::EmptySerialNumber {
                image: image.to_path_buf(),
            });
        }
        Ok(sn)
    }
}
