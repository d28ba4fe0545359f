#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use isis_tools::{
    ConversionError, GeometryError, GeometryService, GroundPoint, ImagePoint, NetworkConverter,
};

/// Control network with a reference measure, a moved measure and an ignored
/// point.
pub const NETWORK: &str = "Object = ControlNetwork
  Version     = 5
  NetworkId   = coreg
  TargetName  = Mars
  Description = \"co-registration of moved.cub onto -
                 match.cub\"

  Object = ControlPoint
    PointType = Free
    PointId   = coreg_1

    Group = ControlMeasure
      SerialNumber = match.x20.cub
      MeasureType  = Candidate
      Sample       = 100.0
      Line         = 200.0
      Reference    = True
    End_Group

    Group = ControlMeasure
      SerialNumber   = moved.x20.cub
      MeasureType    = RegisteredSubPixel
      Sample         = 101.5
      Line           = 199.25
      SampleResidual = 1.5 <pixels>
      LineResidual   = -0.75 <pixels>
      GoodnessOfFit  = 0.93
    End_Group
  End_Object

  Object = ControlPoint
    PointType = Free
    PointId   = coreg_2
    Ignore    = True

    Group = ControlMeasure
      SerialNumber = match.x20.cub
      MeasureType  = Candidate
      Sample       = 300.0
      Line         = 40.0
      Reference    = True
    End_Group

    Group = ControlMeasure
      SerialNumber   = moved.x20.cub
      MeasureType    = RegisteredSubPixel
      Sample         = 320.0
      Line           = 44.0
      SampleResidual = 20.0 <pixels>
      LineResidual   = 4.0 <pixels>
    End_Group
  End_Object
End_Object
End
";

/// [NETWORK] as read back: continuation lines joined.
pub fn joined_network() -> String {
    NETWORK.replace("-\n                 match.cub", "match.cub")
}

/// Images named like the inputs of a co-registration run.
pub fn inputs(dir: &Path) -> cnet_coreg::TranslationInputs {
    cnet_coreg::TranslationInputs {
        image_dir: dir.join("work"),
        source_image: dir.join("source.cub"),
        match_image: dir.join("match.cub"),
    }
}

fn file_name(image: &Path) -> String {
    image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Geometry where ground coordinates are half the pixel coordinates.
///
/// Images named `match.cub` are offset by 1000 pixels and all other images
/// by half a pixel.
#[derive(Default)]
pub struct FakeGeometry {
    /// Serial number whose transformed image cannot be read.
    pub broken: Option<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeGeometry {
    fn offset(image: &Path) -> f64 {
        if file_name(image) == "match.cub" {
            1000.0
        } else {
            0.5
        }
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(program))
            .count()
    }
}

impl GeometryService for FakeGeometry {
    fn ground_from_pixel(
        &self,
        image: &Path,
        pixel: ImagePoint,
    ) -> Result<GroundPoint, GeometryError> {
        let name = file_name(image);
        self.calls.borrow_mut().push(format!("ground {name}"));
        if self.broken.as_deref() == Some(name.as_str()) {
            return Err(GeometryError::Rejected(format!("{name} has no camera")));
        }
        Ok(GroundPoint {
            latitude: pixel.line / 2.0,
            longitude: pixel.sample / 2.0,
        })
    }

    fn pixel_from_ground(
        &self,
        image: &Path,
        ground: GroundPoint,
    ) -> Result<ImagePoint, GeometryError> {
        self.calls
            .borrow_mut()
            .push(format!("pixel {}", file_name(image)));
        let offset = Self::offset(image);
        Ok(ImagePoint {
            sample: ground.longitude * 2.0 + offset,
            line: ground.latitude * 2.0 + offset,
        })
    }

    fn serial_number(&self, image: &Path) -> Result<String, GeometryError> {
        let name = file_name(image);
        self.calls.borrow_mut().push(format!("serial {name}"));
        Ok(format!("SN:{name}"))
    }
}

/// Converter storing the binary network as a verbatim copy of the text.
pub struct CopyConverter;

impl NetworkConverter for CopyConverter {
    fn text_to_binary(&self, text: &Path, binary: &Path) -> Result<(), ConversionError> {
        std::fs::copy(text, binary)?;
        Ok(())
    }

    fn binary_to_text(&self, binary: &Path, text: &Path) -> Result<(), ConversionError> {
        std::fs::copy(binary, text)?;
        Ok(())
    }
}

/// Converter whose binary to text step fails.
pub struct FailingConverter;

impl NetworkConverter for FailingConverter {
    fn text_to_binary(&self, text: &Path, binary: &Path) -> Result<(), ConversionError> {
        std::fs::copy(text, binary)?;
        Ok(())
    }

    fn binary_to_text(&self, _binary: &Path, _text: &Path) -> Result<(), ConversionError> {
        Err(ConversionError::Io(std::io::Error::other("disk full")))
    }
}

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Sorted names of the entries of `dir`.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Statistics table with ten inliers and, when `outlier` is set, a row
/// matching the moved measure of point `coreg_1` of [NETWORK].
pub fn stats_table(outlier: bool) -> String {
    let mut buf = String::from(
        "Sample,Line,TranslatedSample,TranslatedLine,SampleDifference,LineDifference,GoodnessOfFit\n",
    );
    for i in 0..10 {
        let base = 20.0 * f64::from(i);
        buf.push_str(&format!(
            "{base},{base},{},{},0.1,0.1,0.9\n",
            base + 0.1,
            base + 0.1
        ));
    }
    if outlier {
        buf.push_str("100.0,200.0,101.5,199.25,1.5,-0.75,0.5\n");
    }
    buf
}
