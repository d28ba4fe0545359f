use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use isis_tools::{GeometryError, GeometryService, ImagePoint, NetworkConverter};
use pvl_blocks::{MeasureRecord, PvlCursor, clean, decode, encode};
use tracing::{debug, info};

use crate::writer::{NetworkOutputs, split_output, write_final_network};
use crate::{CoregConfig, Error, Result};

const CONTROL_MEASURE: [&str; 3] = ["Group", "=", "ControlMeasure"];
const END_GROUP: [&str; 1] = ["End_Group"];
const REWRITTEN_KEYS: [&str; 3] = ["Sample", "Line", "SerialNumber"];

/// Images involved in translating measures back to the original images.
#[derive(Debug, Clone)]
pub struct TranslationInputs {
    /// Directory with the transformed images named by measure serial numbers.
    pub image_dir: PathBuf,
    /// Original image of the moved measures.
    pub source_image: PathBuf,
    /// Image the reference measures belong to.
    pub match_image: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// Measures rewritten to source or match image coordinates.
    pub translated_measures: usize,
    pub outputs: NetworkOutputs,
}

/// Rewrite every measure of `network` into the pixel coordinates and serial
/// number of its original image and write `<output>.net` and
/// `<output>.pvl`.
pub fn translate_network(
    network: &Path,
    inputs: &TranslationInputs,
    output: &Path,
    cfg: &CoregConfig,
    geometry: &dyn GeometryService,
    converter: &dyn NetworkConverter,
) -> Result<TranslationOutcome> {
    let (text, translated_measures) = translate_measures(network, inputs, cfg, geometry)?;
    let (dir, name) = split_output(output)?;
    let outputs = write_final_network(&text, dir, &name, converter)?;
    info!(
        "translated {} measures, wrote {}",
        translated_measures,
        outputs.pvl.display()
    );
    Ok(TranslationOutcome {
        translated_measures,
        outputs,
    })
}

/// Return the translated text of control network `path` and the number of
/// measures translated.
pub fn translate_measures(
    path: &Path,
    inputs: &TranslationInputs,
    cfg: &CoregConfig,
    geometry: &dyn GeometryService,
) -> Result<(String, usize)> {
    let mut cursor = PvlCursor::open(path).map_err(|e| Error::pvl(path, 0, e))?;
    let mut translator = Translator {
        path,
        inputs,
        require_reference_flag: cfg.translation.require_reference_flag,
        geometry,
        serial_numbers: BTreeMap::new(),
    };
    translator.run(&mut cursor)
}

struct Translator<'a> {
    path: &'a Path,
    inputs: &'a TranslationInputs,
    require_reference_flag: bool,
    geometry: &'a dyn GeometryService,
    serial_numbers: BTreeMap<PathBuf, String>,
}

impl Translator<'_> {
    fn run<R: BufRead>(&mut self, cursor: &mut PvlCursor<R>) -> Result<(String, usize)> {
        let path = self.path;
        let mut out = String::new();
        let mut n_translated = 0;
        loop {
            let head = cursor
                .read_until(&CONTROL_MEASURE)
                .map_err(|e| Error::pvl(path, cursor.line_number(), e))?;
            let found = head.is_terminated();
            head.emit_into(&mut out);
            if !found {
                break;
            }

            let group = cursor
                .read_block(&END_GROUP)
                .map_err(|e| Error::pvl(path, cursor.line_number(), e))?;
            let line_number = cursor.line_number();
            let data_error = |source| Error::pvl(path, line_number, source);

            let mut dict = clean(decode(&group.lines)).map_err(data_error)?;
            let record = MeasureRecord::from_dict(&dict);
            let Some(serial_number) = record.serial_number.clone() else {
                group.emit_into(&mut out);
                continue;
            };
            let reference = match record.reference {
                Some(reference) => reference,
                None if self.require_reference_flag => {
                    return Err(data_error(pvl_blocks::Error::MissingKey {
                        key: "Reference".into(),
                    }));
                }
                None => false,
            };
            let (sample, line) = record.position().map_err(data_error)?;

            let (pixel, new_serial) = self
                .locate(&serial_number, ImagePoint { sample, line }, reference)
                .map_err(|source| Error::Geometry {
                    path: path.to_path_buf(),
                    line: line_number,
                    serial_number: serial_number.clone(),
                    source,
                })?;
            debug!(
                "measure of {serial_number} at ({sample}, {line}) -> {new_serial} at ({}, {})",
                pixel.sample, pixel.line
            );

            dict.insert("Sample", pixel.sample);
            dict.insert("Line", pixel.line);
            dict.insert("SerialNumber", new_serial);
            let lines = encode(&group.lines, &REWRITTEN_KEYS, &dict).map_err(data_error)?;
            out.extend(lines.iter().map(String::as_str));
            out.extend(group.terminator.as_deref());
            n_translated += 1;
        }
        Ok((out, n_translated))
    }

    /// Pixel and serial number in the original image of a measure at `pixel`
    /// of the transformed image `serial_number`.
    fn locate(
        &mut self,
        serial_number: &str,
        pixel: ImagePoint,
        reference: bool,
    ) -> std::result::Result<(ImagePoint, String), GeometryError> {
        let inputs = self.inputs;
        let transformed = inputs.image_dir.join(serial_number);
        let ground = self.geometry.ground_from_pixel(&transformed, pixel)?;
        let image = if reference {
            &inputs.match_image
        } else {
            &inputs.source_image
        };
        let pixel = self.geometry.pixel_from_ground(image, ground)?;
        let serial = match self.serial_numbers.get(image) {
            Some(serial) => serial.clone(),
            None => {
                let serial = self.geometry.serial_number(image)?;
                self.serial_numbers.insert(image.clone(), serial.clone());
                serial
            }
        };
        Ok((pixel, serial))
    }
}
