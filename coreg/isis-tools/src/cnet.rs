use std::path::Path;

use crate::{
    ConversionError, NetworkConverter,
    process::{IsisBin, path_arg},
};

/// [NetworkConverter] backed by the ISIS programs `cnetpvl2bin` and
/// `cnetbin2pvl`.
#[derive(Debug, Clone, Default)]
pub struct IsisCnetConverter {
    bin: IsisBin,
}

impl IsisCnetConverter {
    pub fn new(bin: IsisBin) -> Self {
        Self { bin }
    }

    fn convert(&self, program: &str, from: &Path, to: &Path) -> Result<(), ConversionError> {
        self.bin
            .run(program, &[path_arg("from", from), path_arg("to", to)])?;
        if !to.exists() {
            return Err(ConversionError::MissingOutput {
                path: to.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl NetworkConverter for IsisCnetConverter {
    fn text_to_binary(&self, text: &Path, binary: &Path) -> Result<(), ConversionError> {
        self.convert("cnetpvl2bin", text, binary)
    }

    fn binary_to_text(&self, binary: &Path, text: &Path) -> Result<(), ConversionError> {
        self.convert("cnetbin2pvl", binary, text)
    }
}
