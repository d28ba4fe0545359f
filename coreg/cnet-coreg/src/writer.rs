use std::path::{Path, PathBuf};

use isis_tools::{ConversionError, NetworkConverter};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Files written by [write_final_network].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOutputs {
    /// Binary control network.
    pub net: PathBuf,
    /// Text control network converted back from `net`.
    pub pvl: PathBuf,
}

/// Split an output location `<dir>/<name>` into directory and name.
pub(crate) fn split_output(output: &Path) -> Result<(&Path, String)> {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::io(
                output,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            )
        })?;
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok((dir, name))
}

/// Write `text` as control network `<output_dir>/<name>.net` and its
/// canonical text form `<output_dir>/<name>.pvl`.
///
/// Conversion happens in a scratch directory inside `output_dir` which is
/// removed when this returns. The final files are only moved into place once
/// both conversions succeeded.
pub fn write_final_network(
    text: &str,
    output_dir: &Path,
    name: &str,
    converter: &dyn NetworkConverter,
) -> Result<NetworkOutputs> {
    let scratch = tempfile::Builder::new()
        .prefix(&format!(".{name}-"))
        .tempdir_in(output_dir)
        .map_err(|e| Error::io(output_dir, e))?;
    let draft = scratch.path().join("draft.pvl");
    std::fs::write(&draft, text).map_err(|e| Error::io(&draft, e))?;

    let net_name = format!("{name}.net");
    let pvl_name = format!("{name}.pvl");
    let scratch_net = scratch.path().join(&net_name);
    let scratch_pvl = scratch.path().join(&pvl_name);

    let conversion_error = |source| Error::Conversion {
        dir: output_dir.to_path_buf(),
        name: name.to_string(),
        source,
    };
    converter
        .text_to_binary(&draft, &scratch_net)
        .map_err(conversion_error)?;
    converter
        .binary_to_text(&scratch_net, &scratch_pvl)
        .map_err(conversion_error)?;
    for path in [&scratch_net, &scratch_pvl] {
        if !path.is_file() {
            return Err(conversion_error(ConversionError::MissingOutput {
                path: path.clone(),
            }));
        }
    }

    let net = output_dir.join(net_name);
    let pvl = output_dir.join(pvl_name);
    std::fs::rename(&scratch_net, &net).map_err(|e| Error::io(&net, e))?;
    if let Err(e) = std::fs::rename(&scratch_pvl, &pvl) {
        // A binary network is never left without its text form.
        if let Err(undo) = std::fs::rename(&net, &scratch_net) {
            warn!("cannot withdraw {}: {undo}", net.display());
        }
        return Err(Error::io(&pvl, e));
    }
    debug!("wrote {} and {}", net.display(), pvl.display());

    scratch.close().map_err(|e| Error::io(output_dir, e))?;
    Ok(NetworkOutputs { net, pvl })
}
