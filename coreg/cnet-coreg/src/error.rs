use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed control network {path}: {source}")]
    Format {
        path: PathBuf,
        source: pvl_blocks::Error,
    },
    #[error("bad value in {path} at line {line}: {source}")]
    Data {
        path: PathBuf,
        line: usize,
        source: pvl_blocks::Error,
    },
    #[error("geometry lookup for measure of {serial_number} ({path}, line {line}) failed: {source}")]
    Geometry {
        path: PathBuf,
        line: usize,
        serial_number: String,
        source: isis_tools::GeometryError,
    },
    #[error("converting control network {name} in {dir}: {source}")]
    Conversion {
        dir: PathBuf,
        name: String,
        source: isis_tools::ConversionError,
    },
    #[error(transparent)]
    Stats(#[from] coreg_stats::Error),
    #[error("configuration {path}: {source}")]
    Config {
        path: PathBuf,
        source: crate::config::ConfigError,
    },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the location in the control network to a [pvl_blocks::Error].
    pub(crate) fn pvl(path: &Path, line: usize, source: pvl_blocks::Error) -> Self {
        let path = path.to_path_buf();
        match source {
            pvl_blocks::Error::Io(source) => Error::Io { path, source },
            source @ pvl_blocks::Error::Unterminated { .. } => Error::Format { path, source },
            source => Error::Data { path, line, source },
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
