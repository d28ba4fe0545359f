use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use coreg_stats::OutlierParams;

/// A wrapper newtype indicating the inner type has been validated.
#[derive(Debug, Clone)]
pub struct Valid<T>(T);

impl<T> Valid<T> {
    /// Return a reference to the validated inner type.
    pub fn valid(&self) -> &T {
        &self.0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("parsing configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How flagged statistics rows are matched to control measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatchParams {
    /// Absolute tolerance when comparing positions and residuals written by
    /// the statistics table and by the control network.
    pub abs_tol: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self { abs_tol: 0.01 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TranslationParams {
    /// Fail on measures without a `Reference` key instead of treating them
    /// as measures of the moved image.
    pub require_reference_flag: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IsisParams {
    /// Directory with the ISIS programs. Defaults to looking them up in
    /// `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<PathBuf>,
}

/// Configuration of control network post-processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoregConfig {
    pub outliers: OutlierParams,
    pub matching: MatchParams,
    pub translation: TranslationParams,
    pub isis: IsisParams,
}

impl CoregConfig {
    pub fn validate(self) -> Result<Valid<Self>, ConfigError> {
        let zscore_threshold = self.outliers.zscore_threshold;
        if !(zscore_threshold.is_finite() && zscore_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "outliers.zscore_threshold must be positive, not {zscore_threshold}"
            )));
        }
        if self.outliers.min_rows == 0 {
            return Err(ConfigError::Invalid(
                "outliers.min_rows must be at least 1".into(),
            ));
        }
        let abs_tol = self.matching.abs_tol;
        if !(abs_tol.is_finite() && abs_tol >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "matching.abs_tol must be zero or positive, not {abs_tol}"
            )));
        }
        Ok(Valid(self))
    }

    pub fn from_toml_str(buf: &str) -> Result<Valid<Self>, ConfigError> {
        let cfg: Self = toml::from_str(buf)?;
        cfg.validate()
    }

    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> crate::Result<Valid<Self>> {
        let path = path.as_ref();
        let buf = std::fs::read_to_string(path).map_err(|e| crate::Error::io(path, e))?;
        Self::from_toml_str(&buf).map_err(|source| crate::Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
