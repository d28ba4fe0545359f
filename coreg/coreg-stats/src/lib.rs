//! The statistics table written by `coreg` alongside its control network.
//!
//! Each row describes one registered point: its position in the pattern
//! image, its translated position in the search image and the residual
//! between them. This crate flags rows with outlying residuals using the
//! modified z-score and summarises the goodness of fit of the rows kept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

mod table;

pub use table::StatsTable;

pub const SAMPLE: &str = "Sample";
pub const LINE: &str = "Line";
pub const TRANSLATED_SAMPLE: &str = "TranslatedSample";
pub const TRANSLATED_LINE: &str = "TranslatedLine";
pub const SAMPLE_DIFFERENCE: &str = "SampleDifference";
pub const LINE_DIFFERENCE: &str = "LineDifference";
pub const GOODNESS_OF_FIT: &str = "GoodnessOfFit";
pub const FILTERED: &str = "Filtered";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no column \"{column}\"")]
    MissingColumn { path: PathBuf, column: String },
    #[error("statistics on column \"{column}\" failed: {source}")]
    Stats {
        column: String,
        source: robust_stats::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parameters of the outlier filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutlierParams {
    /// Rows whose absolute modified z-score reaches this value are flagged.
    pub zscore_threshold: f64,
    /// Tables with fewer rows are never filtered.
    pub min_rows: usize,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            zscore_threshold: 3.0,
            min_rows: 3,
        }
    }
}

/// A row flagged as outlier.
///
/// Positions are `None` when the table lacks the column or the cell is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedPoint {
    pub row: usize,
    pub sample: Option<f64>,
    pub line: Option<f64>,
    pub translated_sample: Option<f64>,
    pub translated_line: Option<f64>,
    pub sample_difference: f64,
    pub line_difference: f64,
}

/// Set `flagged[i]` for every finite value in `column` whose modified
/// z-score is an outlier. Empty and non-numeric cells are skipped.
fn flag_outliers(
    name: &str,
    column: &[Option<f64>],
    threshold: f64,
    flagged: &mut [bool],
) -> Result<()> {
    let (rows, values): (Vec<usize>, Vec<f64>) = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (i, v)))
        .unzip();
    if values.is_empty() {
        debug!("column {name} has no numeric values");
        return Ok(());
    }
    let scores = robust_stats::modified_zscore(&values).map_err(|source| Error::Stats {
        column: name.to_string(),
        source,
    })?;
    if scores.iter().any(|s| !s.is_finite()) {
        warn!("column {name} has zero median absolute deviation");
    }
    for (row, score) in rows.into_iter().zip(scores) {
        if robust_stats::is_outlier(score, threshold) {
            debug!("row {row} flagged on {name}, modified z-score {score}");
            flagged[row] = true;
        }
    }
    Ok(())
}

/// Flag outlying rows of the table at `path`.
///
/// The table is always rewritten with a `Filtered` column of zeros (an
/// existing one is reset). With at least `params.min_rows` rows, rows whose
/// `SampleDifference` or `LineDifference` is an outlier get `Filtered = 1`
/// and the table is written again. Returns the flagged rows in table order.
pub fn filter_points<P: AsRef<Path>>(path: P, params: &OutlierParams) -> Result<Vec<FlaggedPoint>> {
    let path = path.as_ref();
    let mut table = StatsTable::read(path)?;
    table.set_column(FILTERED, |_| "0".to_string());
    table.write(path)?;

    if table.len() < params.min_rows {
        info!(
            "{}: {} rows, too few to filter (minimum {})",
            path.display(),
            table.len(),
            params.min_rows
        );
        return Ok(Vec::new());
    }

    let sample_diff = table.real_column(SAMPLE_DIFFERENCE)?;
    let line_diff = table.real_column(LINE_DIFFERENCE)?;

    let mut flagged = vec![false; table.len()];
    flag_outliers(
        SAMPLE_DIFFERENCE,
        &sample_diff,
        params.zscore_threshold,
        &mut flagged,
    )?;
    flag_outliers(
        LINE_DIFFERENCE,
        &line_diff,
        params.zscore_threshold,
        &mut flagged,
    )?;

    let n_flagged = flagged.iter().filter(|f| **f).count();
    info!(
        "{}: {n_flagged} of {} rows flagged",
        path.display(),
        table.len()
    );
    if n_flagged == 0 {
        return Ok(Vec::new());
    }

    table.set_column(FILTERED, |row| (if flagged[row] { "1" } else { "0" }).to_string());
    table.write(path)?;

    let sample = table.optional_real_column(SAMPLE);
    let line = table.optional_real_column(LINE);
    let translated_sample = table.optional_real_column(TRANSLATED_SAMPLE);
    let translated_line = table.optional_real_column(TRANSLATED_LINE);
    let at = |col: &Option<Vec<Option<f64>>>, row: usize| col.as_ref().and_then(|c| c[row]);

    let points = flagged
        .iter()
        .enumerate()
        .filter(|(_, f)| **f)
        .map(|(row, _)| FlaggedPoint {
            row,
            sample: at(&sample, row),
            line: at(&line, row),
            translated_sample: at(&translated_sample, row),
            translated_line: at(&translated_line, row),
            // Flagged rows have finite values in at least one difference
            // column; the other may be empty.
            sample_difference: sample_diff[row].unwrap_or(f64::NAN),
            line_difference: line_diff[row].unwrap_or(f64::NAN),
        })
        .collect();
    Ok(points)
}

/// Summary of a co-registration run.
#[derive(Debug, Clone, PartialEq)]
pub struct GoodnessOfFit {
    /// Mean `GoodnessOfFit` (0..1, higher is better) of the rows kept.
    pub mean_goodness: Option<f64>,
    /// Uncertainty in source pixels along samples and lines.
    pub uncertainty: Option<(f64, f64)>,
    /// Interquartile "normal" range of the sample and line differences of
    /// the rows kept, widened by [IQR_COEFF].
    pub difference_bounds: Option<((f64, f64), (f64, f64))>,
    /// Number of rows kept.
    pub n_rows: usize,
}

/// Interquartile range multiple of [GoodnessOfFit::difference_bounds].
pub const IQR_COEFF: f64 = 1.5;

fn finite(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    values.flatten().filter(|v| v.is_finite()).collect()
}

/// Summarise the rows of the table at `path` not flagged by
/// [filter_points].
///
/// The uncertainty is the population standard deviation of the sample and
/// line differences scaled by `scale / 2`, where `scale` is the reduction
/// factor the registered images were produced with.
pub fn goodness_of_fit<P: AsRef<Path>>(path: P, scale: f64) -> Result<GoodnessOfFit> {
    let table = StatsTable::read(path.as_ref())?;
    if table.is_empty() {
        warn!("{} has no rows", path.as_ref().display());
    }
    let filtered = table.optional_real_column(FILTERED);
    let kept: Vec<usize> = (0..table.len())
        .filter(|row| {
            filtered
                .as_ref()
                .and_then(|c| c[*row])
                .is_none_or(|f| f != 1.0)
        })
        .collect();

    let pick = |col: &[Option<f64>]| finite(kept.iter().map(|row| col[*row]));

    let mean_goodness = table
        .optional_real_column(GOODNESS_OF_FIT)
        .and_then(|col| robust_stats::mean(&pick(&col)).ok());

    let sample_diff = table.real_column(SAMPLE_DIFFERENCE)?;
    let line_diff = table.real_column(LINE_DIFFERENCE)?;
    let uncertainty = match (
        robust_stats::population_std(&pick(&sample_diff)),
        robust_stats::population_std(&pick(&line_diff)),
    ) {
        (Ok(s), Ok(l)) => Some((s * scale / 2.0, l * scale / 2.0)),
        _ => None,
    };
    let difference_bounds = match (
        robust_stats::iqr_bounds(&pick(&sample_diff), IQR_COEFF),
        robust_stats::iqr_bounds(&pick(&line_diff), IQR_COEFF),
    ) {
        (Ok(s), Ok(l)) => Some((s, l)),
        _ => None,
    };

    Ok(GoodnessOfFit {
        mean_goodness,
        uncertainty,
        difference_bounds,
        n_rows: kept.len(),
    })
}
