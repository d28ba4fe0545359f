//! Robust statistics used to reject unreliable co-registration points.
//!
//! The modified z-score follows the NIST/SEMATECH e-Handbook of Statistical
//! Methods: `0.6745 * (x - median) / MAD`, where MAD is the median absolute
//! deviation about the median. Values with an absolute score of about 3.0-3.5
//! or more are usually considered outliers. Unlike a mean/stddev z-score it
//! stays meaningful for small samples.

/// Scale factor relating the MAD to the standard deviation of a normal
/// distribution (`1 / 1.4826`).
pub const MAD_SCALE: f64 = 0.6745;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("statistic requested on an empty sequence")]
    Empty,
    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;

fn check_finite(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(Error::Empty);
    }
    if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFinite {
            index,
            value: *value,
        });
    }
    Ok(())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Median of an already sorted, non-empty slice. Even lengths average the two
/// middle values.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median of `values`.
pub fn median(values: &[f64]) -> Result<f64> {
    check_finite(values)?;
    Ok(median_of_sorted(&sorted(values)))
}

/// Median absolute deviation of `values` about their median.
pub fn mad(values: &[f64]) -> Result<f64> {
    let med = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    Ok(median_of_sorted(&sorted(&deviations)))
}

/// Modified z-score of every value, in input order.
///
/// When the MAD is zero the scores are not finite: `NaN` for values equal
/// to the median and infinite for all others. Use [is_outlier] to compare
/// scores against a threshold.
pub fn modified_zscore(values: &[f64]) -> Result<Vec<f64>> {
    let med = median(values)?;
    let mad = mad(values)?;
    Ok(values.iter().map(|v| MAD_SCALE * (v - med) / mad).collect())
}

/// Returns `true` iff `|score| >= threshold`.
///
/// A `NaN` score (a value equal to the median of a column with zero MAD) is
/// never an outlier, so a column of identical values flags nothing. An
/// infinite score (a value away from a median shared by more than half of
/// the column) always is.
#[inline]
pub fn is_outlier(score: f64, threshold: f64) -> bool {
    !score.is_nan() && score.abs() >= threshold
}

/// Quantile with linear interpolation between the closest ranks.
fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// The "normal" range of `values` based on the interquartile range.
///
/// Returns `(q1 - coeff * iqr, q3 + coeff * iqr)`. Points outside this range
/// may be considered outliers; 1.5 is the customary coefficient.
pub fn iqr_bounds(values: &[f64], coeff: f64) -> Result<(f64, f64)> {
    check_finite(values)?;
    let sorted = sorted(values);
    let q1 = quantile_of_sorted(&sorted, 0.25);
    let q3 = quantile_of_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    Ok((q1 - coeff * iqr, q3 + coeff * iqr))
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    check_finite(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (zero delta degrees of freedom).
pub fn population_std(values: &[f64]) -> Result<f64> {
    let mu = mean(values)?;
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(var.sqrt())
}
