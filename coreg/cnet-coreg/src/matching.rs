//! Matching of flagged statistics rows to control measures.

use coreg_stats::FlaggedPoint;
use pvl_blocks::MeasureRecord;

/// Relative tolerance of [is_close].
pub const REL_TOL: f64 = 1e-9;

/// Whether `a` and `b` differ by at most `abs_tol` or by a relative
/// [REL_TOL] of the larger magnitude.
///
/// Infinite values are only close to themselves and NaN is close to nothing.
pub fn is_close(a: f64, b: f64, abs_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !(a.is_finite() && b.is_finite()) {
        return false;
    }
    let diff = (a - b).abs();
    diff <= (REL_TOL * a.abs().max(b.abs())).max(abs_tol)
}

fn close(a: Option<f64>, b: Option<f64>, abs_tol: f64) -> bool {
    matches!((a, b), (Some(a), Some(b)) if is_close(a, b, abs_tol))
}

/// Whether the statistics row `point` describes `measure`.
///
/// The row position (either untranslated or translated) must match the
/// measure position and the row differences must match the measure
/// residuals.
pub fn point_matches(point: &FlaggedPoint, measure: &MeasureRecord, abs_tol: f64) -> bool {
    let at_position = (close(point.sample, measure.sample, abs_tol)
        && close(point.line, measure.line, abs_tol))
        || (close(point.translated_sample, measure.sample, abs_tol)
            && close(point.translated_line, measure.line, abs_tol));
    at_position
        && close(Some(point.sample_difference), measure.sample_residual, abs_tol)
        && close(Some(point.line_difference), measure.line_residual, abs_tol)
}

pub fn point_in_measures(points: &[FlaggedPoint], measure: &MeasureRecord, abs_tol: f64) -> bool {
    points.iter().any(|p| point_matches(p, measure, abs_tol))
}
