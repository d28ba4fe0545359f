use std::io::BufRead;
use std::path::Path;

use coreg_stats::FlaggedPoint;
use isis_tools::NetworkConverter;
use pvl_blocks::{Block, MeasureRecord, PvlCursor, clean, decode};
use tracing::{debug, info};

use crate::writer::{NetworkOutputs, split_output, write_final_network};
use crate::{CoregConfig, Error, Result};

const CONTROL_POINT: [&str; 3] = ["Object", "=", "ControlPoint"];
const CONTROL_MEASURE: [&str; 3] = ["Group", "=", "ControlMeasure"];
const END_OBJECT: [&str; 1] = ["End_Object"];
const IGNORED: [&str; 3] = ["Ignore", "=", "True"];

/// Result of [filter_network].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Statistics rows flagged as outliers.
    pub flagged_rows: usize,
    /// Control points newly marked as ignored.
    pub ignored_points: usize,
    /// Files written, `None` when no row was flagged.
    pub outputs: Option<NetworkOutputs>,
}

/// Flag outliers in the statistics table `stats` and mark the control points
/// of `network` they belong to as ignored.
///
/// The result is written to `<output>.net` and `<output>.pvl`. Nothing is
/// written when no statistics row was flagged and the caller should keep
/// using `network`.
pub fn filter_network(
    network: &Path,
    stats: &Path,
    output: &Path,
    cfg: &CoregConfig,
    converter: &dyn NetworkConverter,
) -> Result<FilterOutcome> {
    let flagged = coreg_stats::filter_points(stats, &cfg.outliers)?;
    if flagged.is_empty() {
        info!("no outliers in {}, network left unchanged", stats.display());
        return Ok(FilterOutcome {
            flagged_rows: 0,
            ignored_points: 0,
            outputs: None,
        });
    }

    let (text, ignored_points) = mark_ignored_points(network, &flagged, cfg.matching.abs_tol)?;
    let (dir, name) = split_output(output)?;
    let outputs = write_final_network(&text, dir, &name, converter)?;
    info!(
        "{} of {} flagged rows matched control points, wrote {}",
        ignored_points,
        flagged.len(),
        outputs.pvl.display()
    );
    Ok(FilterOutcome {
        flagged_rows: flagged.len(),
        ignored_points,
        outputs: Some(outputs),
    })
}

/// Return the text of control network `path` with every point whose last
/// measure matches a flagged row marked as ignored, and the number of points
/// marked.
pub fn mark_ignored_points(
    path: &Path,
    flagged: &[FlaggedPoint],
    abs_tol: f64,
) -> Result<(String, usize)> {
    let mut cursor = PvlCursor::open(path).map_err(|e| Error::pvl(path, 0, e))?;
    mark_ignored(&mut cursor, flagged, abs_tol)
        .map_err(|e| Error::pvl(path, cursor.line_number(), e))
}

fn mark_ignored<R: BufRead>(
    cursor: &mut PvlCursor<R>,
    flagged: &[FlaggedPoint],
    abs_tol: f64,
) -> pvl_blocks::Result<(String, usize)> {
    let mut out = String::new();
    let mut n_marked = 0;
    loop {
        let head = cursor.read_until(&CONTROL_POINT)?;
        let found = head.is_terminated();
        head.emit_into(&mut out);
        if !found {
            break;
        }

        let mut point = cursor.read_block(&CONTROL_MEASURE)?;
        let attrs = clean(decode(&point.lines))?;
        if !attrs.contains_key("PointId") || attrs.contains_key("Ignore") {
            point.emit_into(&mut out);
            continue;
        }

        let measures = cursor.read_block(&END_OBJECT)?;
        // Later measures overwrite earlier ones, leaving the last measure.
        let last = MeasureRecord::from_dict(&clean(decode(&measures.lines))?);
        if crate::matching::point_in_measures(flagged, &last, abs_tol) {
            debug!(
                "ignoring point {} at line {}",
                attrs.get_text("PointId").unwrap_or_default(),
                cursor.line_number()
            );
            let line = ignore_line(&point);
            point.lines.insert(0, line);
            n_marked += 1;
        }
        point.emit_into(&mut out);
        measures.emit_into(&mut out);
    }
    Ok((out, n_marked))
}

/// `Ignore = True` indented like the first point attribute.
fn ignore_line(point: &Block) -> String {
    let first = point
        .lines
        .iter()
        .chain(point.terminator.iter())
        .find(|l| !l.trim().is_empty());
    let (indent, ending) = match first {
        Some(l) => {
            let indent = &l[..l.len() - l.trim_start().len()];
            let ending = if l.ends_with("\r\n") { "\r\n" } else { "\n" };
            (indent, ending)
        }
        None => ("    ", "\n"),
    };
    format!("{indent}Ignore = True{ending}")
}

/// Number of `Ignore = True` lines in control network `path`.
pub fn count_ignored(path: &Path) -> Result<usize> {
    let mut cursor = PvlCursor::open(path).map_err(|e| Error::pvl(path, 0, e))?;
    let mut n = 0;
    loop {
        let block = cursor
            .read_until(&IGNORED)
            .map_err(|e| Error::pvl(path, cursor.line_number(), e))?;
        if !block.is_terminated() {
            return Ok(n);
        }
        n += 1;
    }
}
