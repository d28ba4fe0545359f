//! Post-processing of co-registration control networks.
//!
//! After co-registering a moved image onto a match image, the control network
//! refers to measures in transformed images. This crate removes outlier
//! points found in the registration statistics ([filter_network]) and maps
//! every measure back to the pixel coordinates and serial number of its
//! original image ([translate_network]).

use std::path::PathBuf;

use coreg_stats::GoodnessOfFit;
use isis_tools::{GeometryService, NetworkConverter};
use tracing::{debug, info, warn};

mod config;
mod error;
mod filter;
pub mod matching;
mod translate;
mod writer;

pub use config::{
    ConfigError, CoregConfig, IsisParams, MatchParams, OutlierParams, TranslationParams, Valid,
};
pub use error::{Error, Result};
pub use filter::{FilterOutcome, count_ignored, filter_network, mark_ignored_points};
pub use translate::{TranslationInputs, TranslationOutcome, translate_measures, translate_network};
pub use writer::{NetworkOutputs, write_final_network};

/// Inputs and outputs of [postprocess].
#[derive(Debug, Clone)]
pub struct PostprocessJob {
    /// Text control network produced by co-registration.
    pub network: PathBuf,
    /// Registration statistics table of `network`.
    pub stats: PathBuf,
    pub images: TranslationInputs,
    /// Output location `<dir>/<name>`. The final network is written to
    /// `<name>.net` and `<name>.pvl`, the filtered one to
    /// `<name>.filtered.net` and `<name>.filtered.pvl`.
    pub output: PathBuf,
    /// Whether to ignore outlier points before translating.
    pub filter: bool,
    /// Pixel scale applied to the registration uncertainty.
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessReport {
    pub filter: Option<FilterOutcome>,
    pub translation: TranslationOutcome,
    pub goodness: GoodnessOfFit,
}

/// Filter, translate and summarize the result of one co-registration.
pub fn postprocess(
    job: &PostprocessJob,
    cfg: &Valid<CoregConfig>,
    geometry: &dyn GeometryService,
    converter: &dyn NetworkConverter,
) -> Result<PostprocessReport> {
    let cfg = cfg.valid();

    let mut network = job.network.clone();
    let filter = if job.filter {
        let mut filtered = job.output.clone().into_os_string();
        filtered.push(".filtered");
        let outcome = filter_network(
            &job.network,
            &job.stats,
            &PathBuf::from(filtered),
            cfg,
            converter,
        )?;
        if let Some(outputs) = &outcome.outputs {
            network = outputs.pvl.clone();
        }
        info!("{} points ignored", outcome.ignored_points);
        Some(outcome)
    } else {
        None
    };

    let translation = translate_network(
        &network,
        &job.images,
        &job.output,
        cfg,
        geometry,
        converter,
    )?;

    let goodness = coreg_stats::goodness_of_fit(&job.stats, job.scale)?;
    if let Some(mean) = goodness.mean_goodness {
        info!("mean goodness of fit {mean:.4}");
    }
    match goodness.uncertainty {
        Some((sample, line)) => info!(
            "uncertainty {sample:.4} x {line:.4} pixels over {} points",
            goodness.n_rows
        ),
        None => warn!("no usable rows in {} for uncertainty", job.stats.display()),
    }
    if let Some(((s_lo, s_hi), (l_lo, l_hi))) = goodness.difference_bounds {
        debug!("difference bounds: sample {s_lo:.4}..{s_hi:.4}, line {l_lo:.4}..{l_hi:.4}");
    }

    Ok(PostprocessReport {
        filter,
        translation,
        goodness,
    })
}
