use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use tracing::info;

use cnet_coreg::{CoregConfig, PostprocessJob, TranslationInputs, Valid};
use isis_tools::{IsisBin, IsisCampt, IsisCnetConverter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Configuration TOML file. Built-in defaults are used if not given.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write log messages to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct ImageArgs {
    /// Directory with the transformed images named by measure serial numbers
    #[arg(long)]
    image_dir: PathBuf,

    /// Original image of the moved (non-reference) measures
    #[arg(long)]
    source_image: PathBuf,

    /// Image of the reference measures
    #[arg(long)]
    match_image: PathBuf,
}

impl From<ImageArgs> for TranslationInputs {
    fn from(args: ImageArgs) -> Self {
        Self {
            image_dir: args.image_dir,
            source_image: args.source_image,
            match_image: args.match_image,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mark control points of outlier measures as ignored.
    Filter {
        /// Control network in PVL form
        #[arg(long)]
        network: PathBuf,

        /// Registration statistics CSV table. Its `Filtered` column is
        /// updated in place.
        #[arg(long)]
        stats: PathBuf,

        /// Output location, `.net` and `.pvl` are appended
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Move measures to the pixel coordinates of their original images.
    Translate {
        /// Control network in PVL form
        #[arg(long)]
        network: PathBuf,

        #[command(flatten)]
        images: ImageArgs,

        /// Output location, `.net` and `.pvl` are appended
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Filter, translate and summarize the result of one co-registration.
    Run {
        /// Control network in PVL form
        #[arg(long)]
        network: PathBuf,

        /// Registration statistics CSV table
        #[arg(long)]
        stats: PathBuf,

        #[command(flatten)]
        images: ImageArgs,

        /// Output location, `.net` and `.pvl` are appended
        #[arg(long, short)]
        output: PathBuf,

        /// Keep outlier points
        #[arg(long)]
        no_filter: bool,

        /// Reduction factor the registered images were produced with
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },

    /// Count `Ignore = True` entries of a control network.
    CountIgnored {
        /// Control network in PVL form
        network: PathBuf,
    },

    /// Print an example configuration TOML.
    PrintExampleConfig,
}

fn load_config(path: Option<&Path>) -> Result<Valid<CoregConfig>> {
    match path {
        Some(path) => CoregConfig::from_toml_path(path)
            .wrap_err_with(|| format!("loading configuration \"{}\"", path.display())),
        None => Ok(CoregConfig::default().validate()?),
    }
}

fn isis(cfg: &CoregConfig) -> (IsisCampt, IsisCnetConverter) {
    let bin = IsisBin::new(cfg.isis.bin_dir.clone());
    (
        IsisCampt::new(bin.clone(), std::env::temp_dir()),
        IsisCnetConverter::new(bin),
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::PrintExampleConfig = &cli.command {
        print!("{}", toml::to_string_pretty(&CoregConfig::default())?);
        return Ok(());
    }

    env_tracing_logger::initiate_logging(&env_tracing_logger::LogOptions {
        log_file: cli.log_file.clone(),
        ..Default::default()
    })?;

    let cfg = load_config(cli.config.as_deref())?;
    let (campt, converter) = isis(cfg.valid());

    match cli.command {
        Commands::Filter {
            network,
            stats,
            output,
        } => {
            let outcome =
                cnet_coreg::filter_network(&network, &stats, &output, cfg.valid(), &converter)
                    .wrap_err_with(|| format!("filtering \"{}\"", network.display()))?;
            match outcome.outputs {
                Some(outputs) => info!(
                    "{} of {} outlier rows ignored, wrote \"{}\"",
                    outcome.ignored_points,
                    outcome.flagged_rows,
                    outputs.pvl.display()
                ),
                None => info!("no outliers, nothing written"),
            }
        }
        Commands::Translate {
            network,
            images,
            output,
        } => {
            let outcome = cnet_coreg::translate_network(
                &network,
                &images.into(),
                &output,
                cfg.valid(),
                &campt,
                &converter,
            )
            .wrap_err_with(|| format!("translating \"{}\"", network.display()))?;
            info!(
                "{} measures translated, wrote \"{}\"",
                outcome.translated_measures,
                outcome.outputs.pvl.display()
            );
        }
        Commands::Run {
            network,
            stats,
            images,
            output,
            no_filter,
            scale,
        } => {
            let job = PostprocessJob {
                network,
                stats,
                images: images.into(),
                output,
                filter: !no_filter,
                scale,
            };
            let report = cnet_coreg::postprocess(&job, &cfg, &campt, &converter)
                .wrap_err_with(|| format!("post-processing \"{}\"", job.network.display()))?;
            println!("{}", report.translation.outputs.pvl.display());
            if let Some((sample, line)) = report.goodness.uncertainty {
                println!("uncertainty: {sample} {line}");
            }
            if let Some(mean) = report.goodness.mean_goodness {
                println!("goodness of fit: {mean}");
            }
        }
        Commands::CountIgnored { network } => {
            let n = cnet_coreg::count_ignored(&network)
                .wrap_err_with(|| format!("reading \"{}\"", network.display()))?;
            println!("{n}");
        }
        Commands::PrintExampleConfig => {}
    }
    Ok(())
}
