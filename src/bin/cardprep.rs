use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use cardprep::{
    io::write_prepared, prep, BadPoints, MagnitudeScaling, PrepConfig, SpectralLayout,
    SpectralMode, Transform,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Spectral {
    Off,
    Log,
    Linear,
    HybridLog,
    HybridLinear,
}

#[derive(Parser, Debug)]
#[command(name = "cardprep", about = "Window paired cardfromfmri / normpleth series for training")]
struct Args {
    /// Directory holding *normpleth_<suffix>.txt and companion files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output safetensors path
    #[arg(long)]
    output: PathBuf,

    /// JSON configuration; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration next to the output
    #[arg(long)]
    save_config: bool,

    /// Samples per window (before lag)
    #[arg(long)]
    window_size: Option<usize>,

    /// Offset between window starts
    #[arg(long)]
    step: Option<usize>,

    /// Extra trailing samples per window
    #[arg(long)]
    lag: Option<usize>,

    /// Drop subjects whose normalised input peak reaches this value
    #[arg(long)]
    exclude_thresh: Option<f64>,

    /// Require bad-point masks and attach them as input channel 1
    #[arg(long)]
    use_bad_pts: bool,

    /// Leading samples to discard
    #[arg(long)]
    start_skip: Option<usize>,

    /// Trailing samples to discard
    #[arg(long)]
    end_skip: Option<usize>,

    /// File suffix: *normpleth_<suffix>.txt
    #[arg(long)]
    suffix: Option<String>,

    /// Spectral encoding of each window
    #[arg(long, value_enum)]
    spectral: Option<Spectral>,

    /// Maximum candidates to read
    #[arg(long)]
    read_lim: Option<usize>,

    /// Maximum subjects to keep
    #[arg(long)]
    count_lim: Option<usize>,

    /// Log per-subject statistics around normalisation
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> Result<(PrepConfig, PathBuf, bool)> {
        let mut cfg = match &self.config {
            Some(path) => PrepConfig::load_json(path)?,
            None => PrepConfig::default(),
        };
        if let Some(v) = self.data_dir { cfg.data_dir = v; }
        if let Some(v) = self.window_size { cfg.window_size = v; }
        if let Some(v) = self.step { cfg.step = v; }
        if let Some(v) = self.lag { cfg.lag = v; }
        if let Some(v) = self.exclude_thresh { cfg.exclude_thresh = v; }
        if let Some(v) = self.start_skip { cfg.start_skip = v; }
        if let Some(v) = self.end_skip { cfg.end_skip = v; }
        if let Some(v) = self.suffix { cfg.suffix = v; }
        if self.read_lim.is_some() { cfg.read_lim = self.read_lim; }
        if self.count_lim.is_some() { cfg.count_lim = self.count_lim; }
        if self.use_bad_pts { cfg.bad_points = BadPoints::Attach; }
        if self.debug { cfg.debug = true; }
        if let Some(s) = self.spectral {
            let log = MagnitudeScaling::default();
            let mode = |scaling, layout| Transform::Spectral(SpectralMode { scaling, layout });
            cfg.transform = match s {
                Spectral::Off => Transform::None,
                Spectral::Log => mode(log, SpectralLayout::MagnitudePhase),
                Spectral::Linear => mode(MagnitudeScaling::Linear, SpectralLayout::MagnitudePhase),
                Spectral::HybridLog => mode(log, SpectralLayout::Hybrid),
                Spectral::HybridLinear => mode(MagnitudeScaling::Linear, SpectralLayout::Hybrid),
            };
        }
        Ok((cfg, self.output, self.save_config))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (cfg, output, save_config) = Args::parse().into_config()?;
    cfg.validate()?;

    let data = prep(&cfg)?;
    let r = &data.report;
    info!(
        "subjects: {} candidates → {} complete → {} read → {} long enough → {} after count_lim → {} after exclusion",
        r.candidates, r.files_present, r.files_read, r.length_ok, r.after_count_lim, r.after_exclusion
    );
    if r.zero_mad_input + r.zero_mad_target > 0 {
        warn!(
            "zero MAD, centred only: {} input / {} target subjects",
            r.zero_mad_input, r.zero_mad_target
        );
    }
    info!(
        "{} subjects × {} windows ({} samples each), train {} / val {}",
        data.n_subjects,
        data.windows_per_subject,
        data.series_len,
        data.train.len(),
        data.val.len()
    );

    write_prepared(&data, &output)?;
    info!("written → {}", output.display());

    if save_config {
        let cfg_path = output.with_extension("json");
        cfg.save_json(&cfg_path)?;
        info!("config → {}", cfg_path.display());
    }
    Ok(())
}
