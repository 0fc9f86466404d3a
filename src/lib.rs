//! # cardprep — windowed training sets from paired physiological recordings
//!
//! `cardprep` turns a directory of paired recordings (a cardiac waveform
//! estimated from fMRI and a normalised plethysmogram) into fixed-length,
//! normalised windows ready for a sequence model.
//!
//! ## Pipeline overview
//!
//! ```text
//! <dir>/*normpleth_<suffix>.txt
//!   │
//!   ├─ discover::discover()            companion / bad-point files present, sorted
//!   ├─ load::load_corpus()             common length tclen from the first subject
//!   ├─ normalize::normalize_corpus()   trim, centre, ÷ MAD, drop peak ≥ threshold
//!   ├─ window::build_windows()         [step·i, step·i + window_size + lag) per subject
//!   ├─ spectral::SpectralCodec         optional (magnitude, phase) encoding
//!   └─ split::split_train_val()        first 80 % train, rest validation
//!        │
//!        └─→ PreparedData { train, val, n_subjects, series_len, windows_per_subject }
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use cardprep::{prep, PrepConfig};
//!
//! let cfg = PrepConfig {
//!     window_size: 64,
//!     data_dir: "/data/physio".into(),
//!     ..PrepConfig::default()
//! };
//! let data = prep(&cfg).unwrap();
//! println!("train {:?}  val {:?}", data.train.x.dim(), data.val.x.dim());
//! ```
//!
//! Each stage is also usable on its own; see the module docs.

pub mod config;
pub mod discover;
pub mod error;
pub mod io;
pub mod load;
pub mod normalize;
pub mod spectral;
pub mod split;
pub mod window;

use anyhow::Result;
use log::info;
use std::path::PathBuf;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{BadPoints, MagnitudeScaling, PrepConfig, SpectralLayout, SpectralMode, Transform};

// error
pub use error::PrepError;

// discover
pub use discover::{discover, companion_path, bad_points_path};

// load
pub use load::{combine_bad_points, load_corpus, Corpus};

// normalize
pub use normalize::{exclude_outliers, mad, normalize_corpus, robust_scale_columns_inplace, SubjectMatrices, ZeroMad};

// window
pub use window::{build_windows, window_channels, windows_per_subject, WindowBatch};

// spectral
pub use spectral::SpectralCodec;

// split
pub use split::{split_train_val, train_limit, WindowSet};

/// How many subjects survived each gate of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepReport {
    /// Files matching the naming pattern.
    pub candidates: usize,
    /// Candidates whose companion files all exist.
    pub files_present: usize,
    /// Candidates read from disk (`read_lim` applied).
    pub files_read: usize,
    /// Subjects at least `tclen` samples long.
    pub length_ok: usize,
    /// Subjects after `count_lim`.
    pub after_count_lim: usize,
    /// Subjects below the amplitude threshold.
    pub after_exclusion: usize,
    /// Subjects whose input had zero MAD and was only centred.
    pub zero_mad_input: usize,
    /// Subjects whose target had zero MAD and was only centred.
    pub zero_mad_target: usize,
}

/// Output of [`prep`].
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train: WindowSet,
    pub val: WindowSet,
    /// Subjects that made it into the batch.
    pub n_subjects: usize,
    /// Per-subject samples after `start_skip` / `end_skip`.
    pub series_len: usize,
    pub windows_per_subject: usize,
    /// Target file of each subject, in batch order.
    pub names: Vec<PathBuf>,
    pub report: PrepReport,
}

/// Run the **full preparation pipeline** described by `cfg`.
///
/// # Pipeline steps
///
/// 1. Discover `*normpleth_<suffix>.txt` in [`PrepConfig::data_dir`] whose
///    companion (and, with [`BadPoints::Attach`], mask) files exist.
/// 2. Load up to [`PrepConfig::read_lim`] subjects, truncated to the length
///    of the first one; cap at [`PrepConfig::count_lim`].
/// 3. Drop [`PrepConfig::start_skip`] / [`PrepConfig::end_skip`] samples,
///    centre and MAD-scale each subject, exclude amplitude outliers.
/// 4. Cut strided, lagged windows (subject-major).
/// 5. Optionally encode every window spectrally.
/// 6. Split the first 80 % into training, the rest into validation.
///
/// # Errors
///
/// * [`PrepError::InvalidConfig`] for a configuration that cannot run.
/// * [`PrepError::EmptyCorpus`] when no subject has all its files.
/// * [`PrepError::NoUsableSubjects`] when a gate removes every subject.
/// * [`PrepError::WindowTooLong`] when windows do not fit the series.
/// * I/O and parse errors from any subject file abort the whole run.
pub fn prep(cfg: &PrepConfig) -> Result<PreparedData> {
    cfg.validate()?;
    let mut report = PrepReport::default();

    let candidates = discover::list_candidates(&cfg.data_dir, &cfg.suffix)?;
    report.candidates = candidates.len();
    let files = discover::filter_complete(candidates, cfg.bad_points);
    report.files_present = files.len();
    if files.is_empty() {
        return Err(PrepError::EmptyCorpus {
            dir: cfg.data_dir.clone(),
            suffix: cfg.suffix.clone(),
        }
        .into());
    }

    let corpus = load::load_corpus(&files, cfg.read_lim, cfg.count_lim, cfg.bad_points)?;
    report.files_read = corpus.files_read;
    report.length_ok = corpus.length_ok;
    report.after_count_lim = corpus.n_subjects();

    let (subjects, zero_mad) = normalize::normalize_corpus(
        corpus,
        cfg.start_skip,
        cfg.end_skip,
        cfg.exclude_thresh,
        cfg.debug,
    )?;
    report.after_exclusion = subjects.n_subjects();
    report.zero_mad_input = zero_mad.input;
    report.zero_mad_target = zero_mad.target;
    let series_len = subjects.n_pts();

    let bad_points = match cfg.transform {
        Transform::None => cfg.bad_points,
        Transform::Spectral(_) => BadPoints::Ignore,
    };
    let mut batch = window::build_windows(&subjects, cfg.window_size, cfg.lag, cfg.step, bad_points)?;

    if let Transform::Spectral(mode) = cfg.transform {
        let codec = SpectralCodec::new(mode, cfg.window_len());
        let (x, x_scale) = codec.encode_batch(&batch.x)?;
        let (y, y_scale) = codec.encode_batch(&batch.y)?;
        info!("spectral batch: x {:?}, y {:?}", x.dim(), y.dim());
        batch = WindowBatch {
            x,
            y,
            x_scale: Some(x_scale),
            y_scale: Some(y_scale),
            windows_per_subject: batch.windows_per_subject,
        };
    }

    let windows_per_subject = batch.windows_per_subject;
    let (train, val) = split::split_train_val(batch);
    info!(
        "train x {:?} y {:?}, val x {:?} y {:?}",
        train.x.dim(),
        train.y.dim(),
        val.x.dim(),
        val.y.dim()
    );

    Ok(PreparedData {
        train,
        val,
        n_subjects: subjects.n_subjects(),
        series_len,
        windows_per_subject,
        names: subjects.names,
        report,
    })
}
