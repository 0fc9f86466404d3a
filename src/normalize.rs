//! Per-subject robust normalisation and the amplitude gate.
//!
//! `robust_scale_columns_inplace`:
//!   for each column: col -= mean(col); col /= MAD(col)   (skipped if MAD = 0)
//!
//! MAD is the normal-consistent median absolute deviation,
//! `median(|v - median(v)|) / Φ⁻¹(3/4)`.
//!
//! `exclude_outliers`: drop every subject whose normalised input peak
//! `max |x|` is not below the threshold.
use anyhow::Result;
use log::{info, warn};
use ndarray::{s, Array2, ArrayView1, Axis};
use std::path::PathBuf;

use crate::error::PrepError;
use crate::load::Corpus;

/// Φ⁻¹(3/4): scales the raw MAD to a standard-deviation estimate.
pub const MAD_NORMAL_SCALE: f64 = 0.674_489_750_196_081_7;

/// Normalised, subject-filtered matrices, `[n_pts, n_subjects]`.
#[derive(Debug, Clone)]
pub struct SubjectMatrices {
    pub input: Array2<f64>,
    pub target: Array2<f64>,
    pub bad: Option<Array2<f64>>,
    pub names: Vec<PathBuf>,
}

impl SubjectMatrices {
    pub fn n_pts(&self) -> usize {
        self.input.nrows()
    }

    pub fn n_subjects(&self) -> usize {
        self.input.ncols()
    }
}

/// Subjects whose MAD was zero, counted before exclusion.  These are only
/// centred, never scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroMad {
    pub input: usize,
    pub target: usize,
}

/// Median; the mean of the two middle values for even n.
/// Returns `NaN` for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

pub fn mad(col: ArrayView1<f64>) -> f64 {
    let mut v: Vec<f64> = col.to_vec();
    let med = median(&mut v);
    let mut dev: Vec<f64> = v.iter().map(|&x| (x - med).abs()).collect();
    median(&mut dev) / MAD_NORMAL_SCALE
}

/// Centre every column on its mean, then divide by its MAD.
/// Returns the MAD of each column; zero-MAD columns are only centred.
pub fn robust_scale_columns_inplace(data: &mut Array2<f64>) -> Vec<f64> {
    let mut mads = Vec::with_capacity(data.ncols());
    for mut col in data.columns_mut() {
        let m = col.mean().unwrap_or(0.0);
        col.mapv_inplace(|v| v - m);
        let d = mad(col.view());
        if d > 0.0 {
            col.mapv_inplace(|v| v / d);
        }
        mads.push(d);
    }
    mads
}

/// Peak absolute value of each column.  A NaN anywhere yields a NaN peak.
pub fn column_peaks(data: &Array2<f64>) -> Vec<f64> {
    data.columns()
        .into_iter()
        .map(|c| {
            c.iter().fold(0.0_f64, |acc, &v| {
                if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.max(v.abs()) }
            })
        })
        .collect()
}

/// Keep the subjects whose input peak is strictly below `thresh`,
/// preserving their relative order.
pub fn exclude_outliers(m: SubjectMatrices, thresh: f64) -> SubjectMatrices {
    let keep: Vec<usize> = column_peaks(&m.input)
        .into_iter()
        .enumerate()
        .filter(|&(_, peak)| peak < thresh)
        .map(|(j, _)| j)
        .collect();
    info!("subjects kept after exclusion: {keep:?}");

    SubjectMatrices {
        input: m.input.select(Axis(1), &keep),
        target: m.target.select(Axis(1), &keep),
        bad: m.bad.map(|b| b.select(Axis(1), &keep)),
        names: keep.iter().map(|&j| m.names[j].clone()).collect(),
    }
}

/// Trim, normalise and gate a loaded corpus.
///
/// Rows `[start_skip, tclen - end_skip)` are kept.  Target then input are
/// robust-scaled per subject, and subjects whose input peak reaches
/// `exclude_thresh` are dropped.  Zero-MAD subjects are counted, not dropped.
pub fn normalize_corpus(
    corpus: Corpus,
    start_skip: usize,
    end_skip: usize,
    exclude_thresh: f64,
    debug: bool,
) -> Result<(SubjectMatrices, ZeroMad)> {
    let tclen = corpus.tclen;
    let last = match start_skip.checked_add(end_skip) {
        Some(skip) if skip <= tclen => tclen - end_skip,
        _ => {
            return Err(PrepError::InvalidConfig(format!(
                "start_skip {start_skip} + end_skip {end_skip} exceeds series length {tclen}"
            ))
            .into())
        }
    };
    let first = start_skip;
    let mut input = corpus.input.slice(s![first..last, ..]).to_owned();
    let mut target = corpus.target.slice(s![first..last, ..]).to_owned();
    let bad = corpus.bad.map(|b| b.slice(s![first..last, ..]).to_owned());
    info!("normalizing {} subjects, input {:?}, target {:?}", input.ncols(), input.dim(), target.dim());

    if debug {
        log_stats("prenorm", &input, &target);
    }
    let zero = |mads: Vec<f64>| mads.into_iter().filter(|&d| d == 0.0).count();
    let zero_mad = ZeroMad {
        target: zero(robust_scale_columns_inplace(&mut target)),
        input: zero(robust_scale_columns_inplace(&mut input)),
    };
    if zero_mad != ZeroMad::default() {
        warn!(
            "zero MAD (centred only): {} input, {} target subjects",
            zero_mad.input, zero_mad.target
        );
    }
    if debug {
        log_stats("postnorm", &input, &target);
    }

    let gated = exclude_outliers(
        SubjectMatrices { input, target, bad, names: corpus.names },
        exclude_thresh,
    );
    info!("after filtering, input shape is {:?}", gated.input.dim());
    if gated.n_subjects() == 0 {
        return Err(PrepError::NoUsableSubjects { stage: "amplitude exclusion" }.into());
    }
    Ok((gated, zero_mad))
}

/// Summary of one column, logged in debug runs.
#[derive(Debug, Clone, Copy)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub mad: f64,
}

pub fn column_stats(col: ArrayView1<f64>) -> ColumnStats {
    let n = col.len().max(1) as f64;
    let mean = col.sum() / n;
    let var = col.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
    ColumnStats {
        min: col.iter().copied().fold(f64::INFINITY, f64::min),
        max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std: var.sqrt(),
        mad: mad(col),
    }
}

fn log_stats(label: &str, input: &Array2<f64>, target: &Array2<f64>) {
    for j in 0..input.ncols() {
        let x = column_stats(input.column(j));
        let y = column_stats(target.column(j));
        info!(
            "{label} sub {j} min, max, mean, std, MAD x: {:.4} {:.4} {:.4} {:.4} {:.4}  y: {:.4} {:.4} {:.4} {:.4} {:.4}",
            x.min, x.max, x.mean, x.std, x.mad, y.min, y.max, y.mean, y.std, y.mad
        );
    }
}
