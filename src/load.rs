//! Series loading.
//!
//! The usable length `tclen` is probed once, from the *first* candidate
//! (`min(len(target), len(input))`), and then imposed on every subject:
//! longer subjects are truncated, shorter ones are dropped.  It is not
//! adapted per subject.
use anyhow::Result;
use log::{debug, info};
use ndarray::{s, Array2, ArrayView1};
use std::path::{Path, PathBuf};

use crate::config::BadPoints;
use crate::discover::{companion_bad_points_path, companion_path, pleth_bad_points_path};
use crate::error::PrepError;
use crate::io::read_series;

/// Subject-indexed series, `[tclen, n_subjects]`, one column per subject.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// Card-from-fMRI series.
    pub input: Array2<f64>,
    /// Normalised plethysmogram series.
    pub target: Array2<f64>,
    /// Combined bad-point mask, present with [`BadPoints::Attach`].
    pub bad: Option<Array2<f64>>,
    /// Target file of each kept subject, in column order.
    pub names: Vec<PathBuf>,
    pub tclen: usize,
    /// Candidates actually read (after `read_lim`).
    pub files_read: usize,
    /// Subjects that passed the length check (before `count_lim`).
    pub length_ok: usize,
}

impl Corpus {
    pub fn n_subjects(&self) -> usize {
        self.names.len()
    }
}

/// A sample is bad if either source flags it: `1 - (1 - a)(1 - b)`.
pub fn combine_bad_points(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(&a, &b)| 1.0 - (1.0 - a) * (1.0 - b)).collect()
}

/// Read up to `read_lim` candidates into dense column matrices.
///
/// Subjects shorter than `tclen` are skipped without error.  `count_lim`
/// then caps the number of kept subjects, discarding the excess.
pub fn load_corpus(
    files: &[PathBuf],
    read_lim: Option<usize>,
    count_lim: Option<usize>,
    bad_points: BadPoints,
) -> Result<Corpus> {
    let first = files
        .first()
        .ok_or(PrepError::NoUsableSubjects { stage: "discovery" })?;
    let tclen = {
        let target = read_series(first)?;
        let input = read_series(&companion_path(first))?;
        target.len().min(input.len())
    };
    info!("tclen set to {tclen}");

    let n_read = read_lim.map_or(files.len(), |lim| lim.min(files.len()));
    let mut input = Array2::<f64>::zeros((tclen, n_read));
    let mut target = Array2::<f64>::zeros((tclen, n_read));
    let mut bad = match bad_points {
        BadPoints::Attach => Some(Array2::<f64>::zeros((tclen, n_read))),
        BadPoints::Ignore => None,
    };
    let mut names = Vec::with_capacity(n_read);

    for path in &files[..n_read] {
        debug!("processing {}", path.display());
        let y = read_series(path)?;
        let x = read_series(&companion_path(path))?;
        if x.len() < tclen || y.len() < tclen {
            debug!("  skipped: {} / {} samples < {tclen}", x.len(), y.len());
            continue;
        }
        let col = names.len();
        input.column_mut(col).assign(&ArrayView1::from(&x[..tclen]));
        target.column_mut(col).assign(&ArrayView1::from(&y[..tclen]));
        if let Some(bad) = bad.as_mut() {
            let combined = read_combined_mask(path, tclen)?;
            bad.column_mut(col).assign(&ArrayView1::from(&combined));
        }
        names.push(path.clone());
    }
    let length_ok = names.len();
    info!("{length_ok} runs pass file length check");

    let kept = count_lim.map_or(length_ok, |lim| lim.min(length_ok));
    names.truncate(kept);
    if kept == 0 {
        return Err(PrepError::NoUsableSubjects { stage: "the file length check" }.into());
    }

    Ok(Corpus {
        input: input.slice(s![.., ..kept]).to_owned(),
        target: target.slice(s![.., ..kept]).to_owned(),
        bad: bad.map(|b| b.slice(s![.., ..kept]).to_owned()),
        names,
        tclen,
        files_read: n_read,
        length_ok,
    })
}

fn read_combined_mask(target: &Path, tclen: usize) -> Result<Vec<f64>> {
    let pleth_path = pleth_bad_points_path(target);
    let input_path = companion_bad_points_path(target);
    let pleth = read_mask(&pleth_path, tclen)?;
    let input = read_mask(&input_path, tclen)?;
    Ok(combine_bad_points(&pleth[..tclen], &input[..tclen]))
}

fn read_mask(path: &Path, tclen: usize) -> Result<Vec<f64>> {
    let mask = read_series(path)?;
    if mask.len() < tclen {
        return Err(PrepError::ShortMask {
            path: path.to_path_buf(),
            len: mask.len(),
            tclen,
        }
        .into());
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_combination_is_logical_or() {
        let combined = combine_bad_points(&[0.0, 1.0, 0.0, 1.0], &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(combined, vec![0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_file_list_is_fatal() {
        let err = load_corpus(&[], None, None, BadPoints::Ignore).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::NoUsableSubjects { .. })
        ));
    }
}
