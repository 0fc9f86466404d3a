//! Corpus discovery.
//!
//! Subjects are found by file name alone:
//!
//! ```text
//! <stem>normpleth_<suffix>.txt              target series (discovered)
//! <stem>cardfromfmri_<suffix>.txt           input series  (companion)
//! <stem>pleth_<suffix>_badpts.txt           bad-point mask of the raw pleth
//! <stem>cardfromfmri_<suffix>_badpts.txt    bad-point mask of the input
//! ```
//!
//! A candidate survives only if every file its mode needs exists.
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::config::BadPoints;
use crate::error::PrepError;

const TARGET_TAG: &str = "normpleth";
const INPUT_TAG: &str = "cardfromfmri";
const PLETH_TAG: &str = "pleth";

/// `…normpleth…` → `…cardfromfmri…`.
pub fn companion_path(target: &Path) -> PathBuf {
    replace_in_file_name(target, TARGET_TAG, INPUT_TAG)
}

/// `….txt` → `…_badpts.txt`.
pub fn bad_points_path(series: &Path) -> PathBuf {
    replace_in_file_name(series, ".txt", "_badpts.txt")
}

/// Mask of the untransformed plethysmogram: `…normpleth….txt` → `…pleth…_badpts.txt`.
pub fn pleth_bad_points_path(target: &Path) -> PathBuf {
    bad_points_path(&replace_in_file_name(target, TARGET_TAG, PLETH_TAG))
}

/// Mask of the companion input series.
pub fn companion_bad_points_path(target: &Path) -> PathBuf {
    bad_points_path(&companion_path(target))
}

fn replace_in_file_name(path: &Path, from: &str, to: &str) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => path.with_file_name(name.replace(from, to)),
        None => path.to_path_buf(),
    }
}

/// Find `*normpleth_<suffix>.txt` in `dir` whose companion files exist.
///
/// The result is sorted by path.  An empty result is a
/// [`PrepError::EmptyCorpus`] error, never an empty `Vec`.
pub fn discover(dir: &Path, suffix: &str, bad_points: BadPoints) -> Result<Vec<PathBuf>> {
    let candidates = list_candidates(dir, suffix)?;
    let clean = filter_complete(candidates, bad_points);
    if clean.is_empty() {
        return Err(PrepError::EmptyCorpus {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        }
        .into());
    }
    Ok(clean)
}

/// Every `*normpleth_<suffix>.txt` in `dir`, sorted, companions unchecked.
pub fn list_candidates(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let pattern_tail = format!("{TARGET_TAG}_{suffix}.txt");
    info!("searching {} for *{pattern_tail}", dir.display());

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&pattern_tail))
        })
        .collect();
    candidates.sort();
    info!("{} candidate files", candidates.len());
    Ok(candidates)
}

/// Keep the candidates whose companion files all exist, in order.
pub fn filter_complete(candidates: Vec<PathBuf>, bad_points: BadPoints) -> Vec<PathBuf> {
    let clean: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|p| has_companions(p, bad_points))
        .collect();
    for p in &clean {
        debug!("  {}", p.display());
    }
    match bad_points {
        BadPoints::Attach => info!("{} runs pass all 4 files present check", clean.len()),
        BadPoints::Ignore => info!("{} runs pass both files present check", clean.len()),
    }
    clean
}

fn has_companions(target: &Path, bad_points: BadPoints) -> bool {
    if !companion_path(target).is_file() {
        return false;
    }
    match bad_points {
        BadPoints::Ignore => true,
        BadPoints::Attach => {
            pleth_bad_points_path(target).is_file() && companion_bad_points_path(target).is_file()
        }
    }
}
