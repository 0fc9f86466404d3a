//! Fatal conditions of a preparation run.
//!
//! Public functions return `anyhow::Result`; these variants are what ends up
//! inside it, so callers can `downcast_ref::<PrepError>()` to tell a bad
//! configuration from an I/O failure.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error(
        "no subjects in {} matching *normpleth_{suffix}.txt have all required companion files",
        .dir.display()
    )]
    EmptyCorpus { dir: PathBuf, suffix: String },

    #[error("no subjects left after {stage}")]
    NoUsableSubjects { stage: &'static str },

    #[error(
        "window of {window_size} + lag {lag} at step {step} does not fit in {n_pts} samples per subject"
    )]
    WindowTooLong {
        window_size: usize,
        lag: usize,
        step: usize,
        n_pts: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("bad-point mask {} has {len} samples, need {tclen}", .path.display())]
    ShortMask { path: PathBuf, len: usize, tclen: usize },

    #[error("{}:{line}: cannot parse {token:?} as a number", .path.display())]
    Parse { path: PathBuf, line: usize, token: String },
}
