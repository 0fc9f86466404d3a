/// Shared helpers for building synthetic corpora on disk.
use std::path::{Path, PathBuf};

pub const SUFFIX: &str = "sliceres";

pub fn write_series(path: &Path, values: &[f64]) {
    let text: String = values.iter().map(|v| format!("{v}\n")).collect();
    std::fs::write(path, text)
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}

#[allow(unused)]
pub fn target_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}_normpleth_{SUFFIX}.txt"))
}

/// Write the target (normpleth) and input (cardfromfmri) series of one subject.
#[allow(unused)]
pub fn write_subject(dir: &Path, stem: &str, input: &[f64], target: &[f64]) -> PathBuf {
    let t = target_path(dir, stem);
    write_series(&t, target);
    write_series(&dir.join(format!("{stem}_cardfromfmri_{SUFFIX}.txt")), input);
    t
}

/// Write both bad-point masks of one subject.
#[allow(unused)]
pub fn write_masks(dir: &Path, stem: &str, pleth_bad: &[f64], input_bad: &[f64]) {
    write_series(&dir.join(format!("{stem}_pleth_{SUFFIX}_badpts.txt")), pleth_bad);
    write_series(&dir.join(format!("{stem}_cardfromfmri_{SUFFIX}_badpts.txt")), input_bad);
}

/// Smooth test waveform; its MAD-normalised peak stays near 1.
#[allow(unused)]
pub fn wave(len: usize, freq: f64, phase: f64) -> Vec<f64> {
    (0..len).map(|t| 3.0 * (freq * t as f64 + phase).sin() + 10.0).collect()
}

/// Write `n` well-behaved subjects `sub00..` of length `len`.
#[allow(unused)]
pub fn write_corpus(dir: &Path, n: usize, len: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|j| {
            let stem = format!("sub{j:02}");
            let input = wave(len, 0.21 + 0.01 * j as f64, j as f64);
            let target = wave(len, 0.13 + 0.02 * j as f64, 0.5 * j as f64);
            write_subject(dir, &stem, &input, &target)
        })
        .collect()
}
