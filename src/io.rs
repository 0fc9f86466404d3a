//! Text series reader and safetensors writer.
//!
//! Reader: plain whitespace-delimited numeric text, one sample per line (or
//! several per row, flattened in row order).  `#` starts a comment.
//!
//! Writer: a minimal safetensors encoder used by the CLI to persist a
//! [`PreparedData`] batch.
use anyhow::{Context, Result};
use ndarray::{Array, Dimension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::PrepError;
use crate::PreparedData;

/// Read every number in `path`, in file order.
pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_series(&text, path)
}

fn parse_series(text: &str, path: &Path) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let body = match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        };
        for token in body.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| PrepError::Parse {
                path: path.to_path_buf(),
                line: lineno + 1,
                token: token.to_string(),
            })?;
            out.push(v);
        }
    }
    Ok(out)
}

// ── safetensors writer ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HeaderEntry<'a> {
    dtype: &'static str,
    shape: &'a [usize],
    data_offsets: [usize; 2],
}

struct Tensor {
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Batch file in safetensors layout: window arrays as row-major F64,
/// run counts as single-element I32.
///
/// ```rust,no_run
/// use cardprep::io::BatchFile;
/// use ndarray::Array3;
/// use std::path::Path;
/// let mut f = BatchFile::default();
/// f.add_array("train_x", &Array3::<f64>::zeros((4, 16, 1)));
/// f.add_count("n_subjects", 2).unwrap();
/// f.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct BatchFile {
    tensors: BTreeMap<String, Tensor>,
}

impl BatchFile {
    /// Store `arr` under `name`, replacing an earlier tensor of that name.
    pub fn add_array<D: Dimension>(&mut self, name: &str, arr: &Array<f64, D>) {
        let bytes = arr.iter().flat_map(|v| v.to_le_bytes()).collect();
        let tensor = Tensor { dtype: "F64", shape: arr.shape().to_vec(), bytes };
        self.tensors.insert(name.to_string(), tensor);
    }

    pub fn add_count(&mut self, name: &str, count: usize) -> Result<()> {
        let v = i32::try_from(count)
            .with_context(|| format!("{name} = {count} does not fit in I32"))?;
        let tensor = Tensor { dtype: "I32", shape: vec![1], bytes: v.to_le_bytes().to_vec() };
        self.tensors.insert(name.to_string(), tensor);
        Ok(())
    }

    /// Header JSON, space-padded to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut offset = 0;
        let mut entries = BTreeMap::new();
        for (name, t) in &self.tensors {
            let end = offset + t.bytes.len();
            entries.insert(name.as_str(), HeaderEntry {
                dtype: t.dtype,
                shape: &t.shape,
                data_offsets: [offset, end],
            });
            offset = end;
        }
        let mut hdr = serde_json::to_vec(&entries)?;
        hdr.resize(hdr.len().next_multiple_of(8), b' ');
        Ok(hdr)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let hdr = self.header()?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(&(hdr.len() as u64).to_le_bytes())?;
        out.write_all(&hdr)?;
        for t in self.tensors.values() {
            out.write_all(&t.bytes)?;
        }
        out.flush()
            .with_context(|| format!("writing {}", path.display()))
    }
}

/// Write a prepared batch to `path`.
///
/// Keys: `train_x`, `train_y`, `val_x`, `val_y` (`[W, L, C]`), the
/// `*_scale` vectors when a spectral transform ran, and the scalars
/// `n_subjects`, `series_len`, `windows_per_subject`.
pub fn write_prepared(data: &PreparedData, path: &Path) -> Result<()> {
    let mut f = BatchFile::default();
    for (prefix, set) in [("train", &data.train), ("val", &data.val)] {
        f.add_array(&format!("{prefix}_x"), &set.x);
        f.add_array(&format!("{prefix}_y"), &set.y);
        if let Some(s) = &set.x_scale {
            f.add_array(&format!("{prefix}_x_scale"), s);
        }
        if let Some(s) = &set.y_scale {
            f.add_array(&format!("{prefix}_y_scale"), s);
        }
    }
    f.add_count("n_subjects", data.n_subjects)?;
    f.add_count("series_len", data.series_len)?;
    f.add_count("windows_per_subject", data.windows_per_subject)?;
    f.write(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_sample_per_line() {
        let v = parse_series("1.5\n-2\n\n3e-1\n", Path::new("x.txt")).unwrap();
        assert_eq!(v, vec![1.5, -2.0, 0.3]);
    }

    #[test]
    fn rows_are_flattened_and_comments_skipped() {
        let v = parse_series("# header\n1 2\t3\n4 # trailing\n", Path::new("x.txt")).unwrap();
        assert_eq!(v, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn bad_token_reports_line() {
        let err = parse_series("1\n2\nabc\n", Path::new("x.txt")).unwrap_err();
        match err.downcast_ref::<PrepError>() {
            Some(PrepError::Parse { line, token, .. }) => {
                assert_eq!(*line, 3);
                assert_eq!(token, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn header_is_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.safetensors");
        let mut f = BatchFile::default();
        f.add_array("a", &ndarray::arr1(&[1.0, 2.0]));
        f.add_count("n", 7).unwrap();
        f.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
        assert_eq!(bytes.len(), 8 + n + 16 + 4);
        let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
        assert_eq!(header["a"]["dtype"], "F64");
        assert_eq!(header["n"]["data_offsets"][0], 16);
        assert_eq!(&bytes[8 + n + 16..], &7_i32.to_le_bytes());
    }

    #[test]
    fn window_batch_keeps_its_shape() {
        let mut f = BatchFile::default();
        f.add_array("x", &ndarray::Array3::<f64>::zeros((3, 5, 2)));
        let hdr = f.header().unwrap();
        let header: serde_json::Value = serde_json::from_slice(&hdr).unwrap();
        assert_eq!(header["x"]["shape"], serde_json::json!([3, 5, 2]));
        assert_eq!(header["x"]["data_offsets"][1], 3 * 5 * 2 * 8);
    }

    #[test]
    fn oversized_count_rejected() {
        let mut f = BatchFile::default();
        assert!(f.add_count("n_subjects", usize::MAX).is_err());
    }
}
