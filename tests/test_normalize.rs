use cardprep::{mad, normalize_corpus, Corpus, PrepError, ZeroMad};
use ndarray::{Array2, Axis};
use std::path::PathBuf;

fn corpus(input: Array2<f64>, target: Array2<f64>) -> Corpus {
    let n = input.ncols();
    Corpus {
        tclen: input.nrows(),
        names: (0..n).map(|j| PathBuf::from(format!("sub{j}"))).collect(),
        bad: None,
        files_read: n,
        length_ok: n,
        input,
        target,
    }
}

fn smooth(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(t, j)| {
        (t as f64 * (0.1 + 0.03 * j as f64)).sin() * 5.0 + j as f64 * 100.0
    })
}

#[test]
fn target_columns_have_zero_mean() {
    let c = corpus(smooth(400, 4), smooth(400, 4) * 2.0 + 7.0);
    let (m, _) = normalize_corpus(c, 50, 0, 4.0, false).unwrap();
    assert_eq!(m.n_pts(), 350);
    let means = m.target.mean_axis(Axis(0)).unwrap();
    for &v in means.iter() {
        approx::assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }
    for col in m.input.columns() {
        approx::assert_abs_diff_eq!(mad(col), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn spiky_subject_excluded_in_order() {
    let mut input = smooth(300, 4);
    input[[150, 2]] += 500.0;
    let target = smooth(300, 4);
    let (m, _) = normalize_corpus(corpus(input, target), 0, 0, 4.0, false).unwrap();

    assert_eq!(
        m.names,
        vec![PathBuf::from("sub0"), PathBuf::from("sub1"), PathBuf::from("sub3")]
    );
    assert_eq!(m.input.ncols(), 3);
    assert_eq!(m.target.ncols(), 3);
}

#[test]
fn skips_trim_both_ends() {
    let c = corpus(smooth(100, 1), smooth(100, 1));
    let (m, _) = normalize_corpus(c, 10, 15, 4.0, true).unwrap();
    assert_eq!(m.n_pts(), 75);
}

#[test]
fn excluding_everyone_is_fatal() {
    let c = corpus(smooth(100, 2), smooth(100, 2));
    let err = normalize_corpus(c, 0, 0, 0.5, false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::NoUsableSubjects { .. })
    ));
}

#[test]
fn skips_longer_than_series_rejected() {
    let c = corpus(smooth(100, 1), smooth(100, 1));
    assert!(normalize_corpus(c, 80, 30, 4.0, false).is_err());
}

#[test]
fn overflowing_skips_rejected() {
    let c = corpus(smooth(100, 1), smooth(100, 1));
    let err = normalize_corpus(c, usize::MAX, 1, 4.0, false).unwrap_err();
    assert!(matches!(err.downcast_ref::<PrepError>(), Some(PrepError::InvalidConfig(_))));
}

#[test]
fn flat_subjects_are_counted() {
    let mut input = smooth(200, 3);
    let mut target = smooth(200, 3);
    input.column_mut(1).fill(5.0);
    target.column_mut(1).fill(3.0);
    target.column_mut(2).fill(-1.0);
    let (m, zero) = normalize_corpus(corpus(input, target), 0, 0, 4.0, false).unwrap();
    assert_eq!(zero, ZeroMad { input: 1, target: 2 });
    // centred to all zeros, so its peak passes the gate
    assert_eq!(m.n_subjects(), 3);
    assert!(m.input.column(1).iter().all(|&v| v == 0.0));
}
