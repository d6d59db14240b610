// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

#![allow(dead_code)]

use kkcorr::{Catalog, KKCorrelation, KKCorrelationBuilder};
use kkcorr_test::RandomCatalog;
use ndarray::ArrayView1;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

pub fn assert_allclose(
    actual: ArrayView1<f64>,
    ref_vals: &[f64],
    rtol: f64,
    atol: f64,
    what: &str,
) {
    assert_eq!(actual.len(), ref_vals.len(), "{what} has the wrong length");
    for (i, (&a, &r)) in actual.iter().zip(ref_vals).enumerate() {
        assert!(
            isclose(a, r, rtol, atol),
            "{what}[{i}]: actual = {a}, reference = {r}"
        );
    }
}

pub fn to_catalog(data: &RandomCatalog) -> Catalog {
    let weights = Some(data.weights.as_slice());
    match data.positions.as_slice() {
        [x, y] => Catalog::from_flat(x, y, &data.k, weights).unwrap(),
        [x, y, z] => Catalog::from_xyz(x, y, z, &data.k, weights).unwrap(),
        _ => panic!("unexpected number of spatial dimensions"),
    }
}

/// a correlation that is computed without any tree approximations
pub fn exact_corr(min_sep: f64, max_sep: f64, nbins: usize) -> KKCorrelation {
    KKCorrelationBuilder::new()
        .min_sep(min_sep)
        .max_sep(max_sep)
        .nbins(nbins)
        .bin_slop(0.0)
        .build()
        .unwrap()
}

/// The raw (unnormalized) sums of a brute-force calculation
pub struct RawSums {
    pub xi: Vec<f64>,
    pub meanr: Vec<f64>,
    pub meanlogr: Vec<f64>,
    pub weight: Vec<f64>,
    pub npairs: Vec<f64>,
}

/// Visit every pair `(i, j)` with `i` from `data1` and `j` from `data2`
/// (when `data2` is `None`, every distinct pair within `data1`) and bin them
/// by their Euclidean separation.
pub fn brute_force(
    data1: &RandomCatalog,
    data2: Option<&RandomCatalog>,
    min_sep: f64,
    max_sep: f64,
    nbins: usize,
) -> RawSums {
    let mut out = RawSums {
        xi: vec![0.0; nbins],
        meanr: vec![0.0; nbins],
        meanlogr: vec![0.0; nbins],
        weight: vec![0.0; nbins],
        npairs: vec![0.0; nbins],
    };
    let bin_size = (max_sep / min_sep).ln() / (nbins as f64);
    let other = data2.unwrap_or(data1);

    for i in 0..data1.n_points() {
        let start = if data2.is_none() { i + 1 } else { 0 };
        for j in start..other.n_points() {
            let dsq: f64 = data1
                .positions
                .iter()
                .zip(&other.positions)
                .map(|(comp1, comp2)| (comp1[i] - comp2[j]).powi(2))
                .sum();
            if dsq < min_sep * min_sep || dsq >= max_sep * max_sep {
                continue;
            }
            let r = dsq.sqrt();
            let bin = (((r.ln() - min_sep.ln()) / bin_size) as usize).min(nbins - 1);
            let w = data1.weights[i] * other.weights[j];
            out.xi[bin] += w * data1.k[i] * other.k[j];
            out.meanr[bin] += w * r;
            out.meanlogr[bin] += w * r.ln();
            out.weight[bin] += w;
            out.npairs[bin] += 1.0;
        }
    }
    out
}
