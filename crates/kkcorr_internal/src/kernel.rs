//! The pair-counting kernels.
//!
//! There are 3 kinds of kernels:
//! - [`process_auto`] accumulates every distinct pair of points drawn from a
//!   single field.
//! - [`process_cross`] accumulates every pair with one point drawn from each
//!   of 2 fields.
//! - [`process_pairwise`] accumulates only the pairs `(p1[i], p2[i])`.
//!
//! The tree kernels recurse through pairs of cells. A pair of cells is
//! treated as a single aggregated pair when the sum of their sizes is no
//! larger than `b` times their separation. With `b = 0`, every pair of
//! points is visited individually and the results are exact.
//!
//! Every kernel distributes work among the threads of the current rayon
//! thread pool. Each worker accumulates into its own [`BinnedSums`] and the
//! partial sums are combined at the end, so the caller's sums are only
//! touched once.

use std::marker::PhantomData;

use rayon::prelude::*;
use tracing::debug;

use crate::bins::LogBinEdges;
use crate::field::KField;
use crate::metric::Distance;
use crate::points::ScalarPoints;
use crate::state::{BinnedSums, PairDatum};

struct PairWalker<'a, M: Distance> {
    edges: &'a LogBinEdges,
    bsq: f64,
    half_min_sep: f64,
    _metric: PhantomData<M>,
}

impl<'a, M: Distance> PairWalker<'a, M> {
    fn new(edges: &'a LogBinEdges, b: f64) -> Self {
        Self {
            edges,
            bsq: b * b,
            half_min_sep: 0.5 * edges.min_sep(),
            _metric: PhantomData,
        }
    }

    /// accumulate all pairs where both points are members of cell `index`
    fn process2(&self, sums: &mut BinnedSums, field: &KField, index: usize) {
        let cell = field.cell(index);
        // every pair within the cell is closer than min_sep
        if cell.size < self.half_min_sep {
            return;
        }
        if let Some([left, right]) = cell.children {
            self.process2(sums, field, left);
            self.process2(sums, field, right);
            self.process11(sums, field, left, field, right);
        }
    }

    /// accumulate all pairs with one point from `f1`'s cell `i1` and the
    /// other from `f2`'s cell `i2`
    fn process11(&self, sums: &mut BinnedSums, f1: &KField, i1: usize, f2: &KField, i2: usize) {
        let c1 = f1.cell(i1);
        let c2 = f2.cell(i2);
        let s1ps2 = c1.size + c2.size;

        if M::too_close(&c1.pos, &c2.pos, s1ps2, self.edges.min_sep())
            || M::too_far(&c1.pos, &c2.pos, s1ps2, self.edges.max_sep())
        {
            return;
        }

        let dsq = M::dist_sq(&c1.pos, &c2.pos);
        let close_enough = s1ps2 * s1ps2 <= self.bsq * dsq;

        match (c1.children, c2.children) {
            (None, None) => self.direct(sums, f1, i1, f2, i2, dsq),
            _ if close_enough => self.direct(sums, f1, i1, f2, i2, dsq),
            (Some([left, right]), None) => {
                self.process11(sums, f1, left, f2, i2);
                self.process11(sums, f1, right, f2, i2);
            }
            (Some([left, right]), Some(_)) if c1.size >= c2.size => {
                self.process11(sums, f1, left, f2, i2);
                self.process11(sums, f1, right, f2, i2);
            }
            (_, Some([left, right])) => {
                self.process11(sums, f1, i1, f2, left);
                self.process11(sums, f1, i1, f2, right);
            }
        }
    }

    #[inline]
    fn direct(
        &self,
        sums: &mut BinnedSums,
        f1: &KField,
        i1: usize,
        f2: &KField,
        i2: usize,
        dsq: f64,
    ) {
        let c1 = f1.cell(i1);
        let c2 = f2.cell(i2);
        let logr = 0.5 * dsq.ln();
        if let Some(bin_index) = self.edges.bin_index(dsq, logr) {
            let datum = PairDatum {
                xi: c1.wk * c2.wk,
                r: dsq.sqrt(),
                logr,
                weight: c1.w * c2.w,
                npairs: c1.n * c2.n,
            };
            sums.consume(bin_index, &datum);
        }
    }
}

fn check_n_bins(sums: &BinnedSums, edges: &LogBinEdges) -> Result<(), &'static str> {
    if sums.n_bins() != edges.n_bins() {
        Err("the sums and the bin edges have inconsistent numbers of bins")
    } else {
        Ok(())
    }
}

fn combine(mut a: BinnedSums, b: BinnedSums) -> BinnedSums {
    a.merge(&b);
    a
}

/// Accumulate every distinct pair of points from `field` into `sums`.
///
/// `b` is the tree-approximation tolerance. It should match the value that
/// was used to construct `field`.
pub fn process_auto<M: Distance>(
    sums: &mut BinnedSums,
    field: &KField,
    edges: &LogBinEdges,
    b: f64,
    output_dots: bool,
) -> Result<(), &'static str> {
    check_n_bins(sums, edges)?;
    let walker = PairWalker::<M>::new(edges, b);
    let top = field.top();
    let n_bins = edges.n_bins();

    let partial = (0..top.len())
        .into_par_iter()
        .fold(
            || BinnedSums::zeros(n_bins),
            |mut acc, i| {
                walker.process2(&mut acc, field, top[i]);
                for &other in &top[i + 1..] {
                    walker.process11(&mut acc, field, top[i], field, other);
                }
                if output_dots {
                    debug!(cell = i, n_top_level = top.len(), "finished top-level cell");
                }
                acc
            },
        )
        .reduce(|| BinnedSums::zeros(n_bins), combine);
    sums.merge(&partial);
    Ok(())
}

/// Accumulate every pair with one point drawn from `field1` and the other
/// drawn from `field2` into `sums`.
pub fn process_cross<M: Distance>(
    sums: &mut BinnedSums,
    field1: &KField,
    field2: &KField,
    edges: &LogBinEdges,
    b: f64,
    output_dots: bool,
) -> Result<(), &'static str> {
    check_n_bins(sums, edges)?;
    let walker = PairWalker::<M>::new(edges, b);
    let (top1, top2) = (field1.top(), field2.top());
    let n_bins = edges.n_bins();

    let partial = (0..top1.len())
        .into_par_iter()
        .fold(
            || BinnedSums::zeros(n_bins),
            |mut acc, i| {
                for &other in top2 {
                    walker.process11(&mut acc, field1, top1[i], field2, other);
                }
                if output_dots {
                    debug!(cell = i, n_top_level = top1.len(), "finished top-level cell");
                }
                acc
            },
        )
        .reduce(|| BinnedSums::zeros(n_bins), combine);
    sums.merge(&partial);
    Ok(())
}

/// Accumulate the pairs `(points1[i], points2[i])` into `sums`.
///
/// Pairs involving a point with zero weight are skipped.
pub fn process_pairwise<M: Distance>(
    sums: &mut BinnedSums,
    points1: &ScalarPoints,
    points2: &ScalarPoints,
    edges: &LogBinEdges,
) -> Result<(), &'static str> {
    check_n_bins(sums, edges)?;
    if points1.n_points() != points2.n_points() {
        return Err("pairwise processing requires collections with equal numbers of points");
    }
    let n_bins = edges.n_bins();

    let partial = (0..points1.n_points())
        .into_par_iter()
        .fold(
            || BinnedSums::zeros(n_bins),
            |mut acc, i| {
                let weight = points1.get_weight(i) * points2.get_weight(i);
                if weight == 0.0 {
                    return acc;
                }
                let dsq = M::dist_sq(&points1.get_position(i), &points2.get_position(i));
                let logr = 0.5 * dsq.ln();
                if let Some(bin_index) = edges.bin_index(dsq, logr) {
                    let datum = PairDatum {
                        xi: weight * points1.get_value(i) * points2.get_value(i),
                        r: dsq.sqrt(),
                        logr,
                        weight,
                        npairs: 1.0,
                    };
                    acc.consume(bin_index, &datum);
                }
                acc
            },
        )
        .reduce(|| BinnedSums::zeros(n_bins), combine);
    sums.merge(&partial);
    Ok(())
}
