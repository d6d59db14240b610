use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis};

/// The contribution of a single (possibly aggregated) pair of points
///
/// `xi` is already weighted (i.e. `w1*k1*w2*k2`), while `r` and `logr` are
/// weighted by `weight` when they get consumed.
#[derive(Clone, Copy, Debug)]
pub struct PairDatum {
    pub xi: f64,
    pub r: f64,
    pub logr: f64,
    pub weight: f64,
    pub npairs: f64,
}

/// Holds the raw per-bin sums of a KK correlation.
///
/// Internally, this is a `(N_SUMS, n_bins)` array. Each column is the
/// accumulation state of a single separation bin and each row holds one of
/// the sums (see the associated constants for the row indices).
///
/// # Note
/// There is some benefit to wrapping the array since it helps contain the
/// knowledge of the memory layout to a single file.
#[derive(Clone, Debug, PartialEq)]
pub struct BinnedSums {
    data: Array2<f64>,
}

impl BinnedSums {
    pub const XI: usize = 0;
    pub const MEANR: usize = 1;
    pub const MEANLOGR: usize = 2;
    pub const WEIGHT: usize = 3;
    pub const NPAIRS: usize = 4;
    pub const N_SUMS: usize = 5;

    /// allocate zero-initialized sums
    pub fn zeros(n_bins: usize) -> Self {
        Self {
            data: Array2::zeros((Self::N_SUMS, n_bins)),
        }
    }

    pub fn n_bins(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// reset every sum to 0
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// consume a pair's contribution to bin `bin_index`
    #[inline]
    pub fn consume(&mut self, bin_index: usize, datum: &PairDatum) {
        self.data[[Self::XI, bin_index]] += datum.xi;
        self.data[[Self::MEANR, bin_index]] += datum.weight * datum.r;
        self.data[[Self::MEANLOGR, bin_index]] += datum.weight * datum.logr;
        self.data[[Self::WEIGHT, bin_index]] += datum.weight;
        self.data[[Self::NPAIRS, bin_index]] += datum.npairs;
    }

    /// merge the sums tracked by `other` into `self`
    ///
    /// # Panics
    /// When `self` and `other` don't have the same number of bins
    pub fn merge(&mut self, other: &BinnedSums) {
        assert_eq!(self.n_bins(), other.n_bins());
        self.data += &other.data;
    }

    /// get the row of sums with the specified index (e.g. [`Self::WEIGHT`])
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    pub fn as_array_view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn as_array_view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }
}
