//! Implements the logarithmically spaced separation bins used while counting
//! pairs.
//!
//! The kernels always know the squared separation of a pair before they know
//! anything else, so [`LogBinEdges`] is designed to be queried with a squared
//! separation (to decide whether the pair is in range at all) together with
//! `ln(r)` (which is needed anyway for the `meanlogr` sums).

/// Log-spaced bins spanning `[min_sep, max_sep)`.
///
/// All separations are physical separations (i.e. any unit conversion has
/// already been applied by the caller).
#[derive(Clone, Debug, PartialEq)]
pub struct LogBinEdges {
    min_sep: f64,
    max_sep: f64,
    min_sep_sq: f64,
    max_sep_sq: f64,
    log_min_sep: f64,
    bin_size: f64,
    n_bins: usize,
}

impl LogBinEdges {
    /// Note that consistency between `n_bins`, `bin_size` and the separation
    /// range is the caller's business. We only check that the values are
    /// usable.
    pub fn new(
        min_sep: f64,
        max_sep: f64,
        n_bins: usize,
        bin_size: f64,
    ) -> Result<Self, &'static str> {
        if n_bins == 0 {
            Err("Number of bins must be greater than zero")
        } else if !min_sep.is_finite() || !max_sep.is_finite() || !bin_size.is_finite() {
            Err("min_sep, max_sep and bin_size must be finite")
        } else if min_sep <= 0.0 {
            Err("min_sep must be positive")
        } else if max_sep <= min_sep {
            Err("max_sep must be greater than min_sep")
        } else if bin_size <= 0.0 {
            Err("bin_size must be positive")
        } else {
            Ok(Self {
                min_sep,
                max_sep,
                min_sep_sq: min_sep * min_sep,
                max_sep_sq: max_sep * max_sep,
                log_min_sep: min_sep.ln(),
                bin_size,
                n_bins,
            })
        }
    }

    pub fn min_sep(&self) -> f64 {
        self.min_sep
    }

    pub fn max_sep(&self) -> f64 {
        self.max_sep
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Calculate the bin index of a pair with squared separation `dsq`, where
    /// `logr` holds `ln(sqrt(dsq))`.
    ///
    /// Separations equal to a boundary are considered part of the higher bin,
    /// i.e. intervals do not include the right edge.
    #[inline]
    pub fn bin_index(&self, dsq: f64, logr: f64) -> Option<usize> {
        if !(dsq >= self.min_sep_sq && dsq < self.max_sep_sq) {
            return None;
        }
        // the cast truncates (and saturates at 0 when round-off pushes logr
        // just below log_min_sep)
        let index = ((logr - self.log_min_sep) / self.bin_size) as usize;
        // round-off can also push a separation just below max_sep into the
        // nonexistent bin
        Some(index.min(self.n_bins - 1))
    }
}
