/*!
Provides parallelized routines for computing the two-point correlation
function of a scalar field (a "KK" correlation) from catalogs of weighted
point measurements.

# High-Level: KK correlations

Each point of a catalog carries a position, a scalar value `k` and a weight
`w`. The correlation function at separation `r` is the weighted average of
`k_i*k_j` over all pairs of points whose separation falls in a bin around
`r`:

```text
xi(r) = sum(w_i*w_j*k_i*k_j) / sum(w_i*w_j)
```

The bins are logarithmically spaced between `min_sep` and `max_sep`. For
large catalogs, visiting every pair is prohibitively expensive. Instead, the
points are organized in a binary tree and pairs of cells are accumulated
together when doing so can't shift any pair by more than a fraction of a
bin (controlled by `bin_slop`). Setting `bin_slop` to 0 makes the
calculation exact.

# User Guide

```
use kkcorr::{Catalog, KKCorrelationBuilder};

let x = [0.0, 3.0, 10.0];
let y = [0.0, 4.0, 0.0];
let k = [1.0, 2.0, -1.0];
let catalog = Catalog::from_flat(&x, &y, &k, None).unwrap();

let mut corr = KKCorrelationBuilder::new()
    .min_sep(1.0)
    .max_sep(20.0)
    .nbins(5)
    .build()
    .unwrap();
corr.process(&[&catalog], None, None).unwrap();
assert_eq!(corr.npairs().sum(), 3.0);
```

A correlation can also be accumulated piece by piece, with
[`KKCorrelation::process_auto`], [`KKCorrelation::process_cross`],
[`KKCorrelation::process_pairwise`] and [`KKCorrelation::merge`], followed
by a single call to [`KKCorrelation::finalize`].

# Developer Guide

The pair kernels, the spatial tree and the per-bin sums live in the
[`kkcorr_internal`] crate. This crate handles configuration, coordinate
systems, the accumulator's lifecycle and persistence.

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod binning;
mod catalog;
mod config;
mod correlation;
mod error;
mod io;
mod metric;

// pull in symbols that visible outside of the package
pub use binning::{BinGrid, SepUnits};
pub use catalog::{Catalog, Coords, calculate_var_k};
pub use config::{CorrelationConfig, KKCorrelationBuilder, RuntimeSpec};
pub use correlation::{AccumState, KKCorrelation};
pub use error::Error;
pub use io::FileType;
pub use kkcorr_internal::SplitMethod;
pub use metric::{Metric, ProcessMode};
