//! Internal machinery of the `kkcorr` crate.
//!
//! This crate holds the pieces that don't need to know anything about
//! configuration, coordinate systems, or file formats: the separation bins,
//! the per-bin sums, the spatial tree, and the pair-counting kernels.
//!
//! Errors are reported as `&'static str`. The public crate wraps them in its
//! own error type.
//!
//! # Layout conventions
//!
//! Positions are stored in `(D, n_points)` arrays, where `D` is 2 for flat
//! coordinates and 3 otherwise (see [`ScalarPoints`]). The per-bin sums are
//! stored in a `(BinnedSums::N_SUMS, n_bins)` array (see [`BinnedSums`]).
//!
//! All separations handled by this crate are physical separations, in the
//! same units as the positions.

mod bins;
mod field;
mod kernel;
mod metric;
mod points;
mod state;

pub use bins::LogBinEdges;
pub use field::{KField, SplitMethod};
pub use kernel::{process_auto, process_cross, process_pairwise};
pub use metric::{Distance, FlatDistance, RperpDistance, ThreeDDistance};
pub use points::ScalarPoints;
pub use state::{BinnedSums, PairDatum};
