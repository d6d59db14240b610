//! Separation metrics used by the pair kernels.
//!
//! Each metric is a unit-like struct implementing [`Distance`]. The kernels
//! are generic over the metric, so every (metric, kernel) combination is
//! monomorphized into its own entry point.

#[inline(always)]
fn squared_diff_norm(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    let dz = p1[2] - p2[2];
    dx * dx + dy * dy + dz * dz
}

#[inline(always)]
fn squared_norm(p: &[f64; 3]) -> f64 {
    p[0] * p[0] + p[1] * p[1] + p[2] * p[2]
}

pub trait Distance: Send + Sync + 'static {
    /// The squared separation of 2 positions (this is what gets binned)
    fn dist_sq(p1: &[f64; 3], p2: &[f64; 3]) -> f64;

    /// Returns `true` when every pair drawn from a cell centered on `p1` and
    /// a cell centered on `p2` is separated by less than `min_sep`.
    /// `s1ps2` is the sum of the cell sizes.
    #[inline]
    fn too_close(p1: &[f64; 3], p2: &[f64; 3], s1ps2: f64, min_sep: f64) -> bool {
        s1ps2 < min_sep && Self::dist_sq(p1, p2) < (min_sep - s1ps2) * (min_sep - s1ps2)
    }

    /// Returns `true` when every pair drawn from a cell centered on `p1` and
    /// a cell centered on `p2` is separated by at least `max_sep`.
    #[inline]
    fn too_far(p1: &[f64; 3], p2: &[f64; 3], s1ps2: f64, max_sep: f64) -> bool {
        Self::dist_sq(p1, p2) >= (max_sep + s1ps2) * (max_sep + s1ps2)
    }
}

/// Euclidean distance between points with flat (2D) coordinates.
#[derive(Clone, Copy, Debug)]
pub struct FlatDistance;

impl Distance for FlatDistance {
    #[inline(always)]
    fn dist_sq(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
        let dx = p1[0] - p2[0];
        let dy = p1[1] - p2[1];
        dx * dx + dy * dy
    }
}

/// Euclidean distance in 3D. For points on the unit sphere, this is the
/// chord distance.
#[derive(Clone, Copy, Debug)]
pub struct ThreeDDistance;

impl Distance for ThreeDDistance {
    #[inline(always)]
    fn dist_sq(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
        squared_diff_norm(p1, p2)
    }
}

/// The component of the 3D separation perpendicular to the line of sight.
///
/// For 2 points at distances `r1` & `r2` from the observer (the origin),
/// separated by `d`, we define `Rperp^2 = d^2 - (r1 - r2)^2`.
#[derive(Clone, Copy, Debug)]
pub struct RperpDistance;

impl Distance for RperpDistance {
    #[inline(always)]
    fn dist_sq(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
        let dsq = squared_diff_norm(p1, p2);
        let r1sq = squared_norm(p1);
        let r2sq = squared_norm(p2);
        let rpar_sq = r1sq + r2sq - 2.0 * (r1sq * r2sq).sqrt();
        // analytically non-negative, but round-off can make it slightly
        // negative
        (dsq - rpar_sq).max(0.0)
    }

    // Rperp never exceeds the 3D separation, so the 3D separation gives a
    // conservative test
    #[inline]
    fn too_close(p1: &[f64; 3], p2: &[f64; 3], s1ps2: f64, min_sep: f64) -> bool {
        s1ps2 < min_sep && squared_diff_norm(p1, p2) < (min_sep - s1ps2) * (min_sep - s1ps2)
    }

    // a pair along the line of sight has Rperp = 0 no matter how far apart
    // the cells are, so nothing can be ruled out
    #[inline]
    fn too_far(_p1: &[f64; 3], _p2: &[f64; 3], _s1ps2: f64, _max_sep: f64) -> bool {
        false
    }
}

/// The squared Euclidean separation, irrespective of the binning metric.
/// This is what we use to measure the sizes of cells.
#[inline(always)]
pub(crate) fn euclidean_dist_sq(p1: &[f64; 3], p2: &[f64; 3]) -> f64 {
    squared_diff_norm(p1, p2)
}
