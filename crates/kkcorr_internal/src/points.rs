use ndarray::ArrayView2;

/// Collection of point properties for a scalar field.
///
/// We place the following constraints on contained arrays:
/// - axis 0 of `positions` is the slow axis and it corresponds to the
///   different spatial components (2 for flat coordinates, 3 otherwise).
/// - axis 1 is the fast axis. The length along this axis coincides with
///   the number of points. We require that it is contiguous (i.e. the stride
///   is unity).
/// - In other words the shape of `positions` is `(D, n_points)`, while
///   `values` (and `weights`, if present) hold `n_points` entries.
#[derive(Clone, Debug)]
pub struct ScalarPoints<'a> {
    positions: ArrayView2<'a, f64>,
    values: &'a [f64],
    weights: Option<&'a [f64]>,
    n_points: usize,
    n_spatial_dims: usize,
}

impl<'a> ScalarPoints<'a> {
    /// create a new instance
    ///
    /// Unlike other point collections, an empty collection is allowed (it
    /// simply doesn't contribute any pairs).
    pub fn new(
        positions: ArrayView2<'a, f64>,
        values: &'a [f64],
        weights: Option<&'a [f64]>,
    ) -> Result<ScalarPoints<'a>, &'static str> {
        let n_spatial_dims = positions.shape()[0];
        let n_points = positions.shape()[1];
        if n_spatial_dims != 2 && n_spatial_dims != 3 {
            Err("positions must have 2 or 3 spatial dimensions")
        } else if n_points > 1 && positions.strides()[1] != 1 {
            Err("positions must be contiguous along the fast axis")
        } else if values.len() != n_points {
            Err("values must have the same number of points as positions")
        } else if weights.is_some_and(|w| w.len() != n_points) {
            Err("weights must have the same number of points as positions")
        } else {
            Ok(Self {
                positions,
                values,
                weights,
                n_points,
                n_spatial_dims,
            })
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_spatial_dims(&self) -> usize {
        self.n_spatial_dims
    }

    /// If no weights are provided, returns 1.0, i.e., weights are just counts.
    #[inline]
    pub fn get_weight(&self, idx: usize) -> f64 {
        if let Some(weights) = self.weights {
            weights[idx]
        } else {
            1.0
        }
    }

    #[inline]
    pub fn get_value(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// returns the position of a point. The z component of a point with flat
    /// coordinates is always 0.
    #[inline]
    pub fn get_position(&self, idx: usize) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (k, comp) in out.iter_mut().enumerate().take(self.n_spatial_dims) {
            *comp = self.positions[[k, idx]];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_points_errs() {
        let positions = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];

        // 4 spatial dimensions
        let view = ArrayView2::from_shape((4, 2), &positions).unwrap();
        assert!(ScalarPoints::new(view, &[1.0, 2.0], None).is_err());

        // wrong number of values
        let view = ArrayView2::from_shape((2, 4), &positions).unwrap();
        assert!(ScalarPoints::new(view, &[1.0, 2.0], None).is_err());

        // wrong number of weights
        let view = ArrayView2::from_shape((2, 4), &positions).unwrap();
        assert!(ScalarPoints::new(view, &[1.0; 4], Some(&[1.0; 3])).is_err());
    }

    #[test]
    fn scalar_points_positions() {
        #[rustfmt::skip]
        let positions = [
            0.0, 1.0,
            2.0, 3.0,
        ];
        let values = [5.0, -5.0];
        let weights = [0.5, 2.0];
        let view = ArrayView2::from_shape((2, 2), &positions).unwrap();
        let points = ScalarPoints::new(view, &values, Some(&weights)).unwrap();

        assert_eq!(points.n_points(), 2);
        assert_eq!(points.n_spatial_dims(), 2);
        assert_eq!(points.get_position(1), [1.0, 3.0, 0.0]);
        assert_eq!(points.get_value(1), -5.0);
        assert_eq!(points.get_weight(0), 0.5);
    }

    #[test]
    fn scalar_points_empty() {
        let positions: [f64; 0] = [];
        let view = ArrayView2::from_shape((3, 0), &positions).unwrap();
        let points = ScalarPoints::new(view, &[], None).unwrap();
        assert_eq!(points.n_points(), 0);
    }
}
