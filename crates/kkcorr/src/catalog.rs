//! A minimal in-memory catalog of scalar measurements.
//!
//! Loading catalogs from files is left to the application. A [`Catalog`]
//! simply owns the positions, values and (optional) weights of a set of
//! points, along with the coordinate system of the positions.

use kkcorr_internal::ScalarPoints;
use ndarray::Array2;

use crate::Error;

/// The coordinate system of a catalog's positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coords {
    /// (x, y) positions in a plane
    Flat,
    /// (x, y, z) positions, or (ra, dec, r) converted to Cartesian positions
    ThreeD,
    /// (ra, dec) positions, placed on the unit sphere
    Spherical,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    name: String,
    coords: Coords,
    // shape is (D, n_points)
    positions: Array2<f64>,
    k: Vec<f64>,
    weights: Option<Vec<f64>>,
}

impl Catalog {
    fn new(
        coords: Coords,
        components: &[&[f64]],
        k: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Catalog, Error> {
        let n_points = components[0].len();
        if components.iter().any(|comp| comp.len() != n_points) {
            return Err(Error::config(
                "every position component must have the same length".to_owned(),
            ));
        }
        let positions = Array2::from_shape_fn((components.len(), n_points), |(dim, i)| {
            components[dim][i]
        });
        let catalog = Catalog {
            name: String::new(),
            coords,
            positions,
            k: k.to_vec(),
            weights: weights.map(|w| w.to_vec()),
        };
        // this validates the lengths of the values and weights
        catalog.points()?;
        Ok(catalog)
    }

    /// Create a catalog from flat positions
    pub fn from_flat(
        x: &[f64],
        y: &[f64],
        k: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Catalog, Error> {
        Catalog::new(Coords::Flat, &[x, y], k, weights)
    }

    /// Create a catalog from 3D Cartesian positions
    pub fn from_xyz(
        x: &[f64],
        y: &[f64],
        z: &[f64],
        k: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Catalog, Error> {
        Catalog::new(Coords::ThreeD, &[x, y, z], k, weights)
    }

    /// Create a catalog from celestial coordinates (in radians).
    ///
    /// When the distances, `r`, are given, the positions are 3D positions.
    /// Otherwise, the points are placed on the unit sphere.
    pub fn from_ra_dec(
        ra: &[f64],
        dec: &[f64],
        r: Option<&[f64]>,
        k: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Catalog, Error> {
        if ra.len() != dec.len() || r.is_some_and(|r| r.len() != ra.len()) {
            return Err(Error::config(
                "ra, dec and r must have the same length".to_owned(),
            ));
        }
        let n_points = ra.len();
        let mut xyz = [
            Vec::with_capacity(n_points),
            Vec::with_capacity(n_points),
            Vec::with_capacity(n_points),
        ];
        for i in 0..n_points {
            let dist = r.map_or(1.0, |r| r[i]);
            let cos_dec = dec[i].cos();
            xyz[0].push(dist * cos_dec * ra[i].cos());
            xyz[1].push(dist * cos_dec * ra[i].sin());
            xyz[2].push(dist * dec[i].sin());
        }
        let coords = if r.is_some() {
            Coords::ThreeD
        } else {
            Coords::Spherical
        };
        let [x, y, z] = &xyz;
        Catalog::new(coords, &[x.as_slice(), y.as_slice(), z.as_slice()], k, weights)
    }

    /// attach a name, which is used in log messages
    pub fn with_name(mut self, name: &str) -> Catalog {
        self.name = name.to_owned();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    pub fn n_points(&self) -> usize {
        self.k.len()
    }

    pub fn k(&self) -> &[f64] {
        &self.k
    }

    /// the sum of the weights
    pub fn sum_weights(&self) -> f64 {
        match self.weights {
            Some(ref w) => w.iter().sum(),
            None => self.k.len() as f64,
        }
    }

    /// The weighted variance of the scalar values.
    ///
    /// Returns 0 when the catalog is empty or the weights sum to 0.
    pub fn vark(&self) -> f64 {
        let weight = |i: usize| self.weights.as_ref().map_or(1.0, |w| w[i]);
        let sum_w = self.sum_weights();
        if sum_w == 0.0 {
            return 0.0;
        }
        let mean = (0..self.k.len()).map(|i| weight(i) * self.k[i]).sum::<f64>() / sum_w;
        (0..self.k.len())
            .map(|i| weight(i) * (self.k[i] - mean).powi(2))
            .sum::<f64>()
            / sum_w
    }

    pub(crate) fn points(&self) -> Result<ScalarPoints<'_>, Error> {
        ScalarPoints::new(self.positions.view(), &self.k, self.weights.as_deref())
            .map_err(Error::internal_legacy_adhoc)
    }
}

/// Compute the variance of the scalar values from a list of catalogs.
///
/// This is the weighted average of each catalog's [`Catalog::vark`], where
/// each catalog is weighted by the sum of its weights. Returns 0 for an
/// empty list (or when the total weight is 0).
pub fn calculate_var_k(catalogs: &[&Catalog]) -> f64 {
    let total_weight: f64 = catalogs.iter().map(|cat| cat.sum_weights()).sum();
    if total_weight == 0.0 {
        0.0
    } else {
        catalogs
            .iter()
            .map(|cat| cat.vark() * cat.sum_weights())
            .sum::<f64>()
            / total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lengths() {
        let x = [0.0, 1.0, 2.0];
        let k = [1.0, 2.0, 3.0];
        assert!(Catalog::from_flat(&x, &x[..2], &k, None).is_err());
        assert!(Catalog::from_flat(&x, &x, &k[..2], None).is_err());
        assert!(Catalog::from_flat(&x, &x, &k, Some(&[1.0])).is_err());
        let cat = Catalog::from_flat(&x, &x, &k, None).unwrap().with_name("grid");
        assert_eq!(cat.n_points(), 3);
        assert_eq!(cat.k(), &k);
        assert_eq!(cat.name(), "grid");
        assert_eq!(cat.coords(), Coords::Flat);
    }

    #[test]
    fn ra_dec_positions() {
        let half_pi = std::f64::consts::FRAC_PI_2;
        let ra = [0.0, half_pi];
        let dec = [0.0, 0.0];
        let k = [1.0, 1.0];

        let cat = Catalog::from_ra_dec(&ra, &dec, None, &k, None).unwrap();
        assert_eq!(cat.coords(), Coords::Spherical);
        let points = cat.points().unwrap();
        assert_eq!(points.get_position(0), [1.0, 0.0, 0.0]);
        let p1 = points.get_position(1);
        assert!(p1[0].abs() < 1e-15 && (p1[1] - 1.0).abs() < 1e-15);

        let cat = Catalog::from_ra_dec(&ra, &dec, Some(&[2.0, 3.0]), &k, None).unwrap();
        assert_eq!(cat.coords(), Coords::ThreeD);
        assert_eq!(cat.points().unwrap().get_position(0), [2.0, 0.0, 0.0]);
    }

    #[test]
    fn variance() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let cat = Catalog::from_flat(&x, &x, &[1.0, 3.0, 1.0, 3.0], None).unwrap();
        assert_eq!(cat.vark(), 1.0);

        // weighted: mean = (1*1 + 3*3)/4 = 2.5
        let cat_w = Catalog::from_flat(&x[..2], &x[..2], &[1.0, 3.0], Some(&[1.0, 3.0])).unwrap();
        assert!((cat_w.vark() - (0.25 * 1.5 * 1.5 + 0.75 * 0.5 * 0.5)).abs() < 1e-15);

        let combined = calculate_var_k(&[&cat, &cat_w]);
        assert!((combined - (4.0 * 1.0 + 4.0 * cat_w.vark()) / 8.0).abs() < 1e-15);

        assert_eq!(calculate_var_k(&[]), 0.0);
        let empty = Catalog::from_flat(&[], &[], &[], None).unwrap();
        assert_eq!(empty.vark(), 0.0);
        assert_eq!(calculate_var_k(&[&empty]), 0.0);
    }
}
