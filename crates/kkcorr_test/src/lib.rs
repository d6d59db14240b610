//! Random test data shared by the tests and benchmarks of `kkcorr`.

use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

/// The columns of a randomly generated catalog
///
/// `positions` holds one vector per spatial component.
#[derive(Clone, Debug)]
pub struct RandomCatalog {
    pub positions: Vec<Vec<f64>>,
    pub k: Vec<f64>,
    pub weights: Vec<f64>,
}

impl RandomCatalog {
    /// Generate `n_points` points uniformly distributed within a box of
    /// `width` along each of `n_dims` dimensions.
    ///
    /// The values are drawn from `[-1, 1)` and the weights from `[0.5, 1.5)`.
    /// The output is fully determined by `seed`.
    pub fn from_random(n_points: usize, n_dims: usize, width: f64, seed: u64) -> RandomCatalog {
        assert!(n_dims == 2 || n_dims == 3);
        assert!(width > 0.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let pos_dist = Uniform::try_from(0.0..width).unwrap();
        let k_dist = Uniform::try_from(-1.0..1.0).unwrap();
        let w_dist = Uniform::try_from(0.5..1.5).unwrap();

        let positions = (0..n_dims)
            .map(|_| (0..n_points).map(|_| pos_dist.sample(&mut rng)).collect())
            .collect();
        let k = (0..n_points).map(|_| k_dist.sample(&mut rng)).collect();
        let weights = (0..n_points).map(|_| w_dist.sample(&mut rng)).collect();
        RandomCatalog {
            positions,
            k,
            weights,
        }
    }

    pub fn n_points(&self) -> usize {
        self.k.len()
    }

    /// Split the catalog into `n_chunks` catalogs of (nearly) equal size
    pub fn split(&self, n_chunks: usize) -> Vec<RandomCatalog> {
        assert!(n_chunks > 0);
        let chunk_len = self.n_points().div_ceil(n_chunks).max(1);
        (0..n_chunks)
            .map(|chunk| {
                let start = (chunk * chunk_len).min(self.n_points());
                let stop = ((chunk + 1) * chunk_len).min(self.n_points());
                RandomCatalog {
                    positions: self
                        .positions
                        .iter()
                        .map(|comp| comp[start..stop].to_vec())
                        .collect(),
                    k: self.k[start..stop].to_vec(),
                    weights: self.weights[start..stop].to_vec(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = RandomCatalog::from_random(10, 3, 5.0, 42);
        let b = RandomCatalog::from_random(10, 3, 5.0, 42);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.k, b.k);
        assert!(a.positions[0].iter().all(|x| (0.0..5.0).contains(x)));
    }

    #[test]
    fn split_covers_everything() {
        let cat = RandomCatalog::from_random(11, 2, 1.0, 7);
        let chunks = cat.split(3);
        assert_eq!(chunks.len(), 3);
        let lens: Vec<usize> = chunks.iter().map(|c| c.n_points()).collect();
        assert_eq!(lens, vec![4, 4, 3]);
        assert_eq!(chunks[2].k, cat.k[8..].to_vec());
    }
}
