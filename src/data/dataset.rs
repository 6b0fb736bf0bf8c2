use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::domain::latent::LatentShape;
use crate::domain::pair::LatentPair;

/// Parent latent pairs, all validated against one shape.
pub struct LatentPairDataset {
    pairs: Vec<LatentPair>,
}

impl LatentPairDataset {
    pub fn new(shape: LatentShape, pairs: Vec<LatentPair>) -> Result<Self> {
        if let Some(idx) = pairs.iter().position(|p| !p.fits(shape)) {
            let p = &pairs[idx];
            bail!(
                "pair {idx} does not match latent shape {shape}: father has {} values, mother has {}",
                p.father.len(),
                p.mother.len()
            );
        }
        Ok(Self { pairs })
    }

    pub fn pair_count(&self) -> usize { self.pairs.len() }
}

impl Dataset<LatentPair> for LatentPairDataset {
    fn get(&self, index: usize) -> Option<LatentPair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Seeded standard-normal parent pairs, for smoke runs without a
/// latent dump on disk.
pub fn synthetic_pairs(count: usize, shape: LatentShape, seed: u64) -> Vec<LatentPair> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let father: Vec<f32> = StandardNormal.sample_iter(&mut rng).take(shape.len()).collect();
            let mother: Vec<f32> = StandardNormal.sample_iter(&mut rng).take(shape.len()).collect();
            LatentPair::new(father, mother)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_mismatched_pair() {
        let shape = LatentShape::new(2, 2);
        let pairs = vec![
            LatentPair::new(vec![0.0; 4], vec![0.0; 4]),
            LatentPair::new(vec![0.0; 4], vec![0.0; 3]),
        ];
        let err = LatentPairDataset::new(shape, pairs).err().unwrap();
        assert!(err.to_string().contains("pair 1"));
    }

    #[test]
    fn test_synthetic_is_seeded() {
        let shape = LatentShape::new(3, 4);
        let a = synthetic_pairs(5, shape, 7);
        let b = synthetic_pairs(5, shape, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.fits(shape)));
        assert!(a.iter().flat_map(|p| p.father.iter()).all(|v| v.is_finite()));
    }

    #[test]
    fn test_synthetic_values_are_standard_normal() {
        let shape  = LatentShape::new(100, 100);
        let pair   = &synthetic_pairs(1, shape, 3)[0];
        let n      = pair.father.len() as f32;
        let mean   = pair.father.iter().sum::<f32>() / n;
        let var    = pair.father.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
        assert_ne!(pair.father, pair.mother);
    }

    #[test]
    fn test_dataset_get() {
        let shape   = LatentShape::new(1, 2);
        let dataset = LatentPairDataset::new(shape, synthetic_pairs(3, shape, 1)).unwrap();
        assert_eq!(dataset.len(), 3);
        assert!(dataset.get(2).is_some());
        assert!(dataset.get(3).is_none());
    }
}
