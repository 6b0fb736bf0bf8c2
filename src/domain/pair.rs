// ============================================================
// Layer 3 - LatentPair Domain Type
// ============================================================
// One training example: the father's and mother's latent
// codes, each flattened row-major to rows * cols values.
// The shape itself is owned by whoever built the dataset;
// a pair on its own only carries the numbers.

use serde::{Deserialize, Serialize};

use crate::domain::latent::LatentShape;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentPair {
    pub father: Vec<f32>,
    pub mother: Vec<f32>,
}

impl LatentPair {
    pub fn new(father: Vec<f32>, mother: Vec<f32>) -> Self {
        Self { father, mother }
    }

    /// True when both parents have exactly `shape.len()` values.
    pub fn fits(&self, shape: LatentShape) -> bool {
        self.father.len() == shape.len() && self.mother.len() == shape.len()
    }
}
