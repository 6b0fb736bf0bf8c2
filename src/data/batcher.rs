// ============================================================
// Layer 4 - Latent Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<LatentPair>
// into two [batch, rows, cols] tensors, one per parent.
//
//   Input:  N pairs, each parent flattened to rows * cols
//   Output: father_latent, mother_latent of shape [N, rows, cols]
//
// The dataset already validated every pair against the shape,
// so the flat buffers always hold N * rows * cols values.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::latent::LatentShape;
use crate::domain::pair::LatentPair;

// ─── LatentPairBatch ─────────────────────────────────────────────────────────
/// The two tensors the predictor's forward pass consumes.
#[derive(Debug, Clone)]
pub struct LatentPairBatch<B: Backend> {
    /// shape: [batch_size, rows, cols]
    pub father_latent: Tensor<B, 3>,

    /// shape: [batch_size, rows, cols]
    pub mother_latent: Tensor<B, 3>,
}

impl<B: Backend> LatentPairBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.father_latent.dims()[0]
    }

    /// Move both parents to `device`.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            father_latent: self.father_latent.to_device(device),
            mother_latent: self.mother_latent.to_device(device),
        }
    }
}

// ─── LatentPairBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct LatentPairBatcher {
    shape: LatentShape,
}

impl LatentPairBatcher {
    pub fn new(shape: LatentShape) -> Self {
        Self { shape }
    }

    fn stack<B: Backend>(
        &self,
        items:  &[LatentPair],
        parent: impl Fn(&LatentPair) -> &[f32],
        device: &B::Device,
    ) -> Tensor<B, 3> {
        let flat: Vec<f32> = items.iter().flat_map(|p| parent(p).iter().copied()).collect();
        let data = TensorData::new(flat, [items.len(), self.shape.rows, self.shape.cols]);
        Tensor::<B, 3>::from_data(data, device)
    }
}

impl<B: Backend> Batcher<B, LatentPair, LatentPairBatch<B>> for LatentPairBatcher {
    fn batch(&self, items: Vec<LatentPair>, device: &B::Device) -> LatentPairBatch<B> {
        let father_latent = self.stack::<B>(&items, |p| p.father.as_slice(), device);
        let mother_latent = self.stack::<B>(&items, |p| p.mother.as_slice(), device);
        LatentPairBatch { father_latent, mother_latent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_order() {
        let device  = Default::default();
        let batcher = LatentPairBatcher::new(LatentShape::new(2, 3));
        let items = vec![
            LatentPair::new((0..6).map(|v| v as f32).collect(), vec![1.0; 6]),
            LatentPair::new((6..12).map(|v| v as f32).collect(), vec![2.0; 6]),
        ];

        let batch: LatentPairBatch<NdArray> = batcher.batch(items, &device);

        assert_eq!(batch.father_latent.dims(), [2, 2, 3]);
        assert_eq!(batch.mother_latent.dims(), [2, 2, 3]);
        assert_eq!(batch.batch_size(), 2);

        let father: Vec<f32> = batch.father_latent.into_data().to_vec().unwrap();
        assert_eq!(father, (0..12).map(|v| v as f32).collect::<Vec<_>>());
        let mother: Vec<f32> = batch.mother_latent.into_data().to_vec().unwrap();
        assert_eq!(&mother[6..], &[2.0; 6]);
    }
}
