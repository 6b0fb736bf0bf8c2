// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds the predictor from model_config.json, loads the
// weights of one epoch and predicts the factors for a single
// parent pair in evaluation mode.
use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::pair::LatentPair;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::DirectionFactorPredictor;

pub struct FactorInferencer<B: Backend> {
    model:  DirectionFactorPredictor<B>,
    device: B::Device,
}

impl<B: Backend> FactorInferencer<B> {
    /// `epoch = None` loads the latest checkpoint.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        epoch:        Option<usize>,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let model = cfg.init::<B>(&device)?;
        let model = ckpt_manager.load_model(model, epoch, &device)?;
        tracing::info!(
            "Predictor ready: latent {}, directions {:?}",
            model.latent_shape(),
            model.directions().names()
        );
        Ok(Self { model, device })
    }

    /// One `(direction, factor)` entry per direction, in declared order.
    pub fn predict(&self, pair: &LatentPair) -> Result<Vec<(String, f32)>> {
        let shape = self.model.latent_shape();
        if !pair.fits(shape) {
            return Err(anyhow!(
                "pair has {} + {} values, latent shape {} needs {} each",
                pair.father.len(),
                pair.mother.len(),
                shape,
                shape.len()
            ));
        }

        let to_tensor = |values: &[f32]| {
            Tensor::<B, 3>::from_data(
                TensorData::new(values.to_vec(), [1, shape.rows, shape.cols]),
                &self.device,
            )
        };

        let factors = self
            .model
            .forward(to_tensor(&pair.father), to_tensor(&pair.mother))?
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read factors: {e:?}"))?;

        tracing::debug!("Predicted factors {:?}", factors);

        Ok(self
            .model
            .directions()
            .iter()
            .map(str::to_string)
            .zip(factors)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::synthetic_pairs;
    use crate::domain::latent::LatentShape;
    use crate::ml::model::FactorPredictorConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_predicts_one_factor_per_direction() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = FactorPredictorConfig::new(2, 3).with_factor_scales(Some(vec![3.0, 3.0, 3.0]));

        let model = config.init::<NdArray>(&device).unwrap();
        ckpt.save_config(&config).unwrap();
        ckpt.save_model(&model, 1).unwrap();

        let inferencer = FactorInferencer::<NdArray>::from_checkpoint(&ckpt, None, device).unwrap();
        let pair       = synthetic_pairs(1, LatentShape::new(2, 3), 5).remove(0);
        let factors    = inferencer.predict(&pair).unwrap();

        let names: Vec<&str> = factors.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["age", "gender", "smile"]);
        assert!(factors.iter().all(|(_, f)| f.abs() <= 3.0));

        // Evaluation mode: same pair, same answer.
        assert_eq!(inferencer.predict(&pair).unwrap(), factors);
    }

    #[test]
    fn test_rejects_pair_of_wrong_size() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = FactorPredictorConfig::new(2, 3);

        ckpt.save_config(&config).unwrap();
        ckpt.save_model(&config.init::<NdArray>(&device).unwrap(), 1).unwrap();

        let inferencer = FactorInferencer::<NdArray>::from_checkpoint(&ckpt, Some(1), device).unwrap();
        let pair       = LatentPair::new(vec![0.0; 6], vec![0.0; 4]);
        assert!(inferencer.predict(&pair).is_err());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(FactorInferencer::<NdArray>::from_checkpoint(&ckpt, None, Default::default()).is_err());
    }
}
