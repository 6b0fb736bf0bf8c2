// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Loads a trained predictor and returns the edit factors for
// one parent pair picked out of a pairs file.
//
//   Step 1: Read the pairs file              (Layer 4 - data)
//   Step 2: Rebuild model, load checkpoint   (Layer 5 - ml)
//   Step 3: Predict in evaluation mode       (Layer 5 - ml)

use anyhow::{anyhow, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::ComputeDevice;
use crate::data::loader::JsonPairLoader;
use crate::domain::{pair::LatentPair, traits::PairSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::FactorInferencer;

pub struct PredictUseCase {
    ckpt_manager: CheckpointManager,
    /// `None` means the latest saved epoch.
    epoch:        Option<usize>,
    device:       ComputeDevice,
}

impl PredictUseCase {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        epoch:          Option<usize>,
        device:         ComputeDevice,
    ) -> Result<Self> {
        Ok(Self { ckpt_manager: CheckpointManager::new(checkpoint_dir)?, epoch, device })
    }

    /// Predict the factors for pair `index` of the JSON file at `pairs`.
    pub fn predict_from_file(&self, pairs: &Path, index: usize) -> Result<Vec<(String, f32)>> {
        let all   = JsonPairLoader::new(pairs).load_all()?;
        let total = all.len();
        let pair  = all
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("pair index {index} out of range, file holds {total} pairs"))?;
        self.predict(&pair)
    }

    pub fn predict(&self, pair: &LatentPair) -> Result<Vec<(String, f32)>> {
        match self.device {
            ComputeDevice::Cpu => {
                FactorInferencer::<NdArray>::from_checkpoint(&self.ckpt_manager, self.epoch, NdArrayDevice::default())?
                    .predict(pair)
            }
            ComputeDevice::Wgpu => {
                FactorInferencer::<Wgpu>::from_checkpoint(&self.ckpt_manager, self.epoch, WgpuDevice::default())?
                    .predict(pair)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};

    #[test]
    fn test_train_then_predict() {
        let dir      = tempfile::tempdir().unwrap();
        let save_dir = dir.path().join("models");
        let pairs    = dir.path().join("pairs.json");
        std::fs::write(
            &pairs,
            r#"[
                {"father_latent": [[0.1, 0.2, 0.3]], "mother_latent": [[0.3, 0.2, 0.1]]},
                {"father_latent": [[1.0, 0.0, -1.0]], "mother_latent": [[0.0, 0.5, 0.0]]},
                {"father_latent": [[-0.4, 0.9, 0.2]], "mother_latent": [[0.7, -0.1, 0.6]]}
            ]"#,
        )
        .unwrap();

        TrainUseCase::new(TrainConfig {
            pairs:           Some(pairs.clone()),
            save_dir:        save_dir.clone(),
            latent_rows:     1,
            latent_cols:     3,
            epochs:          2,
            batch_size:      3,
            factor_scales:   Some(vec![2.0, 2.0, 2.0]),
            log_every_batch: false,
            ..TrainConfig::default()
        })
        .execute()
        .unwrap();

        let latest  = PredictUseCase::new(&save_dir, None, ComputeDevice::Cpu).unwrap();
        let factors = latest.predict_from_file(&pairs, 1).unwrap();
        assert_eq!(factors.len(), 3);
        assert_eq!(factors[0].0, "age");
        assert!(factors.iter().all(|(_, f)| f.abs() <= 2.0));

        // No objective, so epoch 1 and epoch 2 weights only differ in
        // batch-norm running statistics; both must load.
        let first = PredictUseCase::new(&save_dir, Some(1), ComputeDevice::Cpu).unwrap();
        assert_eq!(first.predict_from_file(&pairs, 1).unwrap().len(), 3);

        assert!(latest.predict_from_file(&pairs, 3).is_err());
    }

    #[test]
    fn test_untrained_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = PredictUseCase::new(dir.path(), None, ComputeDevice::Cpu).unwrap();
        assert!(use_case.predict(&LatentPair::new(vec![0.0; 3], vec![0.0; 3])).is_err());
    }
}
