// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores predictor weights with Burn's named
// MessagePack recorder at full precision, so a reloaded model
// reproduces the saved model's outputs bit for bit.
//
// What a record holds: every Linear weight and bias, the
// batch-norm gammas, betas and running statistics, and the
// per-direction factor scales.
//
// File naming convention:
//   <save_dir>/
//     checkpoint_epoch_1.mpk   ← weights after epoch 1
//     checkpoint_epoch_2.mpk   ← weights after epoch 2
//     ...
//     latest_epoch.json        ← number of the latest epoch
//     model_config.json        ← predictor architecture
//
// The architecture is saved separately because a model has to
// be rebuilt with the same shape before its weights can be
// loaded into it.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::PathBuf,
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::ml::model::{DirectionFactorPredictor, FactorPredictorConfig};

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

const RECORD_EXTENSION: &str = "mpk";

/// Manages saving and loading of predictor checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    /// Failing to create it is fatal: there would be nowhere to save.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// File stem of the checkpoint written after `epoch`.
    pub fn epoch_stem(epoch: usize) -> String {
        format!("checkpoint_epoch_{epoch}")
    }

    /// Save weights for a given epoch and update the latest-epoch pointer.
    pub fn save_model<B: Backend>(
        &self,
        model: &DirectionFactorPredictor<B>,
        epoch: usize,
    ) -> Result<PathBuf> {
        let path = self.save_named(model, &Self::epoch_stem(epoch))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        Ok(path)
    }

    /// Save weights under `<dir>/<stem>.mpk` and return the full path.
    pub fn save_named<B: Backend>(
        &self,
        model: &DirectionFactorPredictor<B>,
        stem:  &str,
    ) -> Result<PathBuf> {
        // The recorder would recreate a deleted directory.
        if !self.dir.is_dir() {
            bail!(
                "Failed to save checkpoint '{stem}': directory '{}' no longer exists",
                self.dir.display()
            );
        }

        // The recorder adds the extension itself.
        let path = self.dir.join(stem);

        ModelRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let path = path.with_extension(RECORD_EXTENSION);
        tracing::info!("Model saved to {}", path.display());
        Ok(path)
    }

    /// Load the weights saved after `epoch`, or after the latest epoch
    /// when `epoch` is `None`.
    ///
    /// `model` must have been built from the same architecture config.
    pub fn load_model<B: Backend>(
        &self,
        model:  DirectionFactorPredictor<B>,
        epoch:  Option<usize>,
        device: &B::Device,
    ) -> Result<DirectionFactorPredictor<B>> {
        let epoch = match epoch {
            Some(e) => e,
            None    => self.latest_epoch()?,
        };
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        self.load_named(model, &Self::epoch_stem(epoch), device)
    }

    pub fn load_named<B: Backend>(
        &self,
        model:  DirectionFactorPredictor<B>,
        stem:   &str,
        device: &B::Device,
    ) -> Result<DirectionFactorPredictor<B>> {
        let path = self.dir.join(stem);

        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}.{RECORD_EXTENSION}'", path.display())
            })?;

        tracing::info!("Model loaded from {}.{RECORD_EXTENSION}", path.display());
        Ok(model.load_record(record))
    }

    /// Save the predictor architecture so the model can be rebuilt later.
    pub fn save_config(&self, cfg: &FactorPredictorConfig) -> Result<()> {
        let path = self.dir.join("model_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<FactorPredictorConfig> {
        let path = self.dir.join("model_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model config '{}'", path.display()))
    }

    /// Epoch number of the most recent `save_model` call.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Have you run 'train' first?", path.display())
        })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
