// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load or synthesise parent pairs   (Layer 4 - data)
//   Step 2: Build the dataset                 (Layer 4 - data)
//   Step 3: Load or generate boundaries       (Layer 6 - infra)
//   Step 4: Prepare checkpoints and metrics   (Layer 6 - infra)
//   Step 5: Build and save the predictor      (Layer 5 - ml)
//   Step 6: Build the data loader             (Layer 4 - data)
//   Step 7: Run the training loop             (Layer 5 - ml)
//
// The compute device is picked once here and passed down as a
// concrete Burn backend; nothing below this layer chooses it.

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    data::dataloader::{DataLoader, DataLoaderBuilder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    batcher::{LatentPairBatch, LatentPairBatcher},
    dataset::{synthetic_pairs, LatentPairDataset},
    loader::JsonPairLoader,
};
use crate::domain::{
    direction::DirectionSpec,
    latent::LatentShape,
    pair::LatentPair,
    traits::PairSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    direction_bank::{DirectionBank, DEFAULT_MAX_ABS_FACTOR},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    model::FactorPredictorConfig,
    scheduler::PlateauConfig,
    trainer::{Trainer, TrainerConfig},
};

// ─── Compute Device ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    /// ndarray on the host CPU
    #[default]
    Cpu,
    /// wgpu on the default GPU adapter
    Wgpu,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs, serialisable so a run can be
// described in a file as well as on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// JSON file of parent pairs; `None` trains on synthetic pairs.
    pub pairs:               Option<PathBuf>,
    pub synthetic_pairs:     usize,
    /// Directory of `<direction>.json` boundaries; `None` uses
    /// seeded random ones.
    pub boundaries_dir:      Option<PathBuf>,
    pub max_abs_factor:      f32,
    pub save_dir:            PathBuf,
    pub device:              ComputeDevice,
    pub seed:                u64,

    pub latent_rows:         usize,
    pub latent_cols:         usize,
    pub directions:          DirectionSpec,
    pub dropout:             f64,
    pub factor_scales:       Option<Vec<f32>>,
    pub learn_factor_scales: bool,

    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    pub weight_decay:        f32,
    pub clip_value:          f32,
    pub patience:            usize,
    pub lr_factor:           f64,
    pub min_lr:              f64,
    pub log_every_batch:     bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let scheduler = PlateauConfig::default();
        let trainer   = TrainerConfig::default();
        Self {
            pairs:               None,
            synthetic_pairs:     64,
            boundaries_dir:      None,
            max_abs_factor:      DEFAULT_MAX_ABS_FACTOR,
            save_dir:            PathBuf::from("models"),
            device:              ComputeDevice::Cpu,
            seed:                42,
            latent_rows:         18,
            latent_cols:         512,
            directions:          DirectionSpec::default(),
            dropout:             0.3,
            factor_scales:       None,
            learn_factor_scales: false,
            epochs:              100,
            batch_size:          8,
            learning_rate:       trainer.learning_rate,
            weight_decay:        trainer.weight_decay,
            clip_value:          trainer.clip_value,
            patience:            scheduler.patience,
            lr_factor:           scheduler.factor,
            min_lr:              scheduler.min_lr,
            log_every_batch:     trainer.log_every_batch,
        }
    }
}

impl TrainConfig {
    pub fn latent_shape(&self) -> LatentShape {
        LatentShape::new(self.latent_rows, self.latent_cols)
    }

    pub fn model_config(&self) -> FactorPredictorConfig {
        FactorPredictorConfig::new(self.latent_rows, self.latent_cols)
            .with_directions(self.directions.clone())
            .with_dropout(self.dropout)
            .with_factor_scales(self.factor_scales.clone())
            .with_learn_factor_scales(self.learn_factor_scales)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            learning_rate:   self.learning_rate,
            weight_decay:    self.weight_decay,
            clip_value:      self.clip_value,
            scheduler:       PlateauConfig {
                patience: self.patience,
                factor:   self.lr_factor,
                min_lr:   self.min_lr,
                ..PlateauConfig::default()
            },
            log_every_batch: self.log_every_batch,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        if self.config.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        match self.config.device {
            ComputeDevice::Cpu => {
                tracing::info!("Using ndarray CPU backend");
                self.run::<Autodiff<NdArray>>(NdArrayDevice::default())
            }
            ComputeDevice::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.run::<Autodiff<Wgpu>>(device)
            }
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<Vec<EpochMetrics>> {
        let cfg   = &self.config;
        let shape = cfg.latent_shape();

        // ── Step 1: Parent pairs ──────────────────────────────────────────────
        let pairs = self.load_pairs(shape)?;

        // ── Step 2: Dataset ───────────────────────────────────────────────────
        // Every pair is checked against the latent shape here, so a bad
        // file fails before the model is even built.
        let dataset = LatentPairDataset::new(shape, pairs)?;
        tracing::info!("Dataset: {} pairs of {} latents", dataset.pair_count(), shape);

        // ── Step 3: Editing capability ────────────────────────────────────────
        let editor = match &cfg.boundaries_dir {
            Some(dir) => DirectionBank::from_dir(dir, &cfg.directions, shape, cfg.max_abs_factor)?,
            None => {
                tracing::info!("No boundaries directory given, using random boundaries");
                DirectionBank::random(&cfg.directions, shape, cfg.max_abs_factor, cfg.seed)
            }
        };

        tracing::info!(
            "Editor ready: {} boundaries, |factor| <= {}",
            editor.len(),
            editor.max_abs_factor()
        );

        // ── Step 4: Checkpoints and metrics ───────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.save_dir)?;
        let metrics      = MetricsLogger::new(&cfg.save_dir)?;
        tracing::info!("Metrics will be written to '{}'", metrics.csv_path().display());

        // ── Step 5: Model ─────────────────────────────────────────────────────
        // The config is saved first so the inferencer can rebuild the model.
        let model_cfg = cfg.model_config();
        ckpt_manager.save_config(&model_cfg)?;

        B::seed(&device, cfg.seed);
        let model = model_cfg.init::<B>(&device)?;
        tracing::info!(
            "Model ready: input width {}, {} directions",
            model.input_width(),
            model.num_directions()
        );

        // ── Step 6: Data loader ───────────────────────────────────────────────
        let loader: Arc<dyn DataLoader<B, LatentPairBatch<B>>> =
            DataLoaderBuilder::new(LatentPairBatcher::new(shape))
                .batch_size(cfg.batch_size)
                .shuffle(cfg.seed)
                .set_device(device.clone())
                .build(dataset);

        // ── Step 7: Training loop (Layer 5) ───────────────────────────────────
        let mut trainer = Trainer::new(
            model,
            cfg.directions.clone(),
            editor,
            ckpt_manager,
            cfg.trainer_config(),
            device,
        )?
        .with_metrics(metrics);

        trainer.train(&loader, cfg.epochs)
    }

    fn load_pairs(&self, shape: LatentShape) -> Result<Vec<LatentPair>> {
        let cfg = &self.config;
        match &cfg.pairs {
            Some(path) => JsonPairLoader::new(path).load_all(),
            None => {
                tracing::info!("Generating {} synthetic pairs (seed={})", cfg.synthetic_pairs, cfg.seed);
                Ok(synthetic_pairs(cfg.synthetic_pairs, shape, cfg.seed))
            }
        }
    }
}
