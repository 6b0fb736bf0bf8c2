// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Epoch loop for the direction-factor predictor.
//
// Per batch:
//   1. move father/mother latents to the training device
//   2. forward pass → factors [batch, num_directions]
//   3. copy factors and father latents to the host; this
//      detaches them from the autodiff graph
//   4. for every sample, fold its factors over the direction
//      list with the latent editor (a failed edit is skipped)
//   5. hand every edited sample to the EditObjective; if any
//      sample yields a loss: mean over the batch, backward,
//      clip the gradient norm, AdamW step
//
// Per epoch: step the plateau scheduler (only when a loss was
// computed), print the summary, save checkpoint_epoch_<n>,
// append a metrics row. Checkpoint I/O errors stop training.
//
// Key Burn 0.20 insight:
//   - the model lives on an AutodiffBackend while training, so
//     dropout is active and batch norm updates running stats
//   - model.valid() returns the model on the inner backend in
//     evaluation mode, used by predict()
//
// Reference: Loshchilov & Hutter (2019) AdamW

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::DataLoader,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::batcher::LatentPairBatch;
use crate::domain::direction::DirectionSpec;
use crate::domain::edit_chain::{chain_edits, EditOutcome};
use crate::domain::latent::LatentCode;
use crate::domain::traits::LatentEditor;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::DirectionFactorPredictor;
use crate::ml::scheduler::{PlateauConfig, PlateauScheduler};

// ─── Configuration ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub learning_rate:   f64,
    pub weight_decay:    f32,
    /// Maximum L2 norm of the gradient before each optimizer step.
    pub clip_value:      f32,
    pub scheduler:       PlateauConfig,
    /// Print one progress line per batch.
    pub log_every_batch: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate:   5e-5,
            weight_decay:    1e-5,
            clip_value:      1.0,
            scheduler:       PlateauConfig::default(),
            log_every_batch: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerMode {
    Training,
    Evaluating,
}

// ─── Objective ───────────────────────────────────────────────────────────────
/// Everything known about one sample after its edits were applied.
pub struct EditedSample<'a, B: Backend> {
    /// Position of the sample in its batch.
    pub index:   usize,
    /// This sample's row of the prediction, still attached to the graph.
    /// shape: [num_directions]
    pub factors: Tensor<B, 1>,
    /// shape: [rows, cols]
    pub father:  Tensor<B, 2>,
    /// shape: [rows, cols]
    pub mother:  Tensor<B, 2>,
    pub outcome: &'a EditOutcome,
}

/// Turns an edited sample into a training loss.
///
/// Return a one-element tensor to contribute to the batch loss, or
/// `None` to leave the sample out. The batch loss is the sum of the
/// returned values divided by the batch size. A batch where every
/// sample returns `None` causes no parameter update.
///
/// The edited latent in `outcome` is plain host data, so gradients
/// can only reach the model through `factors`.
pub trait EditObjective<B: AutodiffBackend> {
    fn sample_loss(&self, sample: EditedSample<'_, B>) -> Option<Tensor<B, 1>>;
}

/// Applies the edits but never produces a loss, so the model is
/// never updated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObjective;

impl<B: AutodiffBackend> EditObjective<B> for NoObjective {
    fn sample_loss(&self, _sample: EditedSample<'_, B>) -> Option<Tensor<B, 1>> {
        None
    }
}

// ─── Batch source ────────────────────────────────────────────────────────────
/// Anything the trainer can pull one epoch of batches from.
pub trait BatchSource<B: Backend> {
    fn batches(&self) -> Box<dyn Iterator<Item = LatentPairBatch<B>> + '_>;
}

impl<B: Backend> BatchSource<B> for Arc<dyn DataLoader<B, LatentPairBatch<B>>> {
    fn batches(&self) -> Box<dyn Iterator<Item = LatentPairBatch<B>> + '_> {
        Box::new(self.iter())
    }
}

impl<B: Backend> BatchSource<B> for Vec<LatentPairBatch<B>> {
    fn batches(&self) -> Box<dyn Iterator<Item = LatentPairBatch<B>> + '_> {
        Box::new(self.iter().cloned())
    }
}

// ─── Trainer ─────────────────────────────────────────────────────────────────
pub struct Trainer<B: AutodiffBackend, E, O = NoObjective> {
    model:       DirectionFactorPredictor<B>,
    directions:  DirectionSpec,
    editor:      E,
    objective:   O,
    checkpoints: CheckpointManager,
    metrics:     Option<MetricsLogger>,
    config:      TrainerConfig,
    scheduler:   PlateauScheduler,
    mode:        TrainerMode,
    device:      B::Device,
}

#[derive(Default)]
struct BatchTally {
    loss:    Option<f64>,
    applied: usize,
    skipped: usize,
}

impl<B, E> Trainer<B, E, NoObjective>
where
    B: AutodiffBackend,
    E: LatentEditor,
{
    /// `directions` must be the list the model was built with, in the
    /// same order: column i of the prediction is edited as direction i.
    pub fn new(
        model:       DirectionFactorPredictor<B>,
        directions:  DirectionSpec,
        editor:      E,
        checkpoints: CheckpointManager,
        config:      TrainerConfig,
        device:      B::Device,
    ) -> Result<Self> {
        if directions != *model.directions() {
            return Err(anyhow!(
                "model predicts factors for {:?} but directions {:?} were given",
                model.directions().names(),
                directions.names()
            ));
        }

        let scheduler = PlateauScheduler::new(config.learning_rate, config.scheduler.clone());
        Ok(Self {
            model,
            directions,
            editor,
            objective: NoObjective,
            checkpoints,
            metrics: None,
            config,
            scheduler,
            mode: TrainerMode::Training,
            device,
        })
    }
}

impl<B, E, O> Trainer<B, E, O>
where
    B: AutodiffBackend,
    E: LatentEditor,
    O: EditObjective<B>,
{
    pub fn with_objective<O2: EditObjective<B>>(self, objective: O2) -> Trainer<B, E, O2> {
        Trainer {
            model:       self.model,
            directions:  self.directions,
            editor:      self.editor,
            objective,
            checkpoints: self.checkpoints,
            metrics:     self.metrics,
            config:      self.config,
            scheduler:   self.scheduler,
            mode:        self.mode,
            device:      self.device,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn model(&self) -> &DirectionFactorPredictor<B> {
        &self.model
    }

    pub fn mode(&self) -> TrainerMode {
        self.mode
    }

    pub fn learning_rate(&self) -> f64 {
        self.scheduler.lr()
    }

    /// Run `num_epochs` passes over `source`, saving a checkpoint after each.
    ///
    /// The optimizer state lives for the duration of this call.
    pub fn train<S>(&mut self, source: &S, num_epochs: usize) -> Result<Vec<EpochMetrics>>
    where
        S: BatchSource<B> + ?Sized,
    {
        self.mode = TrainerMode::Training;
        let result = self.run_epochs(source, num_epochs);
        self.mode = TrainerMode::Evaluating;
        result
    }

    fn run_epochs<S>(&mut self, source: &S, num_epochs: usize) -> Result<Vec<EpochMetrics>>
    where
        S: BatchSource<B> + ?Sized,
    {
        // Momentum and variance estimates for every parameter.
        let mut optim = AdamWConfig::new()
            .with_weight_decay(self.config.weight_decay)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(self.config.clip_value)))
            .init::<B, DirectionFactorPredictor<B>>();

        tracing::info!(
            "Training for {} epochs, lr={:.3e}, directions={:?}",
            num_epochs,
            self.scheduler.lr(),
            self.directions.names()
        );

        let mut history = Vec::with_capacity(num_epochs);

        for epoch in 1..=num_epochs {
            let mut model      = self.model.clone();
            let mut total_loss = None::<f64>;
            let mut batches    = 0usize;
            let mut samples    = 0usize;
            let mut applied    = 0usize;
            let mut skipped    = 0usize;

            for batch in source.batches() {
                let batch_size = batch.batch_size();
                let (next, tally) = self.train_batch(model, batch, &mut optim)?;
                model = next;

                if let Some(loss) = tally.loss {
                    *total_loss.get_or_insert(0.0) += loss;
                }
                batches += 1;
                samples += batch_size;
                applied += tally.applied;
                skipped += tally.skipped;
            }
            self.model = model;

            if let Some(loss) = total_loss {
                self.scheduler.step(loss);
            }

            println!("Epoch {}/{}, Loss: {}", epoch, num_epochs, total_loss.unwrap_or(0.0));

            self.checkpoints.save_model(&self.model, epoch)?;

            let metrics = EpochMetrics {
                epoch,
                total_loss,
                learning_rate: self.scheduler.lr(),
                batches,
                samples,
                edits_applied: applied,
                edits_skipped: skipped,
            };
            if let Some(logger) = &self.metrics {
                logger.log(&metrics)?;
            }
            history.push(metrics);
        }

        tracing::info!("Training complete!");
        Ok(history)
    }

    fn train_batch<OP>(
        &self,
        model: DirectionFactorPredictor<B>,
        batch: LatentPairBatch<B>,
        optim: &mut OP,
    ) -> Result<(DirectionFactorPredictor<B>, BatchTally)>
    where
        OP: Optimizer<DirectionFactorPredictor<B>, B>,
    {
        let batch      = batch.to_device(&self.device);
        let batch_size = batch.batch_size();
        let shape      = model.latent_shape();
        let n          = self.directions.len();

        let factors = model.forward(batch.father_latent.clone(), batch.mother_latent.clone())?;

        if self.config.log_every_batch {
            println!(
                "Processed batch with {} samples. Factors shape: {:?}",
                batch_size,
                factors.dims()
            );
        }

        let factor_values = host_values(factors.clone())?;
        let father_values = host_values(batch.father_latent.clone())?;

        let mut tally  = BatchTally::default();
        let mut losses = Vec::new();

        for (b, (row, start)) in factor_values
            .chunks(n)
            .zip(father_values.chunks(shape.len()))
            .enumerate()
        {
            let start   = LatentCode::new(shape, start.to_vec())?;
            let outcome = chain_edits(&self.editor, start, &self.directions, row);
            tally.applied += outcome.applied.len();
            tally.skipped += outcome.skipped.len();
            if !outcome.all_applied() {
                tracing::debug!("sample {b}: {} of {n} edits skipped", outcome.skipped.len());
            }

            let sample = EditedSample {
                index:   b,
                factors: factors.clone().slice([b..b + 1, 0..n]).reshape([n]),
                father:  parent_slice(&batch.father_latent, b),
                mother:  parent_slice(&batch.mother_latent, b),
                outcome: &outcome,
            };
            if let Some(loss) = self.objective.sample_loss(sample) {
                losses.push(loss);
            }
        }

        if losses.is_empty() {
            return Ok((model, tally));
        }

        let batch_loss = Tensor::cat(losses, 0).sum().div_scalar(batch_size as f32);
        let loss_value = batch_loss.clone().into_scalar().elem::<f64>();
        tracing::debug!("batch loss={:.6} over {} samples", loss_value, batch_size);

        let grads = batch_loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        let model = optim.step(self.scheduler.lr(), model, grads);

        tally.loss = Some(loss_value);
        Ok((model, tally))
    }

    /// Factors for a batch in evaluation mode (no dropout, running stats).
    pub fn predict(
        &self,
        father: Tensor<B::InnerBackend, 3>,
        mother: Tensor<B::InnerBackend, 3>,
    ) -> Result<Tensor<B::InnerBackend, 2>> {
        Ok(self.model.valid().forward(father, mother)?)
    }

    pub fn save_model(&self, name: &str) -> Result<PathBuf> {
        self.checkpoints.save_named(&self.model, name)
    }

    pub fn load_model(&mut self, name: &str) -> Result<()> {
        self.model = self.checkpoints.load_named(self.model.clone(), name, &self.device)?;
        Ok(())
    }
}

fn host_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read tensor data: {e:?}"))
}

/// Sample `b` of a [batch, rows, cols] tensor as [rows, cols].
fn parent_slice<B: Backend>(latents: &Tensor<B, 3>, b: usize) -> Tensor<B, 2> {
    let [_, rows, cols] = latents.dims();
    latents.clone().slice([b..b + 1, 0..rows, 0..cols]).reshape([rows, cols])
}
