// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::{ComputeDevice, TrainConfig};
use crate::domain::direction::DirectionSpec;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the direction-factor predictor on parent latent pairs
    Train(TrainArgs),

    /// Predict edit factors for one parent pair with a trained checkpoint
    Predict(PredictArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Wgpu,
}

impl From<DeviceArg> for ComputeDevice {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu  => ComputeDevice::Cpu,
            DeviceArg::Wgpu => ComputeDevice::Wgpu,
        }
    }
}

fn parse_directions(s: &str) -> Result<DirectionSpec, String> {
    DirectionSpec::new(s.split(',').map(str::trim).filter(|n| !n.is_empty()))
        .map_err(|e| e.to_string())
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0)  => Err("batch size must be at least 1".to_string()),
        Ok(n)  => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON file of {father_latent, mother_latent} pairs
    #[arg(long, conflicts_with = "synthetic")]
    pub pairs: Option<PathBuf>,

    /// Train on this many seeded random pairs instead of a file
    #[arg(long, default_value_t = 64)]
    pub synthetic: usize,

    /// Directory holding one <direction>.json boundary per direction;
    /// random boundaries are used when omitted
    #[arg(long)]
    pub boundaries_dir: Option<PathBuf>,

    /// Largest factor magnitude the editor accepts
    #[arg(long, default_value_t = 3.0)]
    pub max_abs_factor: f32,

    /// Directory for checkpoints, model config and metrics
    #[arg(long, default_value = "models")]
    pub save_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Rows of one latent code (18 for StyleGAN2 W+)
    #[arg(long, default_value_t = 18)]
    pub latent_rows: usize,

    /// Columns of one latent code
    #[arg(long, default_value_t = 512)]
    pub latent_cols: usize,

    /// Comma-separated edit directions, applied in this order
    #[arg(long, value_parser = parse_directions, default_value = "age,gender,smile")]
    pub directions: DirectionSpec,

    /// Dropout after the first two encoder stages
    #[arg(long, default_value_t = 0.3)]
    pub dropout: f64,

    /// Comma-separated per-direction output scales (default all 1.0)
    #[arg(long, value_delimiter = ',')]
    pub factor_scales: Option<Vec<f32>>,

    /// Let the optimizer update the factor scales
    #[arg(long)]
    pub learn_factor_scales: bool,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 8, value_parser = parse_batch_size)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-5)]
    pub weight_decay: f32,

    /// Maximum gradient L2 norm per step
    #[arg(long, default_value_t = 1.0)]
    pub clip_value: f32,

    /// Epochs without improvement before the learning rate is cut
    #[arg(long, default_value_t = 15)]
    pub patience: usize,

    #[arg(long, default_value_t = 0.5)]
    pub lr_factor: f64,

    #[arg(long, default_value_t = 1e-7)]
    pub min_lr: f64,

    /// Only print the per-epoch summary
    #[arg(long)]
    pub quiet: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            pairs:               a.pairs,
            synthetic_pairs:     a.synthetic,
            boundaries_dir:      a.boundaries_dir,
            max_abs_factor:      a.max_abs_factor,
            save_dir:            a.save_dir,
            device:              a.device.into(),
            seed:                a.seed,
            latent_rows:         a.latent_rows,
            latent_cols:         a.latent_cols,
            directions:          a.directions,
            dropout:             a.dropout,
            factor_scales:       a.factor_scales,
            learn_factor_scales: a.learn_factor_scales,
            epochs:              a.epochs,
            batch_size:          a.batch_size,
            learning_rate:       a.lr,
            weight_decay:        a.weight_decay,
            clip_value:          a.clip_value,
            patience:            a.patience,
            lr_factor:           a.lr_factor,
            min_lr:              a.min_lr,
            log_every_batch:     !a.quiet,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "models")]
    pub checkpoint_dir: PathBuf,

    /// JSON file of parent pairs
    #[arg(long)]
    pub pairs: PathBuf,

    /// Which pair of the file to predict for
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// Checkpoint epoch to load (latest when omitted)
    #[arg(long)]
    pub epoch: Option<usize>,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let parsed   = train_config(&["interfacegan-factors", "train"]);
        let defaults = TrainConfig::default();
        assert_eq!(parsed.learning_rate, defaults.learning_rate);
        assert_eq!(parsed.weight_decay, defaults.weight_decay);
        assert_eq!(parsed.clip_value, defaults.clip_value);
        assert_eq!(parsed.epochs, defaults.epochs);
        assert_eq!(parsed.batch_size, defaults.batch_size);
        assert_eq!(parsed.directions, defaults.directions);
        assert_eq!(parsed.save_dir, defaults.save_dir);
        assert_eq!(parsed.max_abs_factor, defaults.max_abs_factor);
        assert!(parsed.log_every_batch);
    }

    #[test]
    fn test_train_flags() {
        let cfg = train_config(&[
            "interfacegan-factors", "train",
            "--directions", "age, smile,pose",
            "--factor-scales", "3,2,1",
            "--device", "wgpu",
            "--quiet",
        ]);
        assert_eq!(cfg.directions.names(), &["age", "smile", "pose"]);
        assert_eq!(cfg.factor_scales, Some(vec![3.0, 2.0, 1.0]));
        assert_eq!(cfg.device, ComputeDevice::Wgpu);
        assert!(!cfg.log_every_batch);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(Cli::try_parse_from(["interfacegan-factors", "train", "--batch-size", "0"]).is_err());
        assert_eq!(train_config(&["interfacegan-factors", "train", "--batch-size", "1"]).batch_size, 1);
    }

    #[test]
    fn test_duplicate_directions_are_rejected() {
        assert!(Cli::try_parse_from(["interfacegan-factors", "train", "--directions", "age,age"]).is_err());
    }

    #[test]
    fn test_predict_requires_pairs() {
        assert!(Cli::try_parse_from(["interfacegan-factors", "predict"]).is_err());

        let cli = Cli::try_parse_from([
            "interfacegan-factors", "predict", "--pairs", "p.json", "--epoch", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict(a) => {
                assert_eq!(a.epoch, Some(7));
                assert_eq!(a.index, 0);
            }
            other => panic!("expected predict, got {other:?}"),
        }
    }
}
