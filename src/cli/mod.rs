// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   - trains the predictor on parent latent pairs
//   2. `predict` - loads a checkpoint and prints the factors
//                  for one parent pair
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

/// The main CLI struct. clap generates the argument parsing
/// code from the Parser derive.
#[derive(Parser, Debug)]
#[command(
    name = "interfacegan-factors",
    version,
    about = "Predict InterFaceGAN edit factors from parent latent codes."
)]
pub struct Cli {
    /// The subcommand to run (train or predict)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    match &args.pairs {
        Some(path) => tracing::info!("Starting training on pairs from: {}", path.display()),
        None       => tracing::info!("Starting training on {} synthetic pairs", args.synthetic),
    }

    let save_dir = args.save_dir.clone();
    let history  = TrainUseCase::new(args.into()).execute()?;

    let skipped: usize = history.iter().map(|m| m.edits_skipped).sum();
    println!(
        "Training complete. {} epochs, {} skipped edits. Checkpoints in '{}'.",
        history.len(),
        skipped,
        save_dir.display()
    );
    Ok(())
}

/// Handles the `predict` subcommand.
/// Prints one `direction: factor` line per direction.
fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(&args.checkpoint_dir, args.epoch, args.device.into())?;
    let factors  = use_case.predict_from_file(&args.pairs, args.index)?;

    println!("\nFactors for pair {}:", args.index);
    for (direction, factor) in factors {
        println!("  {direction:<12} {factor:+.4}");
    }
    Ok(())
}
