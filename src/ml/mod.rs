// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here.
//
//   model.rs      - DirectionFactorPredictor
//                   attention gate → encoder (w→2048→1024→512)
//                   → decoder (512→256→128) → tanh head
//                   → per-direction factor scales
//
//   scheduler.rs  - Reduce-on-plateau learning-rate schedule
//
//   trainer.rs    - The training loop
//                   forward pass, sequential per-sample edits,
//                   pluggable objective, AdamW step, checkpoint
//                   saving per epoch
//
//   inferencer.rs - Loads a checkpoint and predicts the factors
//                   for a single parent pair
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Shen et al. (2020) InterFaceGAN

/// Direction-factor predictor architecture
pub mod model;

/// Plateau learning-rate scheduler
pub mod scheduler;

/// Training loop with edit application and checkpointing
pub mod trainer;

/// Inference engine - loads checkpoint and predicts factors
pub mod inferencer;
