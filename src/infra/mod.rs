// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   checkpoint.rs     - Saving and loading model weights
//                       Uses Burn's NamedMpkFileRecorder at
//                       full precision. Also saves/loads the
//                       predictor config as JSON so inference
//                       can rebuild the model.
//
//   metrics.rs        - Training metrics logging
//                       Writes one CSV row per epoch (loss,
//                       learning rate, applied/skipped edits).
//
//   direction_bank.rs - The linear InterFaceGAN editor
//                       Loads one boundary per direction from
//                       disk (or generates seeded random ones)
//                       and implements LatentEditor.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// On-disk semantic boundaries, applied as linear edits
pub mod direction_bank;
