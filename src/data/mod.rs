// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between a latent dump on disk and the tensor
// batches the trainer iterates over:
//
//   pairs.json / synthetic generator
//       │
//       ▼
//   JsonPairLoader      → reads and flattens parent latents
//       │
//       ▼
//   LatentPairDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   LatentPairBatcher   → stacks pairs into [batch, rows, cols]
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop

/// Reads latent pairs from a JSON file
pub mod loader;

/// Implements Burn's Dataset trait for latent pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
