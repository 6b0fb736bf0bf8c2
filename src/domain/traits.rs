// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The two collaborators the training loop talks to without
// knowing their concrete type:
//
//   - PairSource   → where parent latent pairs come from
//                    (JsonPairLoader, synthetic generator)
//   - LatentEditor → the InterFaceGAN editing capability
//                    (DirectionBank, or any external editor)

use anyhow::Result;
use thiserror::Error;

use crate::domain::latent::{LatentCode, LatentShape};
use crate::domain::pair::LatentPair;

// ─── PairSource ──────────────────────────────────────────────────────────────
/// Any component that can produce parent latent pairs.
pub trait PairSource {
    fn load_all(&self) -> Result<Vec<LatentPair>>;
}

// ─── LatentEditor ────────────────────────────────────────────────────────────
/// Why a single edit could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("unknown direction '{0}'")]
    UnknownDirection(String),

    #[error("factor {factor} for '{direction}' is outside [-{limit}, {limit}]")]
    FactorOutOfRange { direction: String, factor: f32, limit: f32 },

    #[error("editor expected a {expected} latent, got {actual}")]
    ShapeMismatch { expected: LatentShape, actual: LatentShape },

    #[error("editor failed: {0}")]
    Backend(String),
}

/// Nudges a latent code along a named semantic direction.
///
/// Implementations must return a code of the same shape as the
/// input, and may refuse (unsupported name, factor out of range).
/// The call is not differentiable: factors arrive as plain f32.
pub trait LatentEditor {
    fn apply(
        &self,
        latent:    &LatentCode,
        direction: &str,
        factor:    f32,
    ) -> Result<LatentCode, EditError>;
}

impl<E: LatentEditor + ?Sized> LatentEditor for &E {
    fn apply(&self, latent: &LatentCode, direction: &str, factor: f32) -> Result<LatentCode, EditError> {
        (**self).apply(latent, direction, factor)
    }
}

impl<E: LatentEditor + ?Sized> LatentEditor for Box<E> {
    fn apply(&self, latent: &LatentCode, direction: &str, factor: f32) -> Result<LatentCode, EditError> {
        (**self).apply(latent, direction, factor)
    }
}
