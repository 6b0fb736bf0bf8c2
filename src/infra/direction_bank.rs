// ============================================================
// Layer 6 - Direction Bank (linear InterFaceGAN editor)
// ============================================================
// InterFaceGAN edits a latent by moving it along the normal of
// a semantic boundary learned in latent space:
//
//   edited = latent + factor * boundary
//
// A boundary is either one row (length cols), added to every
// row of the latent, or a full rows*cols matrix.
//
// Boundaries live on disk as one JSON array per direction:
//
//   <boundaries_dir>/
//     age.json      ← [f32; cols] or [f32; rows*cols]
//     gender.json
//     smile.json
//
// Edits are refused, never clamped: an unknown direction, a
// factor outside [-max_abs_factor, max_abs_factor], a
// non-finite factor or a latent of the wrong shape all return
// an EditError, which the training loop logs and skips.

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::{collections::HashMap, fs, path::Path};

use crate::domain::direction::DirectionSpec;
use crate::domain::latent::{LatentCode, LatentShape};
use crate::domain::traits::{EditError, LatentEditor};

/// Largest factor magnitude accepted when none is configured.
pub const DEFAULT_MAX_ABS_FACTOR: f32 = 3.0;

pub struct DirectionBank {
    shape:          LatentShape,
    boundaries:     HashMap<String, Vec<f32>>,
    max_abs_factor: f32,
}

impl DirectionBank {
    pub fn new(shape: LatentShape, max_abs_factor: f32) -> Self {
        Self { shape, boundaries: HashMap::new(), max_abs_factor }
    }

    /// Register (or replace) the boundary for `name`.
    pub fn insert(&mut self, name: impl Into<String>, boundary: Vec<f32>) -> Result<()> {
        let name = name.into();
        if boundary.len() != self.shape.cols && boundary.len() != self.shape.len() {
            bail!(
                "boundary '{name}' has {} values, expected {} (one row) or {} (full latent {})",
                boundary.len(),
                self.shape.cols,
                self.shape.len(),
                self.shape
            );
        }
        if boundary.iter().any(|v| !v.is_finite()) {
            bail!("boundary '{name}' contains non-finite values");
        }
        self.boundaries.insert(name, boundary);
        Ok(())
    }

    /// Load `<dir>/<name>.json` for every direction in `directions`.
    pub fn from_dir(
        dir:            impl AsRef<Path>,
        directions:     &DirectionSpec,
        shape:          LatentShape,
        max_abs_factor: f32,
    ) -> Result<Self> {
        let dir      = dir.as_ref();
        let mut bank = Self::new(shape, max_abs_factor);

        for name in directions.iter() {
            let path = dir.join(format!("{name}.json"));
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read boundary '{}'", path.display()))?;
            let boundary: Vec<f32> = serde_json::from_str(&json)
                .with_context(|| format!("Malformed boundary file '{}'", path.display()))?;
            bank.insert(name, boundary)?;
        }

        tracing::info!("Loaded {} boundaries from '{}'", bank.len(), dir.display());
        Ok(bank)
    }

    /// Seeded random unit-norm row boundaries, one per direction.
    pub fn random(
        directions:     &DirectionSpec,
        shape:          LatentShape,
        max_abs_factor: f32,
        seed:           u64,
    ) -> Self {
        let mut rng  = StdRng::seed_from_u64(seed);
        let mut bank = Self::new(shape, max_abs_factor);

        for name in directions.iter() {
            let raw: Vec<f32> = (&mut rng).sample_iter(StandardNormal).take(shape.cols).collect();
            let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
            bank.boundaries
                .insert(name.to_string(), raw.into_iter().map(|v| v / norm).collect());
        }

        tracing::debug!("Generated {} random boundaries (seed={})", bank.len(), seed);
        bank
    }

    pub fn max_abs_factor(&self) -> f32 {
        self.max_abs_factor
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }
}

impl LatentEditor for DirectionBank {
    fn apply(&self, latent: &LatentCode, direction: &str, factor: f32) -> Result<LatentCode, EditError> {
        let boundary = self
            .boundaries
            .get(direction)
            .ok_or_else(|| EditError::UnknownDirection(direction.to_string()))?;

        if !factor.is_finite() || factor.abs() > self.max_abs_factor {
            return Err(EditError::FactorOutOfRange {
                direction: direction.to_string(),
                factor,
                limit: self.max_abs_factor,
            });
        }
        if latent.shape() != self.shape {
            return Err(EditError::ShapeMismatch { expected: self.shape, actual: latent.shape() });
        }

        let width  = boundary.len();
        let values = latent
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| v + factor * boundary[i % width])
            .collect();

        LatentCode::new(self.shape, values).map_err(|e| EditError::Backend(e.to_string()))
    }
}
