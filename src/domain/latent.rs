// ============================================================
// Layer 3 - Latent Code Domain Types
// ============================================================
// A latent code is the generator's per-layer style matrix
// (e.g. 18 rows x 512 columns for StyleGAN2 W+).
//
// Here it lives as plain host data: a shape plus a flat,
// row-major Vec<f32>. The training loop converts each
// sample's tensor slice into a LatentCode before handing it
// to the editor, which is exactly the point where values
// leave the autodiff graph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rows x columns of a single latent code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentShape {
    pub rows: usize,
    pub cols: usize,
}

impl LatentShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of scalar values in one flattened latent.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for LatentShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("latent has {actual} values but shape {shape} needs {}", .shape.len())]
pub struct LatentLengthError {
    pub shape:  LatentShape,
    pub actual: usize,
}

/// One sample's latent code. Edits never mutate a code in place;
/// they produce a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentCode {
    shape:  LatentShape,
    values: Vec<f32>,
}

impl LatentCode {
    pub fn new(shape: LatentShape, values: Vec<f32>) -> Result<Self, LatentLengthError> {
        if values.len() != shape.len() {
            return Err(LatentLengthError { shape, actual: values.len() });
        }
        Ok(Self { shape, values })
    }

    pub fn zeros(shape: LatentShape) -> Self {
        Self { shape, values: vec![0.0; shape.len()] }
    }

    pub fn shape(&self) -> LatentShape {
        self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        let shape = LatentShape::new(2, 3);
        let err   = LatentCode::new(shape, vec![0.0; 5]).unwrap_err();
        assert_eq!(err.actual, 5);
        assert_eq!(err.shape, shape);
    }

    #[test]
    fn test_zeros_has_shape_length() {
        let code = LatentCode::zeros(LatentShape::new(2, 2));
        assert_eq!(code.values(), &[0.0; 4]);
        assert_eq!(code.shape().to_string(), "2x2");
    }
}
