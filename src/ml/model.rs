use burn::{
    module::{Ignored, Param},
    nn::{
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{
        activation::{leaky_relu, relu, sigmoid},
        TensorData,
    },
};
use thiserror::Error;

use crate::domain::direction::DirectionSpec;
use crate::domain::latent::LatentShape;

/// Output widths of the three encoder stages.
pub const ENCODER_WIDTHS: [usize; 3] = [2048, 1024, 512];
/// Output widths of the two decoder stages before the factor head.
pub const DECODER_WIDTHS: [usize; 2] = [256, 128];
/// Encoder stages (from the front) that are followed by dropout.
const ENCODER_DROPOUT_STAGES: usize = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("{input} has shape {actual:?}, expected [batch, {rows}, {cols}]")]
    ShapeMismatch { input: &'static str, actual: [usize; 3], rows: usize, cols: usize },

    #[error("father batch has {father} samples but mother batch has {mother}")]
    BatchMismatch { father: usize, mother: usize },

    #[error("batch must contain at least one sample")]
    EmptyBatch,

    #[error("latent shape {0} has no values")]
    EmptyLatent(LatentShape),

    #[error("{actual} factor scales given for {expected} directions")]
    ScaleCount { expected: usize, actual: usize },

    #[error("cannot read tensor data: {0}")]
    Data(String),
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct FactorPredictorConfig {
    pub latent_rows: usize,
    pub latent_cols: usize,
    #[config(default = "DirectionSpec::default()")]
    pub directions: DirectionSpec,
    #[config(default = 0.3)]
    pub dropout: f64,
    #[config(default = 0.2)]
    pub leaky_slope: f64,
    #[config(default = 256)]
    pub attention_hidden: usize,
    /// One multiplier per direction; `None` means all ones.
    #[config(default = "None")]
    pub factor_scales: Option<Vec<f32>>,
    /// Let the optimizer update `factor_scales`.
    #[config(default = false)]
    pub learn_factor_scales: bool,
}

impl FactorPredictorConfig {
    pub fn latent_shape(&self) -> LatentShape {
        LatentShape::new(self.latent_rows, self.latent_cols)
    }

    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<DirectionFactorPredictor<B>, PredictorError> {
        let shape = self.latent_shape();
        if shape.is_empty() {
            return Err(PredictorError::EmptyLatent(shape));
        }

        let num_directions = self.directions.len();
        let scales = match &self.factor_scales {
            Some(s) if s.len() != num_directions => {
                return Err(PredictorError::ScaleCount { expected: num_directions, actual: s.len() });
            }
            Some(s) => s.clone(),
            None    => vec![1.0; num_directions],
        };

        let input_width = 2 * shape.len();
        let attention = AttentionGate {
            hidden: LinearConfig::new(input_width, self.attention_hidden).init(device),
            output: LinearConfig::new(self.attention_hidden, input_width).init(device),
        };

        let mut width = input_width;
        let encoder: Vec<ReductionBlock<B>> = ENCODER_WIDTHS
            .iter()
            .enumerate()
            .map(|(stage, &out)| {
                let block = self.build_block(width, out, stage < ENCODER_DROPOUT_STAGES, device);
                width = out;
                block
            })
            .collect();
        let decoder: Vec<ReductionBlock<B>> = DECODER_WIDTHS
            .iter()
            .map(|&out| {
                let block = self.build_block(width, out, false, device);
                width = out;
                block
            })
            .collect();
        let head = LinearConfig::new(width, num_directions).init(device);

        let scales = Tensor::<B, 1>::from_data(TensorData::new(scales, [num_directions]), device);
        let factor_scales = Param::from_tensor(scales).set_require_grad(self.learn_factor_scales);

        Ok(DirectionFactorPredictor {
            attention, encoder, decoder, head, factor_scales,
            directions:  Ignored(self.directions.clone()),
            latent_rows: self.latent_rows,
            latent_cols: self.latent_cols,
        })
    }

    fn build_block<B: Backend>(
        &self,
        d_in:    usize,
        d_out:   usize,
        dropout: bool,
        device:  &B::Device,
    ) -> ReductionBlock<B> {
        ReductionBlock {
            linear:  LinearConfig::new(d_in, d_out).init(device),
            norm:    BatchNormConfig::new(d_out).init(device),
            dropout: dropout.then(|| DropoutConfig::new(self.dropout).init()),
            slope:   self.leaky_slope,
        }
    }
}

/// Linear → LeakyReLU → BatchNorm, optionally followed by Dropout.
#[derive(Module, Debug)]
pub struct ReductionBlock<B: Backend> {
    pub linear:  Linear<B>,
    pub norm:    BatchNorm<B>,
    pub dropout: Option<Dropout>,
    pub slope:   f64,
}

impl<B: Backend> ReductionBlock<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.norm.forward(leaky_relu(self.linear.forward(x), self.slope));
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None          => x,
        }
    }
}

/// Learns a [0, 1] weight per input coordinate and multiplies it in,
/// so specific latent coordinates can be damped before encoding.
#[derive(Module, Debug)]
pub struct AttentionGate<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> AttentionGate<B> {
    pub fn forward(&self, combined: Tensor<B, 2>) -> Tensor<B, 2> {
        let weights = sigmoid(self.output.forward(relu(self.hidden.forward(combined.clone()))));
        combined * weights
    }
}

/// Maps a (father, mother) latent pair to one scaled edit factor per
/// direction.
///
/// Dropout and batch statistics follow burn's backend convention: on an
/// autodiff backend the model is in training mode (dropout active, batch
/// norm uses and updates batch statistics); after `.valid()` it is in
/// evaluation mode and fully deterministic.
#[derive(Module, Debug)]
pub struct DirectionFactorPredictor<B: Backend> {
    pub attention:     AttentionGate<B>,
    pub encoder:       Vec<ReductionBlock<B>>,
    pub decoder:       Vec<ReductionBlock<B>>,
    pub head:          Linear<B>,
    pub factor_scales: Param<Tensor<B, 1>>,
    /// Column order of the output; not part of the saved record.
    pub directions:    Ignored<DirectionSpec>,
    pub latent_rows:   usize,
    pub latent_cols:   usize,
}

impl<B: Backend> DirectionFactorPredictor<B> {
    /// father, mother: [batch, rows, cols] → factors: [batch, num_directions]
    ///
    /// Column i lies in [-scale_i, scale_i].
    pub fn forward(
        &self,
        father: Tensor<B, 3>,
        mother: Tensor<B, 3>,
    ) -> Result<Tensor<B, 2>, PredictorError> {
        let batch_size = self.check_inputs(&father, &mother)?;
        let width      = self.latent_shape().len();

        let combined = Tensor::cat(
            vec![father.reshape([batch_size, width]), mother.reshape([batch_size, width])],
            1,
        );
        let attended = self.attention.forward(combined);

        let encoded = self.encoder.iter().fold(attended, |x, block| block.forward(x));
        let decoded = self.decoder.iter().fold(encoded, |x, block| block.forward(x));
        let bounded = self.head.forward(decoded).tanh();

        Ok(bounded * self.factor_scales.val().unsqueeze::<2>())
    }

    fn check_inputs(&self, father: &Tensor<B, 3>, mother: &Tensor<B, 3>) -> Result<usize, PredictorError> {
        for (input, dims) in [("father_latent", father.dims()), ("mother_latent", mother.dims())] {
            if dims[1] != self.latent_rows || dims[2] != self.latent_cols {
                return Err(PredictorError::ShapeMismatch {
                    input,
                    actual: dims,
                    rows:   self.latent_rows,
                    cols:   self.latent_cols,
                });
            }
        }
        let (f, m) = (father.dims()[0], mother.dims()[0]);
        if f != m {
            return Err(PredictorError::BatchMismatch { father: f, mother: m });
        }
        if f == 0 {
            return Err(PredictorError::EmptyBatch);
        }
        Ok(f)
    }

    pub fn latent_shape(&self) -> LatentShape {
        LatentShape::new(self.latent_rows, self.latent_cols)
    }

    pub fn input_width(&self) -> usize {
        2 * self.latent_shape().len()
    }

    pub fn directions(&self) -> &DirectionSpec {
        &self.directions
    }

    pub fn num_directions(&self) -> usize {
        self.directions.len()
    }

    pub fn factor_scales(&self) -> Result<Vec<f32>, PredictorError> {
        self.factor_scales
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PredictorError::Data(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;
    type TrainBackend = Autodiff<NdArray>;

    fn random_latents<B: Backend>(batch: usize, rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 3> {
        Tensor::random([batch, rows, cols], Distribution::Normal(0.0, 1.0), device)
    }

    fn values<B: Backend>(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_stylegan_shape_default_directions() {
        let device = Default::default();
        let model  = FactorPredictorConfig::new(18, 512).init::<TestBackend>(&device).unwrap();
        assert_eq!(model.input_width(), 2 * 18 * 512);

        let father = random_latents::<TestBackend>(4, 18, 512, &device);
        let mother = random_latents::<TestBackend>(4, 18, 512, &device);
        let out    = model.forward(father, mother).unwrap();

        assert_eq!(out.dims(), [4, 3]);
        assert!(values(out).iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_output_width_follows_direction_count() {
        let device = Default::default();
        let dirs   = DirectionSpec::new(["age", "gender", "smile", "pose", "glasses"]).unwrap();
        let model  = FactorPredictorConfig::new(2, 4)
            .with_directions(dirs.clone())
            .init::<TestBackend>(&device)
            .unwrap();

        let out = model
            .forward(random_latents(3, 2, 4, &device), random_latents(3, 2, 4, &device))
            .unwrap();
        assert_eq!(out.dims(), [3, 5]);
        assert_eq!(model.num_directions(), 5);
        assert_eq!(model.directions(), &dirs);
    }

    #[test]
    fn test_columns_bounded_by_their_scale() {
        let device = Default::default();
        let scales = vec![0.5, 2.0, 3.0];
        let model  = FactorPredictorConfig::new(3, 5)
            .with_factor_scales(Some(scales.clone()))
            .init::<TestBackend>(&device)
            .unwrap();

        for batch in [1, 2, 7] {
            // Large inputs push tanh towards saturation.
            let father = random_latents::<TestBackend>(batch, 3, 5, &device) * 50.0;
            let mother = random_latents::<TestBackend>(batch, 3, 5, &device) * 50.0;
            let out    = values(model.forward(father, mother).unwrap());
            for (i, v) in out.iter().enumerate() {
                let s = scales[i % 3];
                assert!(v.abs() <= s, "column {} value {v} exceeds scale {s}", i % 3);
            }
        }
    }

    #[test]
    fn test_scale_count_must_match_directions() {
        let device = Default::default();
        let err = FactorPredictorConfig::new(2, 2)
            .with_factor_scales(Some(vec![1.0, 1.0]))
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert_eq!(err, PredictorError::ScaleCount { expected: 3, actual: 2 });
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let device = Default::default();
        let model  = FactorPredictorConfig::new(2, 4).init::<TestBackend>(&device).unwrap();

        let err = model
            .forward(random_latents(2, 2, 4, &device), random_latents(2, 3, 4, &device))
            .unwrap_err();
        assert!(matches!(err, PredictorError::ShapeMismatch { input: "mother_latent", .. }));

        let err = model
            .forward(random_latents(2, 2, 4, &device), random_latents(3, 2, 4, &device))
            .unwrap_err();
        assert_eq!(err, PredictorError::BatchMismatch { father: 2, mother: 3 });
    }

    #[test]
    fn test_evaluation_mode_is_deterministic() {
        let device = Default::default();
        let model  = FactorPredictorConfig::new(2, 8).init::<TrainBackend>(&device).unwrap();
        let eval   = model.valid();

        let father = random_latents(5, 2, 8, &device);
        let mother = random_latents(5, 2, 8, &device);

        let a = values(eval.forward(father.clone(), mother.clone()).unwrap());
        let b = values(eval.forward(father, mother).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_mode_without_dropout_is_deterministic() {
        let device = Default::default();
        let model  = FactorPredictorConfig::new(2, 8)
            .with_dropout(0.0)
            .init::<TrainBackend>(&device)
            .unwrap();

        let father = random_latents::<TrainBackend>(6, 2, 8, &device);
        let mother = random_latents::<TrainBackend>(6, 2, 8, &device);

        let a = values(model.forward(father.clone(), mother.clone()).unwrap());
        let b = values(model.forward(father, mother).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_scales_are_ones() {
        let device = Default::default();
        let model  = FactorPredictorConfig::new(1, 4).init::<TestBackend>(&device).unwrap();
        assert_eq!(model.factor_scales().unwrap(), vec![1.0, 1.0, 1.0]);
    }
}
