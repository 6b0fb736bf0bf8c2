// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal: training the predictor, or predicting factors.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination and backend selection
//
// Reference: Clean Architecture pattern

// The training workflow
pub mod train_use_case;

// The factor prediction workflow
pub mod predict_use_case;
