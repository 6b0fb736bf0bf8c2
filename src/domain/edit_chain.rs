// ============================================================
// Layer 3 - Sequential Edit Chain
// ============================================================
// Applies one factor per direction to a single latent code,
// in declared direction order. Each edit consumes the output
// of the previous one, so this is a left fold over the
// direction list and the order can never be changed.
//
// A failing edit is skipped: the working latent stays as it
// was before that direction, the failure is logged, and the
// fold moves on to the next direction.

use crate::domain::direction::DirectionSpec;
use crate::domain::latent::LatentCode;
use crate::domain::traits::{EditError, LatentEditor};

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEdit {
    pub direction: String,
    pub factor:    f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEdit {
    pub direction: String,
    pub factor:    f32,
    pub error:     EditError,
}

/// Final latent of one sample plus a record of what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub latent:  LatentCode,
    pub applied: Vec<AppliedEdit>,
    pub skipped: Vec<SkippedEdit>,
}

impl EditOutcome {
    pub fn all_applied(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fold `factors[i]` for `directions[i]` over `start`.
///
/// `factors` must have one entry per direction; extra entries are
/// ignored and missing ones end the fold early.
pub fn chain_edits<E>(
    editor:     &E,
    start:      LatentCode,
    directions: &DirectionSpec,
    factors:    &[f32],
) -> EditOutcome
where
    E: LatentEditor + ?Sized,
{
    let init = EditOutcome { latent: start, applied: Vec::new(), skipped: Vec::new() };

    directions
        .iter()
        .zip(factors.iter().copied())
        .fold(init, |mut outcome, (direction, factor)| {
            match editor.apply(&outcome.latent, direction, factor) {
                Ok(edited) if edited.shape() == outcome.latent.shape() => {
                    outcome.latent = edited;
                    outcome.applied.push(AppliedEdit { direction: direction.to_string(), factor });
                }
                Ok(edited) => {
                    let error = EditError::ShapeMismatch {
                        expected: outcome.latent.shape(),
                        actual:   edited.shape(),
                    };
                    tracing::warn!("Error applying edit {direction} with factor {factor}: {error}");
                    outcome.skipped.push(SkippedEdit { direction: direction.to_string(), factor, error });
                }
                Err(error) => {
                    tracing::warn!("Error applying edit {direction} with factor {factor}: {error}");
                    outcome.skipped.push(SkippedEdit { direction: direction.to_string(), factor, error });
                }
            }
            outcome
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::latent::LatentShape;

    /// Adds `factor * (index + 1)` to every value, or refuses
    /// one named direction.
    struct OffsetEditor {
        spec:    DirectionSpec,
        refuses: Option<&'static str>,
    }

    impl LatentEditor for OffsetEditor {
        fn apply(&self, latent: &LatentCode, direction: &str, factor: f32) -> Result<LatentCode, EditError> {
            if Some(direction) == self.refuses {
                return Err(EditError::Backend("refused".into()));
            }
            let idx = self
                .spec
                .index_of(direction)
                .ok_or_else(|| EditError::UnknownDirection(direction.to_string()))?;
            let step   = factor * (idx as f32 + 1.0);
            let values = latent.values().iter().map(|v| v + step).collect();
            Ok(LatentCode::new(latent.shape(), values).unwrap())
        }
    }

    /// Scales every value, so applying it before or after an
    /// offset gives a different result.
    struct OrderSensitiveEditor;

    impl LatentEditor for OrderSensitiveEditor {
        fn apply(&self, latent: &LatentCode, direction: &str, factor: f32) -> Result<LatentCode, EditError> {
            let values = latent
                .values()
                .iter()
                .map(|v| if direction == "scale" { v * factor } else { v + factor })
                .collect();
            Ok(LatentCode::new(latent.shape(), values).unwrap())
        }
    }

    fn start() -> LatentCode {
        LatentCode::new(LatentShape::new(1, 2), vec![1.0, 2.0]).unwrap()
    }

    #[test]
    fn test_applies_every_direction_in_order() {
        let spec   = DirectionSpec::default();
        let editor = OffsetEditor { spec: spec.clone(), refuses: None };
        let out    = chain_edits(&editor, start(), &spec, &[1.0, 1.0, 1.0]);

        // 1 + 2 + 3 added to each value
        assert_eq!(out.latent.values(), &[7.0, 8.0]);
        assert_eq!(out.applied.len(), 3);
        assert!(out.all_applied());
    }

    #[test]
    fn test_failed_direction_equals_chain_without_it() {
        let spec    = DirectionSpec::default();
        let failing = OffsetEditor { spec: spec.clone(), refuses: Some("gender") };
        let out     = chain_edits(&failing, start(), &spec, &[0.5, -2.0, 0.25]);

        let without_gender = DirectionSpec::new(["age", "smile"]).unwrap();
        let healthy        = OffsetEditor { spec: spec.clone(), refuses: None };
        let expected       = chain_edits(&healthy, start(), &without_gender, &[0.5, 0.25]);

        assert_eq!(out.latent, expected.latent);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].direction, "gender");
        assert_eq!(out.skipped[0].factor, -2.0);
    }

    #[test]
    fn test_every_direction_failing_keeps_start() {
        let spec   = DirectionSpec::new(["unknown_a", "unknown_b"]).unwrap();
        let editor = OffsetEditor { spec: DirectionSpec::default(), refuses: None };
        let out    = chain_edits(&editor, start(), &spec, &[1.0, 1.0]);
        assert_eq!(out.latent, start());
        assert_eq!(out.skipped.len(), 2);
    }

    #[test]
    fn test_order_is_preserved() {
        let forward  = DirectionSpec::new(["shift", "scale"]).unwrap();
        let backward = DirectionSpec::new(["scale", "shift"]).unwrap();
        let a = chain_edits(&OrderSensitiveEditor, start(), &forward, &[1.0, 2.0]);
        let b = chain_edits(&OrderSensitiveEditor, start(), &backward, &[2.0, 1.0]);
        // (x + 1) * 2 vs x * 2 + 1
        assert_eq!(a.latent.values(), &[4.0, 6.0]);
        assert_eq!(b.latent.values(), &[3.0, 5.0]);
    }

    #[test]
    fn test_wrong_shape_from_editor_is_skipped() {
        struct Shrinker;
        impl LatentEditor for Shrinker {
            fn apply(&self, _: &LatentCode, _: &str, _: f32) -> Result<LatentCode, EditError> {
                Ok(LatentCode::zeros(LatentShape::new(1, 1)))
            }
        }
        let spec = DirectionSpec::new(["age"]).unwrap();
        let out  = chain_edits(&Shrinker, start(), &spec, &[1.0]);
        assert_eq!(out.latent, start());
        assert!(matches!(out.skipped[0].error, EditError::ShapeMismatch { .. }));
    }
}
