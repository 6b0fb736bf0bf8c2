// ============================================================
// Layer 3 - Direction List
// ============================================================
// The ordered set of semantic edit directions the predictor
// emits a factor for. Column i of every prediction and entry i
// of the factor-scale vector both belong to `names[i]`, and
// edits are applied in this order during training.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DIRECTIONS: [&str; 3] = ["age", "gender", "smile"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectionSpecError {
    #[error("direction list is empty")]
    Empty,

    #[error("direction '{0}' is listed more than once")]
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DirectionSpec {
    names: Vec<String>,
}

impl DirectionSpec {
    pub fn new<I, S>(names: I) -> Result<Self, DirectionSpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DirectionSpecError::Empty);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(DirectionSpecError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for DirectionSpec {
    fn default() -> Self {
        Self { names: DEFAULT_DIRECTIONS.iter().map(|s| s.to_string()).collect() }
    }
}

impl TryFrom<Vec<String>> for DirectionSpec {
    type Error = DirectionSpecError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<DirectionSpec> for Vec<String> {
    fn from(spec: DirectionSpec) -> Self {
        spec.names
    }
}
