// ============================================================
// Layer 4 - Latent Pair Loader
// ============================================================
// Reads parent latent pairs from a JSON file. The file is an
// array of objects keyed the same way the training batches
// are:
//
//   [
//     { "father_latent": [[...cols...], ...rows...],
//       "mother_latent": [[...cols...], ...rows...] },
//     ...
//   ]
//
// Each matrix is flattened row-major. Rows must all be the
// same width; the dataset checks the overall shape later.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::domain::pair::LatentPair;
use crate::domain::traits::PairSource;

#[derive(Debug, Deserialize)]
struct RawPair {
    father_latent: Vec<Vec<f32>>,
    mother_latent: Vec<Vec<f32>>,
}

pub struct JsonPairLoader {
    path: PathBuf,
}

impl JsonPairLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PairSource for JsonPairLoader {
    fn load_all(&self) -> Result<Vec<LatentPair>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read latent pairs from '{}'", self.path.display()))?;

        let raw: Vec<RawPair> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed latent pair file '{}'", self.path.display()))?;

        let mut pairs = Vec::with_capacity(raw.len());
        for (idx, p) in raw.into_iter().enumerate() {
            let father = flatten(p.father_latent)
                .with_context(|| format!("pair {idx}: father_latent"))?;
            let mother = flatten(p.mother_latent)
                .with_context(|| format!("pair {idx}: mother_latent"))?;
            pairs.push(LatentPair::new(father, mother));
        }

        tracing::info!("Loaded {} latent pairs from '{}'", pairs.len(), self.path.display());
        Ok(pairs)
    }
}

fn flatten(rows: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(r) = rows.iter().position(|row| row.len() != width) {
        bail!("row {r} has {} values, expected {width}", rows[r].len());
    }
    Ok(rows.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_and_flattens() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.json");
        fs::write(
            &path,
            r#"[{"father_latent": [[1, 2], [3, 4]], "mother_latent": [[5, 6], [7, 8]]}]"#,
        )
        .unwrap();

        let pairs = JsonPairLoader::new(&path).load_all().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].father, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(pairs[0].mother, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.json");
        fs::write(
            &path,
            r#"[{"father_latent": [[1, 2], [3]], "mother_latent": [[5, 6], [7, 8]]}]"#,
        )
        .unwrap();

        let err = JsonPairLoader::new(&path).load_all().unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonPairLoader::new(dir.path().join("nope.json")).load_all().is_err());
    }
}
