//! Read-only access to the optional pre-trained water classifier.
//!
//! The artifact is a JSON export of the fitted classifier's feature
//! attributes:
//!
//! ```text
//! { "feature_names": ["VV", "VH", "NDWI"], "feature_importances": [0.41, 0.33, 0.26] }
//! ```
//!
//! The dashboard only needs the importance vector. A missing artifact is the
//! normal case and yields [`ModelAdapter::Absent`].

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

/// One feature and its importance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScore {
    pub feature: String,
    pub importance: f64,
}

/// Importance scores sorted from most to least important.
///
/// Scores are reported as stored and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub scores: Vec<FeatureScore>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelAdapter {
    Loaded(FeatureImportance),
    Absent,
}

impl ModelAdapter {
    /// Load the artifact at `path`.
    ///
    /// A missing file is `Absent`. A file that exists but cannot be parsed is
    /// logged and also treated as `Absent`.
    pub fn load(path: &Path) -> ModelAdapter {
        if !path.exists() {
            log::info!("[WSD] model: no artifact at {}, feature importance disabled", path.display());
            return ModelAdapter::Absent;
        }
        match read_artifact(path) {
            Ok(importance) => {
                log::info!(
                    "[WSD] model: Loaded {} feature importances from {}",
                    importance.scores.len(),
                    path.display()
                );
                ModelAdapter::Loaded(importance)
            }
            Err(e) => {
                log::warn!("[WSD] model: ignoring unreadable artifact: {:#}", e);
                ModelAdapter::Absent
            }
        }
    }

    pub fn feature_importance(&self) -> Option<&FeatureImportance> {
        match self {
            ModelAdapter::Loaded(importance) => Some(importance),
            ModelAdapter::Absent => None,
        }
    }
}

fn read_artifact(path: &Path) -> anyhow::Result<FeatureImportance> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read model artifact {}", path.display()))?;
    parse_artifact(&text).with_context(|| format!("invalid model artifact {}", path.display()))
}

pub fn parse_artifact(text: &str) -> anyhow::Result<FeatureImportance> {
    let file: ArtifactFile = serde_json::from_str(text)?;
    if file.feature_names.len() != file.feature_importances.len() {
        anyhow::bail!(
            "{} feature names but {} importances",
            file.feature_names.len(),
            file.feature_importances.len()
        );
    }
    if let Some(bad) = file.feature_importances.iter().find(|v| !v.is_finite()) {
        anyhow::bail!("non-finite importance {}", bad);
    }

    let mut scores: Vec<FeatureScore> = file
        .feature_names
        .into_iter()
        .zip(file.feature_importances)
        .map(|(feature, importance)| FeatureScore { feature, importance })
        .collect();
    scores.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    Ok(FeatureImportance { scores })
}
