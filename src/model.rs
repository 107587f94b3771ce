//! Pre-trained regression models.
//!
//! Each artifact is a fitted linear regression dumped as JSON: an ordered
//! feature schema, one coefficient per feature, and an intercept. `predict`
//! demands the exact trained feature set; anything else is version skew
//! between the caller and the artifact and is surfaced as `SchemaMismatch`.
//!
//! The secondary set fans out one `ImpactInput` to five independent models.
//! A failure in one model is recorded and the remaining metrics are still
//! produced; only the caller decides how much of a partial result to show.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::error::{FleetError, Result};
use crate::types::{ImpactInput, MetricKind};

#[derive(Debug, Deserialize)]
pub struct LinearModel {
    pub name: String,
    features: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    #[cfg(test)]
    pub fn from_parts(
        name: &str,
        features: &[&str],
        coefficients: &[f64],
        intercept: f64,
    ) -> Self {
        LinearModel {
            name: name.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
            coefficients: coefficients.to_vec(),
            intercept,
        }
    }

    /// Structural checks on a freshly deserialized artifact.
    pub fn validate(&self) -> Result<()> {
        if self.features.len() != self.coefficients.len() {
            return Err(FleetError::Artifact {
                what: format!("model {}", self.name),
                reason: format!(
                    "{} features but {} coefficients",
                    self.features.len(),
                    self.coefficients.len()
                ),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for f in &self.features {
            if !seen.insert(f.as_str()) {
                return Err(FleetError::Artifact {
                    what: format!("model {}", self.name),
                    reason: format!("duplicate feature {:?}", f),
                });
            }
        }
        Ok(())
    }

    /// Evaluate the regression for one feature vector.
    ///
    /// The provided feature names must match the trained schema exactly;
    /// a missing, extra, or renamed feature fails the call. The output is
    /// not clamped: out-of-distribution inputs can legitimately predict
    /// negative values and callers must present the result as an estimate.
    pub fn predict(&self, input: &BTreeMap<String, f64>) -> Result<f64> {
        let matches = input.len() == self.features.len()
            && self.features.iter().all(|f| input.contains_key(f));
        if !matches {
            return Err(FleetError::SchemaMismatch {
                model: self.name.clone(),
                expected: self.features.join(", "),
                got: input
                    .keys()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        let mut value = self.intercept;
        for (feature, coef) in self.features.iter().zip(&self.coefficients) {
            value += coef * input[feature];
        }
        Ok(value)
    }
}

/// Result of the five-way secondary fan-out: every metric that produced a
/// value, plus the per-metric failures that were isolated.
#[derive(Debug)]
pub struct ImpactReport {
    pub values: BTreeMap<MetricKind, f64>,
    pub failures: Vec<(MetricKind, FleetError)>,
}

#[derive(Debug)]
pub struct SecondaryModels {
    models: BTreeMap<MetricKind, LinearModel>,
}

impl SecondaryModels {
    /// All five metrics must be backed by a model; a deployment that ships
    /// only some of them is rejected at startup rather than at predict time.
    pub fn new(models: BTreeMap<MetricKind, LinearModel>) -> Result<Self> {
        for kind in MetricKind::ALL {
            if !models.contains_key(&kind) {
                return Err(FleetError::Artifact {
                    what: "secondary model set".to_string(),
                    reason: format!("missing model for metric {}", kind.key()),
                });
            }
        }
        Ok(SecondaryModels { models })
    }

    /// Run every secondary model against the same impact input.
    ///
    /// Failures are isolated per metric: one model rejecting the feature
    /// schema does not suppress the other four results.
    pub fn predict_all(&self, input: &ImpactInput) -> ImpactReport {
        let features = input.features();
        let mut values = BTreeMap::new();
        let mut failures = Vec::new();
        for (kind, model) in &self.models {
            match model.predict(&features) {
                Ok(value) => {
                    values.insert(*kind, value);
                }
                Err(err) => {
                    warn!(metric = kind.key(), error = %err, "secondary predictor failed");
                    failures.push((*kind, err));
                }
            }
        }
        ImpactReport { values, failures }
    }
}
