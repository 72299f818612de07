//! Threshold decision rule

use crate::error::ArtifactError;
use crate::types::prediction::PredictionResult;

/// Classify a positive-class probability against a threshold.
///
/// Exact comparison: a probability equal to the threshold is positive.
pub fn classify(probability: f64, threshold: f64) -> bool {
    probability >= threshold
}

/// Decision rule with a threshold fixed for the lifetime of the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionRule {
    threshold: f64,
}

impl DecisionRule {
    /// Create a rule, rejecting thresholds outside [0, 1].
    pub fn new(threshold: f64) -> Result<Self, ArtifactError> {
        if (0.0..=1.0).contains(&threshold) {
            Ok(Self { threshold })
        } else {
            Err(ArtifactError::ThresholdOutOfRange(threshold))
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn apply(&self, probability: f64) -> PredictionResult {
        PredictionResult {
            probability,
            label: classify(probability, self.threshold),
            threshold_used: self.threshold,
        }
    }
}
