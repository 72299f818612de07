//! Prediction outcome data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the model and decision rule for one submission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class ("subscribes") probability (0.0 - 1.0)
    pub probability: f64,
    /// Decision: likely to subscribe
    pub label: bool,
    /// Threshold the probability was compared against
    pub threshold_used: f64,
}

/// Direction in which a factor plausibly moves subscription likelihood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// Human-readable, rule-derived annotation of the raw inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorTag {
    pub description: String,
    pub polarity: Polarity,
    /// Display significance (0 - 100)
    pub weight: u8,
}

impl FactorTag {
    pub fn new(description: &str, polarity: Polarity, weight: u8) -> Self {
        Self {
            description: description.to_string(),
            polarity,
            weight: weight.min(100),
        }
    }
}

/// Qualitative loan-burden tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialHealth {
    Good,
    Moderate,
    AtRisk,
}

impl FinancialHealth {
    pub fn label(&self) -> &'static str {
        match self {
            FinancialHealth::Good => "Good",
            FinancialHealth::Moderate => "Moderate",
            FinancialHealth::AtRisk => "At Risk",
        }
    }
}

/// Everything the presentation layer renders for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Unique report identifier, for log correlation
    pub report_id: String,
    /// Evaluation timestamp
    pub evaluated_at: DateTime<Utc>,
    pub result: PredictionResult,
    /// Key factors, in rule order
    pub factors: Vec<FactorTag>,
    pub financial_health: FinancialHealth,
}

impl PredictionReport {
    /// Create a report for a fresh evaluation
    pub fn new(
        result: PredictionResult,
        factors: Vec<FactorTag>,
        financial_health: FinancialHealth,
    ) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            evaluated_at: Utc::now(),
            result,
            factors,
            financial_health,
        }
    }

    /// Factors with the given polarity
    pub fn factors_with(&self, polarity: Polarity) -> impl Iterator<Item = &FactorTag> {
        self.factors.iter().filter(move |f| f.polarity == polarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_weight_capped() {
        let tag = FactorTag::new("anything", Polarity::Neutral, 250);
        assert_eq!(tag.weight, 100);
    }

    #[test]
    fn test_report_serialization() {
        let report = PredictionReport::new(
            PredictionResult {
                probability: 0.42,
                label: true,
                threshold_used: 0.3,
            },
            vec![FactorTag::new("cellular contact preferred", Polarity::Positive, 60)],
            FinancialHealth::AtRisk,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["financial_health"], "at_risk");
        assert_eq!(json["factors"][0]["polarity"], "positive");
        assert_eq!(json["result"]["label"], true);

        let back: PredictionReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.report_id, report.report_id);
        assert_eq!(back.result, report.result);
    }
}
