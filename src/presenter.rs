//! Text rendering of prediction outcomes.
//!
//! One adapter, several templates. Templates only change layout; every
//! template renders the same report.

use crate::config::TemplateKind;
use crate::error::PipelineError;
use crate::types::prediction::{Polarity, PredictionReport};
use std::fmt::Write;

/// Renders reports and request failures with a chosen template
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    template: TemplateKind,
}

impl Presenter {
    pub fn new(template: TemplateKind) -> Self {
        Self { template }
    }

    pub fn template(&self) -> TemplateKind {
        self.template
    }

    /// Render a successful evaluation
    pub fn render(&self, report: &PredictionReport) -> String {
        match self.template {
            TemplateKind::Banner => banner(report),
            TemplateKind::Card => card(report),
            TemplateKind::Json => serde_json::to_string(report)
                .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e)),
        }
    }

    /// Render a failed evaluation. Unavailable artifacts get the degraded
    /// message in place of a probability.
    pub fn render_error(&self, err: &PipelineError) -> String {
        let headline = match err {
            PipelineError::ModelUnavailable(_) => {
                "Prediction unavailable: the model could not be loaded"
            }
            PipelineError::TimedOut(_) => {
                "Prediction unavailable: the model did not respond in time"
            }
            PipelineError::MissingField(_) | PipelineError::InvalidField { .. } => {
                "Submission rejected"
            }
            PipelineError::MalformedOutput(_) => "Prediction failed: unexpected model output",
        };

        match self.template {
            TemplateKind::Json => serde_json::json!({
                "status": if err.is_unavailable() { "unavailable" } else { "error" },
                "message": headline,
                "detail": err.to_string(),
            })
            .to_string(),
            _ => format!("⚠️ {} ({})", headline, err),
        }
    }
}

/// Probability as a percentage with two decimals
pub fn percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

fn verdict(report: &PredictionReport) -> &'static str {
    if report.result.label {
        "✅ Likely to Subscribe"
    } else {
        "❌ Unlikely to Subscribe"
    }
}

fn banner(report: &PredictionReport) -> String {
    format!("{} | {} Probability", verdict(report), percent(report.result.probability))
}

fn marker(polarity: Polarity) -> char {
    match polarity {
        Polarity::Positive => '+',
        Polarity::Negative => '-',
        Polarity::Neutral => '~',
    }
}

fn card(report: &PredictionReport) -> String {
    let mut out = String::new();
    let result = &report.result;

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", verdict(report));
    let _ = writeln!(
        out,
        "  Probability: {} (threshold {})",
        percent(result.probability),
        percent(result.threshold_used)
    );
    let _ = writeln!(out, "  Financial health: {}", report.financial_health.label());
    let _ = writeln!(out, "  Key factors:");
    for factor in &report.factors {
        let _ = writeln!(
            out,
            "    {} {} ({})",
            marker(factor.polarity),
            factor.description,
            factor.weight
        );
    }
    let _ = write!(out, "  Report: {}", report.report_id);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactError;
    use crate::types::prediction::{FactorTag, FinancialHealth, PredictionResult};
    use std::path::PathBuf;

    fn report(label: bool) -> PredictionReport {
        PredictionReport::new(
            PredictionResult {
                probability: 0.42,
                label,
                threshold_used: 0.3,
            },
            vec![
                FactorTag::new("previous campaign success", Polarity::Positive, 90),
                FactorTag::new("credit default risk", Polarity::Negative, 80),
            ],
            FinancialHealth::Moderate,
        )
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.42), "42.00%");
        assert_eq!(percent(1.0), "100.00%");
        assert_eq!(percent(0.1234), "12.34%");
    }

    #[test]
    fn test_banner() {
        let presenter = Presenter::new(TemplateKind::Banner);
        assert_eq!(
            presenter.render(&report(true)),
            "✅ Likely to Subscribe | 42.00% Probability"
        );
        assert!(presenter.render(&report(false)).starts_with("❌ Unlikely"));
    }

    #[test]
    fn test_card_lists_factors_and_health() {
        let text = Presenter::new(TemplateKind::Card).render(&report(true));

        assert!(text.contains("Probability: 42.00% (threshold 30.00%)"));
        assert!(text.contains("Financial health: Moderate"));
        assert!(text.contains("+ previous campaign success (90)"));
        assert!(text.contains("- credit default risk (80)"));
    }

    #[test]
    fn test_json_template() {
        let text = Presenter::new(TemplateKind::Json).render(&report(false));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["result"]["probability"], 0.42);
        assert_eq!(value["financial_health"], "moderate");
    }

    #[test]
    fn test_unavailable_has_no_probability() {
        let err = PipelineError::ModelUnavailable(ArtifactError::NotFound {
            path: PathBuf::from("artifacts/best_model.onnx"),
        });

        let text = Presenter::new(TemplateKind::Card).render_error(&err);
        assert!(text.contains("Prediction unavailable"));
        assert!(!text.contains('%'));

        let json: serde_json::Value =
            serde_json::from_str(&Presenter::new(TemplateKind::Json).render_error(&err)).unwrap();
        assert_eq!(json["status"], "unavailable");
    }
}
