//! Prediction pipeline: artifacts in, report out.
//!
//! `Artifacts` is the immutable bundle produced once by the loader (or by a
//! test with stubs). `Pipeline` evaluates submissions against it with no
//! mutable state. `PredictionService` owns the lazy, load-once lifecycle and
//! remembers whether loading succeeded.

use crate::config::ArtifactsConfig;
use crate::error::{ArtifactError, PipelineError};
use crate::explain::explain;
use crate::feature_record::FeatureAssembler;
use crate::financial_health;
use crate::models::decision::DecisionRule;
use crate::models::inference::{Classifier, InferenceEngine, Preprocessor};
use crate::models::loader::ArtifactLoader;
use crate::types::customer::CustomerRecord;
use crate::types::prediction::{PredictionReport, PredictionResult};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Offline-trained artifacts, ready to serve
pub struct Artifacts {
    preprocessor: Box<dyn Preprocessor>,
    classifier: Box<dyn Classifier>,
    rule: DecisionRule,
}

impl Artifacts {
    pub fn new(
        preprocessor: Box<dyn Preprocessor>,
        classifier: Box<dyn Classifier>,
        rule: DecisionRule,
    ) -> Self {
        Self {
            preprocessor,
            classifier,
            rule,
        }
    }
}

/// Evaluates customer submissions
pub struct Pipeline {
    assembler: FeatureAssembler,
    engine: InferenceEngine,
    rule: DecisionRule,
}

impl Pipeline {
    pub fn new(artifacts: Artifacts) -> Self {
        Self {
            assembler: FeatureAssembler::new(),
            engine: InferenceEngine::new(artifacts.preprocessor, artifacts.classifier),
            rule: artifacts.rule,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.rule.threshold()
    }

    /// Probability and decision for one customer
    pub fn predict(&self, customer: &CustomerRecord) -> Result<PredictionResult, PipelineError> {
        let record = self.assembler.record_for(customer);
        let probability = self.engine.predict(&record)?;
        let result = self.rule.apply(probability);

        debug!(
            probability = result.probability,
            threshold = result.threshold_used,
            label = result.label,
            "Submission classified"
        );

        Ok(result)
    }

    /// Prediction plus the key factors and financial health for one customer
    pub fn evaluate(&self, customer: &CustomerRecord) -> Result<PredictionReport, PipelineError> {
        let result = self.predict(customer)?;
        let factors = explain(customer);
        let health =
            financial_health::score(customer.credit_default, customer.housing, customer.loan);

        Ok(PredictionReport::new(result, factors, health))
    }
}

/// Lifecycle of the artifacts behind a service
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    /// Nothing attempted yet
    NotLoaded,
    /// Artifacts loaded and serving
    Ready { threshold: f64 },
    /// Loading failed; every request reports this error
    Unavailable(ArtifactError),
}

type LoadFn = Box<dyn Fn() -> Result<Artifacts, ArtifactError> + Send + Sync>;

/// Shared entry point for the host application.
///
/// Artifacts load at most once, on first use. A failed load is kept and
/// reported per request; it does not stop the process.
pub struct PredictionService {
    assembler: FeatureAssembler,
    state: OnceLock<Result<Pipeline, ArtifactError>>,
    load: LoadFn,
}

impl PredictionService {
    /// Service loading ONNX artifacts from the configured paths
    pub fn from_config(config: ArtifactsConfig) -> Self {
        Self::with_loader(move || {
            let loader = ArtifactLoader::with_threads(config.onnx_threads)?;
            loader.load_all(&config)
        })
    }

    /// Service with a custom artifact source
    pub fn with_loader<F>(load: F) -> Self
    where
        F: Fn() -> Result<Artifacts, ArtifactError> + Send + Sync + 'static,
    {
        Self {
            assembler: FeatureAssembler::new(),
            state: OnceLock::new(),
            load: Box::new(load),
        }
    }

    /// Service over already-loaded artifacts
    pub fn ready(artifacts: Artifacts) -> Self {
        let service = Self::with_loader(|| {
            Err(ArtifactError::runtime("loader", "artifacts already provided"))
        });
        let _ = service.state.set(Ok(Pipeline::new(artifacts)));
        service
    }

    pub fn status(&self) -> ArtifactStatus {
        match self.state.get() {
            None => ArtifactStatus::NotLoaded,
            Some(Ok(pipeline)) => ArtifactStatus::Ready {
                threshold: pipeline.threshold(),
            },
            Some(Err(e)) => ArtifactStatus::Unavailable(e.clone()),
        }
    }

    /// Load artifacts now if that has not happened yet
    pub fn pipeline(&self) -> Result<&Pipeline, PipelineError> {
        let state = self.state.get_or_init(|| {
            let loaded = (self.load)().map(Pipeline::new);
            if let Err(e) = &loaded {
                warn!(error = %e, "Artifacts unavailable, predictions disabled");
            }
            loaded
        });

        state.as_ref().map_err(|e| PipelineError::ModelUnavailable(e.clone()))
    }

    /// Evaluate a typed customer record
    pub fn evaluate(&self, customer: &CustomerRecord) -> Result<PredictionReport, PipelineError> {
        customer.validate()?;
        self.pipeline()?.evaluate(customer)
    }

    /// Evaluate a raw form submission
    pub fn evaluate_fields(
        &self,
        fields: &Map<String, Value>,
    ) -> Result<PredictionReport, PipelineError> {
        let customer = self.assembler.customer_from_fields(fields)?;
        self.evaluate(&customer)
    }
}

/// Evaluate one submission on a blocking thread, bounded by `timeout`.
///
/// A timed-out evaluation keeps running to completion on its thread; only
/// the answer is abandoned. A panicked evaluation is reported as malformed
/// output.
pub async fn evaluate_with_timeout(
    service: Arc<PredictionService>,
    fields: Map<String, Value>,
    timeout: Duration,
) -> Result<PredictionReport, PipelineError> {
    let task = tokio::task::spawn_blocking(move || service.evaluate_fields(&fields));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(PipelineError::MalformedOutput(format!(
            "evaluation panicked: {}",
            join_error
        ))),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Evaluation timed out");
            Err(PipelineError::TimedOut(timeout))
        }
    }
}
