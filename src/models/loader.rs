//! Artifact loader: ONNX preprocessor and classifier, plain-text threshold

use crate::config::ArtifactsConfig;
use crate::error::ArtifactError;
use crate::feature_record::{feature_kind, FeatureKind, FEATURE_NAMES};
use crate::models::decision::DecisionRule;
use crate::models::inference::{OnnxClassifier, OnnxPreprocessor};
use crate::pipeline::Artifacts;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Element type of a model input, as declared by the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputElement {
    Float32,
    Float64,
    Int64,
    String,
    Other,
}

/// One declared model input
#[derive(Debug, Clone)]
pub struct ModelInput {
    pub name: String,
    pub element: InputElement,
    /// Second dimension when statically known
    pub width: Option<usize>,
}

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Declared inputs, in graph order
    pub inputs: Vec<ModelInput>,
    /// Output to read results from
    pub output_name: String,
    /// Second dimension of that output when statically known
    pub output_width: Option<usize>,
}

/// Loader for the offline-trained artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with the given ONNX intra-op thread count
    pub fn with_threads(onnx_threads: usize) -> Result<Self, ArtifactError> {
        ort::init()
            .with_name("term-deposit-predictor")
            .commit()
            .map_err(|e| ArtifactError::runtime("ONNX Runtime initialisation", e))?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load every artifact named in the configuration
    pub fn load_all(&self, config: &ArtifactsConfig) -> Result<Artifacts, ArtifactError> {
        let preprocessor = self.load_preprocessor(&config.preprocessor_path)?;
        let classifier = self.load_classifier(&config.model_path)?;

        if let (Some(produced), Some(expected)) = (
            preprocessor.output_width,
            classifier.inputs.first().and_then(|i| i.width),
        ) {
            if produced != expected {
                return Err(ArtifactError::Incompatible {
                    path: config.model_path.clone(),
                    reason: format!(
                        "expects {} features but the preprocessor produces {}",
                        expected, produced
                    ),
                });
            }
        }

        let rule = load_decision_rule(config)?;
        info!(threshold = rule.threshold(), "Decision threshold loaded");

        Ok(Artifacts::new(
            Box::new(OnnxPreprocessor::new(preprocessor)),
            Box::new(OnnxClassifier::new(classifier)),
            rule,
        ))
    }

    /// Load the preprocessing transform and check its inputs are the feature columns
    pub fn load_preprocessor<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel, ArtifactError> {
        let path = path.as_ref();
        let model = self.load_model(path, "preprocessor")?;
        check_preprocessor_inputs(path, &model.inputs)?;
        Ok(model)
    }

    /// Load the classifier
    pub fn load_classifier<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel, ArtifactError> {
        let path = path.as_ref();
        let model = self.load_model(path, "classifier")?;

        match model.inputs.as_slice() {
            [input] if matches!(input.element, InputElement::Float32) => Ok(model),
            inputs => Err(ArtifactError::Incompatible {
                path: path.to_path_buf(),
                reason: format!(
                    "expected a single float32 input, found {:?}",
                    inputs.iter().map(|i| (&i.name, i.element)).collect::<Vec<_>>()
                ),
            }),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model(&self, path: &Path, name: &str) -> Result<LoadedModel, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound {
                path: path.to_path_buf(),
            });
        }

        info!(
            model = %name,
            path = %path.display(),
            threads = self.onnx_threads,
            "Loading ONNX model"
        );

        let session = self
            .build_session(path)
            .map_err(|e| ArtifactError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let inputs: Vec<ModelInput> = session
            .inputs
            .iter()
            .map(|i| ModelInput {
                name: i.name.clone(),
                element: element_of(&i.input_type),
                width: width_of(&i.input_type),
            })
            .collect();

        // Prefer a probability-like output over the label output
        let output = session
            .outputs
            .iter()
            .find(|o| {
                o.name.contains("prob") || o.name.contains("output") || o.name.contains("variable")
            })
            .or_else(|| session.outputs.last())
            .ok_or_else(|| ArtifactError::Incompatible {
                path: path.to_path_buf(),
                reason: "model declares no outputs".to_string(),
            })?;
        let output_name = output.name.clone();
        let output_width = width_of(&output.output_type);

        info!(
            model = %name,
            inputs = inputs.len(),
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            inputs,
            output_name,
            output_width,
        })
    }

    fn build_session(&self, path: &Path) -> ort::Result<Session> {
        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
    }
}

fn element_of(value_type: &ValueType) -> InputElement {
    match value_type {
        ValueType::Tensor { ty, .. } => match ty {
            TensorElementType::Float32 => InputElement::Float32,
            TensorElementType::Float64 => InputElement::Float64,
            TensorElementType::Int64 => InputElement::Int64,
            TensorElementType::String => InputElement::String,
            _ => InputElement::Other,
        },
        _ => InputElement::Other,
    }
}

fn width_of(value_type: &ValueType) -> Option<usize> {
    match value_type {
        ValueType::Tensor { shape, .. } => shape
            .get(1)
            .and_then(|&d| usize::try_from(d).ok())
            .filter(|&d| d > 0),
        _ => None,
    }
}

/// The preprocessor must declare exactly the feature columns, each typed to
/// match the kind of value the record holds for it.
fn check_preprocessor_inputs(path: &Path, inputs: &[ModelInput]) -> Result<(), ArtifactError> {
    let declared: BTreeSet<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    let expected: BTreeSet<&str> = FEATURE_NAMES.iter().copied().collect();

    if declared != expected {
        let missing: Vec<&str> = expected.difference(&declared).copied().collect();
        let unexpected: Vec<&str> = declared.difference(&expected).copied().collect();
        return Err(ArtifactError::Incompatible {
            path: path.to_path_buf(),
            reason: format!(
                "input columns differ: missing {:?}, unexpected {:?}",
                missing, unexpected
            ),
        });
    }

    for input in inputs {
        let compatible = match feature_kind(&input.name) {
            Some(FeatureKind::Categorical) => input.element == InputElement::String,
            Some(FeatureKind::Numeric) => matches!(
                input.element,
                InputElement::Float32 | InputElement::Float64 | InputElement::Int64
            ),
            None => false,
        };
        if !compatible {
            return Err(ArtifactError::Incompatible {
                path: path.to_path_buf(),
                reason: format!("column {} has element type {:?}", input.name, input.element),
            });
        }
    }

    Ok(())
}

/// Resolve the decision rule: inline threshold first, then the threshold file.
pub fn load_decision_rule(config: &ArtifactsConfig) -> Result<DecisionRule, ArtifactError> {
    let threshold = match (config.threshold, &config.threshold_path) {
        (Some(threshold), _) => threshold,
        (None, Some(path)) => read_threshold(path)?,
        (None, None) => return Err(ArtifactError::ThresholdMissing),
    };
    DecisionRule::new(threshold)
}

/// Read a threshold artifact: a text file holding one float.
pub fn read_threshold<P: AsRef<Path>>(path: P) -> Result<f64, ArtifactError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArtifactError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    contents
        .trim()
        .parse::<f64>()
        .map_err(|e| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{:?} is not a number: {}", contents.trim(), e),
        })
}
