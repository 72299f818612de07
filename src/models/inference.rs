//! Inference over the preprocessing and classifier artifacts

use crate::error::{ArtifactError, PipelineError};
use crate::feature_record::{FeatureRecord, FeatureValue};
use crate::models::loader::{InputElement, LoadedModel};
use ort::memory::Allocator;
use ort::session::{SessionInputValue, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Index of the "subscribes" class in the classifier's probability row
pub const POSITIVE_CLASS: usize = 1;

/// Pre-fitted transform from a feature record to the classifier's input vector
pub trait Preprocessor: Send + Sync {
    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f32>, PipelineError>;
}

/// Pre-fitted binary classifier
pub trait Classifier: Send + Sync {
    /// Class probabilities for one row, indexed by class id.
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, PipelineError>;
}

/// Take the positive-class probability out of a probability row.
pub fn positive_class_probability(row: &[f64]) -> Result<f64, PipelineError> {
    if row.len() != 2 {
        return Err(PipelineError::MalformedOutput(format!(
            "expected 2 class probabilities, got {}",
            row.len()
        )));
    }

    let probability = row[POSITIVE_CLASS];
    if !(0.0..=1.0).contains(&probability) {
        return Err(PipelineError::MalformedOutput(format!(
            "positive-class probability {} is outside [0, 1]",
            probability
        )));
    }

    Ok(probability)
}

/// Runs a feature record through the transform and the classifier
pub struct InferenceEngine {
    preprocessor: Box<dyn Preprocessor>,
    classifier: Box<dyn Classifier>,
}

impl InferenceEngine {
    pub fn new(preprocessor: Box<dyn Preprocessor>, classifier: Box<dyn Classifier>) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    /// Probability that the customer subscribes
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64, PipelineError> {
        let features = self.preprocessor.transform(record)?;
        if features.is_empty() {
            let err = ArtifactError::runtime("preprocessing", "transform produced an empty vector");
            return Err(err.into());
        }

        let probabilities = self.classifier.predict_proba(&features)?;
        let probability = positive_class_probability(&probabilities)?;

        debug!(
            features = features.len(),
            probability = probability,
            "Inference complete"
        );

        Ok(probability)
    }
}

/// Preprocessing artifact exported to ONNX, one named input per feature column
pub struct OnnxPreprocessor {
    model: Mutex<LoadedModel>,
}

impl OnnxPreprocessor {
    pub(crate) fn new(model: LoadedModel) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }
}

impl Preprocessor for OnnxPreprocessor {
    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f32>, PipelineError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| ArtifactError::runtime("preprocessing", format!("lock error: {}", e)))?;

        let mut inputs: Vec<(String, SessionInputValue<'_>)> =
            Vec::with_capacity(model.inputs.len());
        for input in &model.inputs {
            let value = record
                .get(&input.name)
                .ok_or_else(|| PipelineError::MissingField(input.name.clone()))?;
            let tensor = column_tensor(value, input.element).map_err(|e| {
                ArtifactError::runtime("preprocessing", format!("{}: {}", input.name, e))
            })?;
            inputs.push((input.name.clone(), tensor.into()));
        }

        let output_name = model.output_name.clone();
        let outputs = model
            .session
            .run(inputs)
            .map_err(|e| ArtifactError::runtime("preprocessing", e))?;

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| {
                ArtifactError::runtime("preprocessing", format!("no output named {}", output_name))
            })?;

        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            return Ok(data.to_vec());
        }
        if let Ok((_, data)) = output.try_extract_tensor::<f64>() {
            return Ok(data.iter().map(|&v| v as f32).collect());
        }

        Err(ArtifactError::runtime("preprocessing", "output is not a float tensor").into())
    }
}

/// Build the [1, 1] tensor for one column, typed as the artifact declares it.
fn column_tensor(value: FeatureValue, element: InputElement) -> ort::Result<DynValue> {
    let shape = vec![1_i64, 1];
    let tensor = match (value, element) {
        (FeatureValue::Numeric(v), InputElement::Int64) => {
            Tensor::from_array((shape, vec![v as i64]))?.into_dyn()
        }
        (FeatureValue::Numeric(v), InputElement::Float64) => {
            Tensor::from_array((shape, vec![v]))?.into_dyn()
        }
        (FeatureValue::Numeric(v), _) => Tensor::from_array((shape, vec![v as f32]))?.into_dyn(),
        (FeatureValue::Categorical(label), _) => {
            let data = [label.to_string()];
            Tensor::from_string_array((shape, &data[..]))?.into_dyn()
        }
    };
    Ok(tensor)
}

/// Binary classifier exported to ONNX
pub struct OnnxClassifier {
    model: Mutex<LoadedModel>,
}

impl OnnxClassifier {
    pub(crate) fn new(model: LoadedModel) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, PipelineError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| ArtifactError::runtime("classifier", format!("lock error: {}", e)))?;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| ArtifactError::runtime("classifier", e))?;

        let input_name = model
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());
        let output_name = model.output_name.clone();
        let model_name = model.name.clone();

        let outputs = model
            .session
            .run(ort::inputs![input_name => input_tensor])
            .map_err(|e| ArtifactError::runtime("classifier", e))?;

        extract_probabilities(&outputs, &output_name, &model_name)
    }
}

/// Extract the class-probability row from classifier outputs.
///
/// Handles tensor outputs (XGBoost, random forest, logistic regression) and
/// seq(map(int64, float)) outputs (zipmap-style exports of LightGBM, CatBoost).
fn extract_probabilities(
    outputs: &SessionOutputs,
    output_name: &str,
    model_name: &str,
) -> Result<Vec<f64>, PipelineError> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(row) = probabilities_from_value(output, model_name) {
            return Ok(row);
        }
    }

    // Fallback: any non-label output that yields probabilities
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(row) = probabilities_from_value(&output, model_name) {
            debug!(model = %model_name, output = %name, "Extracted probabilities (fallback)");
            return Ok(row);
        }
    }

    warn!(model = %model_name, "Could not extract class probabilities");
    Err(PipelineError::MalformedOutput(format!(
        "{} produced no probability output",
        model_name
    )))
}

fn probabilities_from_value(output: &DynValue, model_name: &str) -> Option<Vec<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        let row = first_row(&dims, data);
        debug!(model = %model_name, classes = row.len(), "Extracted from tensor");
        return Some(row);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        match probabilities_from_sequence_map(output) {
            Ok(row) => {
                debug!(model = %model_name, classes = row.len(), "Extracted from seq(map)");
                return Some(row);
            }
            Err(e) => warn!(model = %model_name, error = %e, "Unreadable seq(map) output"),
        }
    }

    None
}

/// First row of a [batch, classes] or [classes] tensor
fn first_row(dims: &[i64], data: &[f32]) -> Vec<f64> {
    let width = match dims {
        [_, classes] => (*classes).max(0) as usize,
        _ => data.len(),
    };
    data.iter().take(width).map(|&v| v as f64).collect()
}

/// Probabilities from seq(map(int64, float)), ordered by class id
fn probabilities_from_sequence_map(output: &DynValue) -> anyhow::Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    // Batch size is always 1
    let map_value = maps.first().ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let mut kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    kv_pairs.sort_by_key(|(class_id, _)| *class_id);

    Ok(kv_pairs.into_iter().map(|(_, prob)| prob as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_record::FeatureAssembler;
    use crate::types::customer::CustomerRecord;

    struct Widths(usize);

    impl Preprocessor for Widths {
        fn transform(&self, record: &FeatureRecord) -> Result<Vec<f32>, PipelineError> {
            assert_eq!(record.len(), 19);
            Ok(vec![0.5; self.0])
        }
    }

    struct Row(Vec<f64>);

    impl Classifier for Row {
        fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f64>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    fn record() -> FeatureRecord {
        FeatureAssembler::new().record_for(&CustomerRecord::default())
    }

    #[test]
    fn test_positive_class_is_second_column() {
        assert_eq!(positive_class_probability(&[0.58, 0.42]), Ok(0.42));
    }

    #[test]
    fn test_wrong_row_length_is_malformed() {
        assert!(matches!(
            positive_class_probability(&[0.42]),
            Err(PipelineError::MalformedOutput(_))
        ));
        assert!(matches!(
            positive_class_probability(&[0.2, 0.3, 0.5]),
            Err(PipelineError::MalformedOutput(_))
        ));
        assert!(matches!(
            positive_class_probability(&[0.0, f64::NAN]),
            Err(PipelineError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_engine_returns_positive_probability() {
        let engine = InferenceEngine::new(Box::new(Widths(62)), Box::new(Row(vec![0.1, 0.9])));
        assert_eq!(engine.predict(&record()), Ok(0.9));
    }

    #[test]
    fn test_empty_transform_is_unavailable() {
        let engine = InferenceEngine::new(Box::new(Widths(0)), Box::new(Row(vec![0.1, 0.9])));
        let err = engine.predict(&record()).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_first_row_of_batch() {
        assert_eq!(first_row(&[1, 2], &[0.25, 0.75]), vec![0.25, 0.75]);
        assert_eq!(first_row(&[2], &[0.25, 0.75]), vec![0.25, 0.75]);
        assert_eq!(first_row(&[1, 1], &[0.75]), vec![0.75]);
    }
}
