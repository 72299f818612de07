/// End-to-end pipeline scenarios with stub artifacts
/// Exercises assembly, inference, decision, key factors and financial health
/// without an ONNX runtime
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use term_deposit_predictor::config::TemplateKind;
use term_deposit_predictor::types::customer::{
    Contact, DayOfWeek, Education, Job, Marital, Month, Poutcome, YesNo,
};
use term_deposit_predictor::types::prediction::{FinancialHealth, Polarity};
use term_deposit_predictor::{
    evaluate_with_timeout, ArtifactError, ArtifactStatus, Artifacts, Classifier, CustomerRecord,
    DecisionRule, FeatureRecord, PipelineError, PredictionService, Preprocessor, Presenter,
};

/// Preprocessor that remembers the column names it was handed
struct RecordingPreprocessor {
    seen: Arc<Mutex<Vec<BTreeSet<String>>>>,
}

impl Preprocessor for RecordingPreprocessor {
    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f32>, PipelineError> {
        let names = record.names().map(str::to_string).collect();
        self.seen.lock().unwrap().push(names);
        Ok(vec![0.0; 63])
    }
}

struct StubModel {
    row: Vec<f64>,
}

impl Classifier for StubModel {
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, PipelineError> {
        assert_eq!(features.len(), 63);
        Ok(self.row.clone())
    }
}

struct BrokenModel;

impl Classifier for BrokenModel {
    fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f64>, PipelineError> {
        Err(ArtifactError::Runtime {
            stage: "classifier",
            reason: "session run failed".to_string(),
        }
        .into())
    }
}

/// Classifier that answers only after a fixed delay
struct SlowModel {
    delay: Duration,
}

impl Classifier for SlowModel {
    fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f64>, PipelineError> {
        std::thread::sleep(self.delay);
        Ok(vec![0.5, 0.5])
    }
}

fn student_customer() -> CustomerRecord {
    CustomerRecord {
        age: 35,
        job: Job::Student,
        marital: Marital::Single,
        education: Education::UniversityDegree,
        credit_default: YesNo::No,
        housing: YesNo::No,
        loan: YesNo::No,
        contact: Contact::Cellular,
        month: Month::May,
        day_of_week: DayOfWeek::Mon,
        campaign: 2,
        pdays: 999,
        previous: 0,
        poutcome: Poutcome::Success,
        emp_var_rate: 1.1,
        cons_price_idx: 93.5,
        cons_conf_idx: -40.0,
        euribor3m: 4.5,
        nr_employed: 5200.0,
    }
}

type SeenColumns = Arc<Mutex<Vec<BTreeSet<String>>>>;

fn service_with(row: Vec<f64>, threshold: f64) -> (PredictionService, SeenColumns) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let artifacts = Artifacts::new(
        Box::new(RecordingPreprocessor { seen: seen.clone() }),
        Box::new(StubModel { row }),
        DecisionRule::new(threshold).unwrap(),
    );
    (PredictionService::ready(artifacts), seen)
}

fn submission(customer: &CustomerRecord) -> Map<String, Value> {
    match serde_json::to_value(customer).unwrap() {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[test]
fn test_student_scenario() {
    let (service, _) = service_with(vec![0.58, 0.42], 0.3);
    let report = service.evaluate(&student_customer()).unwrap();

    assert_eq!(report.result.probability, 0.42);
    assert!(report.result.label);
    assert_eq!(report.result.threshold_used, 0.3);
    assert_eq!(report.financial_health, FinancialHealth::Good);

    let descriptions: Vec<&str> = report.factors.iter().map(|f| f.description.as_str()).collect();
    assert!(descriptions.contains(&"previous campaign success"));
    assert!(descriptions.contains(&"favorable occupation"));
    assert!(descriptions.contains(&"cellular contact preferred"));
    assert_eq!(report.factors_with(Polarity::Negative).count(), 0);
}

#[test]
fn test_artifact_sees_exact_column_names() {
    let (service, seen) = service_with(vec![0.9, 0.1], 0.5);
    service.evaluate_fields(&submission(&student_customer())).unwrap();

    let expected: BTreeSet<String> = [
        "age", "job", "marital", "education", "default", "housing", "loan", "contact", "month",
        "day_of_week", "campaign", "pdays", "previous", "poutcome", "emp.var.rate",
        "cons.price.idx", "cons.conf.idx", "euribor3m", "nr.employed",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], expected);
}

#[test]
fn test_threshold_boundary_is_positive() {
    let (service, _) = service_with(vec![0.7, 0.3], 0.3);
    assert!(service.evaluate(&student_customer()).unwrap().result.label);
}

#[test]
fn test_factors_do_not_depend_on_probability() {
    let (low, _) = service_with(vec![0.99, 0.01], 0.5);
    let (high, _) = service_with(vec![0.01, 0.99], 0.5);

    let a = low.evaluate(&student_customer()).unwrap();
    let b = high.evaluate(&student_customer()).unwrap();

    assert_ne!(a.result.label, b.result.label);
    assert_eq!(a.factors, b.factors);
    assert_eq!(a.financial_health, b.financial_health);
}

#[test]
fn test_missing_field_from_submission() {
    let (service, seen) = service_with(vec![0.5, 0.5], 0.5);
    let mut fields = submission(&student_customer());
    fields.remove("nr.employed");

    assert_eq!(
        service.evaluate_fields(&fields).unwrap_err(),
        PipelineError::MissingField("nr.employed".to_string())
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_malformed_probability_row() {
    let (service, _) = service_with(vec![0.42], 0.3);
    let err = service.evaluate(&student_customer()).unwrap_err();

    assert!(matches!(err, PipelineError::MalformedOutput(_)));
    assert!(!err.is_unavailable());
}

#[test]
fn test_failing_classifier_is_unavailable_for_that_request_only() {
    let artifacts = Artifacts::new(
        Box::new(RecordingPreprocessor {
            seen: Arc::new(Mutex::new(Vec::new())),
        }),
        Box::new(BrokenModel),
        DecisionRule::new(0.5).unwrap(),
    );
    let service = PredictionService::ready(artifacts);

    let err = service.evaluate(&student_customer()).unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(service.status(), ArtifactStatus::Ready { threshold: 0.5 });
}

#[test]
fn test_missing_artifacts_degrade_without_panicking() {
    let service = PredictionService::from_config(term_deposit_predictor::config::ArtifactsConfig {
        preprocessor_path: "does/not/exist/preprocessor.onnx".into(),
        model_path: "does/not/exist/model.onnx".into(),
        threshold_path: None,
        threshold: Some(0.3),
        onnx_threads: 1,
    });

    let err = service.evaluate(&student_customer()).unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(service.status(), ArtifactStatus::Unavailable(_)));
}

#[tokio::test]
async fn test_slow_classifier_times_out() {
    let timeout = Duration::from_millis(50);
    let artifacts = Artifacts::new(
        Box::new(RecordingPreprocessor {
            seen: Arc::new(Mutex::new(Vec::new())),
        }),
        Box::new(SlowModel {
            delay: Duration::from_millis(500),
        }),
        DecisionRule::new(0.5).unwrap(),
    );
    let service = Arc::new(PredictionService::ready(artifacts));

    let err = evaluate_with_timeout(service.clone(), submission(&student_customer()), timeout)
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::TimedOut(timeout));
    assert!(err.is_unavailable());

    let text = Presenter::new(TemplateKind::Card).render_error(&err);
    assert!(text.contains("Prediction unavailable: the model did not respond in time"));
    assert!(!text.contains('%'));

    let json: Value =
        serde_json::from_str(&Presenter::new(TemplateKind::Json).render_error(&err)).unwrap();
    assert_eq!(json["status"], "unavailable");

    // The service keeps serving after an abandoned evaluation
    assert_eq!(service.status(), ArtifactStatus::Ready { threshold: 0.5 });
}

#[tokio::test]
async fn test_fast_classifier_answers_within_timeout() {
    let (service, _) = service_with(vec![0.58, 0.42], 0.3);
    let report = evaluate_with_timeout(
        Arc::new(service),
        submission(&student_customer()),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(report.result.label);
}
