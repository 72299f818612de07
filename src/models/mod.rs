//! ML artifact loading, inference and the decision rule

pub mod decision;
pub mod inference;
pub mod loader;

pub use decision::{classify, DecisionRule};
pub use inference::{Classifier, InferenceEngine, Preprocessor};
pub use loader::ArtifactLoader;
