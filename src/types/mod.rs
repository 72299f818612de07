//! Type definitions for the term deposit predictor

pub mod customer;
pub mod prediction;

pub use customer::CustomerRecord;
pub use prediction::{FactorTag, FinancialHealth, Polarity, PredictionReport, PredictionResult};
