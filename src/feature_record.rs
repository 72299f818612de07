//! Feature record assembly for the preprocessing artifact.
//!
//! The preprocessing transform was fitted on a table with 19 named columns.
//! This module builds the single-row record it expects, keyed by exactly
//! those names and in the training order. Values are not transformed here.

use crate::error::PipelineError;
use crate::types::customer::CustomerRecord;
use serde_json::{Map, Value};

/// Column names baked into the preprocessing artifact, in training order.
pub const FEATURE_NAMES: [&str; 19] = [
    "age",
    "job",
    "marital",
    "education",
    "default",
    "housing",
    "loan",
    "contact",
    "month",
    "day_of_week",
    "campaign",
    "pdays",
    "previous",
    "poutcome",
    "emp.var.rate",
    "cons.price.idx",
    "cons.conf.idx",
    "euribor3m",
    "nr.employed",
];

/// Alternate submission keys for the dotted economic-indicator columns.
const UNDERSCORED_ALIASES: [(&str, &str); 4] = [
    ("emp.var.rate", "emp_var_rate"),
    ("cons.price.idx", "cons_price_idx"),
    ("cons.conf.idx", "cons_conf_idx"),
    ("nr.employed", "nr_employed"),
];

/// Whether a column is fed to the artifact as a number or a category label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// Column kinds, aligned with `FEATURE_NAMES`.
const FEATURE_KINDS: [FeatureKind; 19] = {
    use FeatureKind::{Categorical as C, Numeric as N};
    [N, C, C, C, C, C, C, C, C, C, N, N, N, C, N, N, N, N, N]
};

/// Kind of the named artifact column, if it is one
pub fn feature_kind(name: &str) -> Option<FeatureKind> {
    FEATURE_NAMES
        .iter()
        .position(|column| *column == name)
        .map(|i| FEATURE_KINDS[i])
}

/// One cell of the feature record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(&'static str),
}

impl FeatureValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Numeric(_) => FeatureKind::Numeric,
            FeatureValue::Categorical(_) => FeatureKind::Categorical,
        }
    }
}

/// Single-row record handed to the preprocessing artifact
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    columns: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRecord {
    /// Column names, in training order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    /// Look up a column by its artifact name
    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FeatureValue)> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<&CustomerRecord> for FeatureRecord {
    fn from(c: &CustomerRecord) -> Self {
        use FeatureValue::{Categorical, Numeric};

        // Keep in step with FEATURE_NAMES.
        let values = [
            Numeric(c.age as f64),
            Categorical(c.job.as_str()),
            Categorical(c.marital.as_str()),
            Categorical(c.education.as_str()),
            Categorical(c.credit_default.as_str()),
            Categorical(c.housing.as_str()),
            Categorical(c.loan.as_str()),
            Categorical(c.contact.as_str()),
            Categorical(c.month.as_str()),
            Categorical(c.day_of_week.as_str()),
            Numeric(c.campaign as f64),
            Numeric(c.pdays as f64),
            Numeric(c.previous as f64),
            Categorical(c.poutcome.as_str()),
            Numeric(c.emp_var_rate),
            Numeric(c.cons_price_idx),
            Numeric(c.cons_conf_idx),
            Numeric(c.euribor3m),
            Numeric(c.nr_employed),
        ];

        Self {
            columns: FEATURE_NAMES.into_iter().zip(values).collect(),
        }
    }
}

/// Builds customer and feature records from raw form submissions.
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Parse a submission into a customer record.
    ///
    /// Every one of the 19 fields must be present (dotted indicator names may
    /// also be given underscored); the first absent field is reported by its
    /// artifact name, as is the first field whose value does not parse.
    pub fn customer_from_fields(
        &self,
        fields: &Map<String, Value>,
    ) -> Result<CustomerRecord, PipelineError> {
        if let Some(name) = FEATURE_NAMES
            .into_iter()
            .find(|name| submitted_value(fields, name).is_none())
        {
            return Err(PipelineError::MissingField(name.to_string()));
        }

        serde_json::from_value(Value::Object(fields.clone())).map_err(|e| {
            PipelineError::InvalidField {
                field: unparseable_field(fields).unwrap_or("record").to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Assemble the feature record for a raw submission.
    pub fn assemble(&self, fields: &Map<String, Value>) -> Result<FeatureRecord, PipelineError> {
        let customer = self.customer_from_fields(fields)?;
        Ok(self.record_for(&customer))
    }

    /// Assemble the feature record for an already-typed customer.
    pub fn record_for(&self, customer: &CustomerRecord) -> FeatureRecord {
        FeatureRecord::from(customer)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (matching training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Value submitted for an artifact column, under its own name or its
/// underscored alias. Null counts as absent.
fn submitted_value<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let alias = UNDERSCORED_ALIASES
        .iter()
        .find(|(dotted, _)| *dotted == name)
        .map(|(_, underscored)| *underscored);

    fields
        .get(name)
        .filter(|v| !v.is_null())
        .or_else(|| alias.and_then(|a| fields.get(a)).filter(|v| !v.is_null()))
}

/// First column whose submitted value fails to parse on its own.
///
/// serde_json type errors carry no field path, so each value is checked
/// against an otherwise default record.
fn unparseable_field(fields: &Map<String, Value>) -> Option<&'static str> {
    let Ok(Value::Object(baseline)) = serde_json::to_value(CustomerRecord::default()) else {
        return None;
    };

    FEATURE_NAMES.into_iter().find(|name| {
        let Some(value) = submitted_value(fields, name) else {
            return false;
        };
        let mut single = baseline.clone();
        single.insert(name.to_string(), value.clone());
        serde_json::from_value::<CustomerRecord>(Value::Object(single)).is_err()
    })
}
