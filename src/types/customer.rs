//! Customer record submitted for a subscription prediction

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Declares a categorical domain whose wire strings are exactly the
/// category labels the preprocessing artifact was fitted on.
macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every category, in form order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Category label as seen by the preprocessing artifact.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

categorical!(
    /// Occupation
    Job {
        Admin => "admin.",
        BlueCollar => "blue-collar",
        Technician => "technician",
        Services => "services",
        Management => "management",
        Retired => "retired",
        Student => "student",
        Unemployed => "unemployed",
        SelfEmployed => "self-employed",
        Entrepreneur => "entrepreneur",
        Housemaid => "housemaid",
        Unknown => "unknown",
    }
);

categorical!(
    /// Marital status
    Marital {
        Single => "single",
        Married => "married",
        Divorced => "divorced",
        Unknown => "unknown",
    }
);

categorical!(
    /// Highest education level
    Education {
        UniversityDegree => "university.degree",
        HighSchool => "high.school",
        Basic9y => "basic.9y",
        ProfessionalCourse => "professional.course",
        Basic4y => "basic.4y",
        Basic6y => "basic.6y",
        Illiterate => "illiterate",
        Unknown => "unknown",
    }
);

categorical!(
    /// Answer to the credit default, housing loan and personal loan questions
    YesNo {
        No => "no",
        Yes => "yes",
        Unknown => "unknown",
    }
);

categorical!(
    /// Contact communication type
    Contact {
        Cellular => "cellular",
        Telephone => "telephone",
    }
);

categorical!(
    /// Last contact month
    Month {
        Jan => "jan",
        Feb => "feb",
        Mar => "mar",
        Apr => "apr",
        May => "may",
        Jun => "jun",
        Jul => "jul",
        Aug => "aug",
        Sep => "sep",
        Oct => "oct",
        Nov => "nov",
        Dec => "dec",
    }
);

categorical!(
    /// Last contact weekday
    DayOfWeek {
        Mon => "mon",
        Tue => "tue",
        Wed => "wed",
        Thu => "thu",
        Fri => "fri",
    }
);

categorical!(
    /// Outcome of the previous marketing campaign
    Poutcome {
        Nonexistent => "nonexistent",
        Failure => "failure",
        Success => "success",
    }
);

/// `pdays` value meaning the client was never contacted before.
pub const PDAYS_NEVER_CONTACTED: u32 = 999;

/// One customer's attributes, as collected by the input form.
///
/// Serialized field names match the preprocessing artifact, including the
/// dotted economic-indicator names. Underscored aliases are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Age in years (18-95)
    pub age: u32,
    pub job: Job,
    pub marital: Marital,
    pub education: Education,
    /// Has credit in default
    #[serde(rename = "default")]
    pub credit_default: YesNo,
    /// Has housing loan
    pub housing: YesNo,
    /// Has personal loan
    pub loan: YesNo,
    pub contact: Contact,
    pub month: Month,
    pub day_of_week: DayOfWeek,
    /// Contacts performed during this campaign (1-50)
    pub campaign: u32,
    /// Days since last contact in a previous campaign (0-999, 999 = never)
    pub pdays: u32,
    /// Contacts performed before this campaign (0-10)
    pub previous: u32,
    pub poutcome: Poutcome,

    /// Employment variation rate (quarterly)
    #[serde(rename = "emp.var.rate", alias = "emp_var_rate")]
    pub emp_var_rate: f64,
    /// Consumer price index (monthly)
    #[serde(rename = "cons.price.idx", alias = "cons_price_idx")]
    pub cons_price_idx: f64,
    /// Consumer confidence index (monthly)
    #[serde(rename = "cons.conf.idx", alias = "cons_conf_idx")]
    pub cons_conf_idx: f64,
    /// Euribor 3 month rate (daily)
    pub euribor3m: f64,
    /// Number of employees (quarterly)
    #[serde(rename = "nr.employed", alias = "nr_employed")]
    pub nr_employed: f64,
}

impl CustomerRecord {
    /// Whether the client was never contacted in a previous campaign.
    pub fn never_contacted(&self) -> bool {
        self.pdays == PDAYS_NEVER_CONTACTED
    }

    /// Check the integer ranges and indicator finiteness the input form enforces.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_range("age", self.age, 18, 95)?;
        check_range("campaign", self.campaign, 1, 50)?;
        check_range("pdays", self.pdays, 0, PDAYS_NEVER_CONTACTED)?;
        check_range("previous", self.previous, 0, 10)?;

        let indicators = [
            ("emp.var.rate", self.emp_var_rate),
            ("cons.price.idx", self.cons_price_idx),
            ("cons.conf.idx", self.cons_conf_idx),
            ("euribor3m", self.euribor3m),
            ("nr.employed", self.nr_employed),
        ];
        for (field, value) in indicators {
            if !value.is_finite() {
                return Err(PipelineError::InvalidField {
                    field: field.to_string(),
                    reason: format!("{} is not a finite number", value),
                });
            }
        }

        Ok(())
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<(), PipelineError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::InvalidField {
            field: field.to_string(),
            reason: format!("{} is outside {}..={}", value, min, max),
        })
    }
}

impl Default for CustomerRecord {
    /// The input form's initial values.
    fn default() -> Self {
        Self {
            age: 35,
            job: Job::Admin,
            marital: Marital::Single,
            education: Education::UniversityDegree,
            credit_default: YesNo::No,
            housing: YesNo::No,
            loan: YesNo::No,
            contact: Contact::Cellular,
            month: Month::Jan,
            day_of_week: DayOfWeek::Mon,
            campaign: 2,
            pdays: PDAYS_NEVER_CONTACTED,
            previous: 0,
            poutcome: Poutcome::Nonexistent,
            emp_var_rate: 1.1,
            cons_price_idx: 93.5,
            cons_conf_idx: -40.0,
            euribor3m: 4.5,
            nr_employed: 5200.0,
        }
    }
}
