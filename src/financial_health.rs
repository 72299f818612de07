//! Financial health tier from the three loan-related answers

use crate::types::customer::YesNo;
use crate::types::prediction::FinancialHealth;

const BASE_SCORE: f64 = 3.0;
const DEFAULT_PENALTY: f64 = 1.0;
const HOUSING_PENALTY: f64 = 0.5;
const LOAN_PENALTY: f64 = 0.5;

/// Point score behind the tier: 3.0 minus a penalty per "yes".
pub fn points(credit_default: YesNo, housing: YesNo, loan: YesNo) -> f64 {
    let mut score = BASE_SCORE;
    if credit_default == YesNo::Yes {
        score -= DEFAULT_PENALTY;
    }
    if housing == YesNo::Yes {
        score -= HOUSING_PENALTY;
    }
    if loan == YesNo::Yes {
        score -= LOAN_PENALTY;
    }
    score
}

/// Map the loan answers to a tier. "unknown" carries no penalty.
pub fn score(credit_default: YesNo, housing: YesNo, loan: YesNo) -> FinancialHealth {
    let score = points(credit_default, housing, loan);
    if score >= 2.5 {
        FinancialHealth::Good
    } else if score >= 1.5 {
        FinancialHealth::Moderate
    } else {
        FinancialHealth::AtRisk
    }
}
