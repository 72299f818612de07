//! Rule-based key factors for the presentation layer.
//!
//! The rules read raw customer fields only. They never see the model output
//! and never feed back into the decision.

use crate::types::customer::{Contact, CustomerRecord, Job, Poutcome, YesNo};
use crate::types::prediction::{FactorTag, Polarity};

/// Campaign contact count above which fatigue is flagged
pub const CONTACT_FATIGUE_LIMIT: u32 = 5;

/// Display weight for a failed previous campaign
pub const PREVIOUS_FAILURE_WEIGHT: u8 = 70;

/// Display weight for a customer with no campaign history
pub const NO_HISTORY_WEIGHT: u8 = 40;

/// Display weight for the fallback factor
pub const STANDARD_PROFILE_WEIGHT: u8 = 50;

fn favorable_occupation(job: Job) -> bool {
    matches!(job, Job::Student | Job::Retired)
}

/// Derive the key factors for a customer.
///
/// Every matching rule contributes, in rule order. A customer matching no
/// rule gets a single neutral "standard profile" factor.
pub fn explain(customer: &CustomerRecord) -> Vec<FactorTag> {
    let mut factors = Vec::new();

    if customer.poutcome == Poutcome::Success {
        factors.push(FactorTag::new("previous campaign success", Polarity::Positive, 90));
    }
    if favorable_occupation(customer.job) {
        factors.push(FactorTag::new("favorable occupation", Polarity::Positive, 75));
    }
    if customer.contact == Contact::Cellular {
        factors.push(FactorTag::new("cellular contact preferred", Polarity::Positive, 60));
    }
    if customer.credit_default == YesNo::Yes {
        factors.push(FactorTag::new("credit default risk", Polarity::Negative, 80));
    }
    if customer.campaign > CONTACT_FATIGUE_LIMIT {
        factors.push(FactorTag::new(
            "high contact frequency / fatigue risk",
            Polarity::Negative,
            65,
        ));
    }
    if customer.poutcome == Poutcome::Failure {
        factors.push(FactorTag::new(
            "previous campaign failed",
            Polarity::Negative,
            PREVIOUS_FAILURE_WEIGHT,
        ));
    }
    if customer.poutcome == Poutcome::Nonexistent && !favorable_occupation(customer.job) {
        factors.push(FactorTag::new(
            "no previous campaign history",
            Polarity::Neutral,
            NO_HISTORY_WEIGHT,
        ));
    }

    if factors.is_empty() {
        factors.push(FactorTag::new(
            "standard profile",
            Polarity::Neutral,
            STANDARD_PROFILE_WEIGHT,
        ));
    }

    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(
        poutcome: Poutcome,
        job: Job,
        contact: Contact,
        credit_default: YesNo,
        campaign: u32,
    ) -> CustomerRecord {
        CustomerRecord {
            poutcome,
            job,
            contact,
            credit_default,
            campaign,
            ..CustomerRecord::default()
        }
    }

    fn descriptions(factors: &[FactorTag]) -> Vec<&str> {
        factors.iter().map(|f| f.description.as_str()).collect()
    }

    #[test]
    fn test_all_positive_factors() {
        let c = customer(Poutcome::Success, Job::Retired, Contact::Cellular, YesNo::No, 1);
        let factors = explain(&c);

        assert_eq!(
            descriptions(&factors),
            vec![
                "previous campaign success",
                "favorable occupation",
                "cellular contact preferred"
            ]
        );
        assert!(factors.iter().all(|f| f.polarity == Polarity::Positive));
        assert_eq!(
            factors.iter().map(|f| f.weight).collect::<Vec<_>>(),
            vec![90, 75, 60]
        );
    }

    #[test]
    fn test_no_history_only() {
        let c = customer(Poutcome::Nonexistent, Job::BlueCollar, Contact::Telephone, YesNo::No, 1);
        let factors = explain(&c);

        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].description, "no previous campaign history");
        assert_eq!(factors[0].polarity, Polarity::Neutral);
    }

    #[test]
    fn test_favorable_occupation_suppresses_no_history() {
        let c = customer(Poutcome::Nonexistent, Job::Student, Contact::Telephone, YesNo::No, 1);
        assert_eq!(descriptions(&explain(&c)), vec!["favorable occupation"]);
    }

    #[test]
    fn test_negative_factors_in_rule_order() {
        let c = customer(Poutcome::Failure, Job::Technician, Contact::Telephone, YesNo::Yes, 6);
        let factors = explain(&c);

        assert_eq!(
            descriptions(&factors),
            vec![
                "credit default risk",
                "high contact frequency / fatigue risk",
                "previous campaign failed"
            ]
        );
        assert!(factors.iter().all(|f| f.polarity == Polarity::Negative));
    }

    #[test]
    fn test_fatigue_limit_is_exclusive() {
        let at_limit = customer(Poutcome::Failure, Job::Admin, Contact::Telephone, YesNo::No, 5);
        assert_eq!(descriptions(&explain(&at_limit)), vec!["previous campaign failed"]);
    }

    #[test]
    fn test_never_empty() {
        for &poutcome in Poutcome::ALL {
            for &job in Job::ALL {
                for &contact in Contact::ALL {
                    for &credit_default in YesNo::ALL {
                        for campaign in [1, 5, 6, 50] {
                            let c = customer(poutcome, job, contact, credit_default, campaign);
                            assert!(!explain(&c).is_empty());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let c = customer(Poutcome::Success, Job::Student, Contact::Cellular, YesNo::Yes, 9);
        assert_eq!(explain(&c), explain(&c));
    }
}
