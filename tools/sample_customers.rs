//! Sample Customer Generator
//!
//! Emits random customer submissions as JSON lines on stdout, for piping
//! into the predictor:
//!
//! `sample-customers [count] [warm_rate] [gap_rate] | term-deposit-predictor`

use anyhow::Context;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::io::{BufWriter, Write};
use term_deposit_predictor::types::customer::{
    Contact, CustomerRecord, DayOfWeek, Education, Job, Marital, Month, Poutcome, YesNo,
    PDAYS_NEVER_CONTACTED,
};
use term_deposit_predictor::FEATURE_NAMES;
use tracing::info;

/// Customer generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        *choices.choose(&mut self.rng).unwrap_or(&choices[0])
    }

    /// Generate a customer drawn uniformly from every domain
    fn generate_cold(&mut self) -> CustomerRecord {
        let previous = self.rng.gen_range(0..=10);
        let poutcome = if previous == 0 {
            Poutcome::Nonexistent
        } else {
            self.pick(&[Poutcome::Failure, Poutcome::Success])
        };
        let pdays = if previous == 0 {
            PDAYS_NEVER_CONTACTED
        } else {
            self.rng.gen_range(0..30)
        };

        CustomerRecord {
            age: self.rng.gen_range(18..=95),
            job: self.pick(Job::ALL),
            marital: self.pick(Marital::ALL),
            education: self.pick(Education::ALL),
            credit_default: self.pick(YesNo::ALL),
            housing: self.pick(YesNo::ALL),
            loan: self.pick(YesNo::ALL),
            contact: self.pick(Contact::ALL),
            month: self.pick(Month::ALL),
            day_of_week: self.pick(DayOfWeek::ALL),
            campaign: self.rng.gen_range(1..=50),
            pdays,
            previous,
            poutcome,
            emp_var_rate: round1(self.rng.gen_range(-3.4..1.4)),
            cons_price_idx: round3(self.rng.gen_range(92.2..94.8)),
            cons_conf_idx: round1(self.rng.gen_range(-50.8..-26.9)),
            euribor3m: round3(self.rng.gen_range(0.6..5.0)),
            nr_employed: round1(self.rng.gen_range(4963.6..5228.1)),
        }
    }

    /// Generate a customer with the traits the key-factor rules favour
    fn generate_warm(&mut self) -> CustomerRecord {
        let base = self.generate_cold();
        CustomerRecord {
            job: self.pick(&[Job::Student, Job::Retired]),
            credit_default: YesNo::No,
            contact: Contact::Cellular,
            campaign: self.rng.gen_range(1..=3),
            pdays: self.rng.gen_range(0..15),
            previous: self.rng.gen_range(1..=5),
            poutcome: Poutcome::Success,
            ..base
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Parse a probability argument, defaulting when absent.
fn parse_rate(arg: Option<&String>, default: f64) -> anyhow::Result<f64> {
    let Some(raw) = arg else {
        return Ok(default);
    };
    let rate: f64 = raw.parse()?;
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("{} is not a probability in [0, 1]", raw);
    }
    Ok(rate)
}

fn main() -> anyhow::Result<()> {
    // Logs to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_customers=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let warm_rate = parse_rate(args.get(2), 0.2).context("Invalid warm_rate")?;
    let gap_rate = parse_rate(args.get(3), 0.0).context("Invalid gap_rate")?;

    info!(
        count = count,
        warm_rate = warm_rate,
        gap_rate = gap_rate,
        "Generating sample customers"
    );

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();
    let mut out = BufWriter::new(std::io::stdout().lock());

    let mut warm_count = 0;
    let mut gap_count = 0;

    for _ in 0..count {
        let customer = if rng.gen_bool(warm_rate) {
            warm_count += 1;
            generator.generate_warm()
        } else {
            generator.generate_cold()
        };

        let mut submission = serde_json::to_value(&customer)?;
        if rng.gen_bool(gap_rate) {
            let field = FEATURE_NAMES.choose(&mut rng);
            if let (Value::Object(fields), Some(field)) = (&mut submission, field) {
                fields.remove(*field);
                gap_count += 1;
            }
        }

        writeln!(out, "{}", serde_json::to_string(&submission)?)?;
    }
    out.flush()?;

    info!(
        "Completed! Generated {} customers ({} warm, {} with a missing field)",
        count, warm_count, gap_count
    );

    Ok(())
}
