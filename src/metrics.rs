//! Submission statistics for the predictor host process.

use crate::error::PipelineError;
use crate::types::prediction::{FinancialHealth, PredictionReport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for submissions
pub struct PipelineMetrics {
    /// Submissions received
    pub submissions: AtomicU64,
    /// Submissions classified positive
    pub positive_decisions: AtomicU64,
    /// Submissions answered with the degraded "unavailable" state
    pub degraded: AtomicU64,
    /// Submissions rejected or failed for other reasons
    pub failed: AtomicU64,
    /// Reports by financial health tier
    health_counts: RwLock<HashMap<FinancialHealth, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            positive_decisions: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            health_counts: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful evaluation
    pub fn record_report(&self, processing_time: Duration, report: &PredictionReport) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        if report.result.label {
            self.positive_decisions.fetch_add(1, Ordering::Relaxed);
        }

        self.record_time(processing_time);

        let bucket = (report.result.probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut counts) = self.health_counts.write() {
            *counts.entry(report.financial_health).or_insert(0) += 1;
        }
    }

    /// Record a failed evaluation
    pub fn record_error(&self, processing_time: Duration, err: &PipelineError) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        match err {
            PipelineError::ModelUnavailable(_) | PipelineError::TimedOut(_) => {
                self.degraded.fetch_add(1, Ordering::Relaxed)
            }
            _ => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        self.record_time(processing_time);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (submissions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.submissions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Get report counts by financial health tier
    pub fn get_health_counts(&self) -> HashMap<FinancialHealth, u64> {
        self.health_counts.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let submissions = self.submissions.load(Ordering::Relaxed);
        let positives = self.positive_decisions.load(Ordering::Relaxed);
        let degraded = self.degraded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let positive_rate = if submissions > 0 {
            (positives as f64 / submissions as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let health = self.get_health_counts();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            TERM DEPOSIT PREDICTOR - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Submissions: {:>8}  │  Throughput: {:>8.1} /s              ║",
            submissions,
            self.get_throughput()
        );
        info!(
            "║ Likely to subscribe: {:>6} ({:>5.1}%)                          ║",
            positives, positive_rate
        );
        info!(
            "║ Unavailable: {:>6}  │  Rejected/failed: {:>6}                ║",
            degraded, failed
        );
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Financial Health:                                            ║");
        for tier in [FinancialHealth::Good, FinancialHealth::Moderate, FinancialHealth::AtRisk] {
            info!("║   {:10}: {:>6}", tier.label(), health.get(&tier).copied().unwrap_or(0));
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Probability Distribution:                                    ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactError;
    use crate::types::prediction::PredictionResult;

    fn report(probability: f64, label: bool, health: FinancialHealth) -> PredictionReport {
        PredictionReport::new(
            PredictionResult {
                probability,
                label,
                threshold_used: 0.5,
            },
            Vec::new(),
            health,
        )
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        let good = FinancialHealth::Good;
        metrics.record_report(Duration::from_micros(100), &report(0.9, true, good));
        metrics.record_report(Duration::from_micros(300), &report(0.1, false, good));
        metrics.record_report(
            Duration::from_micros(200),
            &report(1.0, true, FinancialHealth::AtRisk),
        );

        assert_eq!(metrics.submissions.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.positive_decisions.load(Ordering::Relaxed), 2);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[1], 1);
        assert_eq!(distribution[9], 2);

        let health = metrics.get_health_counts();
        assert_eq!(health.get(&FinancialHealth::Good), Some(&2));

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_error_classification() {
        let metrics = PipelineMetrics::new();

        metrics.record_error(
            Duration::from_micros(10),
            &PipelineError::ModelUnavailable(ArtifactError::ThresholdMissing),
        );
        metrics.record_error(
            Duration::from_micros(10),
            &PipelineError::MissingField("age".to_string()),
        );

        assert_eq!(metrics.submissions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.degraded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
    }
}
