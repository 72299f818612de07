//! Term Deposit Predictor - Main Entry Point
//!
//! Reads customer submissions from stdin (one JSON object per line), scores
//! them with the offline-trained artifacts and prints the rendered outcome.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use term_deposit_predictor::{
    config::{AppConfig, LoggingConfig},
    evaluate_with_timeout,
    metrics::PipelineMetrics,
    ArtifactStatus, PipelineError, PredictionService, Presenter,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("term_deposit_predictor={}", logging.level))
    })?;

    // Logs go to stderr; stdout carries the rendered predictions.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Term Deposit Predictor");
    info!(
        workers = config.pipeline.workers,
        timeout_ms = config.pipeline.timeout_ms,
        template = ?config.presentation.template,
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(PipelineMetrics::new());
    let presenter = Presenter::new(config.presentation.template);
    let service = Arc::new(PredictionService::from_config(config.artifacts.clone()));

    // Load artifacts up front so a broken deployment is visible in the logs
    // before the first submission arrives.
    let warmup = service.clone();
    tokio::task::spawn_blocking(move || warmup.pipeline().map(|_| ()))
        .await
        .context("Artifact loading task panicked")?
        .unwrap_or_else(|e| warn!(error = %e, "Serving in degraded mode"));
    match service.status() {
        ArtifactStatus::Ready { threshold } => info!(threshold = threshold, "Artifacts ready"),
        status => warn!(status = ?status, "Artifacts not ready"),
    }

    let timeout = Duration::from_millis(config.pipeline.timeout_ms);
    let semaphore = Arc::new(Semaphore::new(config.pipeline.workers.max(1)));
    let processed_count = Arc::new(AtomicU64::new(0));
    let mut tasks = JoinSet::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        // Acquire permit (limits concurrent evaluations)
        let permit = semaphore.clone().acquire_owned().await?;

        let service = service.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        // Reap finished submissions so the set stays bounded on long streams
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Submission task panicked");
            }
        }

        tasks.spawn(async move {
            let start_time = Instant::now();

            let outcome = match serde_json::from_str::<Map<String, Value>>(&line) {
                Ok(fields) => evaluate_with_timeout(service, fields, timeout).await,
                Err(e) => Err(PipelineError::InvalidField {
                    field: "record".to_string(),
                    reason: e.to_string(),
                }),
            };
            let processing_time = start_time.elapsed();

            let rendered = match &outcome {
                Ok(report) => {
                    metrics.record_report(processing_time, report);
                    debug!(
                        report_id = %report.report_id,
                        probability = report.result.probability,
                        label = report.result.label,
                        processing_time_us = processing_time.as_micros(),
                        "Submission evaluated"
                    );
                    presenter.render(report)
                }
                Err(e) => {
                    metrics.record_error(processing_time, e);
                    match e {
                        PipelineError::ModelUnavailable(_) | PipelineError::TimedOut(_) => {
                            warn!(error = %e, "Prediction unavailable")
                        }
                        PipelineError::MalformedOutput(_) => {
                            error!(error = %e, "Malformed model output")
                        }
                        _ => warn!(error = %e, "Submission rejected"),
                    }
                    presenter.render_error(e)
                }
            };
            println!("{}", rendered);

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                info!(
                    processed = count,
                    throughput = format!("{:.1} /s", metrics.get_throughput()),
                    avg_latency_us = metrics.get_processing_stats().mean_us,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Submission task panicked");
        }
    }

    info!("Input closed, shutting down");
    metrics.print_summary();

    Ok(())
}
