//! Latency benchmarking for the diagnosis pipeline
//!
//! Repeatedly diagnoses one image and summarizes per-stage and end-to-end
//! latency. Inference time dominates a request, so this is the number to
//! watch when picking the server's inference timeout.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::pipeline::{DiagnosisPipeline, StageTimings};
use crate::utils::error::Result;

/// Configuration for benchmarking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of warmup iterations (excluded from measurements)
    pub warmup_iterations: usize,

    /// Number of measured iterations
    pub iterations: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: 10,
            iterations: 100,
        }
    }
}

/// Results from a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// End-to-end latency
    pub total: LatencyStats,
    /// Decode + resize + scale
    pub preprocess: LatencyStats,
    /// Classifier call only
    pub classify: LatencyStats,
    /// Requests per second at the mean latency
    pub throughput: f64,
    /// Classifier runtime name
    pub runtime: String,
    pub config: BenchmarkConfig,
    pub timestamp: String,
}

impl BenchmarkResult {
    fn from_timings(timings: &[StageTimings], config: BenchmarkConfig, runtime: &str) -> Self {
        let collect = |f: fn(&StageTimings) -> Duration| -> Vec<Duration> {
            timings.iter().map(f).collect()
        };

        let total = LatencyStats::from_durations(&collect(|t| t.total()));
        let throughput = if total.mean_ms > 0.0 {
            1000.0 / total.mean_ms
        } else {
            0.0
        };

        Self {
            preprocess: LatencyStats::from_durations(&collect(|t| t.decode + t.normalize)),
            classify: LatencyStats::from_durations(&collect(|t| t.classify)),
            total,
            throughput,
            runtime: runtime.to_string(),
            config,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Save results to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "Latency: {:.2}ms (mean), {:.2}ms (p95), {:.2}ms (p99) | Throughput: {:.1} img/s",
            self.total.mean_ms, self.total.p95_ms, self.total.p99_ms, self.throughput
        )
    }
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Benchmark ({} runtime, {} iterations, {} warmup)",
            self.runtime, self.config.iterations, self.config.warmup_iterations)?;
        writeln!(f, "  {:<12} {:>9} {:>9} {:>9} {:>9} {:>9}", "stage", "mean", "p50", "p95", "p99", "max")?;
        for (name, stats) in [
            ("preprocess", &self.preprocess),
            ("classify", &self.classify),
            ("total", &self.total),
        ] {
            writeln!(
                f,
                "  {:<12} {:>7.2}ms {:>7.2}ms {:>7.2}ms {:>7.2}ms {:>7.2}ms",
                name, stats.mean_ms, stats.p50_ms, stats.p95_ms, stats.p99_ms, stats.max_ms
            )?;
        }
        writeln!(f, "  Throughput: {:.1} images/second", self.throughput)
    }
}

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub std_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    /// Calculate statistics from a list of durations
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let mut times_ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        times_ms.sort_by(|a, b| a.total_cmp(b));

        let n = times_ms.len();
        let mean = times_ms.iter().sum::<f64>() / n as f64;
        let variance = times_ms.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;

        Self {
            mean_ms: mean,
            std_ms: variance.sqrt(),
            min_ms: times_ms[0],
            max_ms: times_ms[n - 1],
            p50_ms: percentile(&times_ms, 50.0),
            p95_ms: percentile(&times_ms, 95.0),
            p99_ms: percentile(&times_ms, 99.0),
        }
    }
}

/// Nearest-rank percentile of sorted data
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let idx = (p / 100.0 * (sorted_data.len() - 1) as f64).round() as usize;
    sorted_data[idx.min(sorted_data.len() - 1)]
}

/// Diagnose `image` repeatedly and collect latency statistics
pub fn run_benchmark(
    pipeline: &DiagnosisPipeline,
    image: &[u8],
    config: BenchmarkConfig,
) -> Result<BenchmarkResult> {
    for _ in 0..config.warmup_iterations {
        pipeline.diagnose(image)?;
    }

    let mut timings = Vec::with_capacity(config.iterations);
    for i in 0..config.iterations {
        timings.push(pipeline.diagnose_detailed(image)?.timings);
        if (i + 1) % 20 == 0 {
            tracing::debug!("Benchmark iteration {}/{}", i + 1, config.iterations);
        }
    }

    let runtime = pipeline.context().classifier().runtime();
    Ok(BenchmarkResult::from_timings(&timings, config, runtime))
}
