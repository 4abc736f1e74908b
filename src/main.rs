/*!
 * lockbench - Lock Strategy Harness
 *
 * Runs the increment race against every selected strategy:
 * - N threads each apply `+= 1` M times through `atomically`
 * - Verifies no update was lost
 * - Reports elapsed time and throughput per strategy
 */

use anyhow::{bail, Context, Result};
use guarded::monitoring::span_strategy;
use guarded::{init_tracing, GuardConfig, GuardedValue, LockStrategy};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

#[derive(Debug)]
struct BenchConfig {
    strategies: Vec<LockStrategy>,
    threads: usize,
    iterations: usize,
    json: bool,
    guard: GuardConfig,
}

impl BenchConfig {
    fn from_env() -> Result<Self> {
        let strategies = match std::env::var("LOCKBENCH_STRATEGIES") {
            Ok(raw) if raw.trim() != "all" => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<LockStrategy>())
                .collect::<Result<Vec<_>, _>>()
                .context("parsing LOCKBENCH_STRATEGIES")?,
            _ => LockStrategy::ALL.to_vec(),
        };

        let threads = env_usize("LOCKBENCH_THREADS", 8)?;
        let iterations = env_usize("LOCKBENCH_ITERATIONS", 10_000)?;
        if threads == 0 || iterations == 0 {
            bail!("LOCKBENCH_THREADS and LOCKBENCH_ITERATIONS must be positive");
        }

        let json = std::env::var("LOCKBENCH_JSON")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        let guard = GuardConfig::from_env().context("loading guard configuration")?;

        Ok(Self {
            strategies,
            threads,
            iterations,
            json,
            guard,
        })
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be an unsigned integer, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Serialize)]
struct RunReport {
    requested: LockStrategy,
    actual: LockStrategy,
    threads: usize,
    iterations: usize,
    expected: u64,
    observed: u64,
    elapsed_us: u64,
    ops_per_sec: u64,
}

/// Build the shared counter, honoring the configured fallback policy
fn build_counter(guard: &GuardConfig, strategy: LockStrategy) -> Result<GuardedValue<u64>> {
    let guard_config = GuardConfig {
        strategy,
        ..guard.clone()
    };
    GuardedValue::try_with_config(0u64, &guard_config)
        .with_context(|| format!("building counter for strategy {}", strategy))
}

fn run(config: &BenchConfig, strategy: LockStrategy) -> Result<RunReport> {
    let counter = Arc::new(build_counter(&config.guard, strategy)?);

    let span = span_strategy(counter.strategy(), config.threads, config.iterations);
    let _entered = span.enter();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let counter = counter.clone();
            let iterations = config.iterations;
            thread::spawn(move || {
                for _ in 0..iterations {
                    counter.atomically(|n| *n += 1);
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            error!(strategy = %strategy, "Worker thread panicked");
        }
    }

    let expected = (config.threads * config.iterations) as u64;
    let elapsed = span.finish(expected);

    Ok(RunReport {
        requested: strategy,
        actual: counter.strategy(),
        threads: config.threads,
        iterations: config.iterations,
        expected,
        observed: counter.value(),
        elapsed_us: elapsed.as_micros() as u64,
        ops_per_sec: (expected as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
    })
}

fn main() -> Result<()> {
    init_tracing();

    let config = BenchConfig::from_env()?;
    info!(
        strategies = config.strategies.len(),
        threads = config.threads,
        iterations = config.iterations,
        "lockbench starting"
    );

    let mut reports = Vec::with_capacity(config.strategies.len());
    for &strategy in &config.strategies {
        let report = run(&config, strategy)?;
        if report.observed != report.expected {
            error!(
                strategy = %strategy,
                expected = report.expected,
                observed = report.observed,
                "Lost updates detected"
            );
        } else {
            info!(
                strategy = %report.actual,
                elapsed_us = report.elapsed_us,
                ops_per_sec = report.ops_per_sec,
                "Run complete"
            );
        }
        reports.push(report);
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{:<12} {:>12} {:>14}", "strategy", "elapsed_us", "ops/sec");
        for report in &reports {
            println!(
                "{:<12} {:>12} {:>14}",
                report.actual.name(),
                report.elapsed_us,
                report.ops_per_sec
            );
        }
    }

    let failed = reports.iter().filter(|r| r.observed != r.expected).count();
    if failed > 0 {
        bail!("{} strategies lost updates", failed);
    }
    Ok(())
}
