/*!
 * Tracing Setup
 * Structured tracing for benchmark runs using the tracing crate
 *
 * Features:
 * - JSON-formatted logs for structured parsing
 * - Per-strategy run spans with elapsed time recorded on close
 */

use crate::core::sync::LockStrategy;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable enabling JSON output
pub const TRACE_JSON_ENV: &str = "GUARDED_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - GUARDED_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if initialized.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one timed run of a lock strategy
pub struct StrategySpan {
    span: tracing::Span,
    start: Instant,
    strategy: LockStrategy,
    slow_threshold: Duration,
}

impl StrategySpan {
    pub fn new(strategy: LockStrategy, threads: usize, iterations: usize) -> Self {
        let span = span!(
            Level::INFO,
            "strategy_run",
            strategy = %strategy,
            threads = threads,
            iterations = iterations,
            duration_us = tracing::field::Empty,
            ops_per_sec = tracing::field::Empty,
        );

        debug!(parent: &span, strategy = %strategy, "Strategy run started");

        Self {
            span,
            start: Instant::now(),
            strategy,
            slow_threshold: Duration::from_secs(5),
        }
    }

    /// Record completed operations and return the elapsed time
    pub fn finish(&self, operations: u64) -> Duration {
        let elapsed = self.start.elapsed();
        let ops_per_sec = operations as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

        self.span.record("duration_us", elapsed.as_micros() as u64);
        self.span.record("ops_per_sec", ops_per_sec as u64);

        if elapsed > self.slow_threshold {
            warn!(
                parent: &self.span,
                strategy = %self.strategy,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "Slow strategy run"
            );
        }
        elapsed
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Helper to create a strategy span
#[inline]
pub fn span_strategy(strategy: LockStrategy, threads: usize, iterations: usize) -> StrategySpan {
    StrategySpan::new(strategy, threads, iterations)
}
