/*!
 * Monitoring
 * Tracing initialization and run spans
 */

mod tracer;

pub use tracer::{init_tracing, span_strategy, StrategySpan, TRACE_JSON_ENV};
