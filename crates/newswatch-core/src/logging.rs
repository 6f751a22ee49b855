//! Structured logging conventions for newswatch.
//!
//! `tracing` call sites across the workspace attach the same bare field
//! identifiers so log aggregation tools can query by standardized names:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | Originating subsystem: `"scheduler"`, `"db"`, `"worker"`, `"driver"` |
//! | `component` | Component within a subsystem, e.g. `"capacity_gate"`, `"reaper"`, `"pool"` |
//! | `op` | Logical operation name, e.g. `"fill_queue"`, `"claim_batch"`, `"reap_stale"` |
//! | `job_id` | Job UUID being processed |
//! | `keyword_id` | Keyword UUID being scheduled or searched |
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `result_count` | Rows affected or items returned by an operation |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
