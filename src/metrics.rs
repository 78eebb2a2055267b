//! Prober ops metrics definitions
//!
//! This module centralizes the prober's own operational metrics, recorded
//! through the metrics facade installed at startup. These are distinct from
//! the latency samples pushed to the remote backend.
//!
//! ## Counters
//! - Probe cycles run
//! - Probe failures (by any cause)
//! - Metrics push failures
//!
//! ## Histograms
//! - Probe cycle duration
//! - WebSocket handshake duration

use init4_bin_base::deps::metrics::{
    Counter, Histogram, counter, describe_counter, describe_histogram, histogram,
};
use std::sync::LazyLock;

const CYCLES_RUN: &str = "rpc_prober.cycles_run";
const CYCLES_RUN_HELP: &str = "Number of probe cycles executed";

const CYCLE_DURATION_MS: &str = "rpc_prober.cycle_duration_ms";
const CYCLE_DURATION_MS_HELP: &str = "Duration of probe cycles in milliseconds";

const PROBE_FAILURES: &str = "rpc_prober.probe_failures";
const PROBE_FAILURES_HELP: &str = "Number of probes that did not produce a latency measurement";

const PUSH_FAILURES: &str = "rpc_prober.push_failures";
const PUSH_FAILURES_HELP: &str = "Number of batches that could not be pushed to the backend";

const WS_HANDSHAKE_DURATION_MS: &str = "rpc_prober.ws_handshake_duration_ms";
const WS_HANDSHAKE_DURATION_MS_HELP: &str =
    "Duration of WebSocket connect handshakes in milliseconds";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(CYCLES_RUN, CYCLES_RUN_HELP);
    describe_histogram!(CYCLE_DURATION_MS, CYCLE_DURATION_MS_HELP);
    describe_counter!(PROBE_FAILURES, PROBE_FAILURES_HELP);
    describe_counter!(PUSH_FAILURES, PUSH_FAILURES_HELP);
    describe_histogram!(WS_HANDSHAKE_DURATION_MS, WS_HANDSHAKE_DURATION_MS_HELP);
});

/// Counter for probe cycles executed.
pub fn cycles_run() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(CYCLES_RUN)
}

/// Histogram for probe cycle duration in milliseconds.
pub fn cycle_duration_ms() -> Histogram {
    LazyLock::force(&DESCRIBE);
    histogram!(CYCLE_DURATION_MS)
}

/// Counter for probes that failed for any reason.
pub fn probe_failures() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(PROBE_FAILURES)
}

/// Counter for failed batch pushes.
pub fn push_failures() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(PUSH_FAILURES)
}

/// Histogram for WebSocket handshake duration in milliseconds.
pub fn ws_handshake_duration_ms() -> Histogram {
    LazyLock::force(&DESCRIBE);
    histogram!(WS_HANDSHAKE_DURATION_MS)
}
