// Path and File Name : /home/diamondeye/rebuild/core/kb/src/telemetry.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tracing subscriber setup shared by ingestion jobs and test harnesses

/// Install the global fmt subscriber. Safe to call more than once; later
/// calls are no-ops (tests and embedded jobs share one process).
pub fn init() {
    let _ = tracing_subscriber::fmt().with_target(true).try_init();
}
