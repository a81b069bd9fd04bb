//! Wiring for the `vigil-worker` binary: the watched-targets file and the
//! notification channels enabled by the environment.

pub mod channels;
pub mod targets;
