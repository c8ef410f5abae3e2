//! Shared utilities for memfs block stores.

pub mod logging;
pub mod names;
pub mod stats;

pub use logging::{init_tracing, LogFormat};
pub use names::random_name;
pub use stats::{OpCounters, OpSnapshot};
