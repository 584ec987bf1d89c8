//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging, ignoring a logger that is already installed
pub fn try_init() {
    let _ = env_logger::try_init();
}
