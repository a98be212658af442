//! Node Configuration Module
//!
//! Provides the detection node configuration loaded from TOML files, replacing
//! hardcoded constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `TL_DETECTOR_CONFIG` environment variable (path to TOML file)
//! 2. `tl_detector.toml` in the current working directory
//! 3. Built-in defaults (see `defaults`)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(NodeConfig::load());
//! let threshold = config::get().detector.state_count_threshold;
//! ```

mod node_config;
pub mod defaults;
pub mod validation;

pub use node_config::*;

use std::sync::OnceLock;

/// Global node configuration, initialized once at startup.
static NODE_CONFIG: OnceLock<NodeConfig> = OnceLock::new();

/// Initialize the global node configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: NodeConfig) {
    if NODE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global node configuration.
///
/// Falls back to built-in defaults when `init()` was never called, so library
/// users embedding the detector do not need the global.
pub fn get() -> &'static NodeConfig {
    NODE_CONFIG.get_or_init(NodeConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    NODE_CONFIG.get().is_some()
}
