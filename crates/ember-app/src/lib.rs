//! Application runner for the Ember runtime.
//!
//! Handles the boilerplate around a bootstrapped GPU context:
//! - Logging initialization
//! - Window creation
//! - Vulkan context bootstrap and ordered teardown
//! - Event loop handling
//!
//! # Example
//!
//! ```no_run
//! use ember_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::new("Ember Window").with_validation(true))
//! }
//! ```

mod config;
mod runner;

pub use config::AppConfig;
pub use runner::run_app;

pub use ember_gpu::{BootstrapConfig, LayerSet, SuitabilityPolicy};
