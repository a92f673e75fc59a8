//! Application configuration.

use ember_gpu::{BootstrapConfig, SuitabilityPolicy};
use ember_platform::PlatformConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Window width.
    pub width: u32,
    /// Window height.
    pub height: u32,
    /// GPU context settings.
    pub bootstrap: BootstrapConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Ember".to_string(),
            width: 1920,
            height: 1080,
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    ///
    /// The title is also reported to the driver as the application name.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            bootstrap: BootstrapConfig::default().app_name(title.clone()),
            title,
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.bootstrap = self.bootstrap.validation(validation);
        self
    }

    /// Set the device suitability policy.
    pub fn with_suitability(mut self, policy: SuitabilityPolicy) -> Self {
        self.bootstrap = self.bootstrap.suitability(policy);
        self
    }

    /// Window settings derived from this config.
    pub fn platform(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            resizable: false,
        }
    }
}
