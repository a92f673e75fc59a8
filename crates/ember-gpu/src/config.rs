//! Bootstrap configuration.
//!
//! Everything here is read once at startup; nothing is reconfigured while
//! the context is alive.

use std::ffi::CStr;

use ash::vk;

use crate::capabilities::DeviceCapabilities;
use crate::selection::Unsuitable;

/// Validation layer set shipped by a particular driver distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSet {
    /// `VK_LAYER_KHRONOS_validation` (current SDKs).
    Khronos,
    /// `VK_LAYER_LUNARG_standard_validation` (legacy LunarG SDKs).
    LunargStandard,
}

impl LayerSet {
    /// Layer names to request.
    pub fn names(self) -> &'static [&'static CStr] {
        match self {
            Self::Khronos => &[c"VK_LAYER_KHRONOS_validation"],
            Self::LunargStandard => &[c"VK_LAYER_LUNARG_standard_validation"],
        }
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        if cfg!(feature = "lunarg-validation") {
            Self::LunargStandard
        } else {
            Self::Khronos
        }
    }
}

/// Validation instrumentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Enable validation layers and the debug messenger.
    pub enabled: bool,
    /// Which layer set to request.
    pub layers: LayerSet,
    /// Severities the debug messenger subscribes to.
    pub severities: vk::DebugUtilsMessageSeverityFlagsEXT,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            layers: LayerSet::default(),
            severities: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        }
    }
}

impl ValidationConfig {
    /// Validation switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Layer names to request, empty when disabled.
    pub fn requested_layers(&self) -> &'static [&'static CStr] {
        if self.enabled {
            self.layers.names()
        } else {
            &[]
        }
    }
}

/// Minimum capabilities a physical device must report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuitabilityPolicy {
    /// Minimum supported Vulkan major version.
    pub min_api_major: u32,
    /// Minimum `maxImageDimension2D` limit.
    pub min_image_dimension_2d: u32,
    /// Required device class, `None` accepts any.
    pub device_type: Option<vk::PhysicalDeviceType>,
    /// Require the geometry shader feature.
    pub geometry_shader: bool,
}

impl Default for SuitabilityPolicy {
    fn default() -> Self {
        Self {
            min_api_major: 1,
            min_image_dimension_2d: 4096,
            device_type: Some(vk::PhysicalDeviceType::DISCRETE_GPU),
            geometry_shader: true,
        }
    }
}

impl SuitabilityPolicy {
    /// Accept integrated, virtual and CPU devices as well.
    #[must_use]
    pub fn any_device_type(mut self) -> Self {
        self.device_type = None;
        self
    }

    /// Check device capabilities against this policy.
    pub fn check(&self, caps: &DeviceCapabilities) -> Result<(), Unsuitable> {
        if vk::api_version_major(caps.api_version) < self.min_api_major {
            return Err(Unsuitable::ApiVersion(caps.api_version));
        }
        if caps.max_image_dimension_2d < self.min_image_dimension_2d {
            return Err(Unsuitable::ImageDimension(caps.max_image_dimension_2d));
        }
        if let Some(required) = self.device_type {
            if caps.device_type != required {
                return Err(Unsuitable::DeviceType(caps.device_type));
            }
        }
        if self.geometry_shader && !caps.geometry_shader {
            return Err(Unsuitable::GeometryShader);
        }
        Ok(())
    }
}

/// Settings for the whole bootstrap chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub app_name: String,
    pub validation: ValidationConfig,
    pub suitability: SuitabilityPolicy,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            app_name: "Ember".to_string(),
            validation: ValidationConfig::default(),
            suitability: SuitabilityPolicy::default(),
        }
    }
}

impl BootstrapConfig {
    /// Create a new config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation.enabled = enable;
        self
    }

    /// Choose the validation layer set.
    #[must_use]
    pub fn layers(mut self, layers: LayerSet) -> Self {
        self.validation.layers = layers;
        self
    }

    /// Replace the device suitability policy.
    #[must_use]
    pub fn suitability(mut self, policy: SuitabilityPolicy) -> Self {
        self.suitability = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discrete() -> DeviceCapabilities {
        DeviceCapabilities {
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            api_version: vk::make_api_version(0, 1, 3, 0),
            max_image_dimension_2d: 16384,
            geometry_shader: true,
            ..DeviceCapabilities::default()
        }
    }

    #[test]
    fn default_policy_accepts_capable_discrete_gpu() {
        assert_eq!(SuitabilityPolicy::default().check(&discrete()), Ok(()));
    }

    #[test]
    fn default_policy_rejects_each_missing_capability() {
        let policy = SuitabilityPolicy::default();

        let mut caps = discrete();
        caps.api_version = vk::make_api_version(0, 0, 9, 0);
        assert!(matches!(policy.check(&caps), Err(Unsuitable::ApiVersion(_))));

        let mut caps = discrete();
        caps.max_image_dimension_2d = 2048;
        assert_eq!(policy.check(&caps), Err(Unsuitable::ImageDimension(2048)));

        let mut caps = discrete();
        caps.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        assert_eq!(
            policy.check(&caps),
            Err(Unsuitable::DeviceType(vk::PhysicalDeviceType::INTEGRATED_GPU))
        );

        let mut caps = discrete();
        caps.geometry_shader = false;
        assert_eq!(policy.check(&caps), Err(Unsuitable::GeometryShader));
    }

    #[test]
    fn relaxed_policy_accepts_integrated() {
        let mut caps = discrete();
        caps.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        assert_eq!(SuitabilityPolicy::default().any_device_type().check(&caps), Ok(()));
    }

    #[test]
    fn image_dimension_boundary_is_inclusive() {
        let mut caps = discrete();
        caps.max_image_dimension_2d = 4096;
        assert_eq!(SuitabilityPolicy::default().check(&caps), Ok(()));
    }

    #[test]
    fn disabled_validation_requests_no_layers() {
        assert!(ValidationConfig::disabled().requested_layers().is_empty());

        let enabled = ValidationConfig {
            enabled: true,
            layers: LayerSet::Khronos,
            ..ValidationConfig::default()
        };
        assert_eq!(enabled.requested_layers(), &[c"VK_LAYER_KHRONOS_validation"]);
    }

    #[test]
    fn builder() {
        let config = BootstrapConfig::new()
            .app_name("test")
            .validation(true)
            .layers(LayerSet::LunargStandard)
            .suitability(SuitabilityPolicy::default().any_device_type());

        assert_eq!(config.app_name, "test");
        assert!(config.validation.enabled);
        assert_eq!(config.validation.layers, LayerSet::LunargStandard);
        assert_eq!(config.suitability.device_type, None);
    }
}
