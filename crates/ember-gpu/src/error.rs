//! GPU error types.

use ash::vk;
use thiserror::Error;

use crate::diagnostics::describe;

/// GPU bootstrap errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error, rendered through the diagnostic translator.
    #[error("Vulkan error: {} ({:?})", translated(.0), .0)]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or initialized.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// One or more requested validation layers are not installed.
    #[error("Validation layers not supported: {}", .0.join(", "))]
    ValidationLayersUnavailable(Vec<String>),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Optional extension function not exposed by the driver.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl GpuError {
    /// Whether bootstrap may continue without the feature that failed.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::ExtensionNotSupported(_))
    }
}

fn translated(result: &vk::Result) -> &'static str {
    describe(*result)
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_errors_are_translated() {
        let err = GpuError::from(vk::Result::ERROR_DEVICE_LOST);
        assert!(err.to_string().contains("Error device lost"));
    }

    #[test]
    fn missing_layers_are_listed() {
        let err = GpuError::ValidationLayersUnavailable(vec![
            "VK_LAYER_KHRONOS_validation".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation layers not supported: VK_LAYER_KHRONOS_validation"
        );
    }

    #[test]
    fn only_capability_absence_is_degradable() {
        assert!(GpuError::ExtensionNotSupported("VK_EXT_debug_utils".into()).is_degradable());
        assert!(!GpuError::NoSuitableDevice.is_degradable());
        assert!(!GpuError::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED).is_degradable());
    }
}
