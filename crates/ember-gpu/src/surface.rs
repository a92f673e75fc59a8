//! Presentation surface management.
//!
//! Wraps the Vulkan surface created for a window, hiding the
//! raw-window-handle plumbing from the rest of the bootstrap chain.

use std::ffi::CStr;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{GpuError, Result};
use crate::instance::GpuInstance;

/// Instance extensions the windowing system needs for surface creation.
pub fn platform_extensions<W: HasDisplayHandle>(window: &W) -> Result<Vec<&'static CStr>> {
    let display = window
        .display_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;

    let names = ash_window::enumerate_required_extensions(display.as_raw())?;

    // SAFETY: ash-window returns pointers to static NUL-terminated names.
    Ok(names
        .iter()
        .map(|&ptr| unsafe { CStr::from_ptr(ptr) })
        .collect())
}

/// Vulkan surface bound to a window.
pub struct PresentationSurface {
    /// The Vulkan surface handle.
    pub handle: vk::SurfaceKHR,
    /// Surface extension loader.
    pub loader: ash::khr::surface::Instance,
}

impl PresentationSurface {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The instance must be valid and the window must outlive the surface.
    pub unsafe fn from_window<W>(instance: &GpuInstance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        // SAFETY: handles are valid; caller keeps the window alive.
        let handle = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.raw(),
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(crate::diagnostics::describe(e).to_string()))?;

        let loader = ash::khr::surface::Instance::new(instance.entry(), instance.raw());

        Ok(Self { handle, loader })
    }

    /// Query presentation support for one queue family.
    ///
    /// # Safety
    /// The physical device must belong to the instance this surface was
    /// created from.
    pub unsafe fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
    ) -> Result<bool> {
        // SAFETY: forwarded from the caller.
        let supported = unsafe {
            self.loader.get_physical_device_surface_support(
                physical_device,
                family_index,
                self.handle,
            )
        }?;
        Ok(supported)
    }

    /// Query surface support details for a physical device.
    ///
    /// # Safety
    /// The physical device must belong to the instance this surface was
    /// created from.
    pub unsafe fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceSupport> {
        // SAFETY: forwarded from the caller.
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.handle)?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.handle)?;

            Ok(SurfaceSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must not be in use and the instance must still be alive.
    pub unsafe fn destroy(self) {
        // SAFETY: forwarded from the caller.
        unsafe { self.loader.destroy_surface(self.handle, None) };
    }
}

/// Surface support query result.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// A surface is usable for presentation with at least one format and mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// One-line summary for diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "{} formats, {} present modes, {}..{} images",
            self.formats.len(),
            self.present_modes.len(),
            self.capabilities.min_image_count,
            self.capabilities.max_image_count,
        )
    }
}
