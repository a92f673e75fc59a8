//! Vulkan implementation of [`ContextBackend`].

use std::marker::PhantomData;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::capabilities::DeviceCapabilities;
use crate::config::BootstrapConfig;
use crate::device::LogicalDevice;
use crate::error::{GpuError, Result};
use crate::instance::GpuInstance;
use crate::lifecycle::{ContextBackend, ContextLifecycle};
use crate::report::{report, Severity, VK_TAG};
use crate::selection::{self, AdapterQuery, QueueSelection, VulkanAdapterQuery};
use crate::surface::{platform_extensions, PresentationSurface};

/// Physical device chosen during bootstrap.
#[derive(Debug, Clone)]
pub struct SelectedAdapter {
    pub physical_device: vk::PhysicalDevice,
    pub capabilities: DeviceCapabilities,
}

/// Fully bootstrapped Vulkan context for a window of type `W`.
pub type GpuContext<W> = ContextLifecycle<VulkanBackend<W>>;

/// Backend driving a real Vulkan loader.
pub struct VulkanBackend<W> {
    entry: ash::Entry,
    config: BootstrapConfig,
    _window: PhantomData<fn(W)>,
}

impl<W> VulkanBackend<W> {
    /// Load the Vulkan entry point.
    pub fn new(config: BootstrapConfig) -> Result<Self> {
        // SAFETY: the loaded library is kept alive by the entry.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        Ok(Self {
            entry,
            config,
            _window: PhantomData,
        })
    }

    /// Bootstrap configuration.
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }
}

impl<W> ContextBackend for VulkanBackend<W>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    type Window = W;
    type Instance = GpuInstance;
    type Surface = PresentationSurface;
    type Adapter = SelectedAdapter;
    type Device = LogicalDevice;

    fn create_instance(&mut self, window: &W) -> Result<GpuInstance> {
        let platform = platform_extensions(window)?;

        // SAFETY: the entry was loaded in `new` and is still alive.
        let instance = unsafe {
            GpuInstance::create(
                self.entry.clone(),
                &self.config.app_name,
                &platform,
                &self.config.validation,
            )
        }?;

        tracing::info!(
            "Vulkan instance created ({} extensions, {} layers, validation {})",
            instance.enabled_extensions().len(),
            instance.enabled_layers().len(),
            if instance.validation_installed() { "on" } else { "off" },
        );
        Ok(instance)
    }

    fn create_surface(&mut self, instance: &GpuInstance, window: &W) -> Result<PresentationSurface> {
        // SAFETY: the lifecycle keeps the window alive until after the surface is destroyed.
        unsafe { PresentationSurface::from_window(instance, window) }
    }

    fn select_adapter(
        &mut self,
        instance: &GpuInstance,
        surface: &PresentationSurface,
    ) -> Result<(SelectedAdapter, QueueSelection)> {
        // SAFETY: the surface was created from this instance.
        let query = unsafe { VulkanAdapterQuery::new(instance.raw(), surface) };
        let (physical_device, queues) = selection::pick(&query, &self.config.suitability)?;
        let capabilities = query.capabilities(physical_device);

        tracing::info!("Selected GPU: {}", capabilities.summary());
        tracing::info!(
            "Queue families: graphics {}, present {}",
            queues.graphics_family,
            queues.present_family
        );

        // SAFETY: the device was enumerated from the surface's instance.
        match unsafe { surface.support(physical_device) } {
            Ok(support) if support.is_adequate() => {
                tracing::debug!("Surface support: {}", support.summary());
            }
            Ok(support) => report(
                Severity::Warning,
                VK_TAG,
                format_args!("Surface offers no usable formats: {}", support.summary()),
            ),
            Err(e) => report(
                Severity::Warning,
                VK_TAG,
                format_args!("Surface support query failed: {e}"),
            ),
        }

        Ok((
            SelectedAdapter {
                physical_device,
                capabilities,
            },
            queues,
        ))
    }

    fn create_device(
        &mut self,
        instance: &GpuInstance,
        adapter: &SelectedAdapter,
        selection: QueueSelection,
    ) -> Result<LogicalDevice> {
        // SAFETY: the physical device and selection come from `select_adapter`.
        let device =
            unsafe { LogicalDevice::build(instance.raw(), adapter.physical_device, selection) }?;
        tracing::info!(
            "Logical device created with {} queue families",
            selection.unique_families().len()
        );
        Ok(device)
    }

    fn wait_idle(&mut self, device: &LogicalDevice) -> Result<()> {
        device.wait_idle()
    }

    fn destroy_device(&mut self, device: LogicalDevice) -> Result<()> {
        // SAFETY: the lifecycle waits for idle before destroying the device.
        unsafe { device.destroy() };
        Ok(())
    }

    fn uninstall_validation(&mut self, instance: &mut GpuInstance) -> Result<()> {
        // SAFETY: the instance is destroyed only after this step.
        unsafe { instance.uninstall_validation() };
        Ok(())
    }

    fn destroy_surface(&mut self, _instance: &GpuInstance, surface: PresentationSurface) -> Result<()> {
        // SAFETY: the device using the surface is already gone.
        unsafe { surface.destroy() };
        Ok(())
    }

    fn destroy_instance(&mut self, instance: GpuInstance) -> Result<()> {
        // SAFETY: device, surface and messenger are already destroyed.
        unsafe { instance.destroy() };
        Ok(())
    }

    fn release_window(&mut self, window: W) -> Result<()> {
        drop(window);
        Ok(())
    }
}
