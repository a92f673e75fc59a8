//! Logical device creation and queue retrieval.

use std::ffi::{c_char, CStr};

use ash::vk;

use crate::diagnostics::describe;
use crate::error::Result;
use crate::report::{report, Severity, VK_TAG};
use crate::selection::QueueSelection;

/// Priority assigned to every requested queue.
pub const QUEUE_PRIORITY: f32 = 1.0;

/// Required device extensions.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Queue families to request, one queue each.
pub fn queue_family_requests(selection: &QueueSelection) -> Vec<u32> {
    selection.unique_families()
}

/// Graphics and presentation queue handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceQueues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// Logical device with its graphics and presentation queues.
pub struct LogicalDevice {
    pub(crate) raw: ash::Device,
    selection: QueueSelection,
    queues: DeviceQueues,
}

impl LogicalDevice {
    /// Create the logical device and retrieve its queues.
    ///
    /// # Safety
    /// The instance and physical device must be valid, and `selection` must
    /// come from evaluating this physical device.
    pub unsafe fn build(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        selection: QueueSelection,
    ) -> Result<Self> {
        let priorities = [QUEUE_PRIORITY];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_family_requests(&selection)
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let extension_names: Vec<*const c_char> = required_device_extensions()
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);

        // SAFETY: all pointers in the create info outlive the call.
        let raw = unsafe { instance.create_device(physical_device, &device_create_info, None) }
            .inspect_err(|&res| {
                report(
                    Severity::Error,
                    VK_TAG,
                    format_args!("Could not create vulkan device: {}", describe(res)),
                );
            })?;

        // SAFETY: the device was created with one queue in each family.
        let queues = unsafe { retrieve_queues(&raw, &selection) };

        Ok(Self {
            raw,
            selection,
            queues,
        })
    }

    /// Raw device.
    pub fn raw(&self) -> &ash::Device {
        &self.raw
    }

    /// Queue families in use.
    pub fn selection(&self) -> QueueSelection {
        self.selection
    }

    /// Graphics and presentation queues.
    pub fn queues(&self) -> DeviceQueues {
        self.queues
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.queues.graphics
    }

    /// Get the presentation queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.queues.present
    }

    /// Block until all submitted work has completed.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device is alive until `destroy` consumes it.
        unsafe { self.raw.device_wait_idle() }?;
        Ok(())
    }

    /// Destroy the device.
    ///
    /// # Safety
    /// The device must be idle and no child objects may remain.
    pub unsafe fn destroy(self) {
        // SAFETY: forwarded from the caller.
        unsafe { self.raw.destroy_device(None) };
    }
}

/// Fetch queue 0 of each selected family.
///
/// # Safety
/// The device must have been created with a queue in each family of
/// `selection`.
pub unsafe fn retrieve_queues(device: &ash::Device, selection: &QueueSelection) -> DeviceQueues {
    // SAFETY: forwarded from the caller.
    unsafe {
        DeviceQueues {
            graphics: device.get_device_queue(selection.graphics_family, 0),
            present: device.get_device_queue(selection.present_family, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_selection_requests_one_family() {
        assert_eq!(queue_family_requests(&QueueSelection::combined(1)), vec![1]);
    }

    #[test]
    fn split_selection_requests_both_families() {
        let selection = QueueSelection {
            graphics_family: 0,
            present_family: 2,
        };
        assert_eq!(queue_family_requests(&selection), vec![0, 2]);
    }

    #[test]
    fn swapchain_is_always_required() {
        assert_eq!(required_device_extensions(), vec![ash::khr::swapchain::NAME]);
    }
}
