//! Physical device selection.
//!
//! Devices are considered in enumeration order and the first one that passes
//! the [`SuitabilityPolicy`] and exposes graphics and presentation queues is
//! chosen. A later, more capable device never displaces an earlier adequate
//! one.

use ash::vk;
use thiserror::Error;

use crate::capabilities::DeviceCapabilities;
use crate::config::SuitabilityPolicy;
use crate::error::{GpuError, Result};
use crate::report::{report, Severity, VK_TAG};
use crate::surface::PresentationSurface;

/// Queue family indices chosen for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSelection {
    pub graphics_family: u32,
    pub present_family: u32,
}

impl QueueSelection {
    /// One family serving both roles.
    pub const fn combined(family: u32) -> Self {
        Self {
            graphics_family: family,
            present_family: family,
        }
    }

    /// Whether graphics and presentation share a family.
    pub const fn is_combined(&self) -> bool {
        self.graphics_family == self.present_family
    }

    /// Distinct families, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        if self.is_combined() {
            vec![self.graphics_family]
        } else {
            vec![self.graphics_family, self.present_family]
        }
    }
}

/// Reason a device was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsuitable {
    #[error("API version {} is too old", version_string(.0))]
    ApiVersion(u32),
    #[error("max 2D image dimension {0} is too small")]
    ImageDimension(u32),
    #[error("device type {0:?} is not accepted")]
    DeviceType(vk::PhysicalDeviceType),
    #[error("geometry shaders are not supported")]
    GeometryShader,
    #[error("no queue families")]
    NoQueueFamilies,
    #[error("no queue families with graphics and present support")]
    QueueFamilies,
}

fn version_string(version: &u32) -> String {
    format!(
        "{}.{}",
        vk::api_version_major(*version),
        vk::api_version_minor(*version)
    )
}

/// Driver queries needed to evaluate physical devices.
pub trait AdapterQuery {
    /// Enumerate physical devices in driver order.
    fn enumerate(&self) -> Result<Vec<vk::PhysicalDevice>>;

    /// Capabilities of a device.
    fn capabilities(&self, device: vk::PhysicalDevice) -> DeviceCapabilities;

    /// Queue family table of a device.
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    /// Whether a family can present to the target surface.
    fn presentation_support(&self, device: vk::PhysicalDevice, family_index: u32) -> Result<bool>;
}

/// [`AdapterQuery`] backed by a live instance and surface.
pub struct VulkanAdapterQuery<'a> {
    instance: &'a ash::Instance,
    surface: &'a PresentationSurface,
}

impl<'a> VulkanAdapterQuery<'a> {
    /// Create a query.
    ///
    /// # Safety
    /// The surface must have been created from `instance`, and both must stay
    /// valid while the query is used.
    pub unsafe fn new(instance: &'a ash::Instance, surface: &'a PresentationSurface) -> Self {
        Self { instance, surface }
    }
}

impl AdapterQuery for VulkanAdapterQuery<'_> {
    fn enumerate(&self) -> Result<Vec<vk::PhysicalDevice>> {
        // SAFETY: instance validity is guaranteed at construction.
        Ok(unsafe { self.instance.enumerate_physical_devices() }?)
    }

    fn capabilities(&self, device: vk::PhysicalDevice) -> DeviceCapabilities {
        // SAFETY: `device` was enumerated from this instance.
        unsafe { DeviceCapabilities::query(self.instance, device) }
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        // SAFETY: `device` was enumerated from this instance.
        unsafe { self.instance.get_physical_device_queue_family_properties(device) }
    }

    fn presentation_support(&self, device: vk::PhysicalDevice, family_index: u32) -> Result<bool> {
        // SAFETY: surface and device share the instance.
        unsafe { self.surface.supports_present(device, family_index) }
    }
}

/// Choose graphics and presentation families.
///
/// Families are visited in index order. The first family supporting both
/// graphics and presentation wins outright; otherwise the first graphics
/// family is paired with the first presenting family.
pub fn select_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> Option<QueueSelection>
where
    F: FnMut(u32) -> bool,
{
    let mut present_support = Vec::with_capacity(families.len());
    let mut graphics_family = None;

    for (index, family) in (0u32..).zip(families) {
        let presents = supports_present(index);
        present_support.push(presents);

        let graphics =
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        if graphics && graphics_family.is_none() {
            graphics_family = Some(index);
        }

        if graphics && presents {
            return Some(QueueSelection::combined(index));
        }
    }

    let present_family = (0u32..)
        .zip(&present_support)
        .find_map(|(index, &presents)| presents.then_some(index))?;

    Some(QueueSelection {
        graphics_family: graphics_family?,
        present_family,
    })
}

/// Evaluate one device against the policy and find its queue families.
pub fn is_suitable<Q: AdapterQuery + ?Sized>(
    query: &Q,
    device: vk::PhysicalDevice,
    policy: &SuitabilityPolicy,
) -> std::result::Result<QueueSelection, Unsuitable> {
    let caps = query.capabilities(device);

    let outcome = policy.check(&caps).and_then(|()| {
        let families = query.queue_families(device);
        if families.is_empty() {
            return Err(Unsuitable::NoQueueFamilies);
        }

        select_queue_families(&families, |index| {
            query
                .presentation_support(device, index)
                .unwrap_or_else(|e| {
                    report(
                        Severity::Warning,
                        VK_TAG,
                        format_args!("Present support query failed for family {index}: {e}"),
                    );
                    false
                })
        })
        .ok_or(Unsuitable::QueueFamilies)
    });

    if let Err(reason) = &outcome {
        report(
            Severity::Error,
            VK_TAG,
            format_args!("Physical device {} rejected: {reason}", caps.label()),
        );
    }

    outcome
}

/// Enumerate physical devices. An empty list is not an error.
pub fn enumerate<Q: AdapterQuery + ?Sized>(query: &Q) -> Result<Vec<vk::PhysicalDevice>> {
    query.enumerate()
}

/// Pick the first suitable device in enumeration order.
pub fn pick<Q: AdapterQuery + ?Sized>(
    query: &Q,
    policy: &SuitabilityPolicy,
) -> Result<(vk::PhysicalDevice, QueueSelection)> {
    let devices = enumerate(query)?;
    tracing::debug!("Found {} physical device(s)", devices.len());

    devices
        .into_iter()
        .find_map(|device| {
            is_suitable(query, device, policy)
                .ok()
                .map(|selection| (device, selection))
        })
        .ok_or(GpuError::NoSuitableDevice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn graphics() -> vk::QueueFamilyProperties {
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER)
    }

    fn compute() -> vk::QueueFamilyProperties {
        family(vk::QueueFlags::COMPUTE)
    }

    struct FakeDevice {
        caps: DeviceCapabilities,
        families: Vec<vk::QueueFamilyProperties>,
        present: Vec<bool>,
    }

    impl FakeDevice {
        fn suitable() -> Self {
            Self {
                caps: DeviceCapabilities {
                    device_name: "discrete".to_string(),
                    device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
                    api_version: vk::make_api_version(0, 1, 3, 0),
                    max_image_dimension_2d: 16384,
                    geometry_shader: true,
                    ..DeviceCapabilities::default()
                },
                families: vec![graphics()],
                present: vec![true],
            }
        }

        fn integrated() -> Self {
            let mut device = Self::suitable();
            device.caps.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
            device
        }
    }

    #[derive(Default)]
    struct FakeQuery {
        devices: Vec<FakeDevice>,
        queried_families: RefCell<Vec<u64>>,
    }

    impl FakeQuery {
        fn new(devices: Vec<FakeDevice>) -> Self {
            Self {
                devices,
                ..Self::default()
            }
        }

        fn device(&self, device: vk::PhysicalDevice) -> &FakeDevice {
            &self.devices[device.as_raw() as usize - 1]
        }
    }

    impl AdapterQuery for FakeQuery {
        fn enumerate(&self) -> Result<Vec<vk::PhysicalDevice>> {
            Ok((1..=self.devices.len() as u64)
                .map(vk::PhysicalDevice::from_raw)
                .collect())
        }

        fn capabilities(&self, device: vk::PhysicalDevice) -> DeviceCapabilities {
            self.device(device).caps.clone()
        }

        fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
            self.queried_families.borrow_mut().push(device.as_raw());
            self.device(device).families.clone()
        }

        fn presentation_support(&self, device: vk::PhysicalDevice, index: u32) -> Result<bool> {
            Ok(self.device(device).present[index as usize])
        }
    }

    #[test]
    fn combined_family_wins_over_earlier_graphics_family() {
        let selection = select_queue_families(&[graphics(), graphics()], |i| i == 1);
        assert_eq!(selection, Some(QueueSelection::combined(1)));
    }

    #[test]
    fn split_families_when_none_combined() {
        let families = [graphics(), compute(), compute()];
        let selection = select_queue_families(&families, |i| i == 2);
        assert_eq!(
            selection,
            Some(QueueSelection {
                graphics_family: 0,
                present_family: 2,
            })
        );
    }

    #[test]
    fn first_graphics_family_is_kept_in_split_mode() {
        let families = [compute(), graphics(), graphics(), compute()];
        let selection = select_queue_families(&families, |i| i == 3 || i == 0);
        assert_eq!(
            selection,
            Some(QueueSelection {
                graphics_family: 1,
                present_family: 0,
            })
        );
    }

    #[test]
    fn combined_search_stops_at_first_match() {
        let mut visited = Vec::new();
        let selection = select_queue_families(&[graphics(), graphics(), graphics()], |i| {
            visited.push(i);
            true
        });
        assert_eq!(selection, Some(QueueSelection::combined(0)));
        assert_eq!(visited, vec![0]);
    }

    #[test]
    fn missing_roles_reject() {
        assert_eq!(select_queue_families(&[compute()], |_| true), None);
        assert_eq!(select_queue_families(&[graphics()], |_| false), None);
        assert_eq!(select_queue_families(&[], |_| true), None);
    }

    #[test]
    fn empty_graphics_family_is_ignored() {
        let empty = vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::GRAPHICS,
            queue_count: 0,
            ..Default::default()
        };
        let selection = select_queue_families(&[empty, graphics()], |_| true);
        assert_eq!(selection, Some(QueueSelection::combined(1)));
    }

    #[test]
    fn unique_families() {
        assert_eq!(QueueSelection::combined(3).unique_families(), vec![3]);
        let split = QueueSelection {
            graphics_family: 0,
            present_family: 2,
        };
        assert!(!split.is_combined());
        assert_eq!(split.unique_families(), vec![0, 2]);
    }

    #[test]
    fn pick_is_first_fit() {
        let mut better = FakeDevice::suitable();
        better.caps.device_local_memory_mb = 24_576;
        let query = FakeQuery::new(vec![FakeDevice::integrated(), FakeDevice::suitable(), better]);

        let (device, selection) = pick(&query, &SuitabilityPolicy::default()).unwrap();
        assert_eq!(device.as_raw(), 2);
        assert_eq!(selection, QueueSelection::combined(0));
    }

    #[test]
    fn rejected_capabilities_skip_queue_queries() {
        let query = FakeQuery::new(vec![FakeDevice::integrated(), FakeDevice::suitable()]);
        pick(&query, &SuitabilityPolicy::default()).unwrap();
        assert_eq!(*query.queried_families.borrow(), vec![2]);
    }

    #[test]
    fn pick_fails_without_suitable_device() {
        let query = FakeQuery::new(vec![FakeDevice::integrated(), FakeDevice::integrated()]);
        let result = pick(&query, &SuitabilityPolicy::default());
        assert!(matches!(result, Err(GpuError::NoSuitableDevice)));
    }

    #[test]
    fn pick_fails_on_empty_enumeration() {
        let query = FakeQuery::default();
        assert!(enumerate(&query).unwrap().is_empty());
        assert!(matches!(
            pick(&query, &SuitabilityPolicy::default()),
            Err(GpuError::NoSuitableDevice)
        ));
    }

    #[test]
    fn relaxed_policy_accepts_integrated() {
        let query = FakeQuery::new(vec![FakeDevice::integrated()]);
        let policy = SuitabilityPolicy::default().any_device_type();
        let (device, _) = pick(&query, &policy).unwrap();
        assert_eq!(device.as_raw(), 1);
    }

    #[test]
    fn device_without_queue_families_is_rejected() {
        let mut device = FakeDevice::suitable();
        device.families.clear();
        device.present.clear();
        let query = FakeQuery::new(vec![device]);

        let result = is_suitable(
            &query,
            vk::PhysicalDevice::from_raw(1),
            &SuitabilityPolicy::default(),
        );
        assert_eq!(result, Err(Unsuitable::NoQueueFamilies));
    }

    #[test]
    fn split_device_is_suitable() {
        let mut device = FakeDevice::suitable();
        device.families = vec![graphics(), compute(), compute()];
        device.present = vec![false, false, true];
        let query = FakeQuery::new(vec![device]);

        let result = is_suitable(
            &query,
            vk::PhysicalDevice::from_raw(1),
            &SuitabilityPolicy::default(),
        );
        assert_eq!(
            result,
            Ok(QueueSelection {
                graphics_family: 0,
                present_family: 2,
            })
        );
    }
}
