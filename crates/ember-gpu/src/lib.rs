//! Vulkan context bootstrap for the Ember runtime.
//!
//! This crate provides:
//! - Status code translation
//! - Validation layer instrumentation
//! - Instance creation and capability negotiation
//! - Physical device selection and queue family resolution
//! - Logical device creation
//! - An ordered lifecycle that tears everything down in reverse

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod report;
pub mod selection;
pub mod surface;
pub mod validation;

pub use backend::{GpuContext, SelectedAdapter, VulkanBackend};
pub use capabilities::{DeviceCapabilities, GpuVendor};
pub use config::{BootstrapConfig, LayerSet, SuitabilityPolicy, ValidationConfig};
pub use device::{DeviceQueues, LogicalDevice};
pub use diagnostics::describe;
pub use error::{GpuError, Result};
pub use instance::GpuInstance;
pub use lifecycle::{ContextBackend, ContextLifecycle, LifecycleState};
pub use report::{report, Severity};
pub use selection::{AdapterQuery, QueueSelection, Unsuitable};
pub use surface::{PresentationSurface, SurfaceSupport};
pub use validation::ValidationLayer;
