//! Vulkan instance creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;

use crate::config::ValidationConfig;
use crate::diagnostics::describe;
use crate::error::{GpuError, Result};
use crate::report::{report, Severity, VK_TAG};
use crate::validation::ValidationLayer;

/// Engine name reported to the driver.
pub const ENGINE_NAME: &CStr = c"Ember";

/// Extensions the loader needs to expose portability drivers (MoltenVK).
#[cfg(target_os = "macos")]
pub const PORTABILITY_EXTENSIONS: &[&CStr] = &[ash::khr::portability_enumeration::NAME];
#[cfg(not(target_os = "macos"))]
pub const PORTABILITY_EXTENSIONS: &[&CStr] = &[];

/// Instance create flags matching [`PORTABILITY_EXTENSIONS`].
pub fn instance_create_flags() -> vk::InstanceCreateFlags {
    if PORTABILITY_EXTENSIONS.is_empty() {
        vk::InstanceCreateFlags::empty()
    } else {
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    }
}

/// Instance extensions to enable.
///
/// The platform set comes from the windowing system, followed by the
/// portability extensions of this target; `VK_EXT_debug_utils` is appended
/// when validation is enabled. Duplicates are dropped.
pub fn required_extensions(
    platform: &[&'static CStr],
    validation_enabled: bool,
) -> Vec<&'static CStr> {
    let debug: &[&'static CStr] = if validation_enabled {
        &[ash::ext::debug_utils::NAME]
    } else {
        &[]
    };

    let mut extensions: Vec<&'static CStr> = Vec::with_capacity(platform.len() + 2);
    for &ext in platform.iter().chain(PORTABILITY_EXTENSIONS).chain(debug) {
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    extensions
}

/// Requested layers missing from `available`.
pub fn missing_layers<'a>(requested: &[&'a CStr], available: &[&CStr]) -> Vec<&'a CStr> {
    requested
        .iter()
        .copied()
        .filter(|layer| !available.iter().any(|name| name == layer))
        .collect()
}

/// True only if every requested layer is available.
pub fn validation_layers_available(requested: &[&CStr], available: &[&CStr]) -> bool {
    missing_layers(requested, available).is_empty()
}

/// Resolve the layer list for instance creation.
///
/// Fails when validation is enabled and any requested layer is missing.
pub fn resolve_layers(
    config: &ValidationConfig,
    available: &[&CStr],
) -> Result<Vec<&'static CStr>> {
    let requested = config.requested_layers();
    let missing = missing_layers(requested, available);
    if !missing.is_empty() {
        return Err(GpuError::ValidationLayersUnavailable(
            missing
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        ));
    }
    Ok(requested.to_vec())
}

/// Query the names of all installed instance layers.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn available_layers(entry: &ash::Entry) -> Result<Vec<CString>> {
    // SAFETY: entry is valid.
    let properties = unsafe { entry.enumerate_instance_layer_properties() }?;
    Ok(properties
        .iter()
        // SAFETY: layer names are NUL-terminated fixed-size arrays.
        .map(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }.to_owned())
        .collect())
}

/// Loader calls made while creating an instance.
pub trait InstanceLoader {
    type Instance;

    /// Names of the installed instance layers.
    ///
    /// # Safety
    /// The loader must be valid.
    unsafe fn layer_names(&self) -> Result<Vec<CString>>;

    /// Create the instance.
    ///
    /// # Safety
    /// All pointers in `info` must be valid for the call.
    unsafe fn create_raw(&self, info: &vk::InstanceCreateInfo<'_>) -> Result<Self::Instance>;
}

impl InstanceLoader for ash::Entry {
    type Instance = ash::Instance;

    unsafe fn layer_names(&self) -> Result<Vec<CString>> {
        // SAFETY: forwarded from the caller.
        unsafe { available_layers(self) }
    }

    unsafe fn create_raw(&self, info: &vk::InstanceCreateInfo<'_>) -> Result<ash::Instance> {
        // SAFETY: forwarded from the caller.
        Ok(unsafe { self.create_instance(info, None) }?)
    }
}

/// Instance handle with the extensions and layers it was created with.
#[derive(Debug)]
pub struct RawInstance<I> {
    pub instance: I,
    pub extensions: Vec<&'static CStr>,
    pub layers: Vec<&'static CStr>,
}

/// Negotiate layers and extensions, then create the instance.
///
/// Missing validation layers fail before any creation call is made.
///
/// # Safety
/// The loader must be valid.
pub unsafe fn create_raw<L: InstanceLoader>(
    loader: &L,
    app_name: &str,
    platform_extensions: &[&'static CStr],
    validation: &ValidationConfig,
) -> Result<RawInstance<L::Instance>> {
    let layers = if validation.enabled {
        // SAFETY: forwarded from the caller.
        let available = unsafe { loader.layer_names() }?;
        let available: Vec<&CStr> = available.iter().map(CString::as_c_str).collect();
        resolve_layers(validation, &available)
            .inspect_err(|e| report(Severity::Error, VK_TAG, e))?
    } else {
        Vec::new()
    };

    let extensions = required_extensions(platform_extensions, validation.enabled);

    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::InvalidState(format!("Invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(ENGINE_NAME)
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(instance_create_flags());

    // SAFETY: all pointers in `create_info` outlive the call.
    let instance = unsafe { loader.create_raw(&create_info) }.inspect_err(|e| {
        if let GpuError::Vulkan(res) = e {
            report(Severity::Error, VK_TAG, describe(*res));
        }
    })?;

    Ok(RawInstance {
        instance,
        extensions,
        layers,
    })
}

/// Vulkan instance plus its debug instrumentation.
pub struct GpuInstance {
    pub(crate) entry: ash::Entry,
    pub(crate) raw: ash::Instance,
    pub(crate) validation: ValidationLayer,
    enabled_extensions: Vec<&'static CStr>,
    enabled_layers: Vec<&'static CStr>,
}

impl GpuInstance {
    /// Create a Vulkan instance.
    ///
    /// # Safety
    /// The entry must be a valid Vulkan entry point.
    pub unsafe fn create(
        entry: ash::Entry,
        app_name: &str,
        platform_extensions: &[&'static CStr],
        validation: &ValidationConfig,
    ) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        let RawInstance {
            instance: raw,
            extensions,
            layers,
        } = unsafe { create_raw(&entry, app_name, platform_extensions, validation) }?;

        let validation_layer = if validation.enabled {
            // SAFETY: the instance was just created with debug utils enabled.
            match unsafe { ValidationLayer::install(&entry, &raw, validation.severities) } {
                Ok(layer) => layer,
                Err(e) => {
                    let severity = if e.is_degradable() {
                        Severity::Warning
                    } else {
                        Severity::Error
                    };
                    report(
                        severity,
                        VK_TAG,
                        format_args!("Failed to setup debug messenger: {e}"),
                    );
                    ValidationLayer::inactive()
                }
            }
        } else {
            ValidationLayer::inactive()
        };

        let instance = Self {
            entry,
            raw,
            validation: validation_layer,
            enabled_extensions: extensions,
            enabled_layers: layers,
        };
        instance.log_supported_extensions();

        Ok(instance)
    }

    /// Log every instance extension the driver supports.
    fn log_supported_extensions(&self) {
        // SAFETY: entry is valid for the lifetime of self.
        match unsafe { self.entry.enumerate_instance_extension_properties(None) } {
            Ok(supported) => {
                for ext in &supported {
                    // SAFETY: extension names are NUL-terminated fixed-size arrays.
                    let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                    report(
                        Severity::Verbose,
                        VK_TAG,
                        format_args!("{} : {}", name.to_string_lossy(), ext.spec_version),
                    );
                }
            }
            Err(res) => report(Severity::Error, VK_TAG, describe(res)),
        }
    }

    /// Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Raw instance.
    pub fn raw(&self) -> &ash::Instance {
        &self.raw
    }

    /// Extensions the instance was created with.
    pub fn enabled_extensions(&self) -> &[&'static CStr] {
        &self.enabled_extensions
    }

    /// Layers the instance was created with.
    pub fn enabled_layers(&self) -> &[&'static CStr] {
        &self.enabled_layers
    }

    /// Whether the debug messenger is registered.
    pub fn validation_installed(&self) -> bool {
        self.validation.is_installed()
    }

    /// Remove the debug messenger. Repeated calls are no-ops.
    ///
    /// # Safety
    /// The instance must still be alive.
    pub unsafe fn uninstall_validation(&mut self) {
        // SAFETY: called before `destroy`.
        unsafe { self.validation.uninstall() };
    }

    /// Destroy the instance, removing the messenger first if still present.
    ///
    /// # Safety
    /// Every object created from this instance must already be destroyed.
    pub unsafe fn destroy(mut self) {
        // SAFETY: caller guarantees no child objects remain.
        unsafe {
            self.validation.uninstall();
            self.raw.destroy_instance(None);
        }
    }
}
