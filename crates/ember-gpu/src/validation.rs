//! Validation layer instrumentation.
//!
//! Installs a `VK_EXT_debug_utils` messenger that forwards driver diagnostics
//! to the [`report`](crate::report) sink. The messenger entry points are
//! resolved once at install time; a driver that does not expose them yields
//! [`GpuError::ExtensionNotSupported`], which callers treat as non-fatal.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};

use ash::vk;

use crate::diagnostics::describe;
use crate::error::{GpuError, Result};
use crate::report::{report, Severity, VK_TAG};

const CREATE_MESSENGER: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_MESSENGER: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

/// Map driver message severity to a report severity.
///
/// Bits are tested from most to least verbose; anything else is dropped.
pub fn map_severity(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Option<Severity> {
    if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE) {
        Some(Severity::Verbose)
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Some(Severity::Info)
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Some(Severity::Warning)
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Some(Severity::Error)
    } else {
        None
    }
}

unsafe extern "system" fn forward_message(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let Some(severity) = map_severity(message_severity) else {
        return vk::FALSE;
    };

    // SAFETY: the driver passes either null or a callback data struct that
    // stays valid for the duration of the call.
    let message = unsafe {
        match p_callback_data.as_ref() {
            Some(data) if !data.p_message.is_null() => {
                CStr::from_ptr(data.p_message).to_string_lossy()
            }
            _ => Cow::Borrowed(""),
        }
    };

    report(severity, VK_TAG, message);
    vk::FALSE
}

/// Messenger create info forwarding the given severities.
pub fn messenger_create_info(
    severities: vk::DebugUtilsMessageSeverityFlagsEXT,
) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severities)
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(forward_message))
}

/// Destruction side of the debug messenger API.
pub trait MessengerApi {
    /// Destroy a messenger created through this API.
    ///
    /// # Safety
    /// The messenger must have been created by this API and not yet destroyed.
    unsafe fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT);
}

impl MessengerApi for ash::ext::debug_utils::Instance {
    unsafe fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        // SAFETY: forwarded from the caller.
        unsafe { self.destroy_debug_utils_messenger(messenger, None) };
    }
}

/// Installed (or inactive) debug messenger.
pub struct ValidationLayer<A: MessengerApi = ash::ext::debug_utils::Instance> {
    installed: Option<(A, vk::DebugUtilsMessengerEXT)>,
}

impl ValidationLayer {
    /// Register the debug messenger with an instance.
    ///
    /// # Safety
    /// The instance must be valid and created from `entry` with
    /// `VK_EXT_debug_utils` enabled.
    pub unsafe fn install(
        entry: &ash::Entry,
        instance: &ash::Instance,
        severities: vk::DebugUtilsMessageSeverityFlagsEXT,
    ) -> Result<Self> {
        // Resolve the optional entry points once; ash would otherwise load
        // panicking stubs for missing functions.
        for name in [CREATE_MESSENGER, DESTROY_MESSENGER] {
            // SAFETY: instance handle is valid and `name` is NUL-terminated.
            let resolved = unsafe { entry.get_instance_proc_addr(instance.handle(), name.as_ptr()) };
            if resolved.is_none() {
                return Err(GpuError::ExtensionNotSupported(
                    name.to_string_lossy().into_owned(),
                ));
            }
        }

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = messenger_create_info(severities);

        // SAFETY: the loader was built from a valid instance.
        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }
            .inspect_err(|&res| report(Severity::Error, VK_TAG, describe(res)))?;

        tracing::debug!("Debug messenger installed");
        Ok(Self::from_parts(loader, messenger))
    }
}

impl<A: MessengerApi> ValidationLayer<A> {
    /// A layer that was never installed.
    pub fn inactive() -> Self {
        Self { installed: None }
    }

    /// Wrap an already created messenger.
    pub fn from_parts(api: A, messenger: vk::DebugUtilsMessengerEXT) -> Self {
        Self {
            installed: Some((api, messenger)),
        }
    }

    /// Whether a messenger is currently registered.
    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// Remove the messenger. Repeated calls are no-ops.
    ///
    /// # Safety
    /// Must be called before the owning instance is destroyed.
    pub unsafe fn uninstall(&mut self) {
        if let Some((api, messenger)) = self.installed.take() {
            // SAFETY: the messenger came from `api` and is destroyed once.
            unsafe { api.destroy_messenger(messenger) };
            tracing::debug!("Debug messenger removed");
        }
    }
}

impl<A: MessengerApi> Default for ValidationLayer<A> {
    fn default() -> Self {
        Self::inactive()
    }
}
