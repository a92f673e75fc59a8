//! Human-readable descriptions of Vulkan status codes.

use ash::vk;

/// Describe a Vulkan status code.
///
/// Returns an empty string for raw values outside the known enumeration.
pub fn describe(result: vk::Result) -> &'static str {
    match result {
        vk::Result::SUCCESS => "Success",
        vk::Result::NOT_READY => "Not ready",
        vk::Result::TIMEOUT => "Timeout",
        vk::Result::EVENT_SET => "Event set",
        vk::Result::EVENT_RESET => "Event reset",
        vk::Result::INCOMPLETE => "Incomplete",
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => "Error out of host memory",
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => "Error out of device memory",
        vk::Result::ERROR_INITIALIZATION_FAILED => "Error initialization failed",
        vk::Result::ERROR_DEVICE_LOST => "Error device lost",
        vk::Result::ERROR_MEMORY_MAP_FAILED => "Error memory map failed",
        vk::Result::ERROR_LAYER_NOT_PRESENT => "Error layer not present",
        vk::Result::ERROR_EXTENSION_NOT_PRESENT => "Error extension not present",
        vk::Result::ERROR_FEATURE_NOT_PRESENT => "Error feature not present",
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => "Error incompatible driver",
        vk::Result::ERROR_TOO_MANY_OBJECTS => "Error too many objects",
        vk::Result::ERROR_FORMAT_NOT_SUPPORTED => "Error format not supported",
        vk::Result::ERROR_FRAGMENTED_POOL => "Error fragmented pool",
        vk::Result::ERROR_UNKNOWN => "Error unknown",

        // Vulkan 1.1 - 1.3
        vk::Result::ERROR_OUT_OF_POOL_MEMORY => "Error out of pool memory",
        vk::Result::ERROR_INVALID_EXTERNAL_HANDLE => "Error invalid external handle",
        vk::Result::ERROR_FRAGMENTATION => "Error fragmentation",
        vk::Result::ERROR_INVALID_OPAQUE_CAPTURE_ADDRESS => {
            "Error invalid opaque capture address"
        }
        vk::Result::PIPELINE_COMPILE_REQUIRED => "Pipeline compile required",

        // Window system integration
        vk::Result::ERROR_SURFACE_LOST_KHR => "Error surface lost",
        vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR => "Error native window in use",
        vk::Result::SUBOPTIMAL_KHR => "Suboptimal",
        vk::Result::ERROR_OUT_OF_DATE_KHR => "Error out of date",
        vk::Result::ERROR_INCOMPATIBLE_DISPLAY_KHR => "Error incompatible display",
        vk::Result::ERROR_FULL_SCREEN_EXCLUSIVE_MODE_LOST_EXT => {
            "Error full screen exclusive mode lost"
        }

        // Extensions
        vk::Result::ERROR_VALIDATION_FAILED_EXT => "Error validation failed",
        vk::Result::ERROR_INVALID_SHADER_NV => "Error invalid shader NV",
        vk::Result::ERROR_INVALID_DRM_FORMAT_MODIFIER_PLANE_LAYOUT_EXT => {
            "Error invalid DRM format modifier plane layout"
        }
        vk::Result::ERROR_NOT_PERMITTED_KHR => "Error not permitted",
        vk::Result::ERROR_COMPRESSION_EXHAUSTED_EXT => "Error compression exhausted",
        vk::Result::THREAD_IDLE_KHR => "Thread idle",
        vk::Result::THREAD_DONE_KHR => "Thread done",
        vk::Result::OPERATION_DEFERRED_KHR => "Operation deferred",
        vk::Result::OPERATION_NOT_DEFERRED_KHR => "Operation not deferred",
        vk::Result::INCOMPATIBLE_SHADER_BINARY_EXT => "Incompatible shader binary",

        // Video coding
        vk::Result::ERROR_IMAGE_USAGE_NOT_SUPPORTED_KHR => "Error image usage not supported",
        vk::Result::ERROR_VIDEO_PICTURE_LAYOUT_NOT_SUPPORTED_KHR => {
            "Error video picture layout not supported"
        }
        vk::Result::ERROR_VIDEO_PROFILE_OPERATION_NOT_SUPPORTED_KHR => {
            "Error video profile operation not supported"
        }
        vk::Result::ERROR_VIDEO_PROFILE_FORMAT_NOT_SUPPORTED_KHR => {
            "Error video profile format not supported"
        }
        vk::Result::ERROR_VIDEO_PROFILE_CODEC_NOT_SUPPORTED_KHR => {
            "Error video profile codec not supported"
        }
        vk::Result::ERROR_VIDEO_STD_VERSION_NOT_SUPPORTED_KHR => {
            "Error video std version not supported"
        }
        vk::Result::ERROR_INVALID_VIDEO_STD_PARAMETERS_KHR => {
            "Error invalid video std parameters"
        }

        _ => "",
    }
}
