//! Platform abstraction for the Ember runtime.
//!
//! Provides window creation via winit.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use thiserror::Error;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Window handle unavailable: {0}")]
    Handle(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Ember".to_string(),
            width: 1920,
            height: 1080,
            resizable: false,
        }
    }
}

/// Top-left position that centers a window of `window_size` on a monitor.
///
/// Windows larger than the monitor are pinned to its top-left corner.
pub fn centered_position(
    monitor_pos: PhysicalPosition<i32>,
    monitor_size: PhysicalSize<u32>,
    window_size: PhysicalSize<u32>,
) -> PhysicalPosition<i32> {
    let offset = |monitor: u32, window: u32| {
        i32::try_from(monitor.saturating_sub(window) / 2).unwrap_or(i32::MAX)
    };
    PhysicalPosition::new(
        monitor_pos.x.saturating_add(offset(monitor_size.width, window_size.width)),
        monitor_pos.y.saturating_add(offset(monitor_size.height, window_size.height)),
    )
}

/// Center of a window's client area, in window coordinates.
pub fn cursor_center(window_size: PhysicalSize<u32>) -> PhysicalPosition<f64> {
    PhysicalPosition::new(
        f64::from(window_size.width) / 2.0,
        f64::from(window_size.height) / 2.0,
    )
}

/// Create the application window.
///
/// The window is created hidden, moved to the center of the primary monitor,
/// has the cursor placed at its center, and is then shown.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let attributes = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable)
        .with_visible(false);

    let window = event_loop
        .create_window(attributes)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
    ensure_raw_handles(&window)?;

    let monitor = event_loop
        .primary_monitor()
        .or_else(|| window.current_monitor());
    match monitor {
        Some(monitor) => {
            let position = centered_position(monitor.position(), monitor.size(), window.outer_size());
            window.set_outer_position(position);
        }
        None => tracing::warn!("No monitor found; leaving window at its default position"),
    }

    if let Err(e) = window.set_cursor_position(cursor_center(window.inner_size())) {
        tracing::warn!("Could not center cursor: {e}");
    }

    window.set_visible(true);
    tracing::info!(
        "Created window '{}' ({}x{})",
        config.title,
        config.width,
        config.height
    );
    Ok(window)
}

/// Check that a window exposes the handles needed for surface creation.
pub fn ensure_raw_handles<W: HasDisplayHandle + HasWindowHandle>(window: &W) -> Result<()> {
    window
        .display_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    window
        .window_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    Ok(())
}
