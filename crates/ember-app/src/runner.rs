//! Application runner and event loop.

use ember_gpu::report::{report, Severity, APP_TAG};
use ember_gpu::{GpuContext, VulkanBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::AppConfig;

/// Run the application with the given configuration.
///
/// Initializes logging, creates the window and GPU context, and runs the
/// event loop until the window is closed. Returns an error if the context
/// could not be brought up.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        context: None,
        failure: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.failure.take() {
        Some(e) => Err(e),
        None => {
            info!("Shut down cleanly");
            Ok(())
        }
    }
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    context: Option<GpuContext<Window>>,
    failure: Option<anyhow::Error>,
}

impl AppRunner {
    fn create_context(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<GpuContext<Window>> {
        let window = ember_platform::create_window(event_loop, &self.config.platform())?;
        let backend = VulkanBackend::new(self.config.bootstrap.clone())?;
        Ok(GpuContext::start(backend, window)?)
    }

    fn teardown(&mut self) {
        if let Some(mut context) = self.context.take() {
            context.shutdown();
        }
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() || self.failure.is_some() {
            return;
        }

        info!("Bootstrapping GPU context...");

        match self.create_context(event_loop) {
            Ok(context) => {
                self.context = Some(context);
                info!("Application ready!");
            }
            Err(e) => {
                report(Severity::Critical, APP_TAG, format_args!("Startup failed: {e}"));
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            info!("Close requested");
            self.teardown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}
