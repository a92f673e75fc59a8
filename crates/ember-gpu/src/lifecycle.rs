//! Ordered bring-up and tear-down of the GPU context.
//!
//! [`ContextLifecycle`] owns every handle created during bootstrap in its own
//! slot and is the only place that creates or destroys them, so teardown
//! order is fixed by this module rather than by callers:
//!
//! ```text
//! Uninitialized -> InstanceReady -> SurfaceReady -> DeviceSelected -> DeviceReady -> Running
//! teardown: wait idle, destroy device, uninstall validation, destroy surface,
//!           destroy instance, release window
//! ```

use std::fmt;

use crate::error::{GpuError, Result};
use crate::report::{report, Severity, APP_TAG};
use crate::selection::QueueSelection;

/// Bootstrap progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Uninitialized,
    InstanceReady,
    SurfaceReady,
    DeviceSelected,
    DeviceReady,
    Running,
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Operations the lifecycle sequences.
///
/// Each creation step receives the handles it depends on; each destruction
/// step consumes its handle. The lifecycle guarantees that destruction runs
/// in reverse creation order and at most once per handle.
pub trait ContextBackend {
    type Window;
    type Instance;
    type Surface;
    type Adapter;
    type Device;

    fn create_instance(&mut self, window: &Self::Window) -> Result<Self::Instance>;

    fn create_surface(
        &mut self,
        instance: &Self::Instance,
        window: &Self::Window,
    ) -> Result<Self::Surface>;

    fn select_adapter(
        &mut self,
        instance: &Self::Instance,
        surface: &Self::Surface,
    ) -> Result<(Self::Adapter, QueueSelection)>;

    fn create_device(
        &mut self,
        instance: &Self::Instance,
        adapter: &Self::Adapter,
        selection: QueueSelection,
    ) -> Result<Self::Device>;

    /// Block until the device has finished all submitted work.
    fn wait_idle(&mut self, device: &Self::Device) -> Result<()>;

    fn destroy_device(&mut self, device: Self::Device) -> Result<()>;

    /// Remove validation instrumentation; must tolerate repeated calls.
    fn uninstall_validation(&mut self, instance: &mut Self::Instance) -> Result<()>;

    fn destroy_surface(&mut self, instance: &Self::Instance, surface: Self::Surface) -> Result<()>;

    fn destroy_instance(&mut self, instance: Self::Instance) -> Result<()>;

    fn release_window(&mut self, window: Self::Window) -> Result<()>;
}

/// Owner of the GPU context and its creation order.
pub struct ContextLifecycle<B: ContextBackend> {
    backend: B,
    state: LifecycleState,
    window: Option<B::Window>,
    instance: Option<B::Instance>,
    surface: Option<B::Surface>,
    adapter: Option<(B::Adapter, QueueSelection)>,
    device: Option<B::Device>,
}

fn require<'a, T>(slot: &'a Option<T>, what: &str) -> Result<&'a T> {
    slot.as_ref()
        .ok_or_else(|| GpuError::InvalidState(format!("{what} missing")))
}

impl<B: ContextBackend> ContextLifecycle<B> {
    /// Take ownership of the window; nothing is created yet.
    pub fn new(backend: B, window: B::Window) -> Self {
        Self {
            backend,
            state: LifecycleState::Uninitialized,
            window: Some(window),
            instance: None,
            surface: None,
            adapter: None,
            device: None,
        }
    }

    /// Create a lifecycle and run it to [`LifecycleState::Running`].
    ///
    /// On failure everything created so far is torn down before returning.
    pub fn start(backend: B, window: B::Window) -> Result<Self> {
        let mut lifecycle = Self::new(backend, window);
        lifecycle.bootstrap()?;
        Ok(lifecycle)
    }

    /// Advance through every state up to [`LifecycleState::Running`].
    ///
    /// A failure is logged with the state reached and returned; the caller
    /// decides whether it is fatal. There is no partial recovery.
    pub fn bootstrap(&mut self) -> Result<()> {
        while self.state != LifecycleState::Running {
            let from = self.state;
            if let Err(e) = self.advance() {
                report(
                    Severity::Error,
                    APP_TAG,
                    format_args!("Bootstrap failed after {from}: {e}"),
                );
                return Err(e);
            }
            tracing::debug!("Context state: {from} -> {}", self.state);
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        self.state = match self.state {
            LifecycleState::Uninitialized => {
                let window = require(&self.window, "window")?;
                self.instance = Some(self.backend.create_instance(window)?);
                LifecycleState::InstanceReady
            }
            LifecycleState::InstanceReady => {
                let window = require(&self.window, "window")?;
                let instance = require(&self.instance, "instance")?;
                self.surface = Some(self.backend.create_surface(instance, window)?);
                LifecycleState::SurfaceReady
            }
            LifecycleState::SurfaceReady => {
                let instance = require(&self.instance, "instance")?;
                let surface = require(&self.surface, "surface")?;
                self.adapter = Some(self.backend.select_adapter(instance, surface)?);
                LifecycleState::DeviceSelected
            }
            LifecycleState::DeviceSelected => {
                let instance = require(&self.instance, "instance")?;
                let (adapter, selection) = require(&self.adapter, "adapter")?;
                self.device = Some(self.backend.create_device(instance, adapter, *selection)?);
                LifecycleState::DeviceReady
            }
            LifecycleState::DeviceReady | LifecycleState::Running => LifecycleState::Running,
            LifecycleState::Terminated => {
                return Err(GpuError::InvalidState(
                    "context has already been torn down".to_string(),
                ));
            }
        };
        Ok(())
    }

    /// Tear everything down in reverse creation order.
    ///
    /// Every step runs even if an earlier one failed; failures are reported
    /// and otherwise ignored. Calling this again is a no-op.
    pub fn shutdown(&mut self) {
        if self.state == LifecycleState::Terminated {
            return;
        }
        tracing::info!("Starting teardown from {}", self.state);

        if let Some(device) = self.device.take() {
            let idle = self.backend.wait_idle(&device);
            log_teardown("Wait for device idle", idle);
            let destroyed = self.backend.destroy_device(device);
            log_teardown("Destroy device", destroyed);
        }
        self.adapter = None;

        if let Some(instance) = self.instance.as_mut() {
            let uninstalled = self.backend.uninstall_validation(instance);
            log_teardown("Uninstall validation", uninstalled);
        }

        if let Some(surface) = self.surface.take() {
            let destroyed = match self.instance.as_ref() {
                Some(instance) => self.backend.destroy_surface(instance, surface),
                None => Err(GpuError::InvalidState("surface outlived instance".to_string())),
            };
            log_teardown("Destroy surface", destroyed);
        }

        if let Some(instance) = self.instance.take() {
            let destroyed = self.backend.destroy_instance(instance);
            log_teardown("Destroy instance", destroyed);
        }

        if let Some(window) = self.window.take() {
            let released = self.backend.release_window(window);
            log_teardown("Release window", released);
        }

        self.state = LifecycleState::Terminated;
        tracing::info!("Teardown complete");
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether bootstrap completed and teardown has not started.
    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The window, until teardown releases it.
    pub fn window(&self) -> Option<&B::Window> {
        self.window.as_ref()
    }

    /// The instance, once created.
    pub fn instance(&self) -> Option<&B::Instance> {
        self.instance.as_ref()
    }

    /// The presentation surface, once created.
    pub fn surface(&self) -> Option<&B::Surface> {
        self.surface.as_ref()
    }

    /// The selected adapter, once selected.
    pub fn adapter(&self) -> Option<&B::Adapter> {
        self.adapter.as_ref().map(|(adapter, _)| adapter)
    }

    /// The selected queue families, once selected.
    pub fn selection(&self) -> Option<QueueSelection> {
        self.adapter.as_ref().map(|&(_, selection)| selection)
    }

    /// The logical device, once created.
    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }
}

impl<B: ContextBackend> Drop for ContextLifecycle<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn log_teardown(step: &str, outcome: Result<()>) {
    if let Err(e) = outcome {
        report(Severity::Error, APP_TAG, format_args!("{step} failed: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<&'static str>>>;

    #[derive(Default)]
    struct Recorder {
        calls: Calls,
        failing: HashSet<&'static str>,
        uninstalled: u32,
    }

    impl Recorder {
        fn failing(steps: &[&'static str]) -> Self {
            Self {
                failing: steps.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn step(&mut self, name: &'static str) -> Result<()> {
            self.calls.borrow_mut().push(name);
            if self.failing.contains(name) {
                Err(GpuError::InvalidState(format!("{name} failed")))
            } else {
                Ok(())
            }
        }
    }

    impl ContextBackend for Recorder {
        type Window = &'static str;
        type Instance = u32;
        type Surface = u32;
        type Adapter = u32;
        type Device = u32;

        fn create_instance(&mut self, _window: &Self::Window) -> Result<u32> {
            self.step("create_instance").map(|()| 1)
        }

        fn create_surface(&mut self, _instance: &u32, _window: &Self::Window) -> Result<u32> {
            self.step("create_surface").map(|()| 2)
        }

        fn select_adapter(&mut self, _instance: &u32, _surface: &u32) -> Result<(u32, QueueSelection)> {
            self.step("select_adapter")
                .map_err(|_| GpuError::NoSuitableDevice)
                .map(|()| (3, QueueSelection::combined(0)))
        }

        fn create_device(
            &mut self,
            _instance: &u32,
            _adapter: &u32,
            _selection: QueueSelection,
        ) -> Result<u32> {
            self.step("create_device").map(|()| 4)
        }

        fn wait_idle(&mut self, _device: &u32) -> Result<()> {
            self.step("wait_idle")
        }

        fn destroy_device(&mut self, _device: u32) -> Result<()> {
            self.step("destroy_device")
        }

        fn uninstall_validation(&mut self, _instance: &mut u32) -> Result<()> {
            self.uninstalled += 1;
            self.step("uninstall_validation")
        }

        fn destroy_surface(&mut self, _instance: &u32, _surface: u32) -> Result<()> {
            self.step("destroy_surface")
        }

        fn destroy_instance(&mut self, _instance: u32) -> Result<()> {
            self.step("destroy_instance")
        }

        fn release_window(&mut self, _window: Self::Window) -> Result<()> {
            self.step("release_window")
        }
    }

    const TEARDOWN: [&str; 6] = [
        "wait_idle",
        "destroy_device",
        "uninstall_validation",
        "destroy_surface",
        "destroy_instance",
        "release_window",
    ];

    #[test]
    fn bootstrap_reaches_running_in_order() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();

        let lifecycle = ContextLifecycle::start(recorder, "window").unwrap();
        assert!(lifecycle.is_running());
        assert_eq!(lifecycle.selection(), Some(QueueSelection::combined(0)));
        assert_eq!(lifecycle.device(), Some(&4));

        insta::assert_debug_snapshot!(calls.borrow().clone(), @r#"
        [
            "create_instance",
            "create_surface",
            "select_adapter",
            "create_device",
        ]
        "#);
    }

    #[test]
    fn teardown_runs_in_reverse_creation_order() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let mut lifecycle = ContextLifecycle::start(recorder, "window").unwrap();
        calls.borrow_mut().clear();

        lifecycle.shutdown();

        assert_eq!(*calls.borrow(), TEARDOWN);
        assert_eq!(lifecycle.state(), LifecycleState::Terminated);
        assert!(lifecycle.window().is_none());
    }

    #[test]
    fn teardown_continues_past_failures() {
        let recorder = Recorder::failing(&["wait_idle", "destroy_surface", "destroy_device"]);
        let calls = recorder.calls.clone();
        let mut lifecycle = ContextLifecycle::start(recorder, "window").unwrap();
        calls.borrow_mut().clear();

        lifecycle.shutdown();

        assert_eq!(*calls.borrow(), TEARDOWN);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let mut lifecycle = ContextLifecycle::start(recorder, "window").unwrap();

        lifecycle.shutdown();
        let after_first = calls.borrow().len();
        lifecycle.shutdown();
        drop(lifecycle);

        assert_eq!(calls.borrow().len(), after_first);
    }

    #[test]
    fn failed_bootstrap_leaves_critical_report_to_caller() {
        let critical = crate::report::count_critical(|| {
            let result = ContextLifecycle::start(Recorder::failing(&["create_device"]), "window");
            assert!(result.is_err());
        });
        assert_eq!(critical, 0);
    }

    #[test]
    fn drop_tears_down() {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let lifecycle = ContextLifecycle::start(recorder, "window").unwrap();
        calls.borrow_mut().clear();

        drop(lifecycle);

        assert_eq!(*calls.borrow(), TEARDOWN);
    }

    #[test]
    fn failed_selection_tears_down_what_exists() {
        let recorder = Recorder::failing(&["select_adapter"]);
        let calls = recorder.calls.clone();

        let result = ContextLifecycle::start(recorder, "window");
        assert!(matches!(result, Err(GpuError::NoSuitableDevice)));

        insta::assert_debug_snapshot!(calls.borrow().clone(), @r#"
        [
            "create_instance",
            "create_surface",
            "select_adapter",
            "uninstall_validation",
            "destroy_surface",
            "destroy_instance",
            "release_window",
        ]
        "#);
    }

    #[test]
    fn failed_instance_only_releases_window() {
        let mut lifecycle =
            ContextLifecycle::new(Recorder::failing(&["create_instance"]), "window");

        assert!(lifecycle.bootstrap().is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert!(lifecycle.instance().is_none());

        let calls = lifecycle.backend().calls.clone();
        lifecycle.shutdown();
        assert_eq!(*calls.borrow(), ["create_instance", "release_window"]);
    }

    #[test]
    fn states_advance_one_step_at_a_time() {
        let mut lifecycle = ContextLifecycle::new(Recorder::default(), "window");
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

        let expected = [
            LifecycleState::InstanceReady,
            LifecycleState::SurfaceReady,
            LifecycleState::DeviceSelected,
            LifecycleState::DeviceReady,
            LifecycleState::Running,
        ];
        for state in expected {
            lifecycle.advance().unwrap();
            assert_eq!(lifecycle.state(), state);
        }
    }

    #[test]
    fn terminated_context_cannot_restart() {
        let mut lifecycle = ContextLifecycle::start(Recorder::default(), "window").unwrap();
        lifecycle.shutdown();

        assert!(matches!(lifecycle.bootstrap(), Err(GpuError::InvalidState(_))));
        assert_eq!(lifecycle.backend().uninstalled, 1);
    }
}
