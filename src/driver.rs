//! Frame loop lifecycle.
//!
//! The driver never loops by itself. It asks the host for one frame at a time
//! and re-requests after each draw, so tearing down is just a matter of
//! cancelling the one outstanding request.

use tracing::{debug, trace};

use crate::background::viewport::WindowMetrics;
use crate::raster::Raster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Something that can be drawn at a point in time.
pub trait Scene {
    fn resize(&mut self, metrics: WindowMetrics);
    /// `time` is seconds on the host's monotonic clock.
    fn draw(&mut self, time: f64) -> &Raster;
}

/// The environment the background runs in: a display that hands out frame
/// callbacks and resize notifications.
pub trait FrameHost {
    type Error;

    /// Whether a raster surface can be obtained at all.
    fn can_render(&self) -> bool;
    fn metrics(&self) -> WindowMetrics;
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
    fn add_resize_listener(&mut self) -> ListenerId;
    fn remove_resize_listener(&mut self, id: ListenerId);
    fn present(&mut self, frame: &Raster) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

pub struct AnimationDriver<S> {
    scene: S,
    state: DriverState,
    pending: Option<FrameId>,
    listener: Option<ListenerId>,
    frames: u64,
}

impl<S: Scene> AnimationDriver<S> {
    /// Start animating `scene` on `host`. Returns `None` without touching the
    /// host when it cannot render; the background then simply doesn't exist.
    pub fn mount<H: FrameHost>(mut scene: S, host: &mut H) -> Option<Self> {
        if !host.can_render() {
            debug!("no raster surface available, background disabled");
            return None;
        }

        scene.resize(host.metrics());
        let listener = host.add_resize_listener();
        let pending = host.request_frame();
        debug!(?pending, ?listener, "background mounted");

        Some(Self {
            scene,
            state: DriverState::Running,
            pending: Some(pending),
            listener: Some(listener),
            frames: 0,
        })
    }

    /// Frame callback. Stale ids (cancelled or superseded) are dropped
    /// without drawing or rescheduling.
    pub fn on_frame<H: FrameHost>(&mut self, host: &mut H, id: FrameId, time: f64) -> Result<(), H::Error> {
        if self.state != DriverState::Running || self.pending != Some(id) {
            trace!(?id, "ignoring stale frame");
            return Ok(());
        }
        self.pending = None;

        let frame = self.scene.draw(time);
        host.present(frame)?;
        self.frames += 1;

        self.pending = Some(host.request_frame());
        Ok(())
    }

    /// Resize callback. Only the projection changes; time keeps running.
    pub fn on_resize<H: FrameHost>(&mut self, host: &H) {
        if self.state == DriverState::Running && self.listener.is_some() {
            self.scene.resize(host.metrics());
        }
    }

    /// Cancel the outstanding frame and detach from resizes. Safe to call
    /// more than once.
    pub fn unmount<H: FrameHost>(&mut self, host: &mut H) {
        if let Some(id) = self.pending.take() {
            host.cancel_frame(id);
        }
        if let Some(listener) = self.listener.take() {
            host.remove_resize_listener(listener);
        }
        if self.state == DriverState::Running {
            debug!(frames = self.frames, "background unmounted");
        }
        self.state = DriverState::Stopped;
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::AuroraBackground;
    use crate::config::Config;
    use std::collections::HashSet;

    /// Host that records requests and listeners instead of talking to a display.
    struct FakeHost {
        capable: bool,
        metrics: WindowMetrics,
        next_id: u64,
        pending: HashSet<FrameId>,
        listeners: HashSet<ListenerId>,
        presented: usize,
    }

    impl FakeHost {
        fn new(capable: bool) -> Self {
            Self {
                capable,
                metrics: WindowMetrics { width: 800.0, height: 480.0, device_pixel_ratio: 1.0, pixel_density: 0.1 },
                next_id: 0,
                pending: HashSet::new(),
                listeners: HashSet::new(),
                presented: 0,
            }
        }

        /// Fire the single outstanding frame callback, if any.
        fn next_frame(&self) -> Option<FrameId> {
            self.pending.iter().next().copied()
        }
    }

    impl FrameHost for FakeHost {
        type Error = std::convert::Infallible;

        fn can_render(&self) -> bool {
            self.capable
        }

        fn metrics(&self) -> WindowMetrics {
            self.metrics
        }

        fn request_frame(&mut self) -> FrameId {
            self.next_id += 1;
            let id = FrameId(self.next_id);
            self.pending.insert(id);
            id
        }

        fn cancel_frame(&mut self, id: FrameId) {
            self.pending.remove(&id);
        }

        fn add_resize_listener(&mut self) -> ListenerId {
            self.next_id += 1;
            let id = ListenerId(self.next_id);
            self.listeners.insert(id);
            id
        }

        fn remove_resize_listener(&mut self, id: ListenerId) {
            self.listeners.remove(&id);
        }

        fn present(&mut self, _frame: &Raster) -> Result<(), Self::Error> {
            self.presented += 1;
            Ok(())
        }
    }

    /// Counts draws and resizes.
    #[derive(Default)]
    struct Probe {
        frame: Option<Raster>,
        draws: Vec<f64>,
        resizes: Vec<WindowMetrics>,
    }

    impl Scene for Probe {
        fn resize(&mut self, metrics: WindowMetrics) {
            self.resizes.push(metrics);
        }

        fn draw(&mut self, time: f64) -> &Raster {
            self.draws.push(time);
            self.frame.get_or_insert_with(|| Raster::new(1, 1))
        }
    }

    fn fire<S: Scene>(driver: &mut AnimationDriver<S>, host: &mut FakeHost, time: f64) {
        let id = host.next_frame().expect("a frame should be pending");
        host.pending.remove(&id);
        let Ok(()) = driver.on_frame(host, id, time);
    }

    #[test]
    fn incapable_host_gets_no_driver() {
        let mut host = FakeHost::new(false);
        assert!(AnimationDriver::mount(Probe::default(), &mut host).is_none());
        assert!(host.pending.is_empty());
        assert!(host.listeners.is_empty());
    }

    #[test]
    fn mount_measures_listens_and_requests() {
        let mut host = FakeHost::new(true);
        let driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        assert_eq!(driver.state, DriverState::Running);
        assert_eq!(host.pending.len(), 1);
        assert_eq!(host.listeners.len(), 1);
        assert_eq!(driver.scene.resizes.len(), 1);
        assert!(driver.scene.draws.is_empty());
    }

    #[test]
    fn each_frame_schedules_exactly_one_more() {
        let mut host = FakeHost::new(true);
        let mut driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        for i in 0..10 {
            fire(&mut driver, &mut host, i as f64 / 60.0);
            assert_eq!(host.pending.len(), 1);
        }
        assert_eq!(driver.frames_drawn(), 10);
        assert_eq!(host.presented, 10);
    }

    #[test]
    fn five_seconds_then_unmount_leaves_nothing_behind() {
        let mut host = FakeHost::new(true);
        let scene = AuroraBackground::from_config(&Config::default(), &mut fastrand::Rng::with_seed(1));
        let mut driver = AnimationDriver::mount(scene, &mut host).unwrap();

        let mut time = 0.0;
        while time < 5.0 {
            fire(&mut driver, &mut host, time);
            time += 1.0 / 30.0;
        }
        assert!(driver.frames_drawn() >= 150);

        driver.unmount(&mut host);
        assert_eq!(driver.state, DriverState::Stopped);
        assert!(host.pending.is_empty());
        assert!(host.listeners.is_empty());
        assert!(driver.pending.is_none());
    }

    #[test]
    fn stale_callback_after_unmount_does_not_reschedule() {
        let mut host = FakeHost::new(true);
        let mut driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        let in_flight = host.next_frame().unwrap();

        driver.unmount(&mut host);
        let Ok(()) = driver.on_frame(&mut host, in_flight, 1.0);

        assert!(host.pending.is_empty());
        assert!(driver.scene.draws.is_empty());
        assert_eq!(host.presented, 0);
    }

    #[test]
    fn unmount_twice_is_harmless() {
        let mut host = FakeHost::new(true);
        let mut driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        driver.unmount(&mut host);
        driver.unmount(&mut host);
        assert_eq!(driver.state, DriverState::Stopped);
        assert!(host.listeners.is_empty());
    }

    #[test]
    fn resize_reaches_scene_without_touching_time() {
        let mut host = FakeHost::new(true);
        let mut driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        fire(&mut driver, &mut host, 2.0);

        host.metrics.width = 1920.0;
        driver.on_resize(&host);
        fire(&mut driver, &mut host, 2.5);

        let scene = &driver.scene;
        assert_eq!(scene.resizes.len(), 2);
        assert_eq!(scene.resizes[1].width, 1920.0);
        assert_eq!(scene.draws, vec![2.0, 2.5]);
    }

    #[test]
    fn resize_after_unmount_is_ignored() {
        let mut host = FakeHost::new(true);
        let mut driver = AnimationDriver::mount(Probe::default(), &mut host).unwrap();
        driver.unmount(&mut host);
        driver.on_resize(&host);
        assert_eq!(driver.scene.resizes.len(), 1);
    }
}
