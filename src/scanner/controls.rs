use tracing::{debug, warn};

use crate::common::config::LiveConfig;

/// Camera hardware the scanner steers.
pub trait CameraControl {
    fn set_zoom_ratio(&mut self, ratio: f32);
    fn enable_torch(&mut self, on: bool);
}

/// Control sink for sources without zoom or torch, like image files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControl;

impl CameraControl for NoopControl {
    fn set_zoom_ratio(&mut self, _ratio: f32) {}
    fn enable_torch(&mut self, _on: bool) {}
}

// Camera controls
//------------------------------------------------------------------------------

/// Zoom and torch state owned by the consumer side of the scanner. Every
/// change is forwarded to the camera.
#[derive(Debug)]
pub struct CameraControls<C: CameraControl> {
    camera: C,
    zoom: f32,
    torch: bool,
    min_zoom: f32,
    max_zoom: f32,
    auto_zoom_step: f32,
    auto_zoom_limit: f32,
}

impl<C: CameraControl> CameraControls<C> {
    /// Applies the initial zoom to the camera. Out of range zoom settings are
    /// replaced by the defaults.
    pub fn new(mut camera: C, config: &LiveConfig) -> Self {
        let fallback;
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("{e}, using default zoom settings");
                fallback = LiveConfig::default();
                &fallback
            }
        };
        let zoom = config.initial_zoom.clamp(config.min_zoom, config.max_zoom);
        camera.set_zoom_ratio(zoom);
        Self {
            camera,
            zoom,
            torch: false,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            auto_zoom_step: config.auto_zoom_step,
            auto_zoom_limit: config.auto_zoom_limit,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn torch(&self) -> bool {
        self.torch
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Scales the zoom by a pinch gesture factor.
    pub fn pinch(&mut self, factor: f32) -> f32 {
        self.set_zoom(self.zoom * factor)
    }

    pub fn set_zoom(&mut self, ratio: f32) -> f32 {
        self.zoom = ratio.clamp(self.min_zoom, self.max_zoom);
        self.camera.set_zoom_ratio(self.zoom);
        self.zoom
    }

    /// Nudges the zoom in after a hit, until the auto zoom limit.
    pub fn bump_after_hit(&mut self) -> f32 {
        if self.zoom < self.auto_zoom_limit {
            let zoom = self.set_zoom(self.zoom + self.auto_zoom_step);
            debug!("Auto zoom to {zoom:.1}");
        }
        self.zoom
    }

    pub fn toggle_torch(&mut self) -> bool {
        self.torch = !self.torch;
        self.camera.enable_torch(self.torch);
        self.torch
    }
}

#[cfg(test)]
mod controls_tests {
    use test_case::test_case;

    use super::{CameraControl, CameraControls};
    use crate::common::config::LiveConfig;

    #[derive(Debug, Default)]
    struct RecordingCamera {
        zooms: Vec<f32>,
        torch: Vec<bool>,
    }

    impl CameraControl for RecordingCamera {
        fn set_zoom_ratio(&mut self, ratio: f32) {
            self.zooms.push(ratio);
        }

        fn enable_torch(&mut self, on: bool) {
            self.torch.push(on);
        }
    }

    fn controls() -> CameraControls<RecordingCamera> {
        CameraControls::new(RecordingCamera::default(), &LiveConfig::default())
    }

    #[test]
    fn test_initial_zoom() {
        let c = controls();
        assert_eq!(c.zoom(), 1.2);
        assert_eq!(c.camera().zooms, vec![1.2]);
        assert!(!c.torch());
    }

    #[test_case(2.0, 2.4; "zoom in")]
    #[test_case(0.5, 0.6; "zoom out")]
    #[test_case(100.0, 9.0; "clamped high")]
    #[test_case(0.01, 0.5; "clamped low")]
    fn test_pinch(factor: f32, exp: f32) {
        let mut c = controls();
        let zoom = c.pinch(factor);
        assert!((zoom - exp).abs() < 1e-5, "zoom was {zoom}");
        assert_eq!(c.camera().zooms.last(), Some(&zoom));
    }

    #[test]
    fn test_bump_after_hit_stops_at_limit() {
        let mut c = controls();
        for _ in 0..20 {
            c.bump_after_hit();
        }
        // 1.2 steps up by 0.1 until it reaches 2.0, float drift may add one step
        assert!((1.99..2.11).contains(&c.zoom()), "zoom was {}", c.zoom());
        assert!(c.camera().zooms.len() <= 10);

        c.set_zoom(3.0);
        assert_eq!(c.bump_after_hit(), 3.0);
    }

    #[test]
    fn test_toggle_torch() {
        let mut c = controls();
        assert!(c.toggle_torch());
        assert!(!c.toggle_torch());
        assert_eq!(c.camera().torch, vec![true, false]);
    }

    #[test_case(5.0, 1.0; "inverted bounds")]
    #[test_case(0.5, f32::NAN; "nan max")]
    #[test_case(f32::NAN, 9.0; "nan min")]
    fn test_bad_bounds_use_defaults(min_zoom: f32, max_zoom: f32) {
        let config = LiveConfig { min_zoom, max_zoom, ..Default::default() };
        let mut c = CameraControls::new(RecordingCamera::default(), &config);
        assert_eq!(c.zoom(), 1.2);
        assert_eq!(c.pinch(100.0), 9.0);
        assert_eq!(c.pinch(0.0), 0.5);
    }
}
