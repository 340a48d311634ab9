use serde::{Deserialize, Serialize};

/// What the host reports about its drawing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMetrics {
    /// Logical size in px
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Raster pixels per logical px at a device pixel ratio of 1
    pub pixel_density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Widths at or below this are laid out compact
    pub compact_breakpoint: f64,
    pub compact_scale: f64,
    pub max_scale: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            compact_breakpoint: 768.0,
            compact_scale: 1.5,
            max_scale: 2.0,
        }
    }
}

/// Projection of the logical viewport onto the backing raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub compact: bool,
    /// Backing-store scale
    pub scale: f64,
    pub backing_width: usize,
    pub backing_height: usize,
    /// Raster pixels per logical px: the drawing transform
    pub raster_scale: f64,
}

impl Viewport {
    pub fn measure(metrics: WindowMetrics, settings: &ViewportSettings) -> Self {
        let width = metrics.width.max(1.0);
        let height = metrics.height.max(1.0);
        let compact = width <= settings.compact_breakpoint;

        let ratio = if metrics.device_pixel_ratio > 0.0 {
            metrics.device_pixel_ratio
        } else {
            1.0
        };
        let scale = if compact {
            settings.compact_scale
        } else {
            ratio.min(settings.max_scale)
        };

        let raster_scale = scale * metrics.pixel_density;
        Self {
            width,
            height,
            compact,
            scale,
            backing_width: ((width * raster_scale).floor() as usize).max(1),
            backing_height: ((height * raster_scale).floor() as usize).max(1),
            raster_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: f64, height: f64, ratio: f64) -> WindowMetrics {
        WindowMetrics { width, height, device_pixel_ratio: ratio, pixel_density: 1.0 }
    }

    #[test]
    fn desktop_caps_ratio_at_two() {
        let v = Viewport::measure(metrics(1920.0, 1080.0, 3.0), &ViewportSettings::default());
        assert!(!v.compact);
        assert_eq!(v.scale, 2.0);
        assert_eq!((v.backing_width, v.backing_height), (3840, 2160));
    }

    #[test]
    fn desktop_keeps_low_ratio() {
        let v = Viewport::measure(metrics(1280.0, 720.0, 1.25), &ViewportSettings::default());
        assert_eq!(v.scale, 1.25);
        assert_eq!(v.backing_width, 1600);
    }

    #[test]
    fn breakpoint_is_inclusive() {
        let v = Viewport::measure(metrics(768.0, 1024.0, 3.0), &ViewportSettings::default());
        assert!(v.compact);
        assert_eq!(v.scale, 1.5);
        assert_eq!((v.backing_width, v.backing_height), (1152, 1536));

        let v = Viewport::measure(metrics(769.0, 1024.0, 3.0), &ViewportSettings::default());
        assert!(!v.compact);
    }

    #[test]
    fn fractional_backing_size_floors() {
        let v = Viewport::measure(metrics(1001.0, 501.0, 1.5), &ViewportSettings::default());
        assert_eq!((v.backing_width, v.backing_height), (1501, 751));
    }

    #[test]
    fn pixel_density_shrinks_the_raster() {
        let m = WindowMetrics { width: 1600.0, height: 800.0, device_pixel_ratio: 1.0, pixel_density: 0.125 };
        let v = Viewport::measure(m, &ViewportSettings::default());
        assert_eq!((v.backing_width, v.backing_height), (200, 100));
        assert!((v.raster_scale - 0.125).abs() < 1e-12);
    }

    #[test]
    fn measuring_is_idempotent() {
        let m = metrics(900.0, 700.0, 2.0);
        let settings = ViewportSettings::default();
        assert_eq!(Viewport::measure(m, &settings), Viewport::measure(m, &settings));
    }

    #[test]
    fn degenerate_sizes_still_get_a_pixel() {
        let v = Viewport::measure(metrics(0.0, 0.0, 0.0), &ViewportSettings::default());
        assert_eq!((v.backing_width, v.backing_height), (1, 1));
    }
}
