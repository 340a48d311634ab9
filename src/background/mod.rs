//! Aurora ribbons over a twinkling star field.

pub mod band;
pub mod compositor;
pub mod stars;
pub mod viewport;

use tracing::debug;

use crate::config::Config;
use crate::driver::Scene;
use crate::raster::Raster;
use band::BandConfig;
use compositor::Compositor;
use stars::StarConfig;
use viewport::{Viewport, ViewportSettings, WindowMetrics};

pub struct AuroraBackground {
    bands: Vec<BandConfig>,
    stars: Vec<StarConfig>,
    settings: ViewportSettings,
    viewport: Option<Viewport>,
    compositor: Compositor,
    frame: Raster,
}

impl AuroraBackground {
    pub fn new(
        bands: Vec<BandConfig>,
        stars: Vec<StarConfig>,
        settings: ViewportSettings,
        compositor: Compositor,
    ) -> Self {
        Self {
            bands,
            stars,
            settings,
            viewport: None,
            compositor,
            frame: Raster::new(0, 0),
        }
    }

    /// Stars are drawn from `rng` here, once, and never regenerated.
    pub fn from_config(config: &Config, rng: &mut fastrand::Rng) -> Self {
        let stars = stars::generate(rng, config.star_count);
        let compositor = Compositor::new(config.background.rgb(), config.speed_multiplier);
        Self::new(config.bands.clone(), stars, config.viewport.clone(), compositor)
    }
}

impl Scene for AuroraBackground {
    fn resize(&mut self, metrics: WindowMetrics) {
        let viewport = Viewport::measure(metrics, &self.settings);
        if self.viewport == Some(viewport) {
            return;
        }

        self.frame.resize(viewport.backing_width, viewport.backing_height);
        self.frame.set_scale(viewport.raster_scale as f32);
        self.compositor.resize(&viewport);
        debug!(
            width = viewport.width,
            height = viewport.height,
            compact = viewport.compact,
            scale = viewport.scale,
            backing_width = viewport.backing_width,
            backing_height = viewport.backing_height,
            strategy = ?self.compositor.strategy(),
            "viewport measured"
        );
        self.viewport = Some(viewport);
    }

    fn draw(&mut self, time: f64) -> &Raster {
        if let Some(viewport) = &self.viewport {
            self.compositor
                .draw(&mut self.frame, viewport, &self.bands, &self.stars, time);
        }
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::compositor::GlowStrategy;

    fn background() -> AuroraBackground {
        let config = Config::default();
        AuroraBackground::from_config(&config, &mut fastrand::Rng::with_seed(5))
    }

    fn metrics(width: f64, height: f64) -> WindowMetrics {
        WindowMetrics { width, height, device_pixel_ratio: 1.0, pixel_density: 0.125 }
    }

    #[test]
    fn builds_reference_configuration() {
        let bg = background();
        assert_eq!(bg.bands.len(), 5);
        assert_eq!(bg.stars.len(), stars::REFERENCE_COUNT);
        assert!(bg.viewport.is_none());
    }

    #[test]
    fn draws_nothing_before_first_resize() {
        let mut bg = background();
        assert!(bg.draw(1.0).data().is_empty());
    }

    #[test]
    fn resize_keeps_configuration_and_switches_strategy() {
        let mut bg = background();
        let stars_before = bg.stars.clone();

        bg.resize(metrics(1600.0, 800.0));
        let frame = bg.draw(3.0);
        assert_eq!((frame.width(), frame.height()), (200, 100));
        assert_eq!(bg.compositor.strategy(), GlowStrategy::Blur);

        bg.resize(metrics(640.0, 400.0));
        let frame = bg.draw(3.1);
        assert_eq!((frame.width(), frame.height()), (120, 75));
        assert_eq!(bg.compositor.strategy(), GlowStrategy::Glow);

        assert_eq!(bg.stars, stars_before);
    }

    #[test]
    fn redundant_resize_is_harmless() {
        let mut bg = background();
        bg.resize(metrics(1600.0, 800.0));
        let first = bg.draw(1.5).data().to_vec();
        bg.resize(metrics(1600.0, 800.0));
        assert_eq!(bg.draw(1.5).data(), &first[..]);
    }
}
