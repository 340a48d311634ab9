use std::f64::consts::TAU;

/// Side of the square the star field is scattered over. Larger than most
/// viewports so the modulo wrap tiles it without visible repetition.
pub const FIELD_SIZE: f64 = 2000.0;

pub const REFERENCE_COUNT: usize = 75;

/// Share of stars that get the strong twinkle.
const STRONG_SHARE: f64 = 0.35;
pub const STRONG_TWINKLE: f64 = 1.15;

#[derive(Debug, Clone, PartialEq)]
pub struct StarConfig {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub twinkle_speed: f64,
    pub base_opacity: f64,
    pub phase: f64,
    pub twinkle_strength: f64,
}

/// Per-frame look of one star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarAppearance {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: f64,
}

impl StarConfig {
    fn random(rng: &mut fastrand::Rng) -> Self {
        Self {
            x: rng.f64() * FIELD_SIZE,
            y: rng.f64() * FIELD_SIZE,
            size: rng.f64() * 1.5 + 0.5,           // 0.5-2.0px
            twinkle_speed: rng.f64() * 1.2 + 0.6,  // 0.6-1.8
            base_opacity: rng.f64() * 0.5 + 0.25,  // 0.25-0.75
            phase: rng.f64() * TAU,
            twinkle_strength: if rng.f64() < STRONG_SHARE {
                STRONG_TWINKLE
            } else {
                0.5 + rng.f64() * 0.35
            },
        }
    }

    /// Screen position after wrapping the oversized field onto the viewport.
    pub fn screen_position(&self, width: f64, height: f64) -> (f64, f64) {
        (wrap(self.x, width), wrap(self.y, height))
    }

    pub fn appearance(&self, time: f64, width: f64, height: f64) -> StarAppearance {
        let twinkle_base = ((time * self.twinkle_speed + self.phase).sin() + 1.0) / 2.0;
        let twinkle = 0.2 + 0.8 * twinkle_base.powf(1.1) * self.twinkle_strength;
        let shimmer = 0.8 + 0.2 * (time * self.twinkle_speed * 2.0 + self.phase * 1.7).sin();
        let alpha = (self.base_opacity * twinkle * shimmer * 1.1).clamp(0.0, 1.0);
        let radius = self.size * (0.8 + twinkle * 0.45);
        let (x, y) = self.screen_position(width, height);

        StarAppearance { x, y, radius, alpha }
    }
}

fn wrap(value: f64, extent: f64) -> f64 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Build the star field once. The generator is injected so callers decide
/// between a fixed seed and entropy.
pub fn generate(rng: &mut fastrand::Rng, count: usize) -> Vec<StarConfig> {
    (0..count).map(|_| StarConfig::random(rng)).collect()
}
