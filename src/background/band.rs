use serde::{Deserialize, Serialize};

/// Drift multiplier applied on top of every band's own speed.
pub const SPEED_MULTIPLIER: f64 = 1.12;

/// Ribbons never get thinner than this, whatever the curtain does.
const MIN_THICKNESS: f64 = 40.0;

/// One aurora ribbon. Immutable once the background is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    pub color1: [u8; 3],
    pub color2: [u8; 3],
    pub alpha: f64,
    /// Phase drift in radians per second
    pub speed: f64,
    /// Vertical center as a fraction of viewport height
    pub y_offset: f64,
    /// Peak wave displacement in px
    pub amplitude: f64,
    /// Spatial frequency in radians per px
    pub frequency: f64,
    /// Nominal thickness in px
    pub width: f64,
    pub phase: f64,
}

/// Vertical extent of a ribbon at one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSample {
    pub y_top: f64,
    pub y_bottom: f64,
}

/// Emerald and gold ribbons layered at independent phases.
pub fn reference_bands() -> Vec<BandConfig> {
    vec![
        BandConfig {
            color1: [16, 185, 129], // emerald 500
            color2: [5, 150, 105],  // emerald 600
            alpha: 0.16,
            speed: 0.36,
            y_offset: 0.25,
            amplitude: 95.0,
            frequency: 0.0028,
            width: 250.0,
            phase: 0.2,
        },
        BandConfig {
            color1: [52, 211, 153], // emerald 400
            color2: [16, 185, 129], // emerald 500
            alpha: 0.11,
            speed: 0.29,
            y_offset: 0.35,
            amplitude: 120.0,
            frequency: 0.0022,
            width: 290.0,
            phase: 1.1,
        },
        BandConfig {
            color1: [110, 231, 183], // emerald 300
            color2: [234, 179, 8],   // yellow 500
            alpha: 0.09,
            speed: 0.33,
            y_offset: 0.3,
            amplitude: 85.0,
            frequency: 0.0031,
            width: 230.0,
            phase: 2.3,
        },
        BandConfig {
            color1: [253, 224, 71], // yellow 300
            color2: [234, 179, 8],  // yellow 500
            alpha: 0.075,
            speed: 0.26,
            y_offset: 0.2,
            amplitude: 110.0,
            frequency: 0.0024,
            width: 210.0,
            phase: 0.7,
        },
        BandConfig {
            color1: [163, 230, 53], // lime 400
            color2: [16, 185, 129], // emerald 500
            alpha: 0.1,
            speed: 0.31,
            y_offset: 0.4,
            amplitude: 95.0,
            frequency: 0.0029,
            width: 260.0,
            phase: 1.9,
        },
    ]
}

/// Sample the ribbon's top and bottom edge at column `x`.
///
/// Four summed harmonics give the wave, three column terms the curtain
/// striations. Pure function of its arguments.
pub fn sample(band: &BandConfig, x: f64, time: f64, height: f64, speed_multiplier: f64) -> BandSample {
    let drift = time * band.speed * speed_multiplier;
    let base_y = height * band.y_offset;
    let f = band.frequency;
    let a = band.amplitude;
    let p = band.phase;

    let wave1 = (x * f + drift + p).sin() * a;
    let wave2 = (x * f * 0.7 + drift * 0.75 + 1.2 + p).sin() * (a * 0.55);
    let wave3 = (x * f * 1.9 - drift * 0.45 + 2.8 + p).sin() * (a * 0.28);
    let wave4 = (x * f * 3.1 + drift * 1.15 + p * 0.7).sin() * (a * 0.18);

    // Column modulation gives the vertical curtain sections
    let column_a = ((x * 0.017 + drift * 1.4 + p).sin() + 1.0) / 2.0;
    let column_b = ((x * 0.031 - drift * 0.9 + p * 2.0).sin() + 1.0) / 2.0;
    let column_c = ((x * 0.052 + drift * 1.7 + p * 0.6).sin() + 1.0) / 2.0;
    let curtain = (column_a * 0.5 + column_b * 0.3 + column_c * 0.2).powf(1.15);

    let y_top = base_y + wave1 + wave2 + wave3 + wave4;
    let thickness = band.width * (0.42 + curtain * 0.62)
        + (x * 0.01 + drift * 0.6 + p).sin() * (band.width * 0.03);
    let y_bottom = y_top + thickness.max(MIN_THICKNESS);

    BandSample { y_top, y_bottom }
}
