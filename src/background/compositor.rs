use tiny_skia::{
    BlendMode, GradientStop, LinearGradient, Paint, PathBuilder, Point, RadialGradient, Rect, Shader,
    SpreadMode, Transform,
};

use super::band::{self, BandConfig};
use super::stars::StarConfig;
use super::viewport::Viewport;
use crate::raster::{Raster, color};

/// Horizontal distance between sampled ribbon columns, in px.
const COLUMN_STRIDE: f64 = 4.0;
/// Ribbons start and end slightly off screen so the blur has no hard edge.
const EDGE_MARGIN: f64 = 10.0;

const WIDE_BLUR: f32 = 30.0;
// Shadow blur is specified like a canvas shadow: sigma is half of it
const GLOW_SHADOW_BLUR: f32 = 34.0;
const GLOW_ALPHA: f32 = 0.58;
const SOFT_PASS_BLUR: f32 = 16.0;
const SOFT_PASS_ALPHA: f32 = 0.26;

const VIGNETTE_RGB: [u8; 3] = [10, 10, 10];
const VIGNETTE_ALPHA: f64 = 0.4;
const STAR_RGB: [u8; 3] = [255, 255, 255];

/// How ribbons get their softness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlowStrategy {
    /// One wide gaussian per ribbon
    Blur,
    /// Shadow glow plus a light blur pass, cheaper on compact layouts
    Glow,
}

impl GlowStrategy {
    pub fn for_viewport(viewport: &Viewport) -> Self {
        if viewport.compact { Self::Glow } else { Self::Blur }
    }
}

/// Paints whole frames. Owns the scratch layers so a frame allocates nothing
/// once the size has settled.
pub struct Compositor {
    background: [u8; 3],
    speed_multiplier: f64,
    strategy: GlowStrategy,
    layer: Raster,
    shadow: Raster,
    outline: Vec<(f32, f32)>,
}

impl Compositor {
    pub fn new(background: [u8; 3], speed_multiplier: f64) -> Self {
        Self {
            background,
            speed_multiplier,
            strategy: GlowStrategy::Blur,
            layer: Raster::new(0, 0),
            shadow: Raster::new(0, 0),
            outline: Vec::new(),
        }
    }

    pub fn strategy(&self) -> GlowStrategy {
        self.strategy
    }

    /// Only called when the viewport changes, so the strategy stays fixed
    /// between resizes.
    pub fn resize(&mut self, viewport: &Viewport) {
        let scale = viewport.raster_scale as f32;
        for layer in [&mut self.layer, &mut self.shadow] {
            layer.resize(viewport.backing_width, viewport.backing_height);
            layer.set_scale(scale);
        }
        self.strategy = GlowStrategy::for_viewport(viewport);
    }

    pub fn draw(
        &mut self,
        target: &mut Raster,
        viewport: &Viewport,
        bands: &[BandConfig],
        stars: &[StarConfig],
        time: f64,
    ) {
        let (width, height) = (viewport.width, viewport.height);

        target.fill(color(self.background, 1.0));

        for band in bands {
            let alpha = pulsed_alpha(band, time);
            let (Some(outline), Some(shader)) =
                (self.trace_outline(band, time, width, height), ribbon_shader(band, alpha, height))
            else {
                continue;
            };
            let mut paint = Paint::default();
            paint.shader = shader;
            paint.anti_alias = true;

            self.layer.clear();
            self.layer.fill_path(&outline, &paint);

            match self.strategy {
                GlowStrategy::Blur => {
                    self.layer.blur(WIDE_BLUR);
                    target.composite(&self.layer, BlendMode::Plus, 1.0);
                }
                GlowStrategy::Glow => {
                    self.shadow.shadow_of(&self.layer, band.color2, alpha * 0.95);
                    self.shadow.blur(GLOW_SHADOW_BLUR / 2.0);
                    target.composite(&self.shadow, BlendMode::Plus, GLOW_ALPHA);
                    target.composite(&self.layer, BlendMode::Plus, GLOW_ALPHA);

                    // Second soft pass hides the ribbon silhouette
                    self.layer.blur(SOFT_PASS_BLUR);
                    target.composite(&self.layer, BlendMode::Plus, SOFT_PASS_ALPHA);
                }
            }
        }

        for star in stars {
            let look = star.appearance(time, width, height);
            target.fill_circle(look.x as f32, look.y as f32, look.radius as f32, color(STAR_RGB, look.alpha));
        }

        vignette(target, width as f32, height as f32);
    }

    // Top edge left to right, bottom edge back right to left
    fn trace_outline(&mut self, band: &BandConfig, time: f64, width: f64, height: f64) -> Option<tiny_skia::Path> {
        self.outline.clear();

        let mut x = -EDGE_MARGIN;
        while x <= width + EDGE_MARGIN {
            let s = band::sample(band, x, time, height, self.speed_multiplier);
            self.outline.push((x as f32, s.y_top as f32));
            x += COLUMN_STRIDE;
        }

        let mut x = width + EDGE_MARGIN;
        while x >= -EDGE_MARGIN {
            let s = band::sample(band, x, time, height, self.speed_multiplier);
            self.outline.push((x as f32, s.y_bottom as f32));
            x -= COLUMN_STRIDE;
        }

        let (&(x0, y0), rest) = self.outline.split_first()?;
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        for &(x, y) in rest {
            pb.line_to(x, y);
        }
        pb.close();
        pb.finish()
    }
}

fn pulsed_alpha(band: &BandConfig, time: f64) -> f64 {
    let pulse = 0.8 + 0.2 * (time * 0.95 + band.y_offset * 8.0).sin();
    band.alpha * pulse
}

/// Vertical gradient centered on the band's base line, `2 * width` tall.
fn ribbon_shader(band: &BandConfig, a: f64, height: f64) -> Option<Shader<'static>> {
    let center = height * band.y_offset;
    LinearGradient::new(
        Point::from_xy(0.0, (center - band.width) as f32),
        Point::from_xy(0.0, (center + band.width) as f32),
        vec![
            GradientStop::new(0.0, color(band.color1, 0.0)),
            GradientStop::new(0.22, color(band.color1, a * 0.65)),
            GradientStop::new(0.5, color(band.color2, a * 1.2)),
            GradientStop::new(0.78, color(band.color2, a * 0.42)),
            GradientStop::new(1.0, color(band.color1, 0.0)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    )
}

/// Darken toward the corners: clear inside `0.2 h`, full strength past `0.9 h`.
fn vignette(target: &mut Raster, width: f32, height: f32) {
    let (inner, outer) = (height * 0.2, height * 0.9);
    let center = Point::from_xy(width / 2.0, height / 2.0);
    let shader = RadialGradient::new(
        center,
        center,
        outer,
        vec![
            GradientStop::new(0.0, color(VIGNETTE_RGB, 0.0)),
            GradientStop::new(inner / outer, color(VIGNETTE_RGB, 0.0)),
            GradientStop::new(1.0, color(VIGNETTE_RGB, VIGNETTE_ALPHA)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    );
    let (Some(shader), Some(rect)) = (shader, Rect::from_xywh(0.0, 0.0, width, height)) else {
        return;
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    target.fill_rect(rect, &paint);
}
