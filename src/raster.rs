//! Drawing surface for one frame or layer.
//!
//! Wraps a `tiny_skia::Pixmap` with a logical-to-raster scale, so callers
//! draw in logical px and never deal with the backing resolution. Blurs and
//! shadow masks are done here since tiny-skia has no filters.

use std::f32::consts::PI;

use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect,
    Transform,
};
use tracing::warn;

/// Straight color from 8-bit channels and an alpha that is clamped to 0..1.
pub fn color(rgb: [u8; 3], alpha: f64) -> Color {
    let mut color = Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255);
    color.set_alpha(alpha.clamp(0.0, 1.0) as f32);
    color
}

pub struct Raster {
    pixmap: Option<Pixmap>,
    scale: f32,
    work: Vec<[f32; 4]>,
    spare: Vec<[f32; 4]>,
}

impl Raster {
    /// A zero-sized raster has no pixmap and ignores every drawing call.
    pub fn new(width: usize, height: usize) -> Self {
        let mut raster = Self {
            pixmap: None,
            scale: 1.0,
            work: Vec::new(),
            spare: Vec::new(),
        };
        raster.resize(width, height);
        raster
    }

    pub fn width(&self) -> usize {
        self.pixmap.as_ref().map_or(0, |p| p.width() as usize)
    }

    pub fn height(&self) -> usize {
        self.pixmap.as_ref().map_or(0, |p| p.height() as usize)
    }

    /// Premultiplied RGBA bytes, row by row.
    pub fn data(&self) -> &[u8] {
        match &self.pixmap {
            Some(pixmap) => pixmap.data(),
            None => &[],
        }
    }

    /// Reallocates only when the size actually changes. Returns whether it did.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if width == self.width() && height == self.height() && (self.pixmap.is_some() || width == 0) {
            return false;
        }
        self.pixmap = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => {
                let pixmap = Pixmap::new(w, h);
                if pixmap.is_none() {
                    warn!(width, height, "could not allocate raster");
                }
                pixmap
            }
            _ => None,
        };
        self.work.clear();
        self.spare.clear();
        true
    }

    /// Raster pixels per logical unit.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn transform(&self) -> Transform {
        Transform::from_scale(self.scale, self.scale)
    }

    pub fn clear(&mut self) {
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill(Color::TRANSPARENT);
        }
    }

    pub fn fill(&mut self, color: Color) {
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill(color);
        }
    }

    /// Fill a logical-space path (nonzero winding).
    pub fn fill_path(&mut self, path: &Path, paint: &Paint) {
        let transform = self.transform();
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill_path(path, paint, FillRule::Winding, transform, None);
        }
    }

    /// Fill a logical-space rectangle.
    pub fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let transform = self.transform();
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill_rect(rect, paint, transform, None);
        }
    }

    /// Filled antialiased circle. Dots smaller than half a raster pixel
    /// deposit their area into a single pixel so they fade rather than vanish.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        let r = radius * self.scale;
        if r <= 0.0 || self.pixmap.is_none() {
            return;
        }

        let mut paint = Paint::default();
        paint.anti_alias = true;

        if r < 0.5 {
            let (x, y) = ((cx * self.scale).floor(), (cy * self.scale).floor());
            let mut faint = color;
            faint.apply_opacity((PI * r * r).min(1.0));
            paint.set_color(faint);
            if let (Some(rect), Some(pixmap)) = (Rect::from_xywh(x, y, 1.0, 1.0), &mut self.pixmap) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
            return;
        }

        if let Some(circle) = PathBuilder::from_circle(cx, cy, radius) {
            paint.set_color(color);
            self.fill_path(&circle, &paint);
        }
    }

    /// Draw `src` on top of this surface. Both must share a size.
    pub fn composite(&mut self, src: &Raster, blend_mode: BlendMode, opacity: f32) {
        let (Some(dst), Some(src)) = (&mut self.pixmap, &src.pixmap) else {
            return;
        };
        debug_assert_eq!((dst.width(), dst.height()), (src.width(), src.height()));
        let paint = PixmapPaint {
            opacity,
            blend_mode,
            quality: FilterQuality::Nearest,
        };
        dst.draw_pixmap(0, 0, src.as_ref(), &paint, Transform::identity(), None);
    }

    /// Replace contents with `rgb` at `alpha`, masked by the alpha of `mask`.
    pub fn shadow_of(&mut self, mask: &Raster, rgb: [u8; 3], alpha: f64) {
        self.resize(mask.width(), mask.height());
        self.scale = mask.scale;
        let alpha = alpha.clamp(0.0, 1.0) as f32;
        let Some(pixmap) = &mut self.pixmap else {
            return;
        };
        for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(mask.data().chunks_exact(4)) {
            let k = alpha * src[3] as f32 / 255.0;
            for c in 0..3 {
                dst[c] = (rgb[c] as f32 * k).round() as u8;
            }
            dst[3] = (255.0 * k).round() as u8;
        }
    }

    /// Approximate gaussian blur, `sigma` in logical px. Pixels outside the
    /// surface count as transparent.
    pub fn blur(&mut self, sigma: f32) {
        let sigma = sigma * self.scale;
        let Some(pixmap) = &mut self.pixmap else {
            return;
        };
        if sigma < 0.5 {
            return;
        }
        let (width, height) = (pixmap.width() as usize, pixmap.height() as usize);

        self.work.clear();
        self.work.extend(
            pixmap
                .data()
                .chunks_exact(4)
                .map(|px| [px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32]),
        );
        self.spare.resize(self.work.len(), [0.0; 4]);
        for radius in box_radii(sigma, 3) {
            box_blur(&self.work, &mut self.spare, width, height, radius, true);
            box_blur(&self.spare, &mut self.work, width, height, radius, false);
        }

        // Keep channels premultiplied after rounding
        for (dst, px) in pixmap.data_mut().chunks_exact_mut(4).zip(&self.work) {
            let a = px[3].round().clamp(0.0, 255.0);
            for c in 0..3 {
                dst[c] = px[c].round().clamp(0.0, a) as u8;
            }
            dst[3] = a as u8;
        }
    }
}

/// Radii of `n` box passes whose combination approximates a gaussian.
fn box_radii(sigma: f32, n: usize) -> Vec<usize> {
    let nf = n as f32;
    let ideal = (12.0 * sigma * sigma / nf + 1.0).sqrt();
    let mut lower = ideal.floor() as i32;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let lf = lower as f32;
    let m = ((12.0 * sigma * sigma - nf * lf * lf - 4.0 * nf * lf - 3.0 * nf) / (-4.0 * lf - 4.0))
        .round()
        .max(0.0) as usize;

    (0..n)
        .map(|i| if i < m { lower } else { upper })
        .map(|size| (size as usize - 1) / 2)
        .collect()
}

// One running-sum box pass along rows or columns
fn box_blur(src: &[[f32; 4]], dst: &mut [[f32; 4]], width: usize, height: usize, radius: usize, horizontal: bool) {
    let (lines, len, stride, step) = if horizontal {
        (height, width, width, 1)
    } else {
        (width, height, 1, width)
    };
    let norm = 1.0 / (2 * radius + 1) as f32;

    for line in 0..lines {
        let base = line * stride;
        let at = |i: usize| base + i * step;
        let mut acc = [0.0f32; 4];
        for i in 0..=radius.min(len - 1) {
            for c in 0..4 {
                acc[c] += src[at(i)][c];
            }
        }
        for i in 0..len {
            for c in 0..4 {
                dst[at(i)][c] = (acc[c] * norm).max(0.0);
            }
            if i + radius + 1 < len {
                let incoming = src[at(i + radius + 1)];
                for c in 0..4 {
                    acc[c] += incoming[c];
                }
            }
            if i >= radius {
                let outgoing = src[at(i - radius)];
                for c in 0..4 {
                    acc[c] -= outgoing[c];
                }
            }
        }
    }
}
