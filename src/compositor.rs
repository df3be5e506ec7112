use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::{imageops, imageops::FilterType, Pixel, Rgba, RgbaImage};

use crate::layout::{chunk_caption, compute_placement, FrameSpec};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const EARPIECE_GRAY: Rgba<u8> = Rgba([26, 26, 26, 255]);

/// Axis-aligned rect in canvas pixels. Coordinates may reach outside the
/// canvas (the notch extends above the top edge); fills clamp to it.
#[derive(Debug, Clone, Copy)]
struct RectF {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

/// Renders a framed screenshot at the fixed export resolution.
///
/// The caption font is located once at construction; rendering itself is a
/// pure function of (spec, source pixels, caption).
pub struct Compositor {
    spec: FrameSpec,
    font: Option<FontArc>,
}

impl Compositor {
    pub fn new(spec: FrameSpec) -> Self {
        let font = load_caption_font();
        if font.is_none() {
            log::warn!("No usable sans-serif system font found; captions will be skipped");
        }
        Self::with_font(spec, font)
    }

    pub fn with_font(spec: FrameSpec, font: Option<FontArc>) -> Self {
        Self { spec, font }
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    /// Rasterize frame chrome + cover-fit image + caption.
    ///
    /// Renders at `supersample ×` the target size, then resamples down to
    /// exactly `target_w × target_h`. The two explicit stages keep edges
    /// crisp without relying on sub-pixel accuracy in any single draw.
    pub fn render(&self, source: &RgbaImage, caption: &str) -> RgbaImage {
        let ss = self.spec.supersample.max(1);
        let s = ss as f32;
        let big_w = self.spec.target_w * ss;
        let big_h = self.spec.target_h * ss;

        let mut canvas = RgbaImage::from_pixel(big_w, big_h, WHITE);

        // Device body
        let body = RectF {
            x: 0.0,
            y: 0.0,
            w: big_w as f32,
            h: big_h as f32,
        };
        fill_rounded_rect(&mut canvas, body, self.spec.corner_radius * s, BLACK);

        // Screen area inside the bezel
        let border = self.spec.border * s;
        let screen = RectF {
            x: border,
            y: border,
            w: big_w as f32 - 2.0 * border,
            h: big_h as f32 - 2.0 * border,
        };
        let screen_radius = self.spec.screen_radius * s;
        fill_rounded_rect(&mut canvas, screen, screen_radius, WHITE);

        self.blit_cover_image(&mut canvas, source, screen, screen_radius, border);

        // Notch: the rect extends above the canvas so only its bottom
        // corners show rounding.
        let notch_w = big_w as f32 * self.spec.notch_width_frac;
        let notch_r = self.spec.notch_radius * s;
        let notch = RectF {
            x: (big_w as f32 - notch_w) / 2.0,
            y: -notch_r,
            w: notch_w,
            h: self.spec.notch_height * s + notch_r,
        };
        fill_rounded_rect(&mut canvas, notch, notch_r, BLACK);

        // Earpiece pill inside the notch
        let ear_w = self.spec.earpiece_width * s;
        let ear = RectF {
            x: (big_w as f32 - ear_w) / 2.0,
            y: self.spec.earpiece_top * s,
            w: ear_w,
            h: self.spec.earpiece_height * s,
        };
        fill_rounded_rect(&mut canvas, ear, self.spec.earpiece_radius * s, EARPIECE_GRAY);

        // Caption goes on top of everything
        self.draw_caption(&mut canvas, caption, s);

        imageops::resize(
            &canvas,
            self.spec.target_w,
            self.spec.target_h,
            FilterType::Lanczos3,
        )
    }

    /// Place the source over the screen rect with cover-fit semantics.
    ///
    /// Rather than resizing the whole source to placement size (which can
    /// be enormous for extreme aspect ratios), the visible window is mapped
    /// back into source pixels, cropped, and only the crop is resized.
    fn blit_cover_image(
        &self,
        canvas: &mut RgbaImage,
        source: &RgbaImage,
        screen: RectF,
        screen_radius: f32,
        border: f32,
    ) {
        let (big_w, big_h) = canvas.dimensions();
        let (src_w, src_h) = source.dimensions();
        if src_w == 0 || src_h == 0 {
            return;
        }

        let place = compute_placement(
            src_w as f32,
            src_h as f32,
            big_w as f32,
            big_h as f32,
            border,
        );

        // Visible window: placement clipped to the screen rect
        let vx0f = place.x.max(screen.x).max(0.0);
        let vy0f = place.y.max(screen.y).max(0.0);
        let vx1f = (place.x + place.width).min(screen.x + screen.w).min(big_w as f32);
        let vy1f = (place.y + place.height).min(screen.y + screen.h).min(big_h as f32);
        if vx1f - vx0f < 1.0 || vy1f - vy0f < 1.0 {
            return;
        }

        let vx0 = vx0f.floor() as u32;
        let vy0 = vy0f.floor() as u32;
        let out_w = (vx1f.ceil() as u32).min(big_w) - vx0;
        let out_h = (vy1f.ceil() as u32).min(big_h) - vy0;

        // Map the window back into source pixel coordinates
        let sx0 = (((vx0 as f32 - place.x) / place.width) * src_w as f32)
            .floor()
            .clamp(0.0, (src_w - 1) as f32) as u32;
        let sy0 = (((vy0 as f32 - place.y) / place.height) * src_h as f32)
            .floor()
            .clamp(0.0, (src_h - 1) as f32) as u32;
        let sx1 = ((((vx0 + out_w) as f32 - place.x) / place.width) * src_w as f32)
            .ceil()
            .clamp((sx0 + 1) as f32, src_w as f32) as u32;
        let sy1 = ((((vy0 + out_h) as f32 - place.y) / place.height) * src_h as f32)
            .ceil()
            .clamp((sy0 + 1) as f32, src_h as f32) as u32;

        let crop = imageops::crop_imm(source, sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();
        let resized = imageops::resize(&crop, out_w, out_h, FilterType::Lanczos3);

        // Blit, masked to the rounded screen corners
        let (cx, cy) = rect_center(screen);
        for y in 0..out_h {
            for x in 0..out_w {
                let px = vx0 + x;
                let py = vy0 + y;
                let d = sdf_rounded_box(
                    px as f32 + 0.5 - cx,
                    py as f32 + 0.5 - cy,
                    screen.w * 0.5,
                    screen.h * 0.5,
                    screen_radius,
                );
                if d < 0.0 {
                    canvas
                        .get_pixel_mut(px, py)
                        .blend(resized.get_pixel(x, y));
                }
            }
        }
    }

    fn draw_caption(&self, canvas: &mut RgbaImage, caption: &str, s: f32) {
        let lines = chunk_caption(caption, self.spec.caption_chunk);
        if lines.is_empty() {
            return;
        }
        let Some(font) = &self.font else {
            log::warn!("Caption skipped: no font loaded");
            return;
        };

        let size = self.spec.caption_size * s;
        let scaled = font.as_scaled(size);
        let ascent = scaled.ascent();
        let line_height = scaled.height();
        let center_x = canvas.width() as f32 / 2.0;
        let top = self.spec.caption_top * s;

        for (i, line) in lines.iter().enumerate() {
            let baseline_y = top + ascent + i as f32 * line_height;
            draw_text_line(canvas, font, line, size, center_x, baseline_y, BLACK);
        }
    }
}

/// Lay out one line with kerning and draw it centered on `center_x`.
fn draw_text_line(
    canvas: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    size: f32,
    center_x: f32,
    baseline_y: f32,
    color: Rgba<u8>,
) {
    let scaled = font.as_scaled(size);

    // First pass: advances with kerning, left-aligned at x=0
    let mut glyphs: Vec<(GlyphId, f32)> = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    let origin_x = center_x - cursor_x * 0.5;
    let (canvas_w, canvas_h) = canvas.dimensions();

    for (glyph_id, gx) in glyphs {
        let glyph = glyph_id.with_scale_and_position(size, point(origin_x + gx, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, cov| {
                let x = bounds.min.x as i32 + px as i32;
                let y = bounds.min.y as i32 + py as i32;
                if cov > 0.0 && x >= 0 && y >= 0 && (x as u32) < canvas_w && (y as u32) < canvas_h
                {
                    blend_pixel(canvas, x as u32, y as u32, color, cov);
                }
            });
        }
    }
}

/// Locate a bold sans-serif face for the caption headline.
fn load_caption_font() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight::BOLD;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &props)
        .ok()?;
    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

fn rect_center(rect: RectF) -> (f32, f32) {
    (rect.x + rect.w * 0.5, rect.y + rect.h * 0.5)
}

/// Signed distance to a box centered at the origin with half-extents hx, hy.
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let ox = dx.max(0.0);
    let oy = dy.max(0.0);
    let outside = (ox * ox + oy * oy).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// SDF for a rounded box.
#[inline]
fn sdf_rounded_box(px: f32, py: f32, hx: f32, hy: f32, r: f32) -> f32 {
    let r = r.min(hx).min(hy);
    sdf_box(px, py, hx - r, hy - r) - r
}

#[inline]
fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fill a rounded rect with antialiased edges.
fn fill_rounded_rect(img: &mut RgbaImage, rect: RectF, radius: f32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    let (cx, cy) = rect_center(rect);
    let hx = rect.w * 0.5;
    let hy = rect.h * 0.5;

    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    let x1 = ((rect.x + rect.w).ceil().max(0.0) as u32).min(img_w);
    let y1 = ((rect.y + rect.h).ceil().max(0.0) as u32).min(img_h);

    for y in y0..y1 {
        for x in x0..x1 {
            let d = sdf_rounded_box(x as f32 + 0.5 - cx, y as f32 + 0.5 - cy, hx, hy, radius);
            let cov = smoothstep(0.5, -0.5, d);
            if cov > 0.0 {
                blend_pixel(img, x, y, color, cov);
            }
        }
    }
}

/// Blend an opaque color onto a pixel at fractional coverage.
#[inline]
fn blend_pixel(img: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, cov: f32) {
    let dst = img.get_pixel_mut(x, y);
    for c in 0..3 {
        let base = dst.0[c] as f32;
        dst.0[c] = (base + (color.0[c] as f32 - base) * cov).round() as u8;
    }
    dst.0[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Production geometry at 1/20 scale, so tests stay fast.
    fn small_spec() -> FrameSpec {
        FrameSpec {
            target_w: 66,
            target_h: 143,
            border: 2.4,
            corner_radius: 9.0,
            screen_radius: 6.0,
            notch_width_frac: 0.4,
            notch_height: 6.0,
            notch_radius: 4.0,
            earpiece_width: 16.0,
            earpiece_height: 1.6,
            earpiece_top: 2.4,
            earpiece_radius: 0.8,
            caption_size: 5.0,
            caption_top: 10.0,
            caption_chunk: 4,
            supersample: 2,
        }
    }

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn output_has_exact_target_dimensions() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(100, 100, [0, 0, 255, 255]), "");
        assert_eq!(out.dimensions(), (66, 143));
    }

    #[test]
    fn corners_outside_the_body_stay_background_white() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(100, 100, [255, 0, 0, 255]), "");
        let corner = out.get_pixel(0, 0);
        assert!(corner.0[0] > 200 && corner.0[1] > 200 && corner.0[2] > 200);
    }

    #[test]
    fn bezel_edge_is_dark() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(100, 100, [255, 255, 255, 255]), "");
        // Mid-height on the left edge sits inside the black border
        let edge = out.get_pixel(0, 71);
        assert!(edge.0[0] < 60 && edge.0[1] < 60 && edge.0[2] < 60);
    }

    #[test]
    fn screen_interior_shows_source_pixels() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(100, 100, [0, 0, 255, 255]), "");
        // Sample away from notch, caption band and corners
        for (x, y) in [(33, 71), (10, 100), (55, 120)] {
            let px = out.get_pixel(x, y);
            assert!(px.0[2] > 200, "expected blue at ({}, {}), got {:?}", x, y, px);
        }
    }

    #[test]
    fn wide_source_covers_full_screen_width() {
        let compositor = Compositor::with_font(small_spec(), None);
        // 4:1 source is far wider than the portrait target
        let out = compositor.render(&solid(400, 100, [0, 200, 0, 255]), "");
        for (x, y) in [(4, 71), (61, 71), (33, 71)] {
            let px = out.get_pixel(x, y);
            assert!(px.0[1] > 150, "expected green at ({}, {}), got {:?}", x, y, px);
        }
    }

    #[test]
    fn empty_caption_renders_without_text_or_panic() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(50, 50, [255, 255, 255, 255]), "");
        assert_eq!(out.dimensions(), (66, 143));
    }

    #[test]
    fn missing_font_does_not_fail_the_render() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(50, 50, [255, 255, 255, 255]), "有文字的标题");
        assert_eq!(out.dimensions(), (66, 143));
    }

    #[test]
    fn notch_area_is_dark() {
        let compositor = Compositor::with_font(small_spec(), None);
        let out = compositor.render(&solid(100, 100, [255, 255, 255, 255]), "");
        // Top center, just under the bezel, inside the notch
        let px = out.get_pixel(33, 4);
        assert!(px.0[0] < 60 && px.0[1] < 60 && px.0[2] < 60);
    }
}
