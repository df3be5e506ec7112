/// Export canvas width in pixels (App Store portrait screenshot size).
pub const TARGET_WIDTH: u32 = 1320;
/// Export canvas height in pixels.
pub const TARGET_HEIGHT: u32 = 2868;
/// On-screen previews draw the same geometry at a quarter of export size.
pub const PREVIEW_SCALE: f32 = 0.25;

/// Computed position of a source image inside the target rectangle.
///
/// The image covers the target's content area completely; whichever
/// dimension overflows is cropped the same amount on both edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
}

impl Placement {
    /// The same placement at a different render scale. Preview and export
    /// share one formula; only this multiplier differs between them.
    pub fn scaled(&self, k: f32) -> Placement {
        Placement {
            width: self.width * k,
            height: self.height * k,
            x: self.x * k,
            y: self.y * k,
        }
    }
}

/// Cover-fit a source image into a target rectangle.
///
/// `border_inset` shrinks the area the image must cover (the frame border
/// sits on top of it); centering is still against the full target rect.
/// Callers only pass dimensions read from a successfully decoded image, so
/// zero or negative input is not handled here.
pub fn compute_placement(
    source_w: f32,
    source_h: f32,
    target_w: f32,
    target_h: f32,
    border_inset: f32,
) -> Placement {
    let content_w = target_w - 2.0 * border_inset;
    let content_h = target_h - 2.0 * border_inset;
    let target_ratio = content_w / content_h;
    let source_ratio = source_w / source_h;

    let (width, height) = if source_ratio > target_ratio {
        // Source is relatively wider: fill the height, crop left/right
        let height = content_h;
        (height * source_ratio, height)
    } else {
        // Source is relatively taller (or equal): fill the width, crop top/bottom
        let width = content_w;
        (width, width / source_ratio)
    };

    Placement {
        width,
        height,
        x: target_w / 2.0 - width / 2.0,
        y: target_h / 2.0 - height / 2.0,
    }
}

/// Split a caption into fixed-width lines of `chunk` characters.
///
/// Captions are hard-chunked rather than word-wrapped: the expected input
/// is short promotional text in scripts (CJK) where word boundaries carry
/// no meaning. Counted in chars, so multi-byte text chunks correctly.
pub fn chunk_caption(text: &str, chunk: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chunk = chunk.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk)
        .map(|line| line.iter().collect())
        .collect()
}

/// Fixed frame geometry, in export-scale pixels. One `Default` instance is
/// the production spec; the preview multiplies these values by
/// [`PREVIEW_SCALE`] and tests build small instances.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub target_w: u32,
    pub target_h: u32,
    /// Black bezel thickness around the screen.
    pub border: f32,
    /// Outer corner radius of the device body.
    pub corner_radius: f32,
    /// Corner radius of the screen area inside the bezel.
    pub screen_radius: f32,
    /// Notch width as a fraction of the canvas width.
    pub notch_width_frac: f32,
    pub notch_height: f32,
    /// Radius of the notch's bottom corners (top corners are square).
    pub notch_radius: f32,
    pub earpiece_width: f32,
    pub earpiece_height: f32,
    pub earpiece_top: f32,
    pub earpiece_radius: f32,
    pub caption_size: f32,
    /// Distance from the canvas top to the first caption line.
    pub caption_top: f32,
    pub caption_chunk: usize,
    /// Export renders at this multiple of the target size, then downsamples.
    pub supersample: u32,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            target_w: TARGET_WIDTH,
            target_h: TARGET_HEIGHT,
            border: 48.0,
            corner_radius: 180.0,
            screen_radius: 120.0,
            notch_width_frac: 0.4,
            notch_height: 120.0,
            notch_radius: 80.0,
            earpiece_width: 320.0,
            earpiece_height: 32.0,
            earpiece_top: 48.0,
            earpiece_radius: 16.0,
            caption_size: 100.0,
            caption_top: 200.0,
            caption_chunk: 4,
            supersample: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn square_source_fills_width_and_crops_vertically() {
        // Scenario: 1000x1000 into 1320x2868
        let p = compute_placement(1000.0, 1000.0, 1320.0, 2868.0, 0.0);
        assert!((p.width - 1320.0).abs() < EPS);
        assert!((p.height - 1320.0).abs() < EPS);
        assert!((p.x - 0.0).abs() < EPS);
        assert!((p.y - 774.0).abs() < EPS); // (2868 - 1320) / 2
    }

    #[test]
    fn wide_source_fills_height_and_crops_horizontally() {
        // Scenario: 2000x1000 into 1320x2868
        let p = compute_placement(2000.0, 1000.0, 1320.0, 2868.0, 0.0);
        assert!((p.height - 2868.0).abs() < EPS);
        assert!((p.width - 5736.0).abs() < EPS); // 2868 * 2
        assert!((p.x + 2208.0).abs() < EPS); // (1320 - 5736) / 2
        assert!((p.y - 0.0).abs() < EPS);
    }

    #[test]
    fn placement_always_covers_content_area() {
        let cases = [
            (100.0, 100.0),
            (3000.0, 500.0),
            (500.0, 3000.0),
            (1320.0, 2868.0),
            (1.0, 999.0),
        ];
        for (w, h) in cases {
            let p = compute_placement(w, h, 1320.0, 2868.0, 48.0);
            let content_w = 1320.0 - 96.0;
            let content_h = 2868.0 - 96.0;
            assert!(p.width >= content_w - EPS, "width too small for {}x{}", w, h);
            assert!(p.height >= content_h - EPS, "height too small for {}x{}", w, h);
        }
    }

    #[test]
    fn placement_is_centered() {
        let cases = [(640.0, 480.0), (480.0, 640.0), (1234.0, 5678.0)];
        for (w, h) in cases {
            let p = compute_placement(w, h, 1320.0, 2868.0, 48.0);
            assert!((p.x + p.width / 2.0 - 660.0).abs() < EPS);
            assert!((p.y + p.height / 2.0 - 1434.0).abs() < EPS);
        }
    }

    #[test]
    fn scaling_target_equals_scaling_placement() {
        let k = 0.25;
        let small = compute_placement(800.0, 600.0, 1320.0 * k, 2868.0 * k, 0.0);
        let scaled = compute_placement(800.0, 600.0, 1320.0, 2868.0, 0.0).scaled(k);
        assert!((small.width - scaled.width).abs() < EPS);
        assert!((small.height - scaled.height).abs() < EPS);
        assert!((small.x - scaled.x).abs() < EPS);
        assert!((small.y - scaled.y).abs() < EPS);
    }

    #[test]
    fn caption_chunks_are_fixed_width() {
        let lines = chunk_caption("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 4));
        assert_eq!(lines.concat(), "abcdefghij");
    }

    #[test]
    fn caption_chunks_count_chars_not_bytes() {
        let lines = chunk_caption("你好世界再见", 4);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "你好世界");
        assert_eq!(lines[1], "再见");
    }

    #[test]
    fn empty_caption_produces_no_lines() {
        assert!(chunk_caption("", 4).is_empty());
    }

    #[test]
    fn caption_line_count_is_ceil_of_length() {
        for len in 1..=13 {
            let text: String = "x".repeat(len);
            let lines = chunk_caption(&text, 4);
            assert_eq!(lines.len(), (len + 3) / 4);
        }
    }
}
