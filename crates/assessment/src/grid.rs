use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use birkbot_core::domain::profile::{GridPoint, ProfilePayload};
use birkbot_core::errors::ProviderError;

const SIZE: u32 = 400;
const MARGIN: u32 = 20;
const MARKER_RADIUS: i64 = 9;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GUIDE: Rgb<u8> = Rgb([200, 200, 200]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const MARKER: Rgb<u8> = Rgb([20, 20, 20]);

// Quadrant tints, clockwise from top left.
const RED: Rgb<u8> = Rgb([246, 196, 196]);
const GREEN: Rgb<u8> = Rgb([198, 234, 198]);
const BLUE: Rgb<u8> = Rgb([196, 214, 246]);
const YELLOW: Rgb<u8> = Rgb([250, 238, 180]);

/// Draws the four-colour Birkman grid with interests, usual and need markers.
///
/// Output depends only on the payload's grid scores, so repeated renders of the
/// same payload produce identical PNG bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridRenderer;

impl GridRenderer {
    pub fn render(&self, payload: &ProfilePayload) -> Result<Vec<u8>, ProviderError> {
        let scores = payload.grid_scores().ok_or(ProviderError::MissingGridData)?;

        let mut canvas = RgbImage::from_pixel(SIZE, SIZE, BACKGROUND);
        paint_quadrants(&mut canvas);
        paint_guides(&mut canvas);

        paint_asterisk(&mut canvas, to_pixel(scores.interests));
        paint_disc(&mut canvas, to_pixel(scores.usual));
        paint_square(&mut canvas, to_pixel(scores.need));

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|error| ProviderError::Render(error.to_string()))?;
        Ok(bytes)
    }
}

fn plot_span() -> u32 {
    SIZE - 2 * MARGIN
}

/// Maps a 0..=100 score to canvas pixels; `y` grows upwards on the grid.
fn to_pixel(point: GridPoint) -> (i64, i64) {
    let point = point.clamped();
    let span = f64::from(plot_span());
    let x = f64::from(MARGIN) + point.x / 100.0 * span;
    let y = f64::from(MARGIN) + (100.0 - point.y) / 100.0 * span;
    (x.round() as i64, y.round() as i64)
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(SIZE) && y < i64::from(SIZE) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn paint_quadrants(canvas: &mut RgbImage) {
    let low = MARGIN;
    let high = SIZE - MARGIN;
    let mid = SIZE / 2;
    for y in low..high {
        for x in low..high {
            let color = match (x < mid, y < mid) {
                (true, true) => RED,
                (false, true) => GREEN,
                (false, false) => BLUE,
                (true, false) => YELLOW,
            };
            canvas.put_pixel(x, y, color);
        }
    }
}

fn paint_guides(canvas: &mut RgbImage) {
    let low = MARGIN;
    let high = SIZE - MARGIN;
    let span = plot_span();

    for step in [1, 3] {
        let offset = low + span * step / 4;
        for t in low..high {
            canvas.put_pixel(offset, t, GUIDE);
            canvas.put_pixel(t, offset, GUIDE);
        }
    }

    let mid = SIZE / 2;
    for t in low..high {
        canvas.put_pixel(mid, t, AXIS);
        canvas.put_pixel(t, mid, AXIS);
        canvas.put_pixel(low, t, AXIS);
        canvas.put_pixel(high - 1, t, AXIS);
        canvas.put_pixel(t, low, AXIS);
        canvas.put_pixel(t, high - 1, AXIS);
    }
}

fn paint_disc(canvas: &mut RgbImage, (cx, cy): (i64, i64)) {
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            if dx * dx + dy * dy <= MARKER_RADIUS * MARKER_RADIUS {
                put(canvas, cx + dx, cy + dy, MARKER);
            }
        }
    }
}

fn paint_square(canvas: &mut RgbImage, (cx, cy): (i64, i64)) {
    for d in -MARKER_RADIUS..=MARKER_RADIUS {
        for thickness in 0..2 {
            put(canvas, cx + d, cy - MARKER_RADIUS + thickness, MARKER);
            put(canvas, cx + d, cy + MARKER_RADIUS - thickness, MARKER);
            put(canvas, cx - MARKER_RADIUS + thickness, cy + d, MARKER);
            put(canvas, cx + MARKER_RADIUS - thickness, cy + d, MARKER);
        }
    }
}

fn paint_asterisk(canvas: &mut RgbImage, (cx, cy): (i64, i64)) {
    for d in -MARKER_RADIUS..=MARKER_RADIUS {
        for thickness in 0..2 {
            put(canvas, cx + d, cy + thickness, MARKER);
            put(canvas, cx + thickness, cy + d, MARKER);
            put(canvas, cx + d, cy + d + thickness, MARKER);
            put(canvas, cx + d, cy - d + thickness, MARKER);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, ImageFormat};
    use serde_json::json;

    use birkbot_core::domain::profile::{GridPoint, ProfilePayload};
    use birkbot_core::errors::ProviderError;

    use super::{to_pixel, GridRenderer, MARKER, SIZE};

    fn payload() -> ProfilePayload {
        ProfilePayload::new(json!({
            "name": "Alice",
            "grid": {
                "interests": { "x": 20, "y": 80 },
                "usual": { "x": 75, "y": 25 },
                "need": { "x": 60, "y": 40 }
            }
        }))
    }

    #[test]
    fn render_is_deterministic_png() {
        let renderer = GridRenderer;
        let first = renderer.render(&payload()).expect("render");
        let second = renderer.render(&payload()).expect("render");

        assert_eq!(first, second);
        assert_eq!(&first[..8], b"\x89PNG\r\n\x1a\n");

        let decoded =
            image::load_from_memory_with_format(&first, ImageFormat::Png).expect("decode");
        assert_eq!(decoded.dimensions(), (SIZE, SIZE));
    }

    #[test]
    fn usual_marker_lands_at_scaled_position() {
        let bytes = GridRenderer.render(&payload()).expect("render");
        let decoded = image::load_from_memory(&bytes).expect("decode").to_rgb8();

        let (x, y) = to_pixel(GridPoint { x: 75.0, y: 25.0 });
        assert_eq!(decoded.get_pixel(x as u32, y as u32), &MARKER);
    }

    #[test]
    fn different_scores_render_different_images() {
        let moved = ProfilePayload::new(json!({
            "grid": {
                "interests": { "x": 20, "y": 80 },
                "usual": { "x": 10, "y": 90 },
                "need": { "x": 60, "y": 40 }
            }
        }));
        assert_ne!(
            GridRenderer.render(&payload()).expect("render"),
            GridRenderer.render(&moved).expect("render")
        );
    }

    #[test]
    fn payload_without_grid_is_rejected() {
        let error = GridRenderer.render(&ProfilePayload::empty()).expect_err("no grid");
        assert_eq!(error, ProviderError::MissingGridData);
    }

    #[test]
    fn out_of_range_scores_stay_on_canvas() {
        let (x, y) = to_pixel(GridPoint { x: 150.0, y: -20.0 });
        assert!(x < i64::from(SIZE) && y < i64::from(SIZE));
        assert!(x >= 0 && y >= 0);
    }
}
