use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::Point;

pub const STROKE_WIDTH: f32 = 2.0;
pub const STROKE_COLOR: [u8; 3] = [0, 0, 0];
pub const DEFAULT_HEIGHT: u32 = 200;
pub const MIN_HEIGHT: u32 = 150;
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Mouse and touch input after translation into surface-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// RGBA pixel buffer that freehand strokes are rasterized into.
pub struct SignaturePad {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    cursor: Option<Point>,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        let mut pad = Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            cursor: None,
        };
        pad.resize(width, height);
        pad
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_drawing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Allocates a fresh buffer. A zero height means the container has not
    /// been laid out yet and falls back to the default.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = if height == 0 {
            DEFAULT_HEIGHT
        } else {
            height.max(MIN_HEIGHT)
        };
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn to_local(client_x: f64, client_y: f64, origin_left: f64, origin_top: f64) -> Point {
        Point {
            x: (client_x - origin_left) as f32,
            y: (client_y - origin_top) as f32,
        }
    }

    pub fn begin_stroke(&mut self, point: Point) {
        if !point.is_finite() {
            return;
        }
        self.cursor = Some(point);
    }

    pub fn extend_stroke(&mut self, point: Point) {
        let Some(from) = self.cursor else {
            return;
        };
        if !point.is_finite() {
            return;
        }
        self.draw_segment(from, point);
        self.cursor = Some(point);
    }

    pub fn end_stroke(&mut self) {
        self.cursor = None;
    }

    pub fn handle(&mut self, input: PointerInput) {
        match input {
            PointerInput::Down(point) => self.begin_stroke(point),
            PointerInput::Move(point) => self.extend_stroke(point),
            PointerInput::Up | PointerInput::Leave => self.end_stroke(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().skip(3).step_by(4).all(|alpha| *alpha == 0)
    }

    /// Encodes the whole buffer as a PNG data URL.
    pub fn export(&self) -> String {
        // `resize` keeps both dimensions non-zero and the buffer sized to
        // them, which is all the encoder can reject.
        let png = encode_png(self.width, self.height, &self.pixels);
        debug_assert!(png.is_ok(), "PNG encoding failed: {png:?}");
        format!(
            "{PNG_DATA_URL_PREFIX}{}",
            STANDARD.encode(png.unwrap_or_default())
        )
    }

    fn draw_segment(&mut self, from: Point, to: Point) {
        let radius = STROKE_WIDTH / 2.0;
        let reach = radius + 1.0;
        let x0 = (from.x.min(to.x) - reach).floor().max(0.0) as u32;
        let y0 = (from.y.min(to.y) - reach).floor().max(0.0) as u32;
        let x1 = ((from.x.max(to.x) + reach).ceil() as u32).min(self.width);
        let y1 = ((from.y.max(to.y) + reach).ceil() as u32).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let distance = distance_to_segment(
                    x as f64 + 0.5,
                    y as f64 + 0.5,
                    from.x as f64,
                    from.y as f64,
                    to.x as f64,
                    to.y as f64,
                );
                // Round caps fall out of measuring to the closed segment.
                let coverage = (radius as f64 + 0.5 - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, coverage);
                }
            }
        }
    }

    fn blend(&mut self, x: u32, y: u32, coverage: f64) {
        let index = (y as usize * self.width as usize + x as usize) * 4;
        let current = self.pixels[index + 3] as f64 / 255.0;
        let alpha = coverage + current * (1.0 - coverage);
        self.pixels[index..index + 3].copy_from_slice(&STROKE_COLOR);
        self.pixels[index + 3] = (alpha * 255.0).round() as u8;
    }
}

fn distance_to_segment(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return ((px - x1).powi(2) + (py - y1).powi(2)).sqrt();
    }
    let t = ((px - x1) * dx + (py - y1) * dy) / (dx * dx + dy * dy);
    let t = t.clamp(0.0, 1.0);
    let proj_x = x1 + t * dx;
    let proj_y = y1 + t * dy;
    ((px - proj_x).powi(2) + (py - proj_y).powi(2)).sqrt()
}

fn encode_png(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>, png::EncodingError> {
    let mut payload = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut payload, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(pad: &SignaturePad, x: u32, y: u32) -> u8 {
        pad.pixels()[(y as usize * pad.width() as usize + x as usize) * 4 + 3]
    }

    fn decode_export(url: &str) -> (u32, u32) {
        let payload = url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .expect("data url prefix");
        let bytes = STANDARD.decode(payload).expect("valid base64");
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let reader = decoder.read_info().expect("valid png");
        let info = reader.info();
        (info.width, info.height)
    }

    #[test]
    fn blank_pad_exports_valid_png() {
        let pad = SignaturePad::new(320, 200);
        assert!(pad.is_blank());
        let url = pad.export();
        assert_eq!(decode_export(&url), (320, 200));
    }

    #[test]
    fn smallest_pad_exports_valid_png() {
        let mut pad = SignaturePad::new(0, 0);
        assert_eq!(decode_export(&pad.export()), (1, DEFAULT_HEIGHT));

        pad.resize(1, 1);
        pad.begin_stroke(Point::new(0.0, 0.0));
        pad.extend_stroke(Point::new(0.5, 149.0));
        assert!(!pad.is_blank());
        assert_eq!(decode_export(&pad.export()), (1, MIN_HEIGHT));
    }

    #[test]
    fn stroke_paints_pixels_and_changes_export() {
        let mut pad = SignaturePad::new(64, 200);
        let blank = pad.export();
        pad.begin_stroke(Point::new(10.0, 10.0));
        pad.extend_stroke(Point::new(30.0, 10.0));
        pad.end_stroke();

        assert!(!pad.is_blank());
        assert_eq!(alpha_at(&pad, 20, 10), 255);
        assert_eq!(alpha_at(&pad, 20, 13), 0);
        let signed = pad.export();
        assert_ne!(signed, blank);
        assert_eq!(decode_export(&signed), (64, 200));
    }

    #[test]
    fn single_point_stroke_leaves_round_dot() {
        let mut pad = SignaturePad::new(32, 200);
        pad.begin_stroke(Point::new(16.0, 16.0));
        pad.extend_stroke(Point::new(16.0, 16.0));
        assert!(alpha_at(&pad, 15, 15) > 0);
        assert_eq!(alpha_at(&pad, 20, 16), 0);
    }

    #[test]
    fn extend_without_active_stroke_is_ignored() {
        let mut pad = SignaturePad::new(32, 200);
        pad.extend_stroke(Point::new(5.0, 5.0));
        assert!(pad.is_blank());

        pad.begin_stroke(Point::new(1.0, 1.0));
        pad.end_stroke();
        pad.end_stroke();
        pad.extend_stroke(Point::new(20.0, 20.0));
        assert!(pad.is_blank());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn non_finite_points_are_dropped() {
        let mut pad = SignaturePad::new(32, 200);
        pad.begin_stroke(Point::new(f32::NAN, 1.0));
        assert!(!pad.is_drawing());
        pad.begin_stroke(Point::new(4.0, 4.0));
        pad.extend_stroke(Point::new(f32::INFINITY, 4.0));
        assert!(pad.is_blank());
        assert!(pad.is_drawing());
    }

    #[test]
    fn strokes_off_the_edge_are_clipped() {
        let mut pad = SignaturePad::new(16, 150);
        pad.begin_stroke(Point::new(-40.0, -40.0));
        pad.extend_stroke(Point::new(-10.0, -10.0));
        assert!(pad.is_blank());
        pad.extend_stroke(Point::new(100.0, 100.0));
        assert!(!pad.is_blank());
    }

    #[test]
    fn resize_applies_height_floor_and_drops_stroke() {
        let mut pad = SignaturePad::new(100, 100);
        assert_eq!(pad.height(), MIN_HEIGHT);

        pad.resize(0, 0);
        assert_eq!((pad.width(), pad.height()), (1, DEFAULT_HEIGHT));

        pad.resize(400, 260);
        pad.begin_stroke(Point::new(10.0, 10.0));
        pad.extend_stroke(Point::new(40.0, 40.0));
        pad.resize(400, 260);
        assert!(pad.is_blank());
        assert!(!pad.is_drawing());
        assert_eq!(pad.pixels().len(), 400 * 260 * 4);
    }

    #[test]
    fn clear_erases_content() {
        let mut pad = SignaturePad::new(50, 150);
        pad.handle(PointerInput::Down(Point::new(5.0, 5.0)));
        pad.handle(PointerInput::Move(Point::new(45.0, 45.0)));
        pad.handle(PointerInput::Leave);
        assert!(!pad.is_blank());
        pad.clear();
        assert!(pad.is_blank());
    }

    #[test]
    fn screen_points_are_made_local() {
        let point = SignaturePad::to_local(130.0, 75.5, 100.0, 50.0);
        assert_eq!(point, Point::new(30.0, 25.5));
    }
}
