use crate::error::Result;
use crate::image_store::{ImageBuffer, ImageStore};
use egui::{Pos2, Rect};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba};

const PAINTED: Luma<u8> = Luma([255]);

/// Freehand selection strokes painted over the displayed image.
///
/// Strokes accumulate in a display-sized coverage canvas where 0 means
/// untouched. Each stroke is a chain of round stamps, which gives round caps
/// and joins for free.
pub struct MaskTool {
    layer: GrayImage,
    brush_width: f32,
    last_pos: Option<Pos2>,
    dirty_rect: Option<Rect>,
}

impl MaskTool {
    pub fn new(width: u32, height: u32, brush_width: f32) -> Self {
        Self {
            layer: GrayImage::new(width, height),
            brush_width,
            last_pos: None,
            dirty_rect: None,
        }
    }

    pub fn brush_width(&self) -> f32 {
        self.brush_width
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush_width = width;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.layer.dimensions()
    }

    /// Follows a change of display size, stretching what was painted.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.layer.dimensions() {
            return;
        }
        let (old_w, old_h) = self.layer.dimensions();
        self.layer = if old_w == 0 || old_h == 0 || width == 0 || height == 0 {
            GrayImage::new(width, height)
        } else {
            imageops::resize(&self.layer, width, height, FilterType::Nearest)
        };
        let kx = width as f32 / old_w.max(1) as f32;
        let ky = height as f32 / old_h.max(1) as f32;
        self.dirty_rect = self.dirty_rect.map(|r| {
            Rect::from_min_max(
                Pos2::new(r.min.x * kx, r.min.y * ky),
                Pos2::new(r.max.x * kx, r.max.y * ky),
            )
        });
        self.last_pos = None;
    }

    /// Pointer down: a single click already leaves a dot.
    pub fn begin_stroke(&mut self, pos: Pos2) {
        self.draw_circle(pos, self.brush_width / 2.0);
        self.last_pos = Some(pos);
    }

    pub fn extend_stroke(&mut self, pos: Pos2) {
        let Some(last) = self.last_pos else {
            return;
        };
        self.draw_segment(last, pos, self.brush_width / 2.0);
        self.last_pos = Some(pos);
    }

    pub fn end_stroke(&mut self) {
        self.last_pos = None;
    }

    /// Erases the accumulated strokes.
    pub fn clear(&mut self) {
        self.layer.pixels_mut().for_each(|p| *p = Luma([0]));
        self.last_pos = None;
        self.dirty_rect = None;
    }

    pub fn has_strokes(&self) -> bool {
        self.dirty_rect.is_some()
    }

    /// Whether the display pixel at `(x, y)` is painted.
    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        x < self.layer.width() && y < self.layer.height() && self.layer.get_pixel(x, y)[0] > 0
    }

    /// Rasterizes the strokes at native resolution: white strokes on black.
    pub fn save(&self, native_width: u32, native_height: u32) -> Result<ImageBuffer> {
        let mut canvas = ImageStore::filled(native_width, native_height, Rgba([0, 0, 0, 255]));
        if native_width > 0 && native_height > 0 && self.has_strokes() {
            let scaled =
                imageops::resize(&self.layer, native_width, native_height, FilterType::Nearest);
            for (x, y, p) in scaled.enumerate_pixels() {
                if p[0] > 0 {
                    canvas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
                }
            }
        }
        log::info!("Mask: saved at {}x{}", native_width, native_height);
        canvas.encode()
    }

    fn expand_dirty_rect(&mut self, rect: Rect) {
        self.dirty_rect = Some(match self.dirty_rect {
            Some(r) => r.union(rect),
            None => rect,
        });
    }

    fn draw_segment(&mut self, start: Pos2, end: Pos2, radius: f32) {
        let dist = start.distance(end);
        let step_dist = (radius * 0.25).max(1.0);
        let steps = (dist / step_dist).ceil().max(1.0) as u32;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.draw_circle(start.lerp(end, t), radius);
        }
    }

    fn draw_circle(&mut self, pos: Pos2, radius: f32) {
        let width = self.layer.width() as i64;
        let height = self.layer.height() as i64;
        if width == 0 || height == 0 {
            return;
        }

        let r = radius.max(0.5);
        let min_x = ((pos.x - r).floor() as i64).max(0);
        let max_x = ((pos.x + r).ceil() as i64).min(width - 1);
        let min_y = ((pos.y - r).floor() as i64).max(0);
        let max_y = ((pos.y + r).ceil() as i64).min(height - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let mut touched = false;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - pos.x;
                let dy = y as f32 + 0.5 - pos.y;
                if dx * dx + dy * dy <= r * r {
                    self.layer.put_pixel(x as u32, y as u32, PAINTED);
                    touched = true;
                }
            }
        }

        if touched {
            self.expand_dirty_rect(Rect::from_min_max(
                Pos2::new(min_x as f32, min_y as f32),
                Pos2::new(max_x as f32 + 1.0, max_y as f32 + 1.0),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn click_leaves_a_round_dot() {
        let mut mask = MaskTool::new(100, 100, 20.0);
        mask.begin_stroke(pos2(50.0, 50.0));
        mask.end_stroke();
        assert!(mask.is_painted(50, 50));
        assert!(mask.is_painted(58, 50));
        assert!(!mask.is_painted(62, 50));
        assert!(!mask.is_painted(58, 58));
    }

    #[test]
    fn stroke_covers_the_path() {
        let mut mask = MaskTool::new(100, 40, 10.0);
        mask.begin_stroke(pos2(10.0, 20.0));
        mask.extend_stroke(pos2(90.0, 20.0));
        mask.end_stroke();
        for x in 10..90 {
            assert!(mask.is_painted(x, 20), "gap at {}", x);
        }
        assert!(!mask.is_painted(50, 30));
        // Moves without a pointer down paint nothing.
        mask.extend_stroke(pos2(50.0, 5.0));
        assert!(!mask.is_painted(50, 5));
    }

    #[test]
    fn save_is_native_sized_black_and_white() {
        let mut mask = MaskTool::new(50, 50, 10.0);
        mask.begin_stroke(pos2(25.0, 25.0));
        mask.end_stroke();
        let saved = mask.save(200, 100).unwrap();
        assert_eq!(saved.dimensions(), (200, 100));
        let pixels = saved.to_rgba().unwrap();
        assert_eq!(*pixels.get_pixel(100, 50), Rgba([255, 255, 255, 255]));
        assert_eq!(*pixels.get_pixel(5, 5), Rgba([0, 0, 0, 255]));
        assert!(pixels
            .pixels()
            .all(|p| *p == Rgba([0, 0, 0, 255]) || *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn clear_erases_strokes() {
        let mut mask = MaskTool::new(20, 20, 10.0);
        mask.begin_stroke(pos2(10.0, 10.0));
        mask.clear();
        assert!(!mask.has_strokes());
        assert!(!mask.is_painted(10, 10));
    }
}
