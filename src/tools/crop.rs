use super::transform::{clamp_resize, fit_inside, HandleType};
use egui::{pos2, vec2, Rect, Vec2};

/// Native-space pixel region `(x, y, width, height)`.
pub type Region = (u32, u32, u32, u32);

/// Crop rectangle in display space. Only exists while cropping is active.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CropTool {
    rect: Rect,
    bounds: Vec2,
    min_size: f32,
}

impl CropTool {
    /// Starts with a centered box covering `fraction` of each axis.
    pub fn begin(bounds: Vec2, fraction: f32, min_size: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        let size = bounds * fraction;
        let min = pos2((bounds.x - size.x) / 2.0, (bounds.y - size.y) / 2.0);
        let rect = fit_inside(Rect::from_min_size(min, size), bounds, min_size);
        log::debug!("Crop: begin {:?} in {:?}", rect, bounds);
        Self {
            rect,
            bounds,
            min_size,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Replaces the rectangle, clamped into the display bounds.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = fit_inside(rect, self.bounds, self.min_size);
    }

    /// Result of dragging `handle` by `delta` from `start`.
    pub fn drag(&mut self, start: Rect, handle: HandleType, delta: Vec2) {
        self.rect = clamp_resize(start, handle, delta, self.bounds, self.min_size);
    }

    /// The display area changed size; the box keeps its relative placement.
    pub fn rescale(&mut self, bounds: Vec2) {
        if self.bounds.x <= 0.0 || self.bounds.y <= 0.0 {
            self.bounds = bounds;
            self.set_rect(self.rect);
            return;
        }
        let k = vec2(bounds.x / self.bounds.x, bounds.y / self.bounds.y);
        let min = pos2(self.rect.min.x * k.x, self.rect.min.y * k.y);
        let size = vec2(self.rect.width() * k.x, self.rect.height() * k.y);
        self.bounds = bounds;
        self.set_rect(Rect::from_min_size(min, size));
    }

    /// Maps the rectangle to native pixels using per-axis `scale`
    /// (native / display). `None` when nothing of the image would remain.
    pub fn native_region(&self, scale: Vec2, native: (u32, u32)) -> Option<Region> {
        let x = (self.rect.min.x * scale.x).round().max(0.0) as u32;
        let y = (self.rect.min.y * scale.y).round().max(0.0) as u32;
        let w = (self.rect.width() * scale.x).round().max(0.0) as u32;
        let h = (self.rect.height() * scale.y).round().max(0.0) as u32;
        let x = x.min(native.0);
        let y = y.min(native.1);
        let w = w.min(native.0 - x);
        let h = h.min(native.1 - y);
        (w > 0 && h > 0).then_some((x, y, w, h))
    }
}
