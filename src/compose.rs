//! Flattening of filters, crop and layers into a new encoded image.
//!
//! Layers live in display space; everything here runs at native resolution,
//! converting through a per-axis [`Scale`].

use crate::error::{EditorError, Result};
use crate::filters::{self, FilterState};
use crate::image_store::{ImageBuffer, ImageStore};
use crate::layers::{LayerStack, OverlayLayer, TextLayer};
use crate::text;
use crate::tools::Region;
use egui::{pos2, vec2, Pos2, Vec2};
use image::imageops::{self, FilterType};

/// Largest rendered overlay, as a multiple of the canvas pixel count.
const MAX_OVERLAY_AREA_FACTOR: f64 = 16.0;

/// Native pixels per display pixel, per axis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub fn between(native: (u32, u32), display: Vec2) -> Result<Self> {
        let valid = native.0 > 0
            && native.1 > 0
            && display.x.is_finite()
            && display.y.is_finite()
            && display.x > 0.0
            && display.y > 0.0;
        if !valid {
            return Err(EditorError::GeometryInvalid {
                width: display.x,
                height: display.y,
            });
        }
        Ok(Self {
            x: native.0 as f32 / display.x,
            y: native.1 as f32 / display.y,
        })
    }

    pub fn to_vec2(self) -> Vec2 {
        vec2(self.x, self.y)
    }

    fn point(self, p: Pos2, offset: (u32, u32)) -> (i64, i64) {
        (
            (p.x * self.x).round() as i64 - offset.0 as i64,
            (p.y * self.y).round() as i64 - offset.1 as i64,
        )
    }
}

/// Renders `base` with `filters`, optionally cut to `crop` (native pixels),
/// then draws every overlay and then every text layer in creation order.
///
/// Layer positions are display coordinates of the uncropped base. The output
/// is always PNG, and identical inputs give identical bytes.
pub fn bake(
    base: &ImageBuffer,
    filters: &FilterState,
    layers: &LayerStack,
    crop: Option<Region>,
    scale: Scale,
) -> Result<ImageBuffer> {
    let mut pixels = base.to_rgba()?;
    filters::bake(&mut pixels, filters, scale.x);

    let offset = match crop {
        Some((x, y, w, h)) => {
            let (bw, bh) = pixels.dimensions();
            let x = x.min(bw);
            let y = y.min(bh);
            let w = w.min(bw - x);
            let h = h.min(bh - y);
            if w == 0 || h == 0 {
                return Err(EditorError::GeometryInvalid {
                    width: w as f32,
                    height: h as f32,
                });
            }
            pixels = imageops::crop_imm(&pixels, x, y, w, h).to_image();
            (x, y)
        }
        None => (0, 0),
    };

    let mut canvas = ImageStore::from_rgba(pixels);
    for (_, overlay) in layers.overlays() {
        draw_overlay(&mut canvas, overlay, scale, offset)?;
    }
    for (_, layer) in layers.texts() {
        draw_text_layer(&mut canvas, layer, scale, offset);
    }

    log::debug!(
        "Baked {}x{} ({} layer(s), crop: {:?})",
        canvas.width(),
        canvas.height(),
        layers.len(),
        crop
    );
    canvas.encode()
}

fn draw_overlay(
    canvas: &mut ImageStore,
    overlay: &OverlayLayer,
    scale: Scale,
    offset: (u32, u32),
) -> Result<()> {
    let w = (overlay.size.x * scale.x).round();
    let h = (overlay.size.y * scale.y).round();
    let canvas_area = canvas.width() as f64 * canvas.height() as f64;
    let too_large = w as f64 * h as f64 > canvas_area * MAX_OVERLAY_AREA_FACTOR;
    if !w.is_finite() || !h.is_finite() || too_large {
        return Err(EditorError::BakeFailure(format!(
            "overlay of {}x{} px does not fit a {}x{} canvas",
            w,
            h,
            canvas.width(),
            canvas.height()
        )));
    }
    if w < 1.0 || h < 1.0 || overlay.source.width() == 0 || overlay.source.height() == 0 {
        return Ok(());
    }
    let resized = imageops::resize(&*overlay.source, w as u32, h as u32, FilterType::Triangle);
    let (x0, y0) = scale.point(overlay.position, offset);
    for (x, y, p) in resized.enumerate_pixels() {
        canvas.blend_pixel(x0 + x as i64, y0 + y as i64, *p, overlay.opacity);
    }
    Ok(())
}

fn draw_text_layer(canvas: &mut ImageStore, layer: &TextLayer, scale: Scale, offset: (u32, u32)) {
    let (x, y) = scale.point(layer.position, offset);
    text::draw_text(
        canvas,
        &layer.content,
        pos2(x as f32, y as f32),
        layer.font_size * scale.x,
        layer.font,
        layer.color,
    );
}
