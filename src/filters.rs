//! Non-destructive color adjustments.
//!
//! The same ordered list of [`FilterOp`]s drives both the live preview
//! descriptor and the destructive bake, so the two cannot drift apart.

use image::RgbaImage;
use std::fmt;

/// The seven adjustment sliders.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Sepia,
    Grayscale,
    Blur,
    HueRotate,
}

impl FilterKind {
    /// Composition order.
    pub const ALL: [FilterKind; 7] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::Sepia,
        FilterKind::Grayscale,
        FilterKind::Blur,
        FilterKind::HueRotate,
    ];

    pub fn range(self) -> (f32, f32) {
        match self {
            FilterKind::Brightness | FilterKind::Contrast => (50.0, 150.0),
            FilterKind::Saturation => (0.0, 200.0),
            FilterKind::Sepia | FilterKind::Grayscale => (0.0, 100.0),
            FilterKind::Blur => (0.0, 20.0),
            FilterKind::HueRotate => (0.0, 360.0),
        }
    }

    pub fn identity(self) -> f32 {
        match self {
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Saturation => 100.0,
            _ => 0.0,
        }
    }
}

/// Slider values in user units: percentages, blur px, hue degrees.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FilterState {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sepia: f32,
    pub grayscale: f32,
    pub blur: f32,
    pub hue_rotate: f32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            sepia: 0.0,
            grayscale: 0.0,
            blur: 0.0,
            hue_rotate: 0.0,
        }
    }
}

impl FilterState {
    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Sepia => self.sepia,
            FilterKind::Grayscale => self.grayscale,
            FilterKind::Blur => self.blur,
            FilterKind::HueRotate => self.hue_rotate,
        }
    }

    /// Sets a slider, clamping into its range. Non-finite input resets it.
    pub fn set(&mut self, kind: FilterKind, value: f32) {
        let (lo, hi) = kind.range();
        let value = if value.is_finite() {
            value.clamp(lo, hi)
        } else {
            kind.identity()
        };
        match kind {
            FilterKind::Brightness => self.brightness = value,
            FilterKind::Contrast => self.contrast = value,
            FilterKind::Saturation => self.saturation = value,
            FilterKind::Sepia => self.sepia = value,
            FilterKind::Grayscale => self.grayscale = value,
            FilterKind::Blur => self.blur = value,
            FilterKind::HueRotate => self.hue_rotate = value,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_identity(&self) -> bool {
        FilterKind::ALL
            .iter()
            .all(|k| self.get(*k) == k.identity())
    }

    /// The filter chain in composition order, blur radius in display px.
    pub fn ops(&self) -> Vec<FilterOp> {
        vec![
            FilterOp::Brightness(self.brightness / 100.0),
            FilterOp::Contrast(self.contrast / 100.0),
            FilterOp::Saturate(self.saturation / 100.0),
            FilterOp::Sepia(self.sepia / 100.0),
            FilterOp::Grayscale(self.grayscale / 100.0),
            FilterOp::Blur(self.blur),
            FilterOp::HueRotate(self.hue_rotate),
        ]
    }

    /// Opaque descriptor for the live preview.
    pub fn preview(&self) -> FilterDescriptor {
        FilterDescriptor { ops: self.ops() }
    }
}

/// One step of the chain. Amounts are fractions (1.0 == 100%), blur is a
/// gaussian standard deviation in px and hue rotation is in degrees.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FilterOp {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Sepia(f32),
    Grayscale(f32),
    Blur(f32),
    HueRotate(f32),
}

type Matrix = [[f32; 3]; 3];

impl FilterOp {
    pub fn is_identity(&self) -> bool {
        match *self {
            FilterOp::Brightness(a) | FilterOp::Contrast(a) | FilterOp::Saturate(a) => a == 1.0,
            FilterOp::Sepia(a) | FilterOp::Grayscale(a) | FilterOp::Blur(a) => a <= 0.0,
            FilterOp::HueRotate(deg) => deg.rem_euclid(360.0) == 0.0,
        }
    }

    fn matrix(&self) -> Option<Matrix> {
        match *self {
            FilterOp::Saturate(s) => Some([
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ]),
            FilterOp::Sepia(a) => {
                let k = 1.0 - a.clamp(0.0, 1.0);
                Some([
                    [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
                    [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
                    [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
                ])
            }
            FilterOp::Grayscale(a) => {
                let k = 1.0 - a.clamp(0.0, 1.0);
                Some([
                    [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
                    [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
                    [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
                ])
            }
            FilterOp::HueRotate(deg) => {
                let (sin, cos) = deg.to_radians().sin_cos();
                Some([
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                    ],
                    [
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                    ],
                    [
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                    ],
                ])
            }
            _ => None,
        }
    }

    /// Applies this step in place. `blur_scale` converts the display-space
    /// blur radius into pixels of `image`.
    fn apply(&self, pixels: &mut RgbaImage, blur_scale: f32) {
        if self.is_identity() {
            return;
        }
        match *self {
            FilterOp::Blur(radius) => {
                let sigma = radius * blur_scale;
                if sigma > 0.0 {
                    *pixels = image::imageops::blur(&*pixels, sigma);
                }
            }
            FilterOp::Brightness(a) => map_channels(pixels, |c| c * a),
            FilterOp::Contrast(a) => map_channels(pixels, |c| (c - 0.5) * a + 0.5),
            _ => {
                if let Some(m) = self.matrix() {
                    apply_matrix(pixels, &m);
                }
            }
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Three decimals hide f32 noise from the percent conversion.
        let tidy = |v: f32| (v * 1000.0).round() / 1000.0;
        match *self {
            FilterOp::Brightness(a) => write!(f, "brightness({}%)", tidy(a * 100.0)),
            FilterOp::Contrast(a) => write!(f, "contrast({}%)", tidy(a * 100.0)),
            FilterOp::Saturate(a) => write!(f, "saturate({}%)", tidy(a * 100.0)),
            FilterOp::Sepia(a) => write!(f, "sepia({}%)", tidy(a * 100.0)),
            FilterOp::Grayscale(a) => write!(f, "grayscale({}%)", tidy(a * 100.0)),
            FilterOp::Blur(px) => write!(f, "blur({}px)", tidy(px)),
            FilterOp::HueRotate(deg) => write!(f, "hue-rotate({}deg)", tidy(deg)),
        }
    }
}

/// What a display surface needs to show the adjustments live. Formats as a
/// CSS `filter` value.
#[derive(Clone, PartialEq, Debug)]
pub struct FilterDescriptor {
    pub ops: Vec<FilterOp>,
}

impl FilterDescriptor {
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(FilterOp::is_identity)
    }
}

impl fmt::Display for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

fn to_unit(c: u8) -> f32 {
    c as f32 / 255.0
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn map_channels(image: &mut RgbaImage, f: impl Fn(f32) -> f32) {
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut **image);
    for px in pixels {
        for c in px.iter_mut().take(3) {
            *c = to_byte(f(to_unit(*c)));
        }
    }
}

fn apply_matrix(image: &mut RgbaImage, m: &Matrix) {
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut **image);
    for px in pixels {
        let rgb = [to_unit(px[0]), to_unit(px[1]), to_unit(px[2])];
        for (row, out) in m.iter().zip(px.iter_mut()) {
            *out = to_byte(row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);
        }
    }
}

/// Bakes `state` into `image` in composition order.
pub fn bake(image: &mut RgbaImage, state: &FilterState, blur_scale: f32) {
    for op in state.ops() {
        op.apply(image, blur_scale);
    }
}
