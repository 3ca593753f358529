use crate::error::{EditorError, Result};
use image::{ImageBuffer as RawBuffer, Rgba, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Format tag carried alongside every encoded image.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MimeType {
    Png,
    Jpeg,
    Bmp,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Bmp => "image/bmp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(MimeType::Png),
            "image/jpeg" | "image/jpg" => Some(MimeType::Jpeg),
            "image/bmp" => Some(MimeType::Bmp),
            _ => None,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            MimeType::Png => image::ImageFormat::Png,
            MimeType::Jpeg => image::ImageFormat::Jpeg,
            MimeType::Bmp => image::ImageFormat::Bmp,
        }
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(MimeType::Png),
            image::ImageFormat::Jpeg => Some(MimeType::Jpeg),
            image::ImageFormat::Bmp => Some(MimeType::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable encoded image: the unit stored in history, variation sets and
/// handed to collaborators. Cloning shares the bytes.
#[derive(Clone)]
pub struct ImageBuffer {
    bytes: Arc<[u8]>,
    mime: MimeType,
    width: u32,
    height: u32,
}

impl ImageBuffer {
    /// Wraps encoded bytes, checking that they really are an image of `mime`.
    pub fn decode(bytes: impl Into<Arc<[u8]>>, mime: MimeType) -> Result<Self> {
        let bytes = bytes.into();
        let img = image::load_from_memory_with_format(&bytes, mime.image_format())
            .map_err(EditorError::DecodeFailure)?;
        Ok(Self {
            bytes,
            mime,
            width: img.width(),
            height: img.height(),
        })
    }

    /// Like [`ImageBuffer::decode`] but guesses the format from the bytes.
    pub fn sniff(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        let format = image::guess_format(&bytes).map_err(EditorError::DecodeFailure)?;
        let mime = MimeType::from_image_format(format).ok_or_else(|| {
            EditorError::DecodeFailure(image::ImageError::Unsupported(
                image::error::ImageFormatHint::from(format).into(),
            ))
        })?;
        Self::decode(bytes, mime)
    }

    /// Encodes raw pixels as PNG, the engine's single output format.
    pub fn from_rgba(pixels: &RgbaImage) -> Result<Self> {
        let mut out = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .map_err(|e| EditorError::BakeFailure(format!("PNG encode: {}", e)))?;
        Ok(Self {
            bytes: out.into(),
            mime: MimeType::Png,
            width: pixels.width(),
            height: pixels.height(),
        })
    }

    pub fn to_rgba(&self) -> Result<RgbaImage> {
        let img = image::load_from_memory_with_format(&self.bytes, self.mime.image_format())
            .map_err(EditorError::DecodeFailure)?;
        Ok(img.to_rgba8())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Exact content identity: same encoded bytes.
    pub fn same_content(&self, other: &ImageBuffer) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes) || self.bytes[..] == other.bytes[..]
    }
}

impl PartialEq for ImageBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl Eq for ImageBuffer {}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("mime", &self.mime)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Decoded RGBA working canvas used while baking.
#[derive(Clone)]
pub struct ImageStore {
    pub buffer: RgbaImage,
}

impl ImageStore {
    pub fn new(width: u32, height: u32) -> Self {
        // Initialize with white background
        Self::filled(width, height, Rgba([255, 255, 255, 255]))
    }

    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let buffer = RawBuffer::from_pixel(width, height, color);
        Self { buffer }
    }

    pub fn from_rgba(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    pub fn from_image(image: &ImageBuffer) -> Result<Self> {
        Ok(Self {
            buffer: image.to_rgba()?,
        })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.buffer.get_pixel(x, y))
        } else {
            None
        }
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        if x < self.width() && y < self.height() {
            self.buffer.put_pixel(x, y, color);
        }
    }

    /// Source-over composite of `color` at `opacity` (0..=1) onto the pixel.
    /// Coordinates outside the canvas are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba<u8>, opacity: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let src_a = (color[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }
        let dst = self.buffer.get_pixel_mut(x as u32, y as u32);
        if src_a >= 1.0 {
            *dst = color;
            return;
        }
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        let mut out = [0u8; 4];
        for c in 0..3 {
            let v = (color[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
            out[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        *dst = Rgba(out);
    }

    pub fn get_buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn encode(&self) -> Result<ImageBuffer> {
        ImageBuffer::from_rgba(&self.buffer)
    }
}
