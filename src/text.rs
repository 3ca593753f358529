use crate::image_store::ImageStore;
use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use egui::{pos2, vec2, Pos2, Rect, Vec2};
use image::Rgba;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// The fixed set of families a text layer may use.
///
/// Glyphs come from the faces bundled with egui: every family renders with
/// the proportional face except Courier New, which uses the monospace one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum FontFamily {
    #[default]
    Arial,
    Verdana,
    Georgia,
    TimesNewRoman,
    CourierNew,
    Impact,
    ComicSansMs,
}

impl FontFamily {
    pub const ALL: [FontFamily; 7] = [
        FontFamily::Arial,
        FontFamily::Verdana,
        FontFamily::Georgia,
        FontFamily::TimesNewRoman,
        FontFamily::CourierNew,
        FontFamily::Impact,
        FontFamily::ComicSansMs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::Verdana => "Verdana",
            FontFamily::Georgia => "Georgia",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Impact => "Impact",
            FontFamily::ComicSansMs => "Comic Sans MS",
        }
    }

    fn face(self) -> Option<&'static FontArc> {
        static PROPORTIONAL: OnceLock<Option<FontArc>> = OnceLock::new();
        static MONOSPACE: OnceLock<Option<FontArc>> = OnceLock::new();
        match self {
            FontFamily::CourierNew => MONOSPACE.get_or_init(|| load_bundled("Hack")).as_ref(),
            _ => PROPORTIONAL
                .get_or_init(|| load_bundled("Ubuntu-Light"))
                .as_ref(),
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FontFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontFamily::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown font family: {}", s))
    }
}

fn load_bundled(name: &str) -> Option<FontArc> {
    let definitions = egui::FontDefinitions::default();
    let data = definitions.font_data.get(name)?;
    match FontArc::try_from_vec(data.font.to_vec()) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Failed to load bundled font {}: {}", name, e);
            None
        }
    }
}

/// Glyph scale for a CSS-style font size (the em square in px).
fn px_scale(font: &FontArc, font_size: f32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(font_size * font.height_unscaled() / units_per_em)
}

/// Lays out one line from x = 0, returning glyph ids with their pen x.
fn layout_line(font: &FontArc, scale: PxScale, line: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(scale);
    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id, cursor_x));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

/// Size of the text box: widest line by `lines * font_size`, matching the
/// top-anchored, size-advanced line layout used when drawing.
pub fn measure(content: &str, font_size: f32, family: FontFamily) -> Vec2 {
    let lines = content.split('\n').count() as f32;
    let width = match family.face() {
        Some(font) => {
            let scale = px_scale(font, font_size);
            content
                .split('\n')
                .map(|line| layout_line(font, scale, line).1)
                .fold(0.0, f32::max)
        }
        None => 0.0,
    };
    vec2(width, lines * font_size)
}

/// Walks every outlined glyph of `content` laid out with its top-left at
/// `origin`; each line starts `font_size` below the previous one.
fn for_each_glyph(
    content: &str,
    origin: Pos2,
    font_size: f32,
    family: FontFamily,
    mut f: impl FnMut(ab_glyph::OutlinedGlyph),
) {
    let Some(font) = family.face() else {
        log::warn!("No face available for {}, text skipped", family);
        return;
    };
    if font_size <= 0.0 {
        return;
    }
    let scale = px_scale(font, font_size);
    let ascent = font.as_scaled(scale).ascent();
    for (i, line) in content.split('\n').enumerate() {
        let baseline = origin.y + i as f32 * font_size + ascent;
        let (glyphs, _) = layout_line(font, scale, line);
        for (id, x) in glyphs {
            let glyph = id.with_scale_and_position(scale, point(origin.x + x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                f(outlined);
            }
        }
    }
}

/// Union of the pixel bounds of every rendered glyph, if anything renders.
pub fn glyph_bounds(
    content: &str,
    origin: Pos2,
    font_size: f32,
    family: FontFamily,
) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for_each_glyph(content, origin, font_size, family, |outlined| {
        let b = outlined.px_bounds();
        let r = Rect::from_min_max(pos2(b.min.x, b.min.y), pos2(b.max.x, b.max.y));
        bounds = Some(match bounds {
            Some(acc) => acc.union(r),
            None => r,
        });
    });
    bounds
}

/// Rasterizes `content` onto `canvas`, blending `color` by glyph coverage.
pub fn draw_text(
    canvas: &mut ImageStore,
    content: &str,
    origin: Pos2,
    font_size: f32,
    family: FontFamily,
    color: Rgba<u8>,
) {
    for_each_glyph(content, origin, font_size, family, |outlined| {
        let b = outlined.px_bounds();
        let (x0, y0) = (b.min.x as i64, b.min.y as i64);
        outlined.draw(|px, py, coverage| {
            if coverage > 0.0 {
                canvas.blend_pixel(x0 + px as i64, y0 + py as i64, color, coverage);
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_round_trip() {
        for family in FontFamily::ALL {
            assert_eq!(family.name().parse::<FontFamily>().unwrap(), family);
        }
        assert!("Wingdings".parse::<FontFamily>().is_err());
    }

    #[test]
    fn measure_grows_with_lines_and_size() {
        let one = measure("Hello", 20.0, FontFamily::Arial);
        let two = measure("Hello\nHello", 20.0, FontFamily::Arial);
        let big = measure("Hello", 40.0, FontFamily::Arial);
        assert!(one.x > 0.0);
        assert_eq!(one.y, 20.0);
        assert_eq!(two.y, 40.0);
        assert!((two.x - one.x).abs() < 1e-3);
        assert!(big.x > one.x * 1.9);
    }

    #[test]
    fn drawing_touches_only_glyph_bounds() {
        let mut canvas = ImageStore::new(120, 60);
        let origin = pos2(10.0, 10.0);
        let black = Rgba([0, 0, 0, 255]);
        draw_text(&mut canvas, "Hi\nyo", origin, 16.0, FontFamily::CourierNew, black);
        let bounds = glyph_bounds("Hi\nyo", origin, 16.0, FontFamily::CourierNew).unwrap();
        let mut changed = 0;
        for (x, y, p) in canvas.get_buffer().enumerate_pixels() {
            if *p != Rgba([255, 255, 255, 255]) {
                changed += 1;
                assert!(bounds.expand(1.0).contains(pos2(x as f32, y as f32)));
            }
        }
        assert!(changed > 0);
        assert!(bounds.min.y >= origin.y - 1.0);
    }
}
