use crate::error::{EditorError, Result};
use crate::text::{self, FontFamily};
use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Layer handle. Ids are handed out in increasing order, so id order is
/// creation order is draw order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LayerId(u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerKind {
    Text,
    Overlay,
}

/// Currently selected layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Selection {
    pub id: LayerId,
    pub kind: LayerKind,
}

#[derive(Clone, PartialEq, Debug)]
pub struct TextLayer {
    /// May contain `\n`; lines render top-aligned one font size apart.
    pub content: String,
    pub color: Rgba<u8>,
    /// In display px.
    pub font_size: f32,
    pub font: FontFamily,
    /// Top-left, display space.
    pub position: Pos2,
}

impl TextLayer {
    /// Display-space size of the rendered text box.
    pub fn size(&self) -> Vec2 {
        text::measure(&self.content, self.font_size, self.font)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size())
    }
}

#[derive(Clone, Debug)]
pub struct OverlayLayer {
    pub source: Arc<RgbaImage>,
    /// 0..=1
    pub opacity: f32,
    pub size: Vec2,
    pub position: Pos2,
    /// Source width / height, fixed at creation.
    pub aspect_ratio: f32,
    /// While set, resizing derives height from width.
    pub lock_aspect: bool,
}

impl OverlayLayer {
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }
}

impl PartialEq for OverlayLayer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.opacity == other.opacity
            && self.size == other.size
            && self.position == other.position
            && self.aspect_ratio == other.aspect_ratio
            && self.lock_aspect == other.lock_aspect
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum LayerData {
    Text(TextLayer),
    Overlay(OverlayLayer),
}

impl LayerData {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerData::Text(_) => LayerKind::Text,
            LayerData::Overlay(_) => LayerKind::Overlay,
        }
    }

    /// Display-space bounding box.
    pub fn rect(&self) -> Rect {
        match self {
            LayerData::Text(t) => t.rect(),
            LayerData::Overlay(o) => o.rect(),
        }
    }

    fn with_position(&self, position: Pos2) -> LayerData {
        match self {
            LayerData::Text(t) => LayerData::Text(TextLayer {
                position,
                ..t.clone()
            }),
            LayerData::Overlay(o) => LayerData::Overlay(OverlayLayer {
                position,
                ..o.clone()
            }),
        }
    }
}

/// Partial update for a text layer; `None` keeps the current value.
#[derive(Clone, Default, Debug)]
pub struct TextPatch {
    pub content: Option<String>,
    pub color: Option<Rgba<u8>>,
    pub font_size: Option<f32>,
    pub font: Option<FontFamily>,
    pub position: Option<Pos2>,
}

/// Partial update for an overlay layer; `None` keeps the current value.
#[derive(Clone, Default, Debug)]
pub struct OverlayPatch {
    pub opacity: Option<f32>,
    pub size: Option<Vec2>,
    pub position: Option<Pos2>,
    pub lock_aspect: Option<bool>,
}

/// Text and overlay layers in draw order.
///
/// Records are values: every update builds a new record and stores it under
/// the unchanged id. Callers get copies or short borrows, never handles into
/// the map.
#[derive(Clone, Default, Debug)]
pub struct LayerStack {
    layers: BTreeMap<LayerId, LayerData>,
    next_id: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, data: LayerData) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        log::debug!("Created {:?} {}", data.kind(), id);
        self.layers.insert(id, data);
        id
    }

    pub fn add_text(&mut self, layer: TextLayer) -> LayerId {
        self.insert(LayerData::Text(layer))
    }

    pub fn add_overlay(&mut self, layer: OverlayLayer) -> LayerId {
        self.insert(LayerData::Overlay(layer))
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerData> {
        self.layers.get(&id)
    }

    pub fn kind_of(&self, id: LayerId) -> Option<LayerKind> {
        self.layers.get(&id).map(LayerData::kind)
    }

    pub fn text(&self, id: LayerId) -> Option<&TextLayer> {
        match self.layers.get(&id) {
            Some(LayerData::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn overlay(&self, id: LayerId) -> Option<&OverlayLayer> {
        match self.layers.get(&id) {
            Some(LayerData::Overlay(o)) => Some(o),
            _ => None,
        }
    }

    pub fn update_text(&mut self, id: LayerId, patch: TextPatch) -> Result<()> {
        let current = self.text(id).ok_or(EditorError::UnknownLayer(id))?;
        let updated = TextLayer {
            content: patch.content.unwrap_or_else(|| current.content.clone()),
            color: patch.color.unwrap_or(current.color),
            font_size: patch.font_size.unwrap_or(current.font_size),
            font: patch.font.unwrap_or(current.font),
            position: patch.position.unwrap_or(current.position),
        };
        self.layers.insert(id, LayerData::Text(updated));
        Ok(())
    }

    pub fn update_overlay(&mut self, id: LayerId, patch: OverlayPatch) -> Result<()> {
        let current = self.overlay(id).ok_or(EditorError::UnknownLayer(id))?;
        let updated = OverlayLayer {
            opacity: patch.opacity.unwrap_or(current.opacity).clamp(0.0, 1.0),
            size: patch.size.unwrap_or(current.size),
            position: patch.position.unwrap_or(current.position),
            lock_aspect: patch.lock_aspect.unwrap_or(current.lock_aspect),
            ..current.clone()
        };
        self.layers.insert(id, LayerData::Overlay(updated));
        Ok(())
    }

    pub fn set_position(&mut self, id: LayerId, position: Pos2) -> Result<()> {
        let current = self.layers.get(&id).ok_or(EditorError::UnknownLayer(id))?;
        let updated = current.with_position(position);
        self.layers.insert(id, updated);
        Ok(())
    }

    pub fn remove(&mut self, id: LayerId) -> Result<LayerData> {
        let removed = self.layers.remove(&id).ok_or(EditorError::UnknownLayer(id))?;
        log::debug!("Deleted {}", id);
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// All layers in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &LayerData)> + '_ {
        self.layers.iter().map(|(id, data)| (*id, data))
    }

    pub fn texts(&self) -> impl Iterator<Item = (LayerId, &TextLayer)> + '_ {
        self.iter().filter_map(|(id, data)| match data {
            LayerData::Text(t) => Some((id, t)),
            LayerData::Overlay(_) => None,
        })
    }

    pub fn overlays(&self) -> impl Iterator<Item = (LayerId, &OverlayLayer)> + '_ {
        self.iter().filter_map(|(id, data)| match data {
            LayerData::Overlay(o) => Some((id, o)),
            LayerData::Text(_) => None,
        })
    }

    /// Topmost layer whose box contains `pos`.
    pub fn hit_test(&self, pos: Pos2) -> Option<Selection> {
        self.layers
            .iter()
            .rev()
            .find(|(_, data)| data.rect().contains(pos))
            .map(|(id, data)| Selection {
                id: *id,
                kind: data.kind(),
            })
    }
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.trim().strip_prefix('#')?;
    let nibble = |i: usize| u8::from_str_radix(digits.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    match digits.len() {
        3 => Some(Rgba([nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}
