use crate::compose::{self, Scale};
use crate::error::{EditorError, Result};
use crate::filters::{FilterDescriptor, FilterKind, FilterState};
use crate::history::EditHistory;
use crate::image_store::ImageBuffer;
use crate::layers::{
    LayerData, LayerId, LayerKind, LayerStack, OverlayLayer, OverlayPatch, Selection, TextLayer,
    TextPatch,
};
use crate::project::{
    AspectRatio, EditRequest, ImageSynthesizer, Project, ProjectStore, VariationRequest,
};
use crate::text::FontFamily;
use crate::tools::transform::{clamp_move, clamp_resize, resize_locked, scale_font_size};
use crate::tools::{CropTool, HandleType, MaskTool, ToolState};
use egui::{pos2, vec2, Pos2, Rect, Vec2};
use image::Rgba;
use std::sync::Arc;

pub struct EditorSettings {
    /// Smallest crop box side, and smallest overlay width, in display px.
    pub min_box_size: f32,
    pub crop_initial_fraction: f32,
    /// Pointer distance that still grabs a resize handle.
    pub handle_size: f32,
    pub text_resize_sensitivity: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub default_text: String,
    pub default_text_color: Rgba<u8>,
    pub default_font_size: f32,
    pub default_font: FontFamily,
    pub default_layer_position: Pos2,
    /// New overlays start this fraction of the display width wide.
    pub overlay_width_fraction: f32,
    pub min_brush_width: f32,
    pub max_brush_width: f32,
    pub default_brush_width: f32,
    pub variation_count: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            min_box_size: 20.0,
            crop_initial_fraction: 0.6,
            handle_size: 8.0,
            text_resize_sensitivity: 0.5,
            min_font_size: 8.0,
            max_font_size: 200.0,
            default_text: "Your Text Here".to_string(),
            default_text_color: Rgba([0x18, 0x18, 0x1b, 255]),
            default_font_size: 40.0,
            default_font: FontFamily::Arial,
            default_layer_position: pos2(50.0, 50.0),
            overlay_width_fraction: 0.3,
            min_brush_width: 10.0,
            max_brush_width: 100.0,
            default_brush_width: 40.0,
            variation_count: 3,
        }
    }
}

impl EditorSettings {
    pub fn default_text_layer(&self) -> TextLayer {
        TextLayer {
            content: self.default_text.clone(),
            color: self.default_text_color,
            font_size: self.default_font_size,
            font: self.default_font,
            position: self.default_layer_position,
        }
    }
}

/// What a pointer drag is acting on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragTarget {
    Crop,
    Layer(LayerId),
    MaskStroke,
}

/// One pointer-down to pointer-up interaction.
#[derive(Clone, Copy, Debug)]
pub struct DragSession {
    pub target: DragTarget,
    pub handle: HandleType,
    pub start_pointer: Pos2,
    /// Box of the dragged element when the drag began.
    pub start_rect: Rect,
    pub start_font_size: f32,
}

/// Editing session for one base image.
pub struct EditorSession {
    pub settings: EditorSettings,
    history: EditHistory,
    display_size: Vec2,
    filters: FilterState,
    layers: LayerStack,
    tool: ToolState,
    brush_width: f32,
    mask: Option<ImageBuffer>,
    drag: Option<DragSession>,
}

impl EditorSession {
    /// Opens `image`, initially displayed at its native size.
    pub fn new(image: ImageBuffer) -> Self {
        Self::with_settings(image, EditorSettings::default())
    }

    pub fn with_settings(image: ImageBuffer, settings: EditorSettings) -> Self {
        let display_size = vec2(image.width() as f32, image.height() as f32);
        log::info!("Session: opened {}x{} {}", image.width(), image.height(), image.mime());
        Self {
            brush_width: settings.default_brush_width,
            settings,
            history: EditHistory::new(image),
            display_size,
            filters: FilterState::default(),
            layers: LayerStack::new(),
            tool: ToolState::None,
            mask: None,
            drag: None,
        }
    }

    /// Switches to a different base image. History, layers, filters and the
    /// saved mask all start over; reopening the current image changes nothing.
    pub fn load_base(&mut self, image: ImageBuffer) {
        if self.history.current().same_content(&image) {
            return;
        }
        self.display_size = vec2(image.width() as f32, image.height() as f32);
        self.history.reset(image);
        self.filters.reset();
        self.layers.clear();
        self.mask = None;
        self.set_tool(ToolState::None);
        log::info!("Session: new base image");
    }

    pub fn current(&self) -> &ImageBuffer {
        self.history.current()
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.history.current().dimensions()
    }

    pub fn display_size(&self) -> Vec2 {
        self.display_size
    }

    /// The host laid the image out at a new on-screen size.
    pub fn set_display_size(&mut self, size: Vec2) -> Result<()> {
        Scale::between(self.native_size(), size)?;
        self.display_size = size;
        match &mut self.tool {
            ToolState::Cropping(crop) => crop.rescale(size),
            ToolState::Masking(mask) => {
                mask.resize(size.x.round() as u32, size.y.round() as u32)
            }
            _ => {}
        }
        Ok(())
    }

    pub fn scale(&self) -> Result<Scale> {
        Scale::between(self.native_size(), self.display_size)
    }

    // Filters

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_filter(&mut self, kind: FilterKind, value: f32) {
        self.filters.set(kind, value);
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }

    /// Descriptor the host applies to the displayed image.
    pub fn preview(&self) -> FilterDescriptor {
        self.filters.preview()
    }

    // Tool state

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn selection(&self) -> Option<Selection> {
        self.tool.selection()
    }

    fn set_tool(&mut self, next: ToolState) {
        if self.drag.take().is_some() {
            log::debug!("Tool: drag ended by tool change");
        }
        let previous = std::mem::replace(&mut self.tool, next);
        if let ToolState::Masking(mask) = &previous {
            if mask.has_strokes() {
                log::debug!("Tool: unsaved mask strokes discarded");
            }
        }
        log::debug!("Tool: {} -> {}", previous.name(), self.tool.name());
    }

    // Crop

    pub fn begin_crop(&mut self) {
        let crop = CropTool::begin(
            self.display_size,
            self.settings.crop_initial_fraction,
            self.settings.min_box_size,
        );
        self.set_tool(ToolState::Cropping(crop));
    }

    pub fn cancel_crop(&mut self) {
        if matches!(self.tool, ToolState::Cropping(_)) {
            self.set_tool(ToolState::None);
        }
    }

    /// Cuts the image to the crop box. Filters are baked in with it; layers
    /// stay live. A box that maps to no pixels just leaves crop mode.
    pub fn apply_crop(&mut self) -> Result<()> {
        let Some(crop) = self.tool.crop().copied() else {
            log::warn!("Crop: apply without an active crop");
            return Ok(());
        };
        let scale = self.scale()?;
        let Some(region) = crop.native_region(scale.to_vec2(), self.native_size()) else {
            log::warn!("Crop: degenerate region, nothing applied");
            self.set_tool(ToolState::None);
            return Ok(());
        };
        let baked = compose::bake(
            self.history.current(),
            &self.filters,
            &LayerStack::new(),
            Some(region),
            scale,
        )?;
        log::info!("Crop: applied {:?}", region);
        self.history.push(baked);
        self.filters.reset();
        self.display_size = crop.rect().size();
        self.set_tool(ToolState::None);
        Ok(())
    }

    // Mask

    pub fn begin_mask(&mut self) -> Result<()> {
        let (w, h) = (
            self.display_size.x.round() as u32,
            self.display_size.y.round() as u32,
        );
        if w == 0 || h == 0 {
            return Err(EditorError::GeometryInvalid {
                width: self.display_size.x,
                height: self.display_size.y,
            });
        }
        self.set_tool(ToolState::Masking(MaskTool::new(w, h, self.brush_width)));
        Ok(())
    }

    pub fn brush_width(&self) -> f32 {
        self.brush_width
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush_width = width.clamp(
            self.settings.min_brush_width,
            self.settings.max_brush_width,
        );
        if let ToolState::Masking(mask) = &mut self.tool {
            mask.set_brush_width(self.brush_width);
        }
    }

    /// Erases unsaved strokes; a previously saved mask is kept.
    pub fn clear_mask_strokes(&mut self) {
        if let ToolState::Masking(mask) = &mut self.tool {
            mask.clear();
        }
    }

    /// Rasterizes the strokes at native size and leaves mask mode.
    pub fn save_mask(&mut self) -> Result<()> {
        let Some(mask) = self.tool.mask() else {
            log::warn!("Mask: save without an active mask");
            return Ok(());
        };
        let (w, h) = self.native_size();
        let saved = mask.save(w, h)?;
        self.mask = Some(saved);
        self.set_tool(ToolState::None);
        Ok(())
    }

    pub fn mask(&self) -> Option<&ImageBuffer> {
        self.mask.as_ref()
    }

    /// Drops the saved mask: edits apply everywhere again.
    pub fn discard_mask(&mut self) {
        self.mask = None;
    }

    // Layers

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn select(&mut self, id: LayerId) -> Result<()> {
        let kind = self.layers.kind_of(id).ok_or(EditorError::UnknownLayer(id))?;
        self.set_tool(ToolState::LayerSelected(Selection { id, kind }));
        Ok(())
    }

    pub fn deselect(&mut self) {
        if matches!(self.tool, ToolState::LayerSelected(_)) {
            self.set_tool(ToolState::None);
        }
    }

    /// Selects the topmost layer under `pos`, or deselects.
    pub fn select_at(&mut self, pos: Pos2) -> Option<Selection> {
        match self.layers.hit_test(pos) {
            Some(hit) => {
                self.set_tool(ToolState::LayerSelected(hit));
                Some(hit)
            }
            None => {
                self.deselect();
                None
            }
        }
    }

    /// Adds the default text layer and selects it.
    pub fn add_text(&mut self) -> LayerId {
        self.add_text_layer(self.settings.default_text_layer())
    }

    pub fn add_text_layer(&mut self, mut layer: TextLayer) -> LayerId {
        layer.font_size = layer
            .font_size
            .clamp(self.settings.min_font_size, self.settings.max_font_size);
        let id = self.layers.add_text(layer);
        self.set_tool(ToolState::LayerSelected(Selection {
            id,
            kind: LayerKind::Text,
        }));
        id
    }

    /// Adds `source` as an overlay sized to a fraction of the display width,
    /// keeping its aspect ratio, and selects it.
    pub fn add_overlay(&mut self, source: &ImageBuffer) -> Result<LayerId> {
        let pixels = source.to_rgba()?;
        let (w, h) = pixels.dimensions();
        if w == 0 || h == 0 {
            return Err(EditorError::GeometryInvalid {
                width: w as f32,
                height: h as f32,
            });
        }
        let aspect_ratio = w as f32 / h as f32;
        let width = self.display_size.x * self.settings.overlay_width_fraction;
        let id = self.layers.add_overlay(OverlayLayer {
            source: Arc::new(pixels),
            opacity: 1.0,
            size: vec2(width, width / aspect_ratio),
            position: self.settings.default_layer_position,
            aspect_ratio,
            lock_aspect: true,
        });
        self.set_tool(ToolState::LayerSelected(Selection {
            id,
            kind: LayerKind::Overlay,
        }));
        Ok(id)
    }

    pub fn update_text(&mut self, id: LayerId, mut patch: TextPatch) -> Result<()> {
        patch.font_size = patch
            .font_size
            .map(|s| s.clamp(self.settings.min_font_size, self.settings.max_font_size));
        self.layers.update_text(id, patch)
    }

    /// Sizes are kept within the display area and no smaller than the
    /// minimum box side, honoring the aspect lock. Non-finite values are
    /// rejected.
    pub fn update_overlay(&mut self, id: LayerId, mut patch: OverlayPatch) -> Result<()> {
        let current = self.layers.overlay(id).ok_or(EditorError::UnknownLayer(id))?;
        let finite_size = patch.size.map_or(true, |s| s.x.is_finite() && s.y.is_finite());
        let finite_pos = patch.position.map_or(true, |p| p.x.is_finite() && p.y.is_finite());
        if !finite_size || !finite_pos || patch.opacity.is_some_and(|o| !o.is_finite()) {
            let size = patch.size.unwrap_or(current.size);
            return Err(EditorError::GeometryInvalid {
                width: size.x,
                height: size.y,
            });
        }
        if let Some(size) = patch.size {
            let lock = patch.lock_aspect.unwrap_or(current.lock_aspect);
            patch.size = Some(self.clamp_overlay_size(size, current.aspect_ratio, lock));
        }
        self.layers.update_overlay(id, patch)
    }

    fn clamp_overlay_size(&self, size: Vec2, aspect_ratio: f32, lock_aspect: bool) -> Vec2 {
        let bounds = self.display_size;
        let min = self.settings.min_box_size;
        if lock_aspect && aspect_ratio > 0.0 {
            let max_w = bounds.x.min(bounds.y * aspect_ratio);
            let width = size.x.min(max_w).max(min.min(max_w));
            vec2(width, width / aspect_ratio)
        } else {
            vec2(
                size.x.min(bounds.x).max(min.min(bounds.x)),
                size.y.min(bounds.y).max(min.min(bounds.y)),
            )
        }
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<()> {
        self.layers.remove(id)?;
        if self.selection().map(|s| s.id) == Some(id) {
            self.set_tool(ToolState::None);
        }
        Ok(())
    }

    /// Deletes the selected layer, if any. Returns whether one was deleted.
    pub fn delete_selected(&mut self) -> Result<bool> {
        match self.selection() {
            Some(selection) => {
                self.delete_layer(selection.id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Pointer drags

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// What a pointer press at `pointer` would grab: a crop handle while
    /// cropping, or a handle of the selected layer.
    pub fn handle_at(&self, pointer: Pos2) -> Option<(DragTarget, HandleType)> {
        let size = self.settings.handle_size;
        match &self.tool {
            ToolState::Cropping(crop) => {
                HandleType::hit_test(crop.rect(), pointer, size).map(|h| (DragTarget::Crop, h))
            }
            ToolState::Masking(_) => Some((DragTarget::MaskStroke, HandleType::Move)),
            ToolState::LayerSelected(selection) => {
                let rect = self.layers.get(selection.id)?.rect();
                HandleType::hit_test(rect, pointer, size)
                    .map(|h| (DragTarget::Layer(selection.id), h))
            }
            ToolState::None => None,
        }
    }

    /// Starts a drag. Returns `false` when another drag is still running or
    /// the target does not match the active tool.
    pub fn begin_drag(
        &mut self,
        target: DragTarget,
        handle: HandleType,
        pointer: Pos2,
    ) -> Result<bool> {
        if self.drag.is_some() {
            log::debug!("Drag: already active, ignoring {:?}", target);
            return Ok(false);
        }
        let (start_rect, start_font_size) = match target {
            DragTarget::Crop => match self.tool.crop() {
                Some(crop) => (crop.rect(), 0.0),
                None => return Ok(false),
            },
            DragTarget::MaskStroke => match &mut self.tool {
                ToolState::Masking(mask) => {
                    mask.begin_stroke(pointer);
                    (Rect::NOTHING, 0.0)
                }
                _ => return Ok(false),
            },
            DragTarget::Layer(id) => {
                let data = self.layers.get(id).ok_or(EditorError::UnknownLayer(id))?;
                let rect = data.rect();
                let font_size = match data {
                    LayerData::Text(t) => t.font_size,
                    LayerData::Overlay(_) => 0.0,
                };
                if self.selection().map(|s| s.id) != Some(id) {
                    self.select(id)?;
                }
                (rect, font_size)
            }
        };
        self.drag = Some(DragSession {
            target,
            handle,
            start_pointer: pointer,
            start_rect,
            start_font_size,
        });
        Ok(true)
    }

    /// Pointer moved during a drag.
    pub fn drag_to(&mut self, pointer: Pos2) -> Result<()> {
        let Some(drag) = self.drag else {
            return Ok(());
        };
        let delta = pointer - drag.start_pointer;
        match drag.target {
            DragTarget::Crop => {
                if let ToolState::Cropping(crop) = &mut self.tool {
                    crop.drag(drag.start_rect, drag.handle, delta);
                }
            }
            DragTarget::MaskStroke => {
                if let ToolState::Masking(mask) = &mut self.tool {
                    mask.extend_stroke(pointer);
                }
            }
            DragTarget::Layer(id) => self.drag_layer(id, &drag, delta)?,
        }
        Ok(())
    }

    fn drag_layer(&mut self, id: LayerId, drag: &DragSession, delta: Vec2) -> Result<()> {
        let bounds = self.display_size;
        let data = self.layers.get(id).ok_or(EditorError::UnknownLayer(id))?;
        if drag.handle == HandleType::Move {
            let size = data.rect().size();
            let position = clamp_move(drag.start_rect.min, size, delta, bounds);
            return self.layers.set_position(id, position);
        }
        match data {
            LayerData::Text(_) => {
                let font_size = scale_font_size(
                    drag.start_font_size,
                    delta.x,
                    self.settings.text_resize_sensitivity,
                    self.settings.min_font_size,
                    self.settings.max_font_size,
                );
                self.layers.update_text(
                    id,
                    TextPatch {
                        font_size: Some(font_size),
                        ..Default::default()
                    },
                )
            }
            LayerData::Overlay(overlay) => {
                let patch = if overlay.lock_aspect {
                    OverlayPatch {
                        size: Some(resize_locked(
                            drag.start_rect.size(),
                            overlay.position,
                            delta.x,
                            overlay.aspect_ratio,
                            bounds,
                            self.settings.min_box_size,
                        )),
                        ..Default::default()
                    }
                } else {
                    let rect = clamp_resize(
                        drag.start_rect,
                        drag.handle,
                        delta,
                        bounds,
                        self.settings.min_box_size,
                    );
                    OverlayPatch {
                        size: Some(rect.size()),
                        position: Some(rect.min),
                        ..Default::default()
                    }
                };
                self.layers.update_overlay(id, patch)
            }
        }
    }

    /// Pointer released: whatever the drag produced stays.
    pub fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            if drag.target == DragTarget::MaskStroke {
                if let ToolState::Masking(mask) = &mut self.tool {
                    mask.end_stroke();
                }
            }
        }
    }

    // Commits

    fn commit(&mut self, image: ImageBuffer) {
        self.history.push(image);
    }

    /// Bakes the current filters into a new history entry.
    pub fn apply_adjustments(&mut self) -> Result<()> {
        if self.filters.is_identity() {
            return Ok(());
        }
        let baked = compose::bake(
            self.history.current(),
            &self.filters,
            &LayerStack::new(),
            None,
            self.scale()?,
        )?;
        log::info!("Adjustments applied: {}", self.filters.preview());
        self.commit(baked);
        self.filters.reset();
        Ok(())
    }

    /// Bakes filters and every layer into a new history entry; layers and
    /// filters are cleared afterwards.
    pub fn flatten_layers(&mut self) -> Result<()> {
        let baked = compose::bake(
            self.history.current(),
            &self.filters,
            &self.layers,
            None,
            self.scale()?,
        )?;
        log::info!("Flattened {} layer(s)", self.layers.len());
        self.commit(baked);
        self.filters.reset();
        self.layers.clear();
        if matches!(self.tool, ToolState::LayerSelected(_)) {
            self.set_tool(ToolState::None);
        }
        Ok(())
    }

    /// Final render of what is on screen. History is left alone.
    pub fn export(&self) -> Result<ImageBuffer> {
        compose::bake(
            self.history.current(),
            &self.filters,
            &self.layers,
            None,
            self.scale()?,
        )
    }

    /// Records an image returned by the edit collaborator. The saved mask
    /// has been used up.
    pub fn apply_edit_result(&mut self, image: ImageBuffer) {
        let before = self.native_size();
        self.commit(image);
        self.follow_native_size(before);
        self.mask = None;
    }

    /// Makes `image` the current image unless it already is.
    pub fn select_variation(&mut self, image: ImageBuffer) {
        if self.history.current().same_content(&image) {
            return;
        }
        let before = self.native_size();
        self.commit(image);
        self.follow_native_size(before);
    }

    pub fn undo(&mut self) -> &ImageBuffer {
        let before = self.native_size();
        self.history.undo();
        self.follow_native_size(before);
        self.history.current()
    }

    pub fn redo(&mut self) -> &ImageBuffer {
        let before = self.native_size();
        self.history.redo();
        self.follow_native_size(before);
        self.history.current()
    }

    /// The current image changed from native size `before`. The display keeps
    /// its width and takes the new aspect ratio; a saved mask or an open crop
    /// or mask tool sized for the old image is dropped.
    fn follow_native_size(&mut self, before: (u32, u32)) {
        let (w, h) = self.native_size();
        if (w, h) == before {
            return;
        }
        let width = if self.display_size.x > 0.0 {
            self.display_size.x
        } else {
            w as f32
        };
        self.display_size = vec2(width, width * h as f32 / w.max(1) as f32);
        log::debug!(
            "Session: native {:?} -> {:?}, display {:?}",
            before,
            (w, h),
            self.display_size
        );
        if self.mask.as_ref().is_some_and(|m| m.dimensions() != (w, h)) {
            log::debug!("Session: saved mask no longer matches, dropped");
            self.mask = None;
        }
        if matches!(self.tool, ToolState::Cropping(_) | ToolState::Masking(_)) {
            self.set_tool(ToolState::None);
        }
    }

    // Collaborators

    pub fn edit_request(
        &self,
        instructions: &str,
        style_reference: Option<ImageBuffer>,
    ) -> EditRequest {
        EditRequest {
            image: self.history.current().clone(),
            instructions: instructions.to_string(),
            style_reference,
            mask: self.mask.clone(),
        }
    }

    pub fn variation_request(
        &self,
        instructions: &str,
        aspect: Option<AspectRatio>,
    ) -> Result<VariationRequest> {
        Ok(VariationRequest {
            image: self.history.current().clone(),
            instructions: instructions.to_string(),
            count: self.settings.variation_count,
            aspect_guide: aspect.map(AspectRatio::aspect_guide).transpose()?,
        })
    }

    /// Runs an edit through `synth` and commits the result.
    pub fn request_edit(
        &mut self,
        synth: &mut dyn ImageSynthesizer,
        instructions: &str,
        style_reference: Option<ImageBuffer>,
    ) -> Result<()> {
        let request = self.edit_request(instructions, style_reference);
        let image = synth.edit(&request)?;
        log::info!("Edit applied: {}", instructions);
        self.apply_edit_result(image);
        Ok(())
    }

    /// Writes the current image into `project` and persists it.
    pub fn save_to(&self, project: &mut Project, store: &mut dyn ProjectStore) -> Result<()> {
        project.replace_main_image(self.history.current().clone());
        store.put(project)
    }
}
