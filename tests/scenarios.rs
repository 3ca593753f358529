use egui::{pos2, vec2};
use image::{Rgba, RgbaImage};
use mockup_studio::layers::LayerStack;
use mockup_studio::project::{
    EditRequest, ImageSynthesizer, MemoryProjectStore, VariationRequest,
};
use mockup_studio::text::glyph_bounds;
use mockup_studio::variations::{merge, MAX_VARIATIONS};
use mockup_studio::{
    compose, DragTarget, EditHistory, EditorError, EditorSession, FilterKind, FilterState,
    FontFamily, HandleType, ImageBuffer, ImageStore, Project, ProjectStore, Scale, TextLayer,
};

fn gradient(w: u32, h: u32) -> ImageBuffer {
    let pixels = RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 2) as u8, (y * 2) as u8, 77, 255]));
    ImageBuffer::from_rgba(&pixels).unwrap()
}

fn solid(shade: u8) -> ImageBuffer {
    ImageStore::filled(4, 4, Rgba([shade, shade, 0, 255])).encode().unwrap()
}

#[test]
fn crop_forty_square_at_ten_ten() {
    let base = gradient(100, 100);
    let mut session = EditorSession::new(base.clone());
    session.set_display_size(vec2(100.0, 100.0)).unwrap();
    session.begin_crop();

    let start = session.tool().crop().unwrap().rect();
    assert!(session.begin_drag(DragTarget::Crop, HandleType::Move, start.min).unwrap());
    session.drag_to(pos2(10.0, 10.0)).unwrap();
    session.end_drag();
    let moved = session.tool().crop().unwrap().rect();
    session.begin_drag(DragTarget::Crop, HandleType::SouthEast, moved.max).unwrap();
    session.drag_to(pos2(50.0, 50.0)).unwrap();
    session.end_drag();
    session.apply_crop().unwrap();

    let out = session.current().to_rgba().unwrap();
    let original = base.to_rgba().unwrap();
    assert_eq!(out.dimensions(), (40, 40));
    for (x, y, p) in out.enumerate_pixels() {
        assert_eq!(p, original.get_pixel(x + 10, y + 10), "pixel {},{}", x, y);
    }
}

#[test]
fn crop_on_a_scaled_display_maps_to_native() {
    let mut session = EditorSession::new(gradient(120, 60));
    session.set_display_size(vec2(60.0, 30.0)).unwrap();
    session.begin_crop();
    session.apply_crop().unwrap();
    assert_eq!(session.native_size(), (72, 36));
}

#[test]
fn text_only_touches_its_glyph_box() {
    let canvas = ImageStore::new(200, 200).encode().unwrap();
    let mut layers = LayerStack::new();
    layers.add_text(TextLayer {
        content: "Hello".into(),
        color: Rgba([0, 0, 0, 255]),
        font_size: 20.0,
        font: FontFamily::Arial,
        position: pos2(10.0, 10.0),
    });
    let out = compose::bake(&canvas, &FilterState::default(), &layers, None, Scale::IDENTITY)
        .unwrap()
        .to_rgba()
        .unwrap();

    let bounds = glyph_bounds("Hello", pos2(10.0, 10.0), 20.0, FontFamily::Arial)
        .unwrap()
        .expand(1.0);
    let mut changed = 0;
    for (x, y, p) in out.enumerate_pixels() {
        if *p != Rgba([255, 255, 255, 255]) {
            changed += 1;
            assert!(bounds.contains(pos2(x as f32, y as f32)), "stray pixel at {},{}", x, y);
        }
    }
    assert!(changed > 20);
}

#[test]
fn text_scales_with_the_display() {
    let mut session = EditorSession::new(ImageStore::new(400, 400).encode().unwrap());
    session.set_display_size(vec2(200.0, 200.0)).unwrap();
    let id = session.add_text();
    session
        .update_text(
            id,
            mockup_studio::TextPatch {
                content: Some("I".into()),
                position: Some(pos2(100.0, 100.0)),
                color: Some(Rgba([0, 0, 0, 255])),
                ..Default::default()
            },
        )
        .unwrap();
    let out = session.export().unwrap().to_rgba().unwrap();
    let dark_rows = (0..400)
        .filter(|y| (0..400).any(|x| out.get_pixel(x, *y)[0] < 128))
        .collect::<Vec<_>>();
    assert!(!dark_rows.is_empty());
    assert!(*dark_rows.first().unwrap() >= 199);
    // Font size 40 display px becomes 80 native px.
    assert!(dark_rows.len() > 40);
}

#[test]
fn variation_merge_prefers_incoming() {
    let (a, b, c) = (solid(1), solid(2), solid(3));
    let merged = merge(&[a.clone(), b.clone()], &[b.clone(), c.clone()], 10);
    assert_eq!(merged, vec![b, c, a]);
}

#[test]
fn variation_merge_is_bounded_and_unique() {
    for split in 0..15u8 {
        let existing: Vec<_> = (0..split).map(solid).collect();
        let incoming: Vec<_> = (split / 2..20).map(solid).collect();
        let merged = merge(&existing, &incoming, MAX_VARIATIONS);
        assert!(merged.len() <= MAX_VARIATIONS);
        for i in 0..merged.len() {
            for j in i + 1..merged.len() {
                assert_ne!(merged[i], merged[j]);
            }
        }
    }
}

#[test]
fn undo_then_push_drops_the_redo_branch() {
    let (i0, i1, i2, i3) = (solid(0), solid(1), solid(2), solid(3));
    let mut history = EditHistory::new(i0.clone());
    history.push(i1.clone());
    history.push(i2);
    assert_eq!(history.index(), 2);
    history.undo();
    assert_eq!(history.index(), 1);
    assert_eq!(history.current(), &i1);
    history.push(i3.clone());
    assert_eq!(history.entries(), &[i0, i1, i3]);
    assert_eq!(history.index(), 2);
}

#[test]
fn identity_bake_after_a_bake_changes_nothing() {
    let base = gradient(32, 32);
    let mut filters = FilterState::default();
    filters.set(FilterKind::Contrast, 130.0);
    filters.set(FilterKind::HueRotate, 45.0);
    let once = compose::bake(&base, &filters, &LayerStack::new(), None, Scale::IDENTITY).unwrap();
    let identity = FilterState::default();
    let twice = compose::bake(&once, &identity, &LayerStack::new(), None, Scale::IDENTITY).unwrap();
    assert_eq!(once.to_rgba().unwrap(), twice.to_rgba().unwrap());
}

#[test]
fn failed_decode_leaves_the_session_untouched() {
    let mut session = EditorSession::new(gradient(10, 10));
    let bogus = ImageBuffer::decode(vec![0u8; 8], mockup_studio::MimeType::Png);
    assert!(matches!(bogus, Err(EditorError::DecodeFailure(_))));
    session.set_filter(FilterKind::Sepia, 50.0);
    assert!(session.set_display_size(vec2(0.0, 10.0)).is_err());
    assert_eq!(session.display_size(), vec2(10.0, 10.0));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.filters().get(FilterKind::Sepia), 50.0);
}

/// Returns a fixed image for every request and remembers what it was sent.
struct Canned {
    result: ImageBuffer,
    last_mask: Option<ImageBuffer>,
}

impl ImageSynthesizer for Canned {
    fn edit(&mut self, request: &EditRequest) -> mockup_studio::Result<ImageBuffer> {
        self.last_mask = request.mask.clone();
        Ok(self.result.clone())
    }

    fn variations(
        &mut self,
        request: &VariationRequest,
    ) -> mockup_studio::Result<Vec<ImageBuffer>> {
        Ok((0..request.count as u8).map(|n| solid(100 + n)).collect())
    }
}

#[test]
fn edit_round_trip_through_collaborators() {
    let original = gradient(40, 40);
    let edited = ImageStore::filled(40, 40, Rgba([0, 0, 255, 255])).encode().unwrap();
    let mut synth = Canned {
        result: edited.clone(),
        last_mask: None,
    };
    let mut store = MemoryProjectStore::new();
    let mut project = Project::new("mug", "Mug", original.clone());

    let mut session = EditorSession::new(original.clone());
    session.begin_mask().unwrap();
    session.begin_drag(DragTarget::MaskStroke, HandleType::Move, pos2(20.0, 20.0)).unwrap();
    session.drag_to(pos2(30.0, 20.0)).unwrap();
    session.end_drag();
    session.save_mask().unwrap();

    session.request_edit(&mut synth, "make it blue", None).unwrap();
    project.record_edit("make it blue");
    assert!(synth.last_mask.is_some());
    assert!(session.mask().is_none());
    assert_eq!(session.current(), &edited);

    session.save_to(&mut project, &mut store).unwrap();
    let saved = store.get("mug").unwrap().unwrap();
    assert_eq!(saved.image, edited);
    assert_eq!(saved.variations.items(), &[original]);
    assert!(saved.prompt.ends_with("EDIT: make it blue"));

    let request = session
        .variation_request("more angles", Some(mockup_studio::AspectRatio::Square))
        .unwrap();
    assert_eq!(request.count, 3);
    let variations = mockup_studio::project::request_variations(&mut synth, &request).unwrap();
    project.add_variations(&variations);
    assert_eq!(project.variations.len(), 4);
}

#[test]
fn loading_another_base_resets_everything() {
    let mut session = EditorSession::new(gradient(20, 20));
    session.add_text();
    session.set_filter(FilterKind::Blur, 3.0);
    session.flatten_layers().unwrap();
    session.add_text();
    session.load_base(gradient(30, 10));
    assert_eq!(session.history().len(), 1);
    assert!(session.layers().is_empty());
    assert!(session.filters().is_identity());
    assert_eq!(session.native_size(), (30, 10));
}
