//! Display-space box geometry shared by the crop box and the layers:
//! handle-based resize, clamped moves, aspect-locked resize and the
//! text font-size scrub.

use egui::{pos2, vec2, Pos2, Rect, Vec2};

/// Which part of a box the pointer grabbed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleType {
    Move,
    North,
    South,
    East,
    West,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl HandleType {
    pub const RESIZE_HANDLES: [HandleType; 8] = [
        HandleType::NorthWest,
        HandleType::NorthEast,
        HandleType::SouthWest,
        HandleType::SouthEast,
        HandleType::North,
        HandleType::South,
        HandleType::West,
        HandleType::East,
    ];

    fn moves_left(self) -> bool {
        matches!(
            self,
            HandleType::West | HandleType::NorthWest | HandleType::SouthWest
        )
    }

    fn moves_right(self) -> bool {
        matches!(
            self,
            HandleType::East | HandleType::NorthEast | HandleType::SouthEast
        )
    }

    fn moves_top(self) -> bool {
        matches!(
            self,
            HandleType::North | HandleType::NorthWest | HandleType::NorthEast
        )
    }

    fn moves_bottom(self) -> bool {
        matches!(
            self,
            HandleType::South | HandleType::SouthWest | HandleType::SouthEast
        )
    }

    /// Anchor point of this handle on `rect`, used for hit-testing.
    pub fn anchor(self, rect: Rect) -> Pos2 {
        match self {
            HandleType::Move => rect.center(),
            HandleType::North => rect.center_top(),
            HandleType::South => rect.center_bottom(),
            HandleType::East => rect.right_center(),
            HandleType::West => rect.left_center(),
            HandleType::NorthWest => rect.left_top(),
            HandleType::NorthEast => rect.right_top(),
            HandleType::SouthWest => rect.left_bottom(),
            HandleType::SouthEast => rect.right_bottom(),
        }
    }

    /// Picks the handle under `pointer`, preferring corners and edges over a
    /// plain move when the pointer is inside the box.
    pub fn hit_test(rect: Rect, pointer: Pos2, handle_size: f32) -> Option<HandleType> {
        HandleType::RESIZE_HANDLES
            .into_iter()
            .find(|h| pointer.distance(h.anchor(rect)) < handle_size)
            .or_else(|| rect.contains(pointer).then_some(HandleType::Move))
    }
}

/// `value` limited to `[lo, hi]`; when the range is empty `lo` wins.
fn clamp_span(value: f32, lo: f32, hi: f32) -> f32 {
    value.min(hi).max(lo)
}

/// Forces `rect` fully inside `[0, 0, bounds]` with each side at least
/// `min_size`. A container smaller than `min_size` caps the minimum.
pub fn fit_inside(rect: Rect, bounds: Vec2, min_size: f32) -> Rect {
    let bw = bounds.x.max(0.0);
    let bh = bounds.y.max(0.0);
    let w = clamp_span(rect.width(), min_size.min(bw), bw);
    let h = clamp_span(rect.height(), min_size.min(bh), bh);
    let x = clamp_span(rect.min.x, 0.0, bw - w);
    let y = clamp_span(rect.min.y, 0.0, bh - h);
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

/// Applies a drag `delta` to `start` through `handle`.
///
/// A move translates only. A resize moves the grabbed edges, never past the
/// container and never closer than `min_size` to the opposite edge.
pub fn clamp_resize(
    start: Rect,
    handle: HandleType,
    delta: Vec2,
    bounds: Vec2,
    min_size: f32,
) -> Rect {
    let start = fit_inside(start, bounds, min_size);
    if handle == HandleType::Move {
        return fit_inside(start.translate(delta), bounds, min_size);
    }

    let min_w = min_size.min(bounds.x);
    let min_h = min_size.min(bounds.y);
    let (mut left, mut right) = (start.min.x, start.max.x);
    let (mut top, mut bottom) = (start.min.y, start.max.y);

    if handle.moves_left() {
        left = clamp_span(left + delta.x, 0.0, right - min_w);
    }
    if handle.moves_right() {
        right = clamp_span(right + delta.x, left + min_w, bounds.x);
    }
    if handle.moves_top() {
        top = clamp_span(top + delta.y, 0.0, bottom - min_h);
    }
    if handle.moves_bottom() {
        bottom = clamp_span(bottom + delta.y, top + min_h, bounds.y);
    }

    fit_inside(
        Rect::from_min_max(pos2(left, top), pos2(right, bottom)),
        bounds,
        min_size,
    )
}

/// Translates a `size`d element from `start` by `delta`, keeping it inside
/// the container. Elements larger than the container pin to the origin.
pub fn clamp_move(start: Pos2, size: Vec2, delta: Vec2, bounds: Vec2) -> Pos2 {
    let target = start + delta;
    pos2(
        clamp_span(target.x, 0.0, bounds.x - size.x),
        clamp_span(target.y, 0.0, bounds.y - size.y),
    )
}

/// Horizontal-drag resize that keeps `width / height == aspect`.
///
/// The width grows with `dx`, is floored at `min_width` and capped so the
/// box at `position` still fits inside the container on both axes.
pub fn resize_locked(
    start: Vec2,
    position: Pos2,
    dx: f32,
    aspect: f32,
    bounds: Vec2,
    min_width: f32,
) -> Vec2 {
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let max_w = (bounds.x - position.x).min((bounds.y - position.y) * aspect);
    let width = clamp_span(start.x + dx, min_width, max_w.max(min_width));
    vec2(width, width / aspect)
}

/// Font-size scrub used by the text resize handle.
pub fn scale_font_size(start: f32, dx: f32, sensitivity: f32, min: f32, max: f32) -> f32 {
    clamp_span(start + dx * sensitivity, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Vec2 = vec2(100.0, 80.0);

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(x, y), vec2(w, h))
    }

    fn assert_inside(r: Rect, bounds: Vec2, min: f32) {
        assert!(r.min.x >= 0.0 && r.min.y >= 0.0, "{:?}", r);
        assert!(r.max.x <= bounds.x + 1e-3 && r.max.y <= bounds.y + 1e-3, "{:?}", r);
        assert!(r.width() >= min - 1e-3 && r.height() >= min - 1e-3, "{:?}", r);
    }

    #[test]
    fn move_translates_without_resizing() {
        let start = rect(10.0, 10.0, 30.0, 20.0);
        let r = clamp_resize(start, HandleType::Move, vec2(500.0, -50.0), BOUNDS, 20.0);
        assert_eq!(r, rect(70.0, 0.0, 30.0, 20.0));
    }

    #[test]
    fn west_handle_cannot_cross_min_size() {
        let start = rect(10.0, 10.0, 40.0, 40.0);
        let r = clamp_resize(start, HandleType::West, vec2(35.0, 0.0), BOUNDS, 20.0);
        assert_eq!(r.max.x, 50.0);
        assert_eq!(r.width(), 20.0);
    }

    #[test]
    fn south_east_handle_stops_at_container() {
        let start = rect(50.0, 50.0, 20.0, 20.0);
        let r = clamp_resize(start, HandleType::SouthEast, vec2(200.0, 200.0), BOUNDS, 20.0);
        assert_eq!(r, rect(50.0, 50.0, 50.0, 30.0));
    }

    #[test]
    fn north_west_handle_stops_at_origin() {
        let start = rect(10.0, 10.0, 30.0, 30.0);
        let r = clamp_resize(start, HandleType::NorthWest, vec2(-40.0, -40.0), BOUNDS, 20.0);
        assert_eq!(r, rect(0.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn every_handle_and_delta_stays_valid() {
        let starts = [
            rect(0.0, 0.0, 20.0, 20.0),
            rect(30.0, 20.0, 50.0, 40.0),
            rect(80.0, 60.0, 20.0, 20.0),
        ];
        let deltas = [-150.0, -25.0, -3.0, 0.0, 7.5, 42.0, 300.0];
        let mut handles = HandleType::RESIZE_HANDLES.to_vec();
        handles.push(HandleType::Move);
        for start in starts {
            for handle in &handles {
                for dx in deltas {
                    for dy in deltas {
                        let r = clamp_resize(start, *handle, vec2(dx, dy), BOUNDS, 20.0);
                        assert_inside(r, BOUNDS, 20.0);
                    }
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_start_is_pulled_back() {
        let r = fit_inside(rect(90.0, -5.0, 5.0, 200.0), BOUNDS, 20.0);
        assert_inside(r, BOUNDS, 20.0);
        assert_eq!(r.height(), 80.0);
    }

    #[test]
    fn tiny_container_caps_min_size() {
        let r = fit_inside(rect(0.0, 0.0, 50.0, 50.0), vec2(10.0, 12.0), 20.0);
        assert_eq!(r, rect(0.0, 0.0, 10.0, 12.0));
    }

    #[test]
    fn clamp_move_keeps_element_inside() {
        let p = clamp_move(pos2(10.0, 10.0), vec2(30.0, 10.0), vec2(100.0, -30.0), BOUNDS);
        assert_eq!(p, pos2(70.0, 0.0));
        let pinned = clamp_move(pos2(0.0, 0.0), vec2(300.0, 10.0), vec2(5.0, 0.0), BOUNDS);
        assert_eq!(pinned.x, 0.0);
    }

    #[test]
    fn locked_resize_preserves_ratio_and_bounds() {
        let s = resize_locked(vec2(40.0, 20.0), pos2(10.0, 10.0), 15.0, 2.0, BOUNDS, 20.0);
        assert_eq!(s, vec2(55.0, 27.5));
        let capped = resize_locked(vec2(40.0, 20.0), pos2(10.0, 10.0), 500.0, 2.0, BOUNDS, 20.0);
        assert_eq!(capped, vec2(90.0, 45.0));
        let floored = resize_locked(vec2(40.0, 20.0), pos2(10.0, 10.0), -500.0, 2.0, BOUNDS, 20.0);
        assert_eq!(floored, vec2(20.0, 10.0));
    }

    #[test]
    fn font_scrub_is_half_speed_and_clamped() {
        assert_eq!(scale_font_size(40.0, 20.0, 0.5, 8.0, 200.0), 50.0);
        assert_eq!(scale_font_size(40.0, -500.0, 0.5, 8.0, 200.0), 8.0);
        assert_eq!(scale_font_size(40.0, 1000.0, 0.5, 8.0, 200.0), 200.0);
    }

    #[test]
    fn hit_test_prefers_corners() {
        let r = rect(10.0, 10.0, 50.0, 50.0);
        assert_eq!(HandleType::hit_test(r, pos2(11.0, 11.0), 6.0), Some(HandleType::NorthWest));
        assert_eq!(HandleType::hit_test(r, pos2(30.0, 40.0), 6.0), Some(HandleType::Move));
        assert_eq!(HandleType::hit_test(r, pos2(90.0, 90.0), 6.0), None);
    }
}
