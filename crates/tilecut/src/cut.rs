//! Tile-boundary cut synthesis.
//!
//! Once segments are grouped by owning tile, the polygon's boundary
//! inside a tile is incomplete: wherever the polygon passes straight
//! through the tile without an edge crossing the boundary, the tile-local
//! view needs a synthetic "cut" segment following the boundary itself, so
//! the tile-local geometry stays a closed polygon.
//!
//! Points on the tile boundary are parameterized by arc length
//! (counter-clockwise, starting at the origin corner) so that "is this
//! arc inside the polygon" reduces to a sort and a linear sweep.

use crate::ar_assert;
use crate::ar_post;
use crate::ar_pre;
use crate::cast::exact_cast_i64_to_u16;
use crate::geom::{Segment2u16, Vec2u16};
use crate::orient::point_order;

/// Distance along the perimeter (counter-clockwise) of a tile of the
/// given size from the zero corner to `point`, or `None` if `point` is
/// not on the boundary.
fn perimeter_param(tile_size: u16, point: Vec2u16) -> Option<u32> {
    let tile_size = u32::from(tile_size);
    let (x, y) = (u32::from(point.x), u32::from(point.y));
    if y == 0 {
        return Some(x);
    }
    if x == tile_size {
        return Some(tile_size + y);
    }
    if y == tile_size {
        return Some(tile_size * 2 + (tile_size - x));
    }
    if x == 0 {
        return Some(tile_size * 3 + (tile_size - y));
    }
    None
}

/// Inverse of [`perimeter_param`]: the boundary point at the given
/// distance along the perimeter. `parameter` may exceed one full
/// perimeter (`tile_size * 4`); it wraps.
fn perimeter_point(tile_size: u16, parameter: u32) -> Vec2u16 {
    let tile_size_u32 = u32::from(tile_size);
    let side_parameter = exact_cast_i64_to_u16(i64::from(parameter % tile_size_u32));
    match parameter / tile_size_u32 % 4 {
        0 => Vec2u16::new(side_parameter, 0),
        1 => Vec2u16::new(tile_size, side_parameter),
        2 => Vec2u16::new(tile_size - side_parameter, tile_size),
        3 => Vec2u16::new(0, tile_size - side_parameter),
        _ => unreachable!("parameter / tile_size % 4 is in 0..4"),
    }
}

/// Appends boundary segments from the point at `from_parameter` to the
/// point at `to_parameter`, following the perimeter counter-clockwise
/// through every tile corner in between.
fn add_cut(tile_size: u16, result: &mut Vec<Segment2u16>, from_parameter: u32, to_parameter: u32) {
    ar_pre!(from_parameter < to_parameter);

    let tile_size_u32 = u32::from(tile_size);
    let mut prev = perimeter_point(tile_size, from_parameter);
    let mut corner_parameter = (from_parameter / tile_size_u32 + 1) * tile_size_u32;
    while corner_parameter < to_parameter {
        let corner = perimeter_point(tile_size, corner_parameter);
        ar_post!(prev != corner);
        result.push(Segment2u16::new(prev, corner));
        ar_post!(
            (prev.x == corner.x && (prev.x == 0 || prev.x == tile_size))
                || (prev.y == corner.y && (prev.y == 0 || prev.y == tile_size))
        );
        prev = corner;
        corner_parameter += tile_size_u32;
    }
    let end = perimeter_point(tile_size, to_parameter);
    result.push(Segment2u16::new(prev, end));
    ar_post!(prev != end);
    ar_post!(
        (prev.x == end.x && (prev.x == 0 || prev.x == tile_size))
            || (prev.y == end.y && (prev.y == 0 || prev.y == tile_size))
    );
}

/// Whether the outermost contour among `segments` (none of which touch a
/// tile boundary) is oriented as a hole, i.e. the whole tile is covered
/// by the polygon.
fn outermost_contour_is_inner(segments: &[Segment2u16]) -> bool {
    ar_pre!(!segments.is_empty());

    let canonical = |segment: &Segment2u16| -> Segment2u16 {
        if segment.a < segment.b {
            Segment2u16::new(segment.a, segment.b)
        } else {
            Segment2u16::new(segment.b, segment.a)
        }
    };

    // `min_by` here stands in for the original's `min_element` over a
    // comparator that orders by *descending* canonical `b`: the winner
    // is the segment whose canonical upper endpoint is the largest.
    let min_segment = segments
        .iter()
        .min_by(|lhs, rhs| {
            let (lhs_c, rhs_c) = (canonical(lhs), canonical(rhs));
            if lhs_c.b == rhs_c.b {
                if point_order(lhs_c.b, lhs_c.a, rhs_c.a).is_cw() {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                }
            } else {
                rhs_c.b.cmp(&lhs_c.b)
            }
        })
        .expect("non-empty checked above");

    min_segment.a > min_segment.b
}

/// A segment endpoint lying on the tile boundary, paired with the
/// direction the segment leaves it in.
struct TouchingSegment {
    parameter: u32,
    touching_point: Vec2u16,
    opposite_point: Vec2u16,
    /// The segment's *second* point is the one on the boundary: the
    /// segment is "outgoing" from the touching point in reverse, i.e.
    /// walking the contour arrives at the boundary here.
    outgoing: bool,
}

/// Verifies the orientation precondition for segments that lie entirely
/// on the tile boundary (both endpoints on the same edge).
fn check_orientation_if_on_boundary(tile_size: u16, touching_segment: &TouchingSegment) -> bool {
    let (mut a, mut b) = (touching_segment.touching_point, touching_segment.opposite_point);
    ar_pre!(a != b);
    if touching_segment.outgoing {
        std::mem::swap(&mut a, &mut b);
    }
    if a.x == 0 && b.x == 0 && a.y < b.y {
        return false;
    }
    if a.x == tile_size && b.x == tile_size && a.y > b.y {
        return false;
    }
    if a.y == 0 && b.y == 0 && a.x > b.x {
        return false;
    }
    if a.y == tile_size && b.y == tile_size && a.x < b.x {
        return false;
    }
    true
}

/// Synthesizes the boundary cut segments for a single tile's worth of
/// polygon segments, appending them to `result`.
///
/// # Preconditions
/// `segments` is a set of non-self-intersecting oriented segments (a
/// closed, possibly multi-contour, polygon boundary) local to one tile.
pub fn find_cuts(tile_size: u16, segments: &[Segment2u16], result: &mut Vec<Segment2u16>) {
    if segments.is_empty() {
        return;
    }

    let mut touching_segments = Vec::with_capacity(segments.len() * 2);
    for segment in segments {
        if let Some(parameter) = perimeter_param(tile_size, segment.a) {
            touching_segments.push(TouchingSegment {
                parameter,
                touching_point: segment.a,
                opposite_point: segment.b,
                outgoing: false,
            });
        }
        if let Some(parameter) = perimeter_param(tile_size, segment.b) {
            touching_segments.push(TouchingSegment {
                parameter,
                touching_point: segment.b,
                opposite_point: segment.a,
                outgoing: true,
            });
        }
    }

    ar_assert!(touching_segments.len() % 2 == 0);

    if touching_segments.is_empty() {
        if outermost_contour_is_inner(segments) {
            add_cut(tile_size, result, 0, u32::from(tile_size) * 4);
        }
        return;
    }

    touching_segments.sort_by(|lhs, rhs| {
        if lhs.parameter != rhs.parameter {
            return lhs.parameter.cmp(&rhs.parameter);
        }
        ar_assert!(lhs.touching_point == rhs.touching_point);
        ar_assert!(lhs.opposite_point != rhs.opposite_point);
        let order = point_order(lhs.touching_point, lhs.opposite_point, rhs.opposite_point);
        if order.is_collinear() {
            let lhs_param = perimeter_param(tile_size, lhs.opposite_point);
            let rhs_param = perimeter_param(tile_size, rhs.opposite_point);
            ar_assert!(lhs_param.is_some() && rhs_param.is_some());
            if lhs_param == Some(0) {
                ar_assert!(rhs_param != Some(0));
                return if lhs.touching_point.y == 0 {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                };
            }
            if rhs_param == Some(0) {
                ar_assert!(lhs_param != Some(0));
                return if lhs.touching_point.y != 0 {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                };
            }
            return lhs_param.cmp(&rhs_param);
        }
        if order.is_cw() {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    let mut prev_point: Option<u32> = None;
    let mut process_bunch = |cw_segment: &TouchingSegment, repeated_first: bool| {
        ar_pre!(check_orientation_if_on_boundary(tile_size, cw_segment));

        let previous_boundary_part_is_cut = !cw_segment.outgoing;
        if previous_boundary_part_is_cut {
            if let Some(prev) = prev_point {
                let to = if repeated_first {
                    u32::from(tile_size) * 4 + cw_segment.parameter
                } else {
                    cw_segment.parameter
                };
                add_cut(tile_size, result, prev, to);
            } else {
                ar_assert!(!repeated_first);
            }
        }
        prev_point = Some(cw_segment.parameter);
    };

    let mut i = 0;
    while i < touching_segments.len() {
        process_bunch(&touching_segments[i], false);
        let current_parameter = touching_segments[i].parameter;
        i += 1;
        while i < touching_segments.len() && touching_segments[i].parameter == current_parameter {
            i += 1;
        }
    }
    process_bunch(&touching_segments[0], true);
}

/// Whether any of `cut_segments` lies along the tile's bottom edge
/// (`y == 0`).
pub fn open_on_the_bottom(cut_segments: &[Segment2u16]) -> bool {
    cut_segments.iter().any(|segment| segment.a.y == 0 && segment.b.y == 0)
}
