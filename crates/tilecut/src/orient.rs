//! Orientation classifiers and outer-contour orientation without area
//! summation.
//!
//! Polygon orientation is usually computed from the oriented (signed)
//! area, but that accumulates rounding error for floats and can overflow
//! for integers. Instead we find the lexicographically largest vertex of
//! the contour; every edge of the contour lies to its left or on the
//! line through it (it is, after all, the largest vertex), so the
//! half-plane to the right of the most-clockwise edge touching that
//! vertex is either entirely inside or entirely outside the polygon. The
//! contour is CCW iff that edge enters the vertex in its stored
//! direction.

use crate::ar_pre;
use crate::cast::exact_cast_u16_to_i64;
use crate::exact::predicates::{orientation_f32, orientation_f64, orientation_i16, orientation_i64};
use crate::geom::{Segment2, Vec2};

/// A coordinate type for which the exact sign of `orientation(a, b, c)` is
/// known. Implemented for the scalar types this crate threads through the
/// classifiers (`f64`/`f32` for input polylines, `i64` for cell
/// coordinates, `u16`/`i16` for tile-local output); widening `u16`/`i16`
/// to `i64` is exact and orientation over cell-range integers never
/// overflows `i64` (see [`orientation_i64`]).
pub trait OrientationScalar: Copy {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32;
}

impl OrientationScalar for f64 {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32 {
        let value = orientation_f64(a, b, c);
        if value > 0.0 {
            1
        } else if value < 0.0 {
            -1
        } else {
            0
        }
    }
}

impl OrientationScalar for f32 {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32 {
        let value = orientation_f32(a, b, c);
        if value > 0.0 {
            1
        } else if value < 0.0 {
            -1
        } else {
            0
        }
    }
}

impl OrientationScalar for i64 {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32 {
        orientation_i64(a, b, c).signum() as i32
    }
}

impl OrientationScalar for u16 {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32 {
        i64::orientation_sign(a.map(exact_cast_u16_to_i64), b.map(exact_cast_u16_to_i64), c.map(exact_cast_u16_to_i64))
    }
}

impl OrientationScalar for i16 {
    fn orientation_sign(a: Vec2<Self>, b: Vec2<Self>, c: Vec2<Self>) -> i32 {
        orientation_i16(a, b, c).signum() as i32
    }
}

macro_rules! orientation_classifier {
    ($name:ident { $gt:ident, $ge:ident, $eq:ident, $le:ident, $lt:ident }) => {
        /// Equality compares only the sign of the underlying predicate,
        /// not its magnitude (the magnitude carries no meaning).
        #[derive(Clone, Copy, Debug)]
        pub struct $name(i32);

        impl $name {
            pub fn $gt(&self) -> bool {
                self.0 > 0
            }
            pub fn $ge(&self) -> bool {
                self.0 >= 0
            }
            pub fn $eq(&self) -> bool {
                self.0 == 0
            }
            pub fn $le(&self) -> bool {
                self.0 <= 0
            }
            pub fn $lt(&self) -> bool {
                self.0 < 0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.signum() == other.0.signum()
            }
        }
        impl Eq for $name {}
    };
}

orientation_classifier!(PointLocation { left, left_or_line, line, right_or_line, right });
orientation_classifier!(PointOrder { is_ccw, is_ccw_or_collinear, is_collinear, is_cw_or_collinear, is_cw });
orientation_classifier!(VertexType { is_convex, is_convex_or_straight, is_straight, is_reflex_or_straight, is_reflex });

/// Where `point_c` lies relative to the directed line through `line_a`,
/// `line_b`.
pub fn point_location<T: OrientationScalar>(line_a: Vec2<T>, line_b: Vec2<T>, point_c: Vec2<T>) -> PointLocation {
    PointLocation(T::orientation_sign(line_a, line_b, point_c))
}

/// The winding order of `a`, `b`, `c`.
pub fn point_order<T: OrientationScalar>(a: Vec2<T>, b: Vec2<T>, c: Vec2<T>) -> PointOrder {
    PointOrder(T::orientation_sign(a, b, c))
}

/// Whether `curr` is a convex, straight, or reflex vertex of the path
/// `prev -> curr -> next`.
pub fn vertex_type<T: OrientationScalar>(prev: Vec2<T>, curr: Vec2<T>, next: Vec2<T>) -> VertexType {
    VertexType(T::orientation_sign(prev, curr, next))
}

/// The orientation of a contour with non-zero area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonOrientation {
    Clockwise,
    CounterClockwise,
}

/// Picks, among the segments touching the lexicographically largest
/// vertex, the one whose other endpoint is most clockwise as seen from
/// that vertex.
struct MainSegmentChooser<T> {
    max_vertex: Vec2<T>,
    chosen: Option<(Segment2<T>, Vec2<T>)>,
}

impl<T: OrientationScalar + PartialOrd + PartialEq> MainSegmentChooser<T> {
    fn new(max_vertex: Vec2<T>) -> Self {
        Self {
            max_vertex,
            chosen: None,
        }
    }

    fn process_segment(&mut self, segment: Segment2<T>) {
        let undirected = segment.to_undirected();
        if undirected.b != self.max_vertex {
            return;
        }
        let better = match self.chosen {
            None => true,
            Some((_, prev_a)) => {
                ar_pre!(prev_a != undirected.a);
                point_location(prev_a, self.max_vertex, undirected.a).right()
            }
        };
        if better {
            self.chosen = Some((segment, undirected.a));
        }
    }

    fn chosen_segment(&self) -> Segment2<T> {
        self.chosen.expect("at least one segment touches the max vertex").0
    }
}

/// Orientation of a closed contour given as consecutive vertices (the
/// last vertex equal to the first, i.e. the usual closed-ring
/// convention).
///
/// # Preconditions
/// At least 3 vertices (so at least one edge beyond the closing one), no
/// two consecutive vertices equal, no self-intersections except at
/// shared vertices.
pub fn contour_orientation<T: OrientationScalar + PartialOrd + Ord + Copy>(contour: &[Vec2<T>]) -> PolygonOrientation {
    ar_pre!(contour.len() >= 3);
    ar_pre!(contour.windows(2).all(|w| w[0] != w[1]));

    let max_vertex = *contour.iter().max().expect("length checked above");
    let mut chooser = MainSegmentChooser::new(max_vertex);
    for window in contour.windows(2) {
        chooser.process_segment(Segment2::new(window[0], window[1]));
    }
    if chooser.chosen_segment().b == max_vertex {
        PolygonOrientation::CounterClockwise
    } else {
        PolygonOrientation::Clockwise
    }
}

/// Orientation of the outermost contour of the contour set represented by
/// `segments`. Orientations of interior contours are ignored; if several
/// contours are outermost, one is chosen arbitrarily.
///
/// # Preconditions
/// At least 3 segments, none degenerate, forming closed non-self-
/// intersecting contours that may touch only at shared vertices.
pub fn polygon_orientation<T: OrientationScalar + PartialOrd + Ord + Copy>(segments: &[Segment2<T>]) -> PolygonOrientation {
    ar_pre!(segments.len() >= 3);
    ar_pre!(segments.iter().all(|s| !s.degenerate()));

    let max_vertex = segments
        .iter()
        .map(|s| if s.a > s.b { s.a } else { s.b })
        .max()
        .expect("length checked above");

    let mut chooser = MainSegmentChooser::new(max_vertex);
    for &segment in segments {
        chooser.process_segment(segment);
    }
    if chooser.chosen_segment().b == max_vertex {
        PolygonOrientation::CounterClockwise
    } else {
        PolygonOrientation::Clockwise
    }
}
