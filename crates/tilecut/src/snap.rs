//! Snap-rounding: replacing a floating-point polyline with the sequence
//! of grid cells ("hot pixels") it passes through, including the cells
//! where it merely crosses a tile boundary without a vertex of its own.
//!
//! Two entry points, grounded on the same underlying stepping logic but
//! serving different callers:
//!
//! - [`snap_round`] rounds a line to `Vec2s64` cell coordinates using a
//!   precomputed [`HotPixelIndex`] shared across every contour of a
//!   multipolygon (the index guarantees two contours that pass through
//!   the same pixel round to the literal same coordinate).
//! - [`LineSnapper`] additionally carries an arbitrary payload per vertex
//!   (attributes to interpolate, such as a measure or a third
//!   coordinate) along a single line, without needing a shared index.

use crate::ar_pre;
use crate::geom::{Segment2, Vec2f64, Vec2s64};
use crate::grid::TileCellGrid;
use crate::hotpixel::{hot_pixel_less, HotPixelIndex, HotPixelOrder};

fn orders_for(start: Vec2s64, stop: Vec2s64) -> (HotPixelOrder, HotPixelOrder) {
    (
        if start.x <= stop.x { HotPixelOrder::Ascending } else { HotPixelOrder::Descending },
        if start.y <= stop.y { HotPixelOrder::Ascending } else { HotPixelOrder::Descending },
    )
}

/// Rounds `line` to the grid, inserting every hot pixel the segment
/// between consecutive vertices passes through (in travel order),
/// deduplicating consecutive repeats implicitly by never revisiting the
/// pixel of the previous vertex.
pub fn snap_round(grid: &TileCellGrid, hot_pixels: &HotPixelIndex, line: impl IntoIterator<Item = Vec2f64>, out: &mut Vec<Vec2s64>) {
    let mut prev: Option<(Vec2f64, Vec2s64)> = None;

    for vertex in line {
        let pixel = grid.cell_of(vertex);

        if let Some((prev_vertex, prev_pixel)) = prev {
            let (horizontal_order, vertical_order) = orders_for(prev_pixel, pixel);
            let min_x = prev_pixel.x.min(pixel.x);
            let max_x = prev_pixel.x.max(pixel.x);
            let min_y = prev_pixel.y.min(pixel.y);
            let max_y = prev_pixel.y.max(pixel.y);

            let predicate = |hot_pixel: Vec2s64| {
                ar_pre!(min_x <= hot_pixel.x && hot_pixel.x <= max_x);
                ar_pre!(min_y <= hot_pixel.y && hot_pixel.y <= max_y);
                if hot_pixel == prev_pixel || hot_pixel == pixel {
                    // Endpoints are added explicitly below; skip them here
                    // to avoid repeating them.
                    return false;
                }
                grid.line_intersects_cell(Segment2::new(prev_vertex, vertex), hot_pixel)
            };

            hot_pixels.find_if(horizontal_order, vertical_order, min_x, max_x, min_y, max_y, predicate, out);
        }

        out.push(pixel);
        prev = Some((vertex, pixel));
    }
}

/// Sorts `pixels` (already known to lie on the segment from
/// `segment_start_pixel` to `segment_stop_pixel`) into the order they
/// occur along it.
pub fn sort_hot_pixels_along_segment(pixels: &mut [Vec2s64], segment_start_pixel: Vec2s64, segment_stop_pixel: Vec2s64) {
    let (horizontal_order, vertical_order) = orders_for(segment_start_pixel, segment_stop_pixel);
    pixels.sort_by(|&lhs, &rhs| {
        if hot_pixel_less(horizontal_order, vertical_order, lhs, rhs) {
            std::cmp::Ordering::Less
        } else if hot_pixel_less(horizontal_order, vertical_order, rhs, lhs) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });
}

/// Scalar interpolation parameter of `position`'s projection onto the
/// segment `start -> stop`, applied via `f64::lerp` semantics (`t = 0`
/// at `start`, `t = 1` at `stop`).
pub fn lerp_along_segment(start: Vec2f64, start_value: f64, stop: Vec2f64, stop_value: f64, position: Vec2f64) -> f64 {
    let to_stop = Vec2f64::new(stop.x - start.x, stop.y - start.y);
    let len_sqr = to_stop.x * to_stop.x + to_stop.y * to_stop.y;
    let to_pos = Vec2f64::new(position.x - start.x, position.y - start.y);
    let t = (to_pos.x * to_stop.x + to_pos.y * to_stop.y) / len_sqr;
    start_value + t * (stop_value - start_value)
}

/// A per-vertex payload type that can be projected to a coordinate,
/// snapped to a grid cell, and interpolated at an intermediate hot pixel.
///
/// Mirrors the contract a caller with attributes to carry along a
/// snap-rounded line (a measure value, an extra dimension) must satisfy;
/// [`LineSnapper::snap_line`] is generic over it instead of being
/// hardwired to bare coordinates like [`snap_round`].
pub trait CoordinateHandler {
    type InputVertex: Copy;
    type OutputVertex: Copy;

    /// The vertex's position to snap-round on.
    fn project(&self, vertex: &Self::InputVertex) -> Vec2f64;

    /// The output vertex once `vertex` has snapped to `position`.
    fn transform(&self, vertex: &Self::InputVertex, position: Vec2s64) -> Self::OutputVertex;

    /// The output vertex to synthesize for a hot pixel strictly between
    /// `start` and `stop` that is not itself an input vertex.
    fn interpolate(
        &self,
        start_in: &Self::InputVertex,
        start_out: &Self::OutputVertex,
        stop_in: &Self::InputVertex,
        stop_out: &Self::OutputVertex,
        position: Vec2s64,
    ) -> Self::OutputVertex;
}

/// Snaps a single line to the grid while carrying a [`CoordinateHandler`]
/// payload, reusing an internal buffer across calls.
///
/// Unlike [`snap_round`], this does not consult a shared [`HotPixelIndex`]
/// across contours: it only needs the tile-boundary crossings of the
/// current line, so it has no notion of hot pixels contributed by other
/// contours.
#[derive(Default)]
pub struct LineSnapper {
    interior_pixels: Vec<Vec2s64>,
}

impl LineSnapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snap_line<H: CoordinateHandler>(
        &mut self,
        grid: &TileCellGrid,
        line: impl IntoIterator<Item = H::InputVertex>,
        handler: &H,
        out: &mut Vec<H::OutputVertex>,
    ) {
        let mut prev: Option<(Vec2f64, Vec2s64, H::InputVertex, H::OutputVertex)> = None;

        for curr_input in line {
            let curr_vertex = handler.project(&curr_input);
            let curr_pixel = grid.cell_of(curr_vertex);
            let curr_output = handler.transform(&curr_input, curr_pixel);

            if let Some((prev_vertex, prev_pixel, prev_input, prev_output)) = &prev {
                self.interior_pixels.clear();
                self.interior_pixels.extend(grid.tile_boundary_intersection_cells(
                    Segment2::new(*prev_vertex, curr_vertex),
                    Segment2::new(*prev_pixel, curr_pixel),
                ));
                sort_hot_pixels_along_segment(&mut self.interior_pixels, *prev_pixel, curr_pixel);
                self.interior_pixels.dedup();

                for &pixel in strictly_interior_pixels(*prev_pixel, curr_pixel, &self.interior_pixels) {
                    out.push(handler.interpolate(prev_input, prev_output, &curr_input, &curr_output, pixel));
                }
            }

            out.push(curr_output);
            prev = Some((curr_vertex, curr_pixel, curr_input, curr_output));
        }
    }
}

fn strictly_interior_pixels(start: Vec2s64, stop: Vec2s64, pixels: &[Vec2s64]) -> &[Vec2s64] {
    let mut pixels = pixels;
    if pixels.first() == Some(&start) {
        pixels = &pixels[1..];
    }
    if pixels.last() == Some(&stop) {
        pixels = &pixels[..pixels.len() - 1];
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;
    use crate::grid::{ColumnBorderIntersectionTolerance, GridParameters, GridRounding, TileGrid};
    use crate::hotpixel::HotPixelCollector;

    fn test_grid() -> TileCellGrid {
        let params = GridParameters {
            cell_size: 1.0,
            desired_cell_size: 1.0,
            min_input: 0.0,
            max_input: 1.0e9,
            column_border_intersection: ColumnBorderIntersectionTolerance {
                min_reliable_fractional_part: 1.0e-6,
                max_reliable_fractional_part: 1.0 - 1.0e-6,
            },
        };
        TileCellGrid::new(params, TileGrid::new(Vec2::new(0, 0), 4), GridRounding::Cell)
    }

    #[test]
    fn snap_round_includes_tile_crossing_pixels() {
        let grid = test_grid();
        let mut collector = HotPixelCollector::new();
        collector.init(grid);
        collector.new_contour();
        collector.add_vertex_and_tile_cuts(Vec2::new(0.5, 0.5));
        collector.add_vertex_and_tile_cuts(Vec2::new(10.5, 0.5));
        let index = collector.build_index();

        let line = [Vec2::new(0.5, 0.5), Vec2::new(10.5, 0.5)];
        let mut out = Vec::new();
        snap_round(&grid, &index, line, &mut out);

        assert_eq!(out.first(), Some(&Vec2::new(0, 0)));
        assert_eq!(out.last(), Some(&Vec2::new(10, 0)));
        // The tile boundary at x=4 and x=8 is crossed along the way.
        assert!(out.contains(&Vec2::new(4, 0)));
        assert!(out.contains(&Vec2::new(8, 0)));
        assert!(out.windows(2).all(|w| w[0].x <= w[1].x));
    }

    struct Identity;
    impl CoordinateHandler for Identity {
        type InputVertex = Vec2f64;
        type OutputVertex = Vec2s64;

        fn project(&self, vertex: &Vec2f64) -> Vec2f64 {
            *vertex
        }
        fn transform(&self, _vertex: &Vec2f64, position: Vec2s64) -> Vec2s64 {
            position
        }
        fn interpolate(&self, _s_in: &Vec2f64, _s_out: &Vec2s64, _e_in: &Vec2f64, _e_out: &Vec2s64, position: Vec2s64) -> Vec2s64 {
            position
        }
    }

    #[test]
    fn line_snapper_inserts_interior_tile_crossings() {
        let grid = test_grid();
        let mut snapper = LineSnapper::new();
        let line = [Vec2::new(0.5, 0.5), Vec2::new(10.5, 0.5)];
        let mut out = Vec::new();
        snapper.snap_line(&grid, line, &Identity, &mut out);

        assert_eq!(out.first(), Some(&Vec2::new(0, 0)));
        assert_eq!(out.last(), Some(&Vec2::new(10, 0)));
        assert!(out.contains(&Vec2::new(4, 0)));
        assert!(out.contains(&Vec2::new(8, 0)));
    }

    #[test]
    fn lerp_along_segment_midpoint() {
        let start = Vec2::new(0.0, 0.0);
        let stop = Vec2::new(10.0, 0.0);
        let mid = Vec2::new(5.0, 0.0);
        assert_eq!(lerp_along_segment(start, 0.0, stop, 100.0, mid), 50.0);
    }

    /// `std::nextafter(value, +inf)` for finite, nonzero `value`. Good
    /// enough for the fixtures below, which never nudge across zero.
    fn next_float(value: f64) -> f64 {
        let bits = value.to_bits();
        f64::from_bits(if value >= 0.0 { bits + 1 } else { bits - 1 })
    }

    /// `std::nextafter(value, -inf)` for finite, nonzero `value`.
    fn prev_float(value: f64) -> f64 {
        let bits = value.to_bits();
        f64::from_bits(if value > 0.0 { bits - 1 } else { bits + 1 })
    }

    fn square_grid(cell_size: f64) -> TileCellGrid {
        let params = GridParameters {
            cell_size,
            desired_cell_size: cell_size,
            min_input: 0.0,
            max_input: 1.0e6,
            column_border_intersection: ColumnBorderIntersectionTolerance {
                min_reliable_fractional_part: 1.0e-6,
                max_reliable_fractional_part: 1.0 - 1.0e-6,
            },
        };
        TileCellGrid::new(params, TileGrid::new(Vec2::new(0, 0), 8), GridRounding::Cell)
    }

    fn snap_round_contour(grid: &TileCellGrid, geometry: &[Vec2f64]) -> Vec<Vec2s64> {
        let mut collector = HotPixelCollector::new();
        collector.init(*grid);
        collector.new_contour();
        for &vertex in geometry {
            collector.add_vertex_and_tile_cuts(vertex);
        }
        let index = collector.build_index();

        let mut out = Vec::new();
        snap_round(grid, &index, geometry.iter().copied(), &mut out);
        out
    }

    #[test]
    fn snap_round_matches_perfect_square_ground_truth() {
        let cell_size = 1.1;
        let grid = square_grid(cell_size);
        let geometry = [
            Vec2::new(cell_size * -4.0, cell_size * -4.0),
            Vec2::new(cell_size * 4.0, cell_size * -4.0),
            Vec2::new(cell_size * 4.0, cell_size * 4.0),
            Vec2::new(cell_size * -4.0, cell_size * 4.0),
            Vec2::new(cell_size * -4.0, cell_size * -4.0),
        ];

        let result = snap_round_contour(&grid, &geometry);

        let expected = [
            Vec2::new(-4, -4),
            Vec2::new(0, -4),
            Vec2::new(4, -4),
            Vec2::new(4, 0),
            Vec2::new(4, 4),
            Vec2::new(0, 4),
            Vec2::new(-4, 4),
            Vec2::new(-4, 0),
            Vec2::new(-4, -4),
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn snap_round_matches_distorted_square_ground_truth() {
        // Same square as `snap_round_matches_perfect_square_ground_truth`,
        // but every corner nudged by one ULP. This is enough to change
        // which column/row border the snap-rounding predicates decide a
        // corner belongs to, hence the different expected pixels.
        let cell_size = 1.1;
        let grid = square_grid(cell_size);
        let geometry = [
            Vec2::new(prev_float(cell_size * -4.0), cell_size * -4.0),
            Vec2::new(next_float(cell_size * 4.0), prev_float(cell_size * -4.0)),
            Vec2::new(prev_float(cell_size * 4.0), next_float(cell_size * 4.0)),
            Vec2::new(cell_size * -4.0, cell_size * 4.0),
            Vec2::new(prev_float(cell_size * -4.0), cell_size * -4.0),
        ];

        let result = snap_round_contour(&grid, &geometry);

        let expected = [
            Vec2::new(-5, -4),
            Vec2::new(0, -5),
            Vec2::new(4, -5),
            Vec2::new(4, 0),
            Vec2::new(3, 4),
            Vec2::new(0, 4),
            Vec2::new(-4, 4),
            Vec2::new(-5, 0),
            Vec2::new(-5, -4),
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn orientation_stays_exact_for_hard_collinear_large_coordinates() {
        // Three points a million units out, one coordinate nudged by a
        // single ULP, still exactly collinear: naive f64 arithmetic loses
        // this to rounding, the expansion-based predicate does not.
        use crate::exact::predicates::orientation_f64;

        let a = Vec2::new(next_float(1.0 + 1.0e6), 2.0 + 1.0e6);
        let b = Vec2::new(next_float(6.0 + 1.0e6), 10.0 + 1.0e6);
        let c = Vec2::new(next_float(11.0 + 1.0e6), 18.0 + 1.0e6);
        assert_eq!(orientation_f64(a, b, c), 0.0);
    }
}
