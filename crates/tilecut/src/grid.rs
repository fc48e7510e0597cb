//! The tile/cell grid: parameters, tile-boundary bookkeeping, and the
//! combined cell+tile view used by the snap-rounding and cutting stages.

use crate::ar_pre;
use crate::cast::exact_cast_i64_to_u16;
use crate::exact::predicates::{
    border_between_coordinates, column_border_intersection, column_containing_position,
    line_intersects_cell as exact_line_intersects_cell, row_border_intersection,
    row_containing_position,
};
use crate::geom::{Segment2, Segment2f64, Segment2s64, Segment2u16, Vec2, Vec2f64, Vec2s64, Vec2u16};

/// Error bounds used by [`crate::exact::predicates::column_border_intersection`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnBorderIntersectionTolerance {
    /// Fractional parts smaller than this do not guarantee correct
    /// rounding.
    pub min_reliable_fractional_part: f64,
    /// Fractional parts larger than this do not guarantee correct
    /// rounding.
    pub max_reliable_fractional_part: f64,
}

/// Parameters of the grid and the exactly precomputed constants derived
/// from it. Narrowing the allowed range of input coordinates and/or
/// increasing the cell size beyond `desired_cell_size` is correct even
/// without recomputing the tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridParameters {
    /// Size of a grid cell; may be larger than `desired_cell_size`.
    pub cell_size: f64,
    /// The cell size the tolerance below was actually computed for.
    pub desired_cell_size: f64,
    /// Minimal allowed absolute value of input coordinates (0 exempt).
    pub min_input: f64,
    /// Maximal allowed absolute value of input coordinates.
    pub max_input: f64,
    pub column_border_intersection: ColumnBorderIntersectionTolerance,
}

/// Rule for matching points to grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridRounding {
    /// Round down to the enclosing grid cell.
    Cell,
    /// Round to the nearest grid node.
    NearestNode,
}

/// Maps geometry to the tiles it passes through. `tile_size` is the
/// number of cells along one edge of a tile; `origin` is the cell
/// coordinate of tile `(0, 0)`'s lower-left corner (the original this
/// crate is grounded on always assumes an origin of zero; this crate
/// makes that explicit so grids can be positioned anywhere on the cell
/// plane).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGrid {
    pub origin: Vec2s64,
    tile_size: u16,
}

fn div_round_up(a: i64, b: u16) -> i64 {
    ar_pre!(b > 0);
    let b = i64::from(b);
    if a >= 0 {
        (a + b - 1) / b
    } else {
        -(-a / b)
    }
}

fn div_round_down(a: i64, b: u16) -> i64 {
    ar_pre!(b > 0);
    let b = i64::from(b);
    if a >= 0 {
        a / b
    } else {
        -((-a + b - 1) / b)
    }
}

impl TileGrid {
    pub fn new(origin: Vec2s64, tile_size: u16) -> Self {
        ar_pre!(tile_size > 0);
        Self { origin, tile_size }
    }

    pub fn tile_size(&self) -> u16 {
        self.tile_size
    }

    /// The tile containing the given cell.
    pub fn tile_of_cell(&self, cell: Vec2s64) -> Vec2s64 {
        Vec2::new(
            div_round_down(cell.x - self.origin.x, self.tile_size),
            div_round_down(cell.y - self.origin.y, self.tile_size),
        )
    }

    /// The tile containing the given segment.
    ///
    /// A segment lying entirely on a tile boundary is considered to
    /// belong to the tile in its left half-plane; a tile therefore never
    /// contains a 2D slice of a polygon, which simplifies finding the
    /// boundaries of a tile lying inside one.
    pub fn tile_of_segment(&self, segment: Segment2s64) -> Vec2s64 {
        ar_pre!(segment.a != segment.b);
        ar_pre!(self.is_inside_single_tile(segment));

        let start_tile = self.tile_of_cell(segment.a);
        let stop_tile = self.tile_of_cell(segment.b);
        let tile_x = start_tile.x.min(stop_tile.x);
        let tile_y = start_tile.y.min(stop_tile.y);

        if segment.a.x == segment.b.x && segment.a.x == self.origin.x + tile_x * i64::from(self.tile_size) {
            return Vec2::new(
                if segment.a.y < segment.b.y {
                    tile_x - 1
                } else {
                    tile_x
                },
                tile_y,
            );
        }
        if segment.a.y == segment.b.y && segment.a.y == self.origin.y + tile_y * i64::from(self.tile_size) {
            return Vec2::new(
                tile_x,
                if segment.a.x < segment.b.x {
                    tile_y
                } else {
                    tile_y - 1
                },
            );
        }
        Vec2::new(tile_x, tile_y)
    }

    /// Converts a cell to the local coordinates of the given tile.
    pub fn local_coordinates_of_cell(&self, tile: Vec2s64, cell: Vec2s64) -> Vec2u16 {
        let local = Vec2::new(
            cell.x - self.origin.x - tile.x * i64::from(self.tile_size),
            cell.y - self.origin.y - tile.y * i64::from(self.tile_size),
        );
        ar_pre!(local.x >= 0);
        ar_pre!(local.x <= i64::from(self.tile_size));
        ar_pre!(local.y >= 0);
        ar_pre!(local.y <= i64::from(self.tile_size));
        local.map(exact_cast_i64_to_u16)
    }

    /// Converts a segment to the local coordinates of the given tile.
    pub fn local_coordinates_of_segment(&self, tile: Vec2s64, segment: Segment2s64) -> Segment2u16 {
        Segment2::new(
            self.local_coordinates_of_cell(tile, segment.a),
            self.local_coordinates_of_cell(tile, segment.b),
        )
    }

    fn is_inside_single_tile_1d(&self, mut a: i64, mut b: i64, origin: i64) -> bool {
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let min_tile = div_round_down(a - origin, self.tile_size);
        let max_tile = div_round_down(b - origin, self.tile_size);
        min_tile == max_tile || b - origin == (min_tile + 1) * i64::from(self.tile_size)
    }

    /// Whether a segment is entirely contained within a single tile.
    pub fn is_inside_single_tile(&self, segment: Segment2s64) -> bool {
        self.is_inside_single_tile_1d(segment.a.x, segment.b.x, self.origin.x)
            && self.is_inside_single_tile_1d(segment.a.y, segment.b.y, self.origin.y)
    }

    /// Whether a cell does not belong to the tile's closure.
    pub fn strictly_outside(&self, tile: Vec2s64, cell: Vec2s64) -> bool {
        let left = self.origin.x + tile.x * i64::from(self.tile_size);
        let right = left + i64::from(self.tile_size);
        let bottom = self.origin.y + tile.y * i64::from(self.tile_size);
        let top = bottom + i64::from(self.tile_size);
        cell.x < left || cell.x > right || cell.y < bottom || cell.y > top
    }

    /// Coordinate ranges (inclusive) of tile boundaries crossed by a
    /// segment. A `min > max` component means that axis has no crossings.
    pub fn intersected_boundaries_ranges(&self, segment: Segment2s64) -> BoundariesRanges {
        let (min_x, max_x) = self.intersected_boundaries_range_1d(segment.a.x, segment.b.x, self.origin.x);
        let (min_y, max_y) = self.intersected_boundaries_range_1d(segment.a.y, segment.b.y, self.origin.y);
        BoundariesRanges {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    fn intersected_boundaries_range_1d(&self, begin_cell: i64, end_cell: i64, origin: i64) -> (i64, i64) {
        let (mut begin, mut end) = (begin_cell - origin, end_cell - origin);
        if begin > end {
            std::mem::swap(&mut begin, &mut end);
        }
        (
            origin + div_round_up(begin, self.tile_size) * i64::from(self.tile_size),
            origin + div_round_down(end, self.tile_size) * i64::from(self.tile_size),
        )
    }

    /// The four counter-clockwise tile-boundary segments, in local
    /// coordinates, starting at the origin corner.
    pub fn tile_local_boundaries(&self) -> [Segment2u16; 4] {
        let s = self.tile_size;
        let corners = [
            Vec2::new(0, 0),
            Vec2::new(s, 0),
            Vec2::new(s, s),
            Vec2::new(0, s),
        ];
        std::array::from_fn(|i| Segment2::new(corners[i], corners[(i + 1) % 4]))
    }
}

/// Coordinate ranges of the tile boundaries intersected by a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundariesRanges {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

/// Combines a [`GridParameters`] and a [`TileGrid`] to map geometry to the
/// grid cells it passes through, under a chosen [`GridRounding`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileCellGrid {
    grid: GridParameters,
    tile_grid: TileGrid,
    rounding: GridRounding,
}

impl TileCellGrid {
    pub fn new(grid: GridParameters, tile_grid: TileGrid, rounding: GridRounding) -> Self {
        ar_pre!(grid.desired_cell_size > 0.0);
        ar_pre!(grid.cell_size >= grid.desired_cell_size);
        Self {
            grid,
            tile_grid,
            rounding,
        }
    }

    pub fn grid(&self) -> &GridParameters {
        &self.grid
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tile_grid
    }

    pub fn rounding(&self) -> GridRounding {
        self.rounding
    }

    pub fn cell_size(&self) -> f64 {
        self.grid.cell_size
    }

    /// The grid cell containing a point.
    pub fn cell_of(&self, point: Vec2f64) -> Vec2s64 {
        Vec2::new(
            column_containing_position(&self.grid, self.rounding, point.x),
            row_containing_position(&self.grid, self.rounding, point.y),
        )
    }

    /// All grid cells where `segment` crosses a tile boundary.
    ///
    /// `segment_cells` is `segment` already snapped to the grid (`cell_of`
    /// applied to each endpoint); callers usually have it already, so it
    /// is taken rather than recomputed.
    pub fn tile_boundary_intersection_cells(&self, segment: Segment2f64, segment_cells: Segment2s64) -> Vec<Vec2s64> {
        ar_pre!(self.cell_of(segment.a) == segment_cells.a);
        ar_pre!(self.cell_of(segment.b) == segment_cells.b);

        let mut out = Vec::new();
        let ranges = self.tile_grid.intersected_boundaries_ranges(segment_cells);
        let tile_size = i64::from(self.tile_grid.tile_size());

        if segment.a.x != segment.b.x {
            let mut x = ranges.min_x;
            while x <= ranges.max_x {
                if border_between_coordinates(self.grid.cell_size, segment.a.x, segment.b.x, x) {
                    let y = column_border_intersection(&self.grid, self.rounding, segment.a, segment.b, x);
                    out.push(Vec2::new(x, y));
                }
                x += tile_size;
            }
        }
        if segment.a.y != segment.b.y {
            let mut y = ranges.min_y;
            while y <= ranges.max_y {
                if border_between_coordinates(self.grid.cell_size, segment.a.y, segment.b.y, y) {
                    let x = row_border_intersection(&self.grid, self.rounding, segment.a, segment.b, y);
                    out.push(Vec2::new(x, y));
                }
                y += tile_size;
            }
        }
        out
    }

    /// Whether the line through `segment_on_line`'s endpoints intersects
    /// `cell`.
    pub fn line_intersects_cell(&self, segment_on_line: Segment2f64, cell: Vec2s64) -> bool {
        exact_line_intersects_cell(
            &self.grid,
            self.rounding,
            segment_on_line.a,
            segment_on_line.b,
            cell,
        )
    }
}

/// A tile together with the tile-local segments that belong to it,
/// borrowing from a shared arena (see [`crate::tile_group::collect_tiles`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile<'a> {
    pub tile: Vec2s64,
    pub segments: &'a [Segment2u16],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_of_cell_floors_towards_negative_infinity() {
        let grid = TileGrid::new(Vec2::new(0, 0), 16);
        assert_eq!(grid.tile_of_cell(Vec2::new(15, 0)), Vec2::new(0, 0));
        assert_eq!(grid.tile_of_cell(Vec2::new(16, 0)), Vec2::new(1, 0));
        assert_eq!(grid.tile_of_cell(Vec2::new(-1, 0)), Vec2::new(-1, 0));
    }

    #[test]
    fn tile_of_cell_respects_nonzero_origin() {
        let grid = TileGrid::new(Vec2::new(100, 0), 16);
        assert_eq!(grid.tile_of_cell(Vec2::new(100, 0)), Vec2::new(0, 0));
        assert_eq!(grid.tile_of_cell(Vec2::new(99, 0)), Vec2::new(-1, 0));
        assert_eq!(grid.tile_of_cell(Vec2::new(116, 0)), Vec2::new(1, 0));
    }

    #[test]
    fn tile_of_segment_on_boundary_belongs_to_left_half_plane() {
        let grid = TileGrid::new(Vec2::new(0, 0), 16);
        // Vertical segment exactly on x = 16, travelling upward: belongs
        // to the tile to its left (tile_x - 1 = 0), since "up" along a
        // vertical boundary keeps the polygon interior on the left.
        let seg = Segment2::new(Vec2::new(16, 0), Vec2::new(16, 8));
        assert_eq!(grid.tile_of_segment(seg), Vec2::new(0, 0));
    }

    #[test]
    fn local_coordinates_are_relative_to_tile_origin() {
        let grid = TileGrid::new(Vec2::new(0, 0), 16);
        let tile = Vec2::new(1, 0);
        assert_eq!(
            grid.local_coordinates_of_cell(tile, Vec2::new(20, 3)),
            Vec2::new(4, 3)
        );
    }

    #[test]
    fn tile_local_boundaries_are_counterclockwise_from_origin() {
        let grid = TileGrid::new(Vec2::new(0, 0), 4);
        let boundaries = grid.tile_local_boundaries();
        assert_eq!(boundaries[0], Segment2::new(Vec2::new(0, 0), Vec2::new(4, 0)));
        assert_eq!(boundaries[1], Segment2::new(Vec2::new(4, 0), Vec2::new(4, 4)));
        assert_eq!(boundaries[2], Segment2::new(Vec2::new(4, 4), Vec2::new(0, 4)));
        assert_eq!(boundaries[3], Segment2::new(Vec2::new(0, 4), Vec2::new(0, 0)));
    }
}
