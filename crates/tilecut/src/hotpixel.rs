//! Hot-pixel collection and the 2D range index used to query them during
//! snap-rounding.
//!
//! A "hot pixel" is a grid cell that a rounded polyline must pass through:
//! one at every original vertex, and one at every point where a segment
//! crosses a tile boundary (so that tile-local output never silently
//! skips a tile it geometrically passes through).

use crate::ar_post;
use crate::ar_pre;
use crate::geom::{Segment2, Vec2, Vec2f64, Vec2s64};
use crate::grid::TileCellGrid;

/// Direction a [`HotPixelIndex`] range query walks a dimension in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotPixelOrder {
    Ascending,
    Descending,
}

/// Orders hot pixels the way they occur along a segment travelling in the
/// given horizontal/vertical direction.
pub fn hot_pixel_less(x_order: HotPixelOrder, y_order: HotPixelOrder, lhs: Vec2s64, rhs: Vec2s64) -> bool {
    if lhs.x != rhs.x {
        return match x_order {
            HotPixelOrder::Ascending => lhs.x < rhs.x,
            HotPixelOrder::Descending => lhs.x > rhs.x,
        };
    }
    match y_order {
        HotPixelOrder::Ascending => lhs.y < rhs.y,
        HotPixelOrder::Descending => lhs.y > rhs.y,
    }
}

/// An immutable, x-then-y sorted snapshot of hot pixels supporting range
/// queries by a chosen walk direction. Built once per contour set by
/// [`HotPixelCollector::build_index`].
#[derive(Clone, Debug)]
pub struct HotPixelIndex {
    columns: Vec<Column>,
}

#[derive(Clone, Debug)]
struct Column {
    x: i64,
    pixels: Vec<Vec2s64>,
}

impl HotPixelIndex {
    /// All hot pixels within `[min_x, max_x] x [min_y, max_y]` for which
    /// `predicate` holds, in the order implied by `horizontal_order` /
    /// `vertical_order`.
    pub fn find_if(
        &self,
        horizontal_order: HotPixelOrder,
        vertical_order: HotPixelOrder,
        min_x: i64,
        max_x: i64,
        min_y: i64,
        max_y: i64,
        mut predicate: impl FnMut(Vec2s64) -> bool,
        out: &mut Vec<Vec2s64>,
    ) {
        ar_pre!(min_x <= max_x);
        ar_pre!(min_y <= max_y);

        let columns: Box<dyn Iterator<Item = &Column>> = match horizontal_order {
            HotPixelOrder::Ascending => {
                let first = self.columns.partition_point(|c| c.x < min_x);
                Box::new(self.columns[first..].iter().take_while(move |c| c.x <= max_x))
            }
            HotPixelOrder::Descending => {
                let first = self.columns.iter().rev().position(|c| c.x <= max_x);
                match first {
                    None => Box::new(std::iter::empty()),
                    Some(offset) => {
                        let start = self.columns.len() - 1 - offset;
                        Box::new(
                            self.columns[..=start]
                                .iter()
                                .rev()
                                .take_while(move |c| c.x >= min_x),
                        )
                    }
                }
            }
        };

        for column in columns {
            column.find_if(vertical_order, min_y, max_y, &mut predicate, out);
        }
    }
}

impl Column {
    fn find_if(
        &self,
        vertical_order: HotPixelOrder,
        min_y: i64,
        max_y: i64,
        predicate: &mut impl FnMut(Vec2s64) -> bool,
        out: &mut Vec<Vec2s64>,
    ) {
        match vertical_order {
            HotPixelOrder::Ascending => {
                let first = self.pixels.partition_point(|p| p.y < min_y);
                for &pixel in self.pixels[first..].iter().take_while(|p| p.y <= max_y) {
                    if predicate(pixel) {
                        out.push(pixel);
                    }
                }
            }
            HotPixelOrder::Descending => {
                let first = self.pixels.iter().rev().position(|p| p.y <= max_y);
                if let Some(offset) = first {
                    let start = self.pixels.len() - 1 - offset;
                    for &pixel in self.pixels[..=start].iter().rev().take_while(|p| p.y >= min_y) {
                        if predicate(pixel) {
                            out.push(pixel);
                        }
                    }
                }
            }
        }
    }
}

/// Accumulates hot pixels for a set of contours, then builds an
/// immutable [`HotPixelIndex`] over them.
///
/// Built atop [`TileCellGrid`] rather than reimplementing tile-boundary
/// crossing detection: a hot pixel at a vertex is `grid.cell_of(vertex)`,
/// and a hot pixel at a tile-boundary crossing is exactly what
/// [`TileCellGrid::tile_boundary_intersection_cells`] already computes.
#[derive(Default)]
pub struct HotPixelCollector {
    grid: Option<TileCellGrid>,
    prev_vertex: Option<Vec2f64>,
    prev_pixel: Option<Vec2s64>,
    hot_pixels: Vec<Vec2s64>,
}

impl HotPixelCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets state and sets the grid about to be used for the contours
    /// about to be added.
    pub fn init(&mut self, grid: TileCellGrid) {
        self.grid = Some(grid);
        self.prev_vertex = None;
        self.prev_pixel = None;
        self.hot_pixels.clear();
    }

    /// Starts a new contour: breaks the "previous vertex" chain so the
    /// next [`Self::add_vertex_and_tile_cuts`] call does not add
    /// tile-crossing pixels between contours.
    pub fn new_contour(&mut self) {
        ar_pre!(self.grid.is_some());
        self.prev_vertex = None;
    }

    /// Adds the hot pixel around `vertex` and, if there was a previous
    /// vertex in the current contour, the hot pixels where the segment
    /// between them crosses a tile boundary.
    pub fn add_vertex_and_tile_cuts(&mut self, vertex: Vec2f64) {
        ar_pre!(self.grid.is_some());

        let grid = self.grid.expect("grid set by init");
        let pixel = grid.cell_of(vertex);
        self.hot_pixels.push(pixel);

        if let Some(prev_vertex) = self.prev_vertex {
            let prev_pixel = self.prev_pixel.expect("prev_pixel set alongside prev_vertex");
            let crossings = grid.tile_boundary_intersection_cells(
                Segment2::new(prev_vertex, vertex),
                Segment2::new(prev_pixel, pixel),
            );
            self.hot_pixels.extend(crossings);
        }
        self.prev_vertex = Some(vertex);
        self.prev_pixel = Some(pixel);
    }

    /// Sorts, deduplicates, and partitions the collected pixels into a
    /// queryable [`HotPixelIndex`].
    pub fn build_index(&mut self) -> HotPixelIndex {
        ar_pre!(self.grid.is_some());
        ar_pre!(!self.hot_pixels.is_empty());

        self.hot_pixels.sort();
        self.hot_pixels.dedup();

        let mut columns = Vec::new();
        let mut span_start = 0;
        let mut current_x = self.hot_pixels[0].x;
        for i in 0..self.hot_pixels.len() {
            if self.hot_pixels[i].x != current_x {
                columns.push(Column {
                    x: current_x,
                    pixels: self.hot_pixels[span_start..i].to_vec(),
                });
                current_x = self.hot_pixels[i].x;
                span_start = i;
            }
        }
        columns.push(Column {
            x: current_x,
            pixels: self.hot_pixels[span_start..].to_vec(),
        });

        let index = HotPixelIndex { columns };
        ar_post!(!index.columns.is_empty());
        index
    }

    /// The grid this collector was last [`Self::init`]-ed with.
    pub fn grid(&self) -> Option<&TileCellGrid> {
        self.grid.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridParameters, GridRounding, TileGrid};

    fn test_grid() -> TileCellGrid {
        let params = GridParameters {
            cell_size: 1.0,
            desired_cell_size: 1.0,
            min_input: 0.0,
            max_input: 1.0e9,
            column_border_intersection: crate::grid::ColumnBorderIntersectionTolerance {
                min_reliable_fractional_part: 1.0e-6,
                max_reliable_fractional_part: 1.0 - 1.0e-6,
            },
        };
        TileCellGrid::new(params, TileGrid::new(Vec2::new(0, 0), 4), GridRounding::Cell)
    }

    #[test]
    fn collector_builds_index_with_sorted_unique_pixels() {
        let grid = test_grid();
        let mut collector = HotPixelCollector::new();
        collector.init(grid);
        collector.new_contour();
        collector.add_vertex_and_tile_cuts(Vec2::new(0.5, 0.5));
        collector.add_vertex_and_tile_cuts(Vec2::new(0.5, 0.5));
        collector.add_vertex_and_tile_cuts(Vec2::new(10.5, 0.5));
        let index = collector.build_index();
        let mut out = Vec::new();
        index.find_if(
            HotPixelOrder::Ascending,
            HotPixelOrder::Ascending,
            0,
            10,
            0,
            0,
            |_| true,
            &mut out,
        );
        assert!(out.windows(2).all(|w| w[0].x <= w[1].x));
        assert!(out.contains(&Vec2::new(0, 0)));
        assert!(out.contains(&Vec2::new(10, 0)));
    }

    #[test]
    fn hot_pixel_less_orders_by_requested_direction() {
        let a = Vec2::new(1i64, 5i64);
        let b = Vec2::new(2i64, 1i64);
        assert!(hot_pixel_less(HotPixelOrder::Ascending, HotPixelOrder::Ascending, a, b));
        assert!(hot_pixel_less(HotPixelOrder::Descending, HotPixelOrder::Ascending, b, a));
    }
}
