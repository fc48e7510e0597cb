//! Segment deduplication and grouping by owning tile.
//!
//! Coincident edges shared by adjacent rings (a hole boundary and the
//! shell it punctures, or two polygons of a multipolygon sharing an
//! edge) cancel out: a forward copy and a reverse copy of the same
//! segment contribute nothing to the final boundary. [`filter_segments`]
//! removes exactly those pairs. [`collect_tiles`] then buckets what
//! remains by the tile each segment belongs to, converting coordinates
//! to tile-local `u16`s.

use crate::geom::{Segment2, Segment2s64};
use crate::grid::{Tile, TileGrid};
use std::ops::Range;

fn flipped(segment: Segment2s64) -> Segment2s64 {
    Segment2::new(segment.b, segment.a)
}

fn unoriented(segment: Segment2s64) -> Segment2s64 {
    if segment.a < segment.b {
        segment
    } else {
        flipped(segment)
    }
}

/// Folds any net multiplicity down to a single oriented copy: only the
/// sign of `counter` matters, not its magnitude (three forward copies of
/// an edge and one forward copy both leave one).
fn push_oriented(out: &mut Vec<Segment2s64>, segment: Segment2s64, counter: i64) {
    if counter > 0 {
        out.push(segment);
    } else if counter < 0 {
        out.push(flipped(segment));
    }
}

/// Removes degenerate segments, then cancels pairs of segments that are
/// the same edge traversed in opposite directions (an odd number of
/// coincident forward copies beyond the first is folded in the same
/// way: three forward copies of an edge leave one).
///
/// # Preconditions
/// No directed edge occurs more than once among segments sharing the
/// same undirected pair in the same direction minus the opposite
/// direction beyond a net multiplicity of 1 (a simple multipolygon's
/// edges never coincide more than twice).
pub fn filter_segments(segments: &mut Vec<Segment2s64>) {
    segments.retain(|s| s.a != s.b);
    if segments.is_empty() {
        return;
    }

    segments.sort_by_key(|&s| unoriented(s));

    let mut result = Vec::with_capacity(segments.len());
    let mut main_segment = segments[0];
    let mut counter: i64 = 1;
    for &segment in &segments[1..] {
        if segment == main_segment {
            counter += 1;
        } else if segment == flipped(main_segment) {
            counter -= 1;
        } else {
            push_oriented(&mut result, main_segment, counter);
            main_segment = segment;
            counter = 1;
        }
    }
    push_oriented(&mut result, main_segment, counter);

    *segments = result;
}

/// The result of [`collect_tiles`]: tile-local segments grouped by
/// owning tile, backed by one contiguous arena so each [`Tile`] borrows
/// a slice rather than owning a `Vec`.
#[derive(Default)]
pub struct TileGroups {
    arena: Vec<crate::geom::Segment2u16>,
    ranges: Vec<(crate::geom::Vec2s64, Range<usize>)>,
}

impl TileGroups {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tile<'_>> {
        self.ranges.iter().map(|(tile, range)| Tile {
            tile: *tile,
            segments: &self.arena[range.clone()],
        })
    }
}

/// Sorts `unique_segments` by owning tile and buckets them into
/// [`TileGroups`], converting each segment to coordinates local to its
/// tile.
///
/// # Preconditions
/// Every segment lies entirely inside a single tile (callers run hot-
/// pixel snap-rounding, which inserts a vertex at every tile-boundary
/// crossing, before this step).
pub fn collect_tiles(tile_grid: &TileGrid, unique_segments: &mut [Segment2s64]) -> TileGroups {
    if unique_segments.is_empty() {
        return TileGroups::default();
    }

    unique_segments.sort_by_key(|&s| tile_grid.tile_of_segment(s));

    let mut arena = Vec::with_capacity(unique_segments.len());
    let mut ranges = Vec::new();
    let mut prev_tile = tile_grid.tile_of_segment(unique_segments[0]);
    let mut span_start = 0;

    for &segment in unique_segments.iter() {
        let tile = tile_grid.tile_of_segment(segment);
        if tile != prev_tile {
            ranges.push((prev_tile, span_start..arena.len()));
            span_start = arena.len();
            prev_tile = tile;
        }
        arena.push(tile_grid.local_coordinates_of_segment(tile, segment));
    }
    ranges.push((prev_tile, span_start..arena.len()));

    TileGroups { arena, ranges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;

    fn s(ax: i64, ay: i64, bx: i64, by: i64) -> Segment2s64 {
        Segment2::new(Vec2::new(ax, ay), Vec2::new(bx, by))
    }

    #[test]
    fn filter_segments_drops_degenerate() {
        let mut segments = vec![s(0, 0, 0, 0), s(0, 0, 1, 0)];
        filter_segments(&mut segments);
        assert_eq!(segments, vec![s(0, 0, 1, 0)]);
    }

    #[test]
    fn filter_segments_cancels_opposite_pair() {
        let mut segments = vec![s(0, 0, 1, 0), s(1, 0, 0, 0)];
        filter_segments(&mut segments);
        assert!(segments.is_empty());
    }

    #[test]
    fn filter_segments_keeps_unmatched_segment() {
        let mut segments = vec![s(5, 5, 6, 6), s(0, 0, 1, 0), s(1, 0, 0, 0)];
        filter_segments(&mut segments);
        assert_eq!(segments, vec![s(5, 5, 6, 6)]);
    }

    #[test]
    fn filter_segments_net_multiplicity_keeps_one_oriented_copy() {
        // Three coincident forward copies, net multiplicity +1.
        let mut segments = vec![s(0, 0, 1, 0), s(0, 0, 1, 0), s(0, 0, 1, 0)];
        filter_segments(&mut segments);
        assert_eq!(segments, vec![s(0, 0, 1, 0)]);
    }

    #[test]
    fn collect_tiles_groups_by_tile_and_converts_local_coordinates() {
        let grid = TileGrid::new(Vec2::new(0, 0), 4);
        let mut segments = vec![s(1, 1, 2, 1), s(5, 1, 6, 1)];
        let groups = collect_tiles(&grid, &mut segments);
        assert_eq!(groups.len(), 2);
        let tiles: Vec<_> = groups.iter().map(|t| t.tile).collect();
        assert!(tiles.contains(&Vec2::new(0, 0)));
        assert!(tiles.contains(&Vec2::new(1, 0)));
        for tile in groups.iter() {
            assert_eq!(tile.segments.len(), 1);
        }
    }

    #[test]
    fn collect_tiles_on_empty_input_yields_no_groups() {
        let grid = TileGrid::new(Vec2::new(0, 0), 4);
        let mut segments: Vec<Segment2s64> = Vec::new();
        let groups = collect_tiles(&grid, &mut segments);
        assert!(groups.is_empty());
    }
}
