//! Exact geometric predicates and constructors built on
//! [`crate::exact::expansion`].
//!
//! All of these are "exact" in the sense that their sign or boolean
//! result is always correct for the real numbers the `f64` inputs
//! represent, never merely for the rounded floating-point approximation
//! of them.

use crate::ar_post;
use crate::ar_pre;
use crate::cast::{exact_cast_f64_to_i64, exact_cast_i16_to_i64, exact_cast_i64_to_f64};
use crate::exact::expansion::f32_arith::{
    expansion_approx_f32, fast_expansion_difference_f32, fast_expansion_sum_f32,
    scale_expansion_f32, two_diff_f32,
};
use crate::exact::expansion::{
    expansion_approx, expansion_diff, expansion_sum, fast_expansion_difference,
    fast_expansion_sum, grow_expansion, scale_expansion, two_diff, two_product,
};
use crate::geom::Vec2;
use crate::grid::{GridParameters, GridRounding};

/// Sign of the signed area of triangle `a b c`: positive when `a, b, c`
/// turn counter-clockwise, negative when clockwise, zero when collinear.
/// Exact for any finite `f64` inputs.
pub fn orientation_f64(a: Vec2<f64>, b: Vec2<f64>, c: Vec2<f64>) -> f64 {
    let dx = two_diff(b.x, a.x);
    let dy = two_diff(b.y, a.y);

    let mut t1 = [0.0; 4];
    scale_expansion(&dx, c.y, &mut t1);
    let mut t2 = [0.0; 4];
    scale_expansion(&dx, a.y, &mut t2);
    let mut t3 = [0.0; 4];
    scale_expansion(&dy, c.x, &mut t3);
    let mut t4 = [0.0; 4];
    scale_expansion(&dy, a.x, &mut t4);

    let mut t1t4 = [0.0; 8];
    fast_expansion_sum(&t1, &t4, &mut t1t4);
    let mut t2t3 = [0.0; 8];
    fast_expansion_sum(&t2, &t3, &mut t2t3);

    let mut res = [0.0; 16];
    fast_expansion_difference(&t1t4, &t2t3, &mut res);
    expansion_approx(&res)
}

/// `f32` counterpart of [`orientation_f64`], same construction at `f32`
/// precision.
pub fn orientation_f32(a: Vec2<f32>, b: Vec2<f32>, c: Vec2<f32>) -> f32 {
    let dx = two_diff_f32(b.x, a.x);
    let dy = two_diff_f32(b.y, a.y);

    let mut t1 = [0.0f32; 4];
    scale_expansion_f32(&dx, c.y, &mut t1);
    let mut t2 = [0.0f32; 4];
    scale_expansion_f32(&dx, a.y, &mut t2);
    let mut t3 = [0.0f32; 4];
    scale_expansion_f32(&dy, c.x, &mut t3);
    let mut t4 = [0.0f32; 4];
    scale_expansion_f32(&dy, a.x, &mut t4);

    let mut t1t4 = [0.0f32; 8];
    fast_expansion_sum_f32(&t1, &t4, &mut t1t4);
    let mut t2t3 = [0.0f32; 8];
    fast_expansion_sum_f32(&t2, &t3, &mut t2t3);

    let mut res = [0.0f32; 16];
    fast_expansion_difference_f32(&t1t4, &t2t3, &mut res);
    expansion_approx_f32(&res)
}

/// Sign of the signed area of triangle `a b c` for integer (tile-local)
/// coordinates. Exact: the widest intermediate product fits comfortably
/// in `i64` for any `u16`/`i16`-range coordinate.
pub fn orientation_i64(a: Vec2<i64>, b: Vec2<i64>, c: Vec2<i64>) -> i64 {
    let m00 = b.x - a.x;
    let m01 = c.x - a.x;
    let m10 = b.y - a.y;
    let m11 = c.y - a.y;
    m00 * m11 - m01 * m10
}

/// Sign of the signed area of triangle `a b c` for `i16`-range
/// coordinates. Widens to `i64` and reuses [`orientation_i64`]: the
/// widest intermediate product for `i16` inputs fits comfortably in
/// `i64`, so the widening itself is exact by range analysis alone.
pub fn orientation_i16(a: Vec2<i16>, b: Vec2<i16>, c: Vec2<i16>) -> i64 {
    orientation_i64(a.map(exact_cast_i16_to_i64), b.map(exact_cast_i16_to_i64), c.map(exact_cast_i16_to_i64))
}

struct LineCellFlags {
    invert_signs: bool,
    main_diagonal: bool,
}

/// One can always choose a diagonal of the cell that intersects the given
/// line iff the line intersects the cell: the line intersects the
/// diagonal iff the diagonal's endpoints lie on opposite sides of it.
fn choose_flags(a_x: f64, a_y: f64, b_x: f64, b_y: f64) -> LineCellFlags {
    let main_diagonal = (a_x <= b_x && a_y >= b_y) || (a_x >= b_x && a_y <= b_y);
    if main_diagonal {
        LineCellFlags {
            invert_signs: a_x >= b_x && a_y <= b_y,
            main_diagonal,
        }
    } else {
        LineCellFlags {
            invert_signs: a_x < b_x,
            main_diagonal,
        }
    }
}

/// Common term of both determinants: `a_x * b_y - a_y * b_x`.
fn common_term(a_x: f64, a_y: f64, b_x: f64, b_y: f64) -> [f64; 4] {
    let mut term = [0.0; 4];
    expansion_diff(&two_product(a_x, b_y), &two_product(a_y, b_x), &mut term);
    term
}

/// Difference between the two determinants: `size * (dy -+ dx)`.
fn difference_term(main_diagonal: bool, size: f64, dx: [f64; 2], dy: [f64; 2]) -> [f64; 8] {
    let mut term = [0.0; 8];
    let mut tmp = [0.0; 4];
    if main_diagonal {
        expansion_diff(&dy, &dx, &mut tmp);
    } else {
        expansion_sum(&dy, &dx, &mut tmp);
    }
    scale_expansion(&tmp, size, &mut term);
    term
}

struct CellNode {
    x: i64,
    y: i64,
    /// Power of two.
    size_multiplier: f64,
}

/// For snapping to grid nodes we internally use rounding to cell, to
/// reduce the number of possibly inexact operations.
fn main_cell_node(rounding: GridRounding, main_diagonal: bool, c_x: i64, c_y: i64) -> CellNode {
    match rounding {
        GridRounding::Cell => {
            ar_pre!(c_y <= i64::MAX - 1);
            CellNode {
                x: c_x,
                y: if main_diagonal { c_y } else { c_y + 1 },
                size_multiplier: 1.0,
            }
        }
        GridRounding::NearestNode => {
            // Smaller cell size, bigger cell coordinates: the distance
            // between corners (and so difference_term) is unchanged.
            ar_pre!(c_x >= (i64::MIN + 1) / 2);
            ar_pre!(c_y <= (i64::MAX - 1) / 2);
            CellNode {
                x: c_x * 2 - 1,
                y: if main_diagonal { c_y * 2 - 1 } else { c_y * 2 + 1 },
                size_multiplier: 0.5,
            }
        }
    }
}

/// Second common term of both determinants, depending on the cell
/// coordinates.
fn cell_dependent_term(node_x: i64, node_y: i64, size: f64, dx: [f64; 2], dy: [f64; 2]) -> [f64; 16] {
    let n = exact_cast_i64_to_f64(node_x);
    let m = exact_cast_i64_to_f64(node_y);

    let mut ndy = [0.0; 4];
    scale_expansion(&dy, n, &mut ndy);
    let mut mdx = [0.0; 4];
    scale_expansion(&dx, m, &mut mdx);
    let mut cell_tmp = [0.0; 8];
    expansion_diff(&ndy, &mdx, &mut cell_tmp);
    let mut term = [0.0; 16];
    scale_expansion(&cell_tmp, size, &mut term);
    term
}

fn first_determinant_sign(common_term: &[f64; 4], cell_dependent_term: &[f64; 16]) -> f64 {
    let mut first_determinant = [0.0; 20];
    fast_expansion_sum(common_term, cell_dependent_term, &mut first_determinant);
    expansion_approx(&first_determinant)
}

fn second_determinant_sign(
    common_term: &[f64; 4],
    difference_term: &[f64; 8],
    cell_dependent_term: &[f64; 16],
) -> f64 {
    let mut precomputed_second = [0.0; 12];
    expansion_sum(common_term, difference_term, &mut precomputed_second);
    let mut second_determinant = [0.0; 28];
    fast_expansion_sum(&precomputed_second, cell_dependent_term, &mut second_determinant);
    expansion_approx(&second_determinant)
}

fn good_first_sign(invert_signs: bool, first_sign: f64) -> bool {
    if invert_signs {
        first_sign > 0.0
    } else {
        first_sign < 0.0
    }
}

fn good_second_sign(invert_signs: bool, second_sign: f64) -> bool {
    if invert_signs {
        second_sign < 0.0
    } else {
        second_sign > 0.0
    }
}

/// Whether the line through `a` and `b` intersects the grid cell at
/// `(c_x, c_y)` under the given rounding mode.
pub fn line_intersects_cell(
    grid: &GridParameters,
    rounding: GridRounding,
    a: Vec2<f64>,
    b: Vec2<f64>,
    c: Vec2<i64>,
) -> bool {
    let flags = choose_flags(a.x, a.y, b.x, b.y);

    let dx = two_diff(a.x, b.x);
    let dy = two_diff(a.y, b.y);

    let common = common_term(a.x, a.y, b.x, b.y);

    let node = main_cell_node(rounding, flags.main_diagonal, c.x, c.y);
    let cell_dependent = cell_dependent_term(node.x, node.y, node.size_multiplier * grid.cell_size, dx, dy);

    let first_sign = first_determinant_sign(&common, &cell_dependent);
    if flags.main_diagonal && first_sign == 0.0 {
        return true;
    }
    if !good_first_sign(flags.invert_signs, first_sign) {
        return false;
    }

    let difference = difference_term(flags.main_diagonal, grid.cell_size, dx, dy);
    let second_sign = second_determinant_sign(&common, &difference, &cell_dependent);
    good_second_sign(flags.invert_signs, second_sign)
}

fn column_containing_position_impl(grid: &GridParameters, size: f64, x: f64) -> i64 {
    ar_pre!(x.abs() <= grid.max_input);
    ar_pre!(grid.desired_cell_size > 0.0);
    ar_pre!(size >= grid.desired_cell_size);

    let quotient = x / size;
    let candidate = quotient.floor();
    if candidate == quotient {
        // The quotient may have been rounded towards infinity, so the
        // result needs to be checked exactly.
        let mut difference = [0.0; 3];
        grow_expansion(&two_product(candidate, size), -x, &mut difference);
        let sign = expansion_approx(&difference);
        // candidate * size > x
        if sign > 0.0 {
            return exact_cast_f64_to_i64(candidate) - 1;
        }
    }
    exact_cast_f64_to_i64(candidate)
}

/// Index of the grid column containing `x`.
pub fn column_containing_position(grid: &GridParameters, rounding: GridRounding, x: f64) -> i64 {
    match rounding {
        GridRounding::Cell => column_containing_position_impl(grid, grid.cell_size, x),
        GridRounding::NearestNode => {
            half_cell_to_nearest_full_cell(column_containing_position_impl(grid, grid.cell_size / 2.0, x))
        }
    }
}

/// Index of the grid row containing `y`. Identical to
/// [`column_containing_position`] by symmetry of a square grid.
pub fn row_containing_position(grid: &GridParameters, rounding: GridRounding, y: f64) -> i64 {
    column_containing_position(grid, rounding, y)
}

/// Checks that the main boundary of column/row `x` lies between
/// coordinates `a` and `b`: `a <= size * x <= b` or `b <= size * x <= a`,
/// whichever order `a`, `b` are given in.
pub fn border_between_coordinates(cell_size: f64, a: f64, b: f64, x: i64) -> bool {
    ar_pre!(a != b);

    fn compare_border_and_coordinate(s: f64, n: i64, x: f64, cmp: impl Fn(f64, f64) -> bool) -> bool {
        let mut fms = [0.0; 3];
        let tmp = two_product(exact_cast_i64_to_f64(n), s);
        grow_expansion(&tmp, -x, &mut fms);
        cmp(expansion_approx(&fms), 0.0)
    }

    if a < b {
        compare_border_and_coordinate(cell_size, x, a, |l, r| l >= r)
            && compare_border_and_coordinate(cell_size, x, b, |l, r| l <= r)
    } else {
        compare_border_and_coordinate(cell_size, x, a, |l, r| l <= r)
            && compare_border_and_coordinate(cell_size, x, b, |l, r| l >= r)
    }
}

fn column_border_intersection_impl(
    grid: &GridParameters,
    size: f64,
    a_x: f64,
    a_y: f64,
    b_x: f64,
    b_y: f64,
    c_x: i64,
) -> i64 {
    ar_pre!(a_x != b_x);
    ar_pre!(border_between_coordinates(size, a_x, b_x, c_x));
    ar_pre!(a_x == 0.0 || a_x.abs() >= grid.min_input);
    ar_pre!(a_y == 0.0 || a_y.abs() >= grid.min_input);
    ar_pre!(b_x == 0.0 || b_x.abs() >= grid.min_input);
    ar_pre!(b_y == 0.0 || b_y.abs() >= grid.min_input);
    ar_pre!(a_x.abs() <= grid.max_input);
    ar_pre!(a_y.abs() <= grid.max_input);
    ar_pre!(b_x.abs() <= grid.max_input);
    ar_pre!(b_y.abs() <= grid.max_input);
    ar_pre!(grid.desired_cell_size > 0.0);
    ar_pre!(size >= grid.desired_cell_size);

    // The fused multiply-add is probably not required here, but it makes
    // error analysis easier.
    let t_numerator = exact_cast_i64_to_f64(c_x).mul_add(size, -a_x);
    let t_denominator = b_x - a_x;
    let t = t_numerator / t_denominator;
    let delta = b_y - a_y;
    let lerp_delta = delta * t;
    let lerp = a_y + lerp_delta;
    let intersection = lerp / size;

    // Checks if `value` can be the result of rounding a quotient towards
    // negative infinity.
    let check_value = |value: f64| -> bool {
        // a_y * b_x - a_x * b_y
        let mut numerator_1 = [0.0; 4];
        expansion_diff(&two_product(a_y, b_x), &two_product(a_x, b_y), &mut numerator_1);
        // size * (b_y - a_y)
        let mut size_dy = [0.0; 4];
        scale_expansion(&two_diff(b_y, a_y), size, &mut size_dy);
        // c_x * size * (b_y - a_y)
        let mut numerator_2 = [0.0; 8];
        scale_expansion(&size_dy, exact_cast_i64_to_f64(c_x), &mut numerator_2);

        let mut numerator = [0.0; 12];
        expansion_sum(&numerator_1, &numerator_2, &mut numerator);

        // size * (b_x - a_x)
        let mut denominator = [0.0; 4];
        scale_expansion(&two_diff(b_x, a_x), size, &mut denominator);

        // value * denominator
        let mut product = [0.0; 8];
        scale_expansion(&denominator, value, &mut product);
        // value * denominator - numerator
        let mut difference = [0.0; 20];
        expansion_diff(&product, &numerator, &mut difference);

        let difference_sign = expansion_approx(&difference);
        let positive_denominator = b_x > a_x;
        if positive_denominator {
            difference_sign <= 0.0
        } else {
            difference_sign >= 0.0
        }
    };

    // Computation of 1.0 - fractional_part may be inexact, so we can't
    // avoid branching on the sign of the value using floor().
    let integral_part = intersection.trunc();
    let fractional_part = (intersection - integral_part).abs();
    let truncated = exact_cast_f64_to_i64(integral_part);

    if intersection >= 0.0 {
        if fractional_part < grid.column_border_intersection.min_reliable_fractional_part
            && !check_value(integral_part)
        {
            return truncated - 1;
        }
        if fractional_part > grid.column_border_intersection.max_reliable_fractional_part
            && check_value(integral_part + 1.0)
        {
            return truncated + 1;
        }
        return truncated;
    }

    if fractional_part > grid.column_border_intersection.max_reliable_fractional_part
        && !check_value(integral_part - 1.0)
    {
        return truncated - 2;
    }
    if fractional_part < grid.column_border_intersection.min_reliable_fractional_part
        && check_value(integral_part)
    {
        return truncated;
    }
    truncated - 1
}

/// Finds the row containing the intersection of the line through `a`,
/// `b` with the left border of grid column `c_x`.
pub fn column_border_intersection(
    grid: &GridParameters,
    rounding: GridRounding,
    a: Vec2<f64>,
    b: Vec2<f64>,
    c_x: i64,
) -> i64 {
    let c_y = match rounding {
        GridRounding::Cell => {
            column_border_intersection_impl(grid, grid.cell_size, a.x, a.y, b.x, b.y, c_x)
        }
        GridRounding::NearestNode => half_cell_to_nearest_full_cell(column_border_intersection_impl(
            grid,
            grid.cell_size / 2.0,
            a.x,
            a.y,
            b.x,
            b.y,
            c_x * 2,
        )),
    };
    ar_post!(line_intersects_cell(grid, rounding, a, b, Vec2::new(c_x, c_y)));
    c_y
}

/// Finds the column containing the intersection of the line through `a`,
/// `b` with the bottom border of grid row `c_y`.
pub fn row_border_intersection(
    grid: &GridParameters,
    rounding: GridRounding,
    a: Vec2<f64>,
    b: Vec2<f64>,
    c_y: i64,
) -> i64 {
    let c_x = match rounding {
        GridRounding::Cell => column_border_intersection_impl(
            grid,
            grid.cell_size,
            -a.y,
            a.x,
            -b.y,
            b.x,
            -c_y,
        ),
        GridRounding::NearestNode => half_cell_to_nearest_full_cell(column_border_intersection_impl(
            grid,
            grid.cell_size / 2.0,
            -a.y,
            a.x,
            -b.y,
            b.x,
            -c_y * 2,
        )),
    };
    ar_post!(line_intersects_cell(grid, rounding, a, b, Vec2::new(c_x, c_y)));
    c_x
}

/// Maps a coordinate on the doubled "half-cell" grid used internally by
/// [`GridRounding::NearestNode`] to the nearest full-cell coordinate.
/// Uses floor-toward-negative-infinity division throughout; `value / 2`
/// alone mishandles odd negative inputs (e.g. it would map `-5` to `-2`
/// instead of the correct `-3`).
pub fn half_cell_to_nearest_full_cell(value: i64) -> i64 {
    if value >= -1 {
        (value + 1) / 2
    } else {
        (value - 1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_f64_detects_counterclockwise_triangle() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        let c = Vec2::new(0.0, 1.0);
        assert!(orientation_f64(a, b, c) > 0.0);
        assert!(orientation_f64(a, c, b) < 0.0);
    }

    #[test]
    fn orientation_f64_detects_collinear_points() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 1.0);
        let c = Vec2::new(2.0, 2.0);
        assert_eq!(orientation_f64(a, b, c), 0.0);
    }

    #[test]
    fn orientation_i64_matches_f64_on_small_integers() {
        let a = Vec2::new(0i64, 0i64);
        let b = Vec2::new(4i64, 0i64);
        let c = Vec2::new(0i64, 4i64);
        assert!(orientation_i64(a, b, c) > 0);
    }

    #[test]
    fn orientation_f32_detects_counterclockwise_triangle() {
        let a = Vec2::new(0.0f32, 0.0);
        let b = Vec2::new(1.0f32, 0.0);
        let c = Vec2::new(0.0f32, 1.0);
        assert!(orientation_f32(a, b, c) > 0.0);
        assert!(orientation_f32(a, c, b) < 0.0);
    }

    #[test]
    fn orientation_f32_detects_collinear_points() {
        let a = Vec2::new(0.0f32, 0.0);
        let b = Vec2::new(1.0f32, 1.0);
        let c = Vec2::new(2.0f32, 2.0);
        assert_eq!(orientation_f32(a, b, c), 0.0);
    }

    #[test]
    fn orientation_i16_matches_i64_on_small_integers() {
        let a = Vec2::new(0i16, 0i16);
        let b = Vec2::new(4i16, 0i16);
        let c = Vec2::new(0i16, 4i16);
        assert!(orientation_i16(a, b, c) > 0);
    }

    #[test]
    fn orientation_i16_handles_full_range_without_overflow() {
        let a = Vec2::new(i16::MIN, i16::MIN);
        let b = Vec2::new(i16::MAX, i16::MIN);
        let c = Vec2::new(i16::MIN, i16::MAX);
        assert!(orientation_i16(a, b, c) > 0);
    }

    #[test]
    fn half_cell_to_nearest_full_cell_uses_floor_division() {
        assert_eq!(half_cell_to_nearest_full_cell(-5), -3);
        assert_eq!(half_cell_to_nearest_full_cell(-4), -2);
        assert_eq!(half_cell_to_nearest_full_cell(-3), -2);
        assert_eq!(half_cell_to_nearest_full_cell(-2), -1);
        assert_eq!(half_cell_to_nearest_full_cell(-1), 0);
        assert_eq!(half_cell_to_nearest_full_cell(0), 0);
        assert_eq!(half_cell_to_nearest_full_cell(1), 1);
        assert_eq!(half_cell_to_nearest_full_cell(2), 1);
    }

    fn test_grid() -> GridParameters {
        GridParameters {
            cell_size: 1.0,
            desired_cell_size: 1.0,
            min_input: 0.0,
            max_input: 1.0e9,
            column_border_intersection: crate::grid::ColumnBorderIntersectionTolerance {
                min_reliable_fractional_part: 1.0e-6,
                max_reliable_fractional_part: 1.0 - 1.0e-6,
            },
        }
    }

    #[test]
    fn column_containing_position_floors_towards_negative_infinity() {
        let grid = test_grid();
        assert_eq!(
            column_containing_position(&grid, GridRounding::Cell, 3.5),
            3
        );
        assert_eq!(
            column_containing_position(&grid, GridRounding::Cell, -3.5),
            -4
        );
        assert_eq!(
            column_containing_position(&grid, GridRounding::Cell, 3.0),
            3
        );
    }

    #[test]
    fn line_intersects_cell_detects_axis_aligned_crossing() {
        let grid = test_grid();
        let a = Vec2::new(0.5, 0.5);
        let b = Vec2::new(2.5, 0.5);
        assert!(line_intersects_cell(
            &grid,
            GridRounding::Cell,
            a,
            b,
            Vec2::new(1, 0)
        ));
        assert!(!line_intersects_cell(
            &grid,
            GridRounding::Cell,
            a,
            b,
            Vec2::new(1, 5)
        ));
    }

    #[test]
    fn border_between_coordinates_accepts_enclosing_pair() {
        assert!(border_between_coordinates(1.0, 0.5, 2.5, 1));
        assert!(!border_between_coordinates(1.0, 0.5, 0.9, 1));
    }
}
