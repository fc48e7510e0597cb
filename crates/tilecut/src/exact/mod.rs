//! Exact arithmetic: error-free expansions and the geometric predicates
//! built on top of them.

pub mod expansion;
pub mod predicates;

pub use expansion::{
    expansion_approx, expansion_diff, expansion_sum, fast_expansion_difference,
    fast_expansion_sum, fast_two_diff, fast_two_sum, grow_expansion, scale_expansion, two_diff,
    two_product, two_sum,
};
pub use predicates::{
    border_between_coordinates, column_border_intersection, column_containing_position,
    half_cell_to_nearest_full_cell, line_intersects_cell, orientation_f32, orientation_f64,
    orientation_i16, orientation_i64, row_border_intersection, row_containing_position,
};
