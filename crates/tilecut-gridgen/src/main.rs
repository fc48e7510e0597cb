//! Computes a `GridParameters` constant from a world-size/cell-count
//! bound and prints it as a Rust item, ready to paste into a caller that
//! needs a fixed grid for a known coordinate range.
//!
//! Every arithmetic step runs over exact rationals
//! ([`num_rational::BigRational`]); the only place a double's limited
//! precision matters is the final `RoundDown`/`RoundUp` back to `f64`,
//! done explicitly by [`rational::round_toward`].

mod rational;

use clap::Parser;
use std::process::ExitCode;
use tilecut::grid::{ColumnBorderIntersectionTolerance, GridParameters};

/// Inverse of the smallest gap between distinct doubles MPFR guaranteed
/// for the 53-bit mantissa the original tool used; kept as a named
/// constant since it appears nowhere else and has no other derivation.
const MANTISSA_ULPS: u32 = 21;
const DOUBLE_PRECISION_BITS: u32 = 53;

#[derive(Parser, Debug)]
#[command(about = "Computes tilecut GridParameters constants for a world-size/cell-count bound")]
struct Arguments {
    /// Name of the emitted Rust constant.
    #[arg(long)]
    name: String,

    /// Number of grid cells the world width is divided into.
    #[arg(long)]
    world_cells: String,

    /// Width of the world, in input coordinate units.
    #[arg(long)]
    world_size: String,

    /// Smallest absolute input coordinate value that must round
    /// correctly (0 is always exempt).
    #[arg(long, default_value = "0")]
    min_world_coordinate: String,

    /// Largest absolute input coordinate value that must round
    /// correctly.
    #[arg(long)]
    max_world_coordinate: String,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("invalid --{option}: {source}")]
    InvalidArgument {
        option: &'static str,
        #[source]
        source: rational::ParseError,
    },
    #[error("world_cells must be positive")]
    NonPositiveWorldCells,
}

fn parse_argument(option: &'static str, value: &str) -> Result<f64, Error> {
    rational::parse_float(value).map_err(|source| Error::InvalidArgument { option, source })
}

fn compute_grid_parameters(args: &Arguments) -> Result<GridParameters, Error> {
    let world_cells = parse_argument("world-cells", &args.world_cells)?;
    let world_size = parse_argument("world-size", &args.world_size)?;
    let min_world_coordinate = parse_argument("min-world-coordinate", &args.min_world_coordinate)?;
    let max_world_coordinate = parse_argument("max-world-coordinate", &args.max_world_coordinate)?;
    if world_cells <= 0.0 {
        return Err(Error::NonPositiveWorldCells);
    }

    let world_size_r = rational::exact_rational_from_f64(world_size);
    let world_cells_r = rational::exact_rational_from_f64(world_cells);
    let min_grid_step = rational::round_toward(&(world_size_r / world_cells_r), false);

    let unit_in_last_place = rational::exact_rational_from_f64(2.0f64.powi(-(DOUBLE_PRECISION_BITS as i32)));
    let numerator = rational::exact_rational_from_f64(MANTISSA_ULPS as f64)
        * rational::exact_rational_from_f64(max_world_coordinate)
        * unit_in_last_place;
    let min_grid_step_r = rational::exact_rational_from_f64(min_grid_step);
    let min_reliable_fractional_part = rational::round_toward(&(numerator / min_grid_step_r), true);

    let one = rational::exact_rational_from_f64(1.0);
    let min_reliable_fractional_part_r = rational::exact_rational_from_f64(min_reliable_fractional_part);
    let max_reliable_fractional_part = rational::round_toward(&(one - min_reliable_fractional_part_r), false);

    Ok(GridParameters {
        cell_size: min_grid_step,
        desired_cell_size: min_grid_step,
        min_input: min_world_coordinate,
        max_input: max_world_coordinate,
        column_border_intersection: ColumnBorderIntersectionTolerance {
            min_reliable_fractional_part,
            max_reliable_fractional_part,
        },
    })
}

/// Renders `params` as a Rust item `pub const {name}: tilecut::GridParameters = ...;`.
///
/// Relies on `GridParameters`'s derived `Debug` producing the same
/// syntax as a struct literal; the nested type name gets the same
/// `tilecut::` qualification stitched in afterward since `{:?}` has no
/// notion of the path a caller would use to name it.
fn render_constant(name: &str, params: &GridParameters) -> String {
    let body = format!("{params:?}").replacen("GridParameters", "tilecut::GridParameters", 1).replacen(
        "ColumnBorderIntersectionTolerance",
        "tilecut::ColumnBorderIntersectionTolerance",
        1,
    );
    format!("pub const {name}: tilecut::GridParameters = {body};")
}

fn run() -> Result<String, Error> {
    let args = Arguments::parse();
    let params = compute_grid_parameters(&args)?;
    Ok(render_constant(&args.name, &params))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    match run() {
        Ok(literal) => {
            println!("{literal}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to compute grid parameters");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(world_cells: &str, world_size: &str, max_world_coordinate: &str) -> Arguments {
        Arguments {
            name: "TEST_GRID".to_string(),
            world_cells: world_cells.to_string(),
            world_size: world_size.to_string(),
            min_world_coordinate: "0".to_string(),
            max_world_coordinate: max_world_coordinate.to_string(),
        }
    }

    #[test]
    fn compute_grid_parameters_matches_hand_computed_rationals() {
        // world_size = 1024, world_cells = 10 -> min_grid_step rounds down
        // from the exact rational 102.4.
        let params = compute_grid_parameters(&args("10", "1024", "1024")).unwrap();
        assert_eq!(params.cell_size, rational::round_toward(&rational::exact_rational_from_f64(102.4), false));
        assert!(params.cell_size <= 102.4);

        let min_grid_step_r = rational::exact_rational_from_f64(params.cell_size);
        let expected_min_reliable = rational::round_toward(
            &((rational::exact_rational_from_f64(21.0) * rational::exact_rational_from_f64(1024.0)
                * rational::exact_rational_from_f64(2.0f64.powi(-53)))
                / min_grid_step_r),
            true,
        );
        assert_eq!(params.column_border_intersection.min_reliable_fractional_part, expected_min_reliable);
        assert!(
            params.column_border_intersection.max_reliable_fractional_part
                < 1.0 - params.column_border_intersection.min_reliable_fractional_part
                || params.column_border_intersection.max_reliable_fractional_part
                    == 1.0 - params.column_border_intersection.min_reliable_fractional_part
        );
    }

    #[test]
    fn compute_grid_parameters_rejects_non_positive_world_cells() {
        assert!(matches!(compute_grid_parameters(&args("0", "1024", "1024")), Err(Error::NonPositiveWorldCells)));
    }

    #[test]
    fn compute_grid_parameters_rejects_inexact_literal_without_prefix() {
        assert!(compute_grid_parameters(&args("0.1", "1024", "1024")).is_err());
    }

    #[test]
    fn render_constant_produces_qualified_struct_literal() {
        let params = compute_grid_parameters(&args("10", "1024", "1024")).unwrap();
        let rendered = render_constant("TEST_GRID", &params);
        assert!(rendered.starts_with("pub const TEST_GRID: tilecut::GridParameters = tilecut::GridParameters {"));
        assert!(rendered.contains("tilecut::ColumnBorderIntersectionTolerance {"));
        assert!(rendered.ends_with("};"));
    }
}
