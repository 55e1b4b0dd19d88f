use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gdx::{
    algo::{self, values_equal_with_tolerance},
    raster::io,
    Array as _, Cell, DenseRaster,
};

#[derive(Parser, Debug)]
#[clap(name = "gdxcmp", about = "Structural comparison of two raster files")]
struct Opt {
    /// Reference raster
    expected: PathBuf,

    /// Actual raster
    actual: PathBuf,

    /// Check for metadata differences
    #[clap(long = "check-meta", short = 'm')]
    check_meta: bool,

    /// Print every value difference
    #[clap(long, short = 'v')]
    verbose: bool,

    /// Use floating point comparison with the given tolerance
    #[clap(long = "floating-point-tolerance", short = 'f')]
    tolerance: Option<f64>,
}

fn compare_rasters(opt: &Opt) -> gdx::Result<bool> {
    let expected = io::read_any(&opt.expected)?;
    let actual = io::read_any(&opt.actual)?;

    if opt.check_meta && expected.metadata() != actual.metadata() {
        eprintln!("Metadata mismatch:\n{}\n{}", expected.metadata(), actual.metadata());
        return Ok(false);
    }

    let tolerance = opt.tolerance.unwrap_or(0.0);
    let expected: DenseRaster<f64> = expected.cast_to();
    let actual: DenseRaster<f64> = actual.cast_to();

    let diff = algo::diff_rasters(&expected, &actual, tolerance)?;
    if diff.is_exact_match() {
        println!("Rasters are equal!");
        return Ok(true);
    }

    println!("# matches:\t\t{}", diff.equal);

    if diff.data_difference > 0 {
        println!("# mismatches:\t{}", diff.data_difference);
    }

    if diff.zero_to_non_zero > 0 {
        println!("# zero -> non zero:\t{}", diff.zero_to_non_zero);
    }

    if diff.non_zero_to_zero > 0 {
        println!("# non zero -> zero:\t{}", diff.non_zero_to_zero);
    }

    if diff.zero_to_nodata > 0 {
        println!("# zero -> nodata:\t{}", diff.zero_to_nodata);
    }

    if diff.non_zero_to_nodata > 0 {
        println!("# non zero -> nodata:\t{}", diff.non_zero_to_nodata);
    }

    if diff.nodata_to_zero > 0 {
        println!("# nodata -> zero:\t{}", diff.nodata_to_zero);
    }

    if diff.nodata_to_non_zero > 0 {
        println!("# nodata -> non zero:\t{}", diff.nodata_to_non_zero);
    }

    if opt.verbose {
        for r in 0..expected.rows().count() {
            for c in 0..expected.columns().count() {
                let cell = Cell::from_row_col(r, c);
                if let (Some(exp), Some(act)) = (expected.cell_value(cell), actual.cell_value(cell)) {
                    if !values_equal_with_tolerance(exp, act, tolerance) {
                        println!("value difference at cell ({r},{c}): {exp} != {act}");
                    }
                }
            }
        }
    }

    Ok(false)
}

fn main() -> ExitCode {
    env_logger::init();

    let opt = Opt::parse();
    match compare_rasters(&opt) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("gdxcmp: {err}");
            ExitCode::FAILURE
        }
    }
}
