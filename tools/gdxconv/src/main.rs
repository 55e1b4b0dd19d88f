use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gdx::{raster::io, ArrayDataType, Error};
use log::info;

#[derive(Parser, Debug)]
#[clap(name = "gdxconv", about = "Raster conversion: projection override, type cast and format conversion")]
struct Opt {
    /// Input raster
    input: PathBuf,

    /// Output raster
    output: PathBuf,

    /// Override the projection with the given EPSG code
    #[clap(long)]
    epsg: Option<i32>,

    /// Cast to the given element type (byte|int|float|double)
    #[clap(long = "type")]
    data_type: Option<String>,

    /// Apply a named color map when writing an image
    #[clap(long = "color-map")]
    color_map: Option<String>,
}

fn convert(opt: &Opt) -> gdx::Result {
    let mut raster = io::read_any(&opt.input)?;

    if let Some(epsg) = opt.epsg {
        raster.set_projection_from_epsg(epsg);
    }

    if let Some(type_name) = &opt.data_type {
        let data_type = ArrayDataType::from_str(type_name)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid element type: {type_name}")))?;
        if data_type != raster.data_type() {
            raster = raster.cast(data_type);
        }
    }

    if opt.color_map.is_some() {
        return Err(Error::Runtime(
            "Color mapped image output requires the imaging collaborator".to_string(),
        ));
    }

    info!("Writing {} raster to {}", raster.data_type(), opt.output.display());
    io::write_any(&raster, &opt.output)
}

fn main() -> ExitCode {
    env_logger::init();

    let opt = Opt::parse();
    match convert(&opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gdxconv: {err}");
            ExitCode::FAILURE
        }
    }
}
