use std::{error::Error, path::PathBuf};

use clap::Parser;
use mrc_tools::{
    logging,
    resample::{self, ScaleParams},
};

/// Scale MRC files by a given factor.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Path to the input MRC file.
    #[arg(long)]
    input_file: PathBuf,

    /// Voxel size of the input MRC file.
    #[arg(long)]
    input_voxel_size: f64,

    /// Path to save the scaled MRC file.
    #[arg(long)]
    output_file: PathBuf,

    /// Scaling factor for the MRC data, applied to both in-plane axes.
    #[arg(long)]
    scale_factor: f64,
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    let multi_progress = logging::init()?;

    let args = Args::parse();

    let params = ScaleParams {
        input_file: args.input_file,
        input_voxel_size: args.input_voxel_size,
        output_file: args.output_file,
        scale_factor: args.scale_factor,
    };
    resample::scale_mrc(&params, &multi_progress)?;

    println!("Scaled MRC file saved to {}", params.output_file.display());

    Ok(())
}
