use std::{error::Error, io, path::PathBuf};

use clap::Parser;
use log::info;
use mrc_tools::{
    compare::{self, CompareParams, NamedInput},
    logging,
    render::Colormap,
};

/// Compare 2D sections of two MRC files.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Name of the first MRC file for display purposes.
    #[arg(long)]
    mrc_file_1_name: String,

    /// Name of the second MRC file for display purposes.
    #[arg(long)]
    mrc_file_2_name: String,

    /// Path to the first MRC file.
    #[arg(long)]
    mrc_file_1: PathBuf,

    /// Path to the second MRC file.
    #[arg(long)]
    mrc_file_2: PathBuf,

    /// One or more space-separated, 1-indexed section numbers to compare (e.g. 1 5 10).
    #[arg(long, required = true, num_args = 1.., value_parser = clap::value_parser!(u64).range(1..))]
    sections: Vec<u64>,

    /// Directory to save the output plots.
    #[arg(long, default_value = "./mrc_comparison_results")]
    output_dir: PathBuf,

    /// Colormap for the two data heatmaps.
    #[arg(long, value_enum, default_value_t = Colormap::Viridis)]
    colormap: Colormap,

    /// Colormap for the absolute difference heatmap.
    #[arg(long, value_enum, default_value_t = Colormap::Hot)]
    difference_colormap: Colormap,
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {
    logging::init()?;

    let args = Args::parse();

    let params = CompareParams {
        first: NamedInput {
            name: args.mrc_file_1_name,
            path: args.mrc_file_1,
        },
        second: NamedInput {
            name: args.mrc_file_2_name,
            path: args.mrc_file_2,
        },
        sections: args.sections.into_iter().map(|s| s as usize).collect(),
        output_dir: args.output_dir,
        colormap: args.colormap,
        difference_colormap: args.difference_colormap,
    };

    let summary = compare::compare(&params, &mut io::stdout().lock())?;
    info!(
        "wrote {} heatmap(s) to {:?}",
        summary.written.len(),
        params.output_dir
    );

    Ok(())
}
