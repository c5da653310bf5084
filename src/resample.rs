//! Linear resampling of image stacks.
//!
//! Each section is zoomed in-plane by the same factor; the section axis is
//! never resampled. Grid corners stay aligned: the first and last output
//! samples of an axis sit exactly on the first and last input samples.

use std::{path::PathBuf, time::Instant};

use indicatif::{MultiProgress, ParallelProgressIterator, ProgressBar};
use log::info;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    error::{Error, Result},
    read::{self, ReadMode, Volume},
    write::write_volume,
};

#[derive(Debug, Clone)]
pub struct ScaleParams {
    pub input_file: PathBuf,
    /// Angstrom per voxel of the input
    pub input_voxel_size: f64,
    pub output_file: PathBuf,
    /// applied to both in-plane axes
    pub scale_factor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleReport {
    pub input_shape: (usize, usize, usize),
    pub output_shape: (usize, usize, usize),
    pub output_voxel_size: f64,
}

/// Load, resample and write a stack as described by `params`.
pub fn scale_mrc(params: &ScaleParams, multi_progress: &MultiProgress) -> Result<ScaleReport> {
    let t0 = Instant::now();
    let output_voxel_size = output_voxel_size(params.input_voxel_size, params.scale_factor)?;

    let input = read::open(&params.input_file, ReadMode::Strict)?;
    let (nz, ny, nx) = input.shape();
    info!("dimensions: {nz}x{ny}x{nx}");

    let progress = multi_progress.add(ProgressBar::new(nz as u64));
    let scaled = zoom_sections(input.data(), params.scale_factor, &progress)?;
    progress.finish();
    multi_progress.remove(&progress);

    let output_shape = scaled.dim();
    let (oz, oy, ox) = output_shape;
    info!("scaled to {oz}x{oy}x{ox}, voxel size {output_voxel_size}");

    let label = format!("mrc-scale: in-plane zoom by {}", params.scale_factor);
    let output = Volume::new(scaled, input.mode(), [output_voxel_size as f32; 3]);
    write_volume(&params.output_file, &output, &[&label])?;

    info!("scaling done in {:?}", t0.elapsed());

    Ok(ScaleReport {
        input_shape: input.shape(),
        output_shape,
        output_voxel_size,
    })
}

/// Voxel size after zooming by `scale_factor`, keeping physical units.
pub fn output_voxel_size(input_voxel_size: f64, scale_factor: f64) -> Result<f64> {
    if !(scale_factor.is_finite() && scale_factor > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "scale factor must be a positive number, got {scale_factor}"
        )));
    }
    if !(input_voxel_size.is_finite() && input_voxel_size > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "voxel size must be a positive number, got {input_voxel_size}"
        )));
    }
    Ok(input_voxel_size / scale_factor)
}

/// Output length of an axis of length `n` zoomed by `factor`, rounding half
/// to even.
pub fn zoomed_len(n: usize, factor: f64) -> usize {
    (n as f64 * factor).round_ties_even() as usize
}

/// Zoom every section of `data` by `(1, factor, factor)`.
pub fn zoom_sections(data: &Array3<f32>, factor: f64, progress: &ProgressBar) -> Result<Array3<f32>> {
    let (nz, ny, nx) = data.dim();
    if nz == 0 || ny == 0 || nx == 0 {
        return Err(Error::Degenerate(format!(
            "cannot resample an empty stack of shape {:?}",
            data.dim()
        )));
    }
    let out_shape = (zoomed_len(ny, factor), zoomed_len(nx, factor));
    if out_shape.0 == 0 || out_shape.1 == 0 {
        return Err(Error::Degenerate(format!(
            "zoom by {factor} turns {ny}x{nx} sections into {}x{}",
            out_shape.0, out_shape.1
        )));
    }

    let idxs: Vec<usize> = (0..nz).collect();
    let sections: Vec<Array2<f32>> = idxs
        .into_par_iter()
        .progress_with(progress.clone())
        .map(|z| resample_section(data.index_axis(Axis(0), z), out_shape))
        .collect();

    let mut scaled = Array3::zeros((nz, out_shape.0, out_shape.1));
    for (mut dest, section) in scaled.outer_iter_mut().zip(&sections) {
        dest.assign(section);
    }
    Ok(scaled)
}

/// Bilinear resampling of a non-empty section onto a `(rows, cols)` grid.
pub fn resample_section(section: ArrayView2<'_, f32>, out_shape: (usize, usize)) -> Array2<f32> {
    let (ny, nx) = section.dim();
    let rows = axis_samples(ny, out_shape.0);
    let cols = axis_samples(nx, out_shape.1);

    Array2::from_shape_fn(out_shape, |(oy, ox)| {
        let (y0, y1, fy) = rows[oy];
        let (x0, x1, fx) = cols[ox];
        let top = lerp(section[[y0, x0]] as f64, section[[y0, x1]] as f64, fx);
        let bottom = lerp(section[[y1, x0]] as f64, section[[y1, x1]] as f64, fx);
        lerp(top, bottom, fy) as f32
    })
}

/// For each output index: the two input neighbours and the weight of the
/// second one.
fn axis_samples(n_in: usize, n_out: usize) -> Vec<(usize, usize, f64)> {
    let last = (n_in - 1) as f64;
    let step = if n_out > 1 {
        last / (n_out - 1) as f64
    } else {
        0.0
    };
    (0..n_out)
        .map(|o| {
            let pos = (o as f64 * step).min(last);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n_in - 1);
            (lo, hi, pos - lo as f64)
        })
        .collect()
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t == 0.0 { a } else { a + t * (b - a) }
}
