use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Instant,
};

use log::{info, warn};
use ndarray::{Array2, ArrayView2, Zip};

use crate::{
    error::{Error, Result},
    read::{self, ReadMode, Volume},
    render::{Colormap, render_heatmap},
    stats::Summary,
};

/// A file to compare and the name it is shown under.
#[derive(Debug, Clone)]
pub struct NamedInput {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CompareParams {
    pub first: NamedInput,
    pub second: NamedInput,
    /// 1-indexed, processed in order, duplicates allowed
    pub sections: Vec<usize>,
    pub output_dir: PathBuf,
    pub colormap: Colormap,
    pub difference_colormap: Colormap,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompareSummary {
    pub processed: Vec<usize>,
    pub skipped: Vec<usize>,
    pub written: Vec<PathBuf>,
}

/// Compare the requested sections of two MRC files, writing statistics to
/// `out` and three heatmaps per section into the output directory.
pub fn compare(params: &CompareParams, out: &mut impl Write) -> Result<CompareSummary> {
    let t0 = Instant::now();

    let first = read::open(&params.first.path, ReadMode::Permissive)?;
    let second = read::open(&params.second.path, ReadMode::Permissive)?;

    let summary = compare_volumes(&first, &second, params, out)?;

    info!(
        "compared {} section(s), skipped {}, in {:?}",
        summary.processed.len(),
        summary.skipped.len(),
        t0.elapsed()
    );
    Ok(summary)
}

pub fn compare_volumes(
    first: &Volume,
    second: &Volume,
    params: &CompareParams,
    out: &mut impl Write,
) -> Result<CompareSummary> {
    if first.shape() != second.shape() {
        return Err(Error::ShapeMismatch {
            first: first.shape(),
            second: second.shape(),
        });
    }
    let (nz, ny, nx) = first.shape();
    info!("dimensions: {nz}x{ny}x{nx}");

    std::fs::create_dir_all(&params.output_dir).map_err(Error::io(&params.output_dir))?;

    let mut summary = CompareSummary::default();
    for &section in &params.sections {
        writeln!(out, "\n{0} Processing Section {section} {0}", "=".repeat(20))
            .map_err(Error::Report)?;

        // `section` is 1-indexed
        let slices = section
            .checked_sub(1)
            .and_then(|z| Some((first.section(z)?, second.section(z)?)));
        let Some((a, b)) = slices else {
            let message = format!(
                "Section {section} is out of bounds for shape {:?}. Skipping.",
                first.shape()
            );
            warn!("{message}");
            writeln!(out, "Warning: {message}").map_err(Error::Report)?;
            summary.skipped.push(section);
            continue;
        };

        let written = compare_section(a, b, section, params, out)?;
        summary.processed.push(section);
        summary.written.extend(written);
    }

    Ok(summary)
}

/// Statistics and heatmaps for one pair of same-shape sections.
pub fn compare_section(
    a: ArrayView2<'_, f32>,
    b: ArrayView2<'_, f32>,
    section: usize,
    params: &CompareParams,
    out: &mut impl Write,
) -> Result<Vec<PathBuf>> {
    let difference = abs_difference(a, b)?;
    let first_label = format!("{} Data", params.first.name);
    let second_label = format!("{} Data", params.second.name);

    for summary in [
        Summary::of(first_label.as_str(), a),
        Summary::of(second_label.as_str(), b),
        Summary::of("Difference", difference.view()),
    ] {
        writeln!(out, "  - {summary}").map_err(Error::Report)?;
    }

    let dir = &params.output_dir;
    let first_path = section_path(dir, section, &format!("{}_data", params.first.name));
    render_heatmap(a, &first_label, params.colormap, &first_path)?;

    let second_path = section_path(dir, section, &format!("{}_data", params.second.name));
    render_heatmap(b, &second_label, params.colormap, &second_path)?;

    let difference_path = section_path(dir, section, "absolute_difference");
    render_heatmap(
        difference.view(),
        "Absolute Difference",
        params.difference_colormap,
        &difference_path,
    )?;

    Ok(vec![first_path, second_path, difference_path])
}

/// Element-wise `|a - b|`.
pub fn abs_difference(a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
    if a.dim() != b.dim() {
        return Err(Error::InvalidParameter(format!(
            "sections differ in shape: {:?} vs {:?}",
            a.dim(),
            b.dim()
        )));
    }
    Ok(Zip::from(&a).and(&b).map_collect(|x, y| (x - y).abs()))
}

pub fn section_path(output_dir: &Path, section: usize, suffix: &str) -> PathBuf {
    output_dir.join(format!("section_{section}_{suffix}.png"))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_abs_difference() {
        let a = array![[1.0f32, -2.0, 3.5], [0.0, 10.0, -7.25]];
        let b = array![[4.0f32, -2.0, 1.5], [-1.0, -10.0, 7.25]];
        let d = abs_difference(a.view(), b.view()).unwrap();

        assert_eq!(d, array![[3.0, 0.0, 2.0], [1.0, 20.0, 14.5]]);
        for ((idx, v), (x, y)) in d.indexed_iter().zip(a.iter().zip(b.iter())) {
            assert!(*v >= 0.0, "negative difference at {idx:?}");
            assert_eq!(*v, (x - y).abs());
        }
    }

    #[test]
    fn test_abs_difference_is_symmetric() {
        let a = array![[0.5f32, 8.0], [-3.0, 2.0]];
        let b = array![[1.0f32, -8.0], [3.0, 2.0]];
        assert_eq!(
            abs_difference(a.view(), b.view()).unwrap(),
            abs_difference(b.view(), a.view()).unwrap()
        );
    }

    #[test]
    fn test_abs_difference_shape_mismatch() {
        let a = Array2::<f32>::zeros((2, 3));
        let b = Array2::<f32>::zeros((3, 2));
        assert!(matches!(
            abs_difference(a.view(), b.view()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_section_path() {
        let path = section_path(Path::new("out"), 3, "tomo_data");
        assert_eq!(path, Path::new("out/section_3_tomo_data.png"));
    }
}
