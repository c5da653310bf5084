use std::path::Path;

use log::debug;
use ndarray::ArrayView2;
use plotters::{prelude::*, style::colors::colormaps::ViridisRGB};

use crate::{
    error::{Error, Result},
    stats::{percentile, sorted_values},
};

/// Figure size in pixels, 10 x 6 inches at 100 dpi.
pub const FIGURE_SIZE: (u32, u32) = (1000, 600);
const COLORBAR_WIDTH: u32 = 140;
const COLORBAR_STEPS: usize = 256;
const CAPTION_SIZE: u32 = 28;
const BAD_VALUE: RGBColor = WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Colormap {
    Viridis,
    /// black → red → yellow → white
    Hot,
    Gray,
}

impl Colormap {
    /// Color for `t` in `[0, 1]`; values outside are clamped.
    pub fn color(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Viridis => ViridisRGB.get_color(t),
            Colormap::Hot => rgb([
                (t / 0.365079).clamp(0.0, 1.0),
                ((t - 0.365079) / (0.746032 - 0.365079)).clamp(0.0, 1.0),
                ((t - 0.746032) / (1.0 - 0.746032)).clamp(0.0, 1.0),
            ]),
            Colormap::Gray => rgb([t, t, t]),
        }
    }
}

fn rgb(channels: [f64; 3]) -> RGBColor {
    let [r, g, b] = channels.map(|c| (c * 255.0).round() as u8);
    RGBColor(r, g, b)
}

/// Color scale limits of a heatmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub vmin: f64,
    pub vmax: f64,
}

impl DisplayRange {
    /// 5th to 95th percentile of the finite values, clipping outliers.
    pub fn of(data: ArrayView2<'_, f32>) -> Self {
        let sorted = sorted_values(data.iter().copied().filter(|v| v.is_finite()));
        Self {
            vmin: percentile(sorted.as_deref(), 5.0),
            vmax: percentile(sorted.as_deref(), 95.0),
        }
    }

    fn normalize(&self, v: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span > 0.0 { (v - self.vmin) / span } else { 0.0 }
    }

    /// Value axis of the colorbar, widened when the range is empty or
    /// undefined.
    fn colorbar_limits(&self) -> (f64, f64) {
        match (self.vmin.is_finite(), self.vmax.is_finite()) {
            (true, true) if self.vmax > self.vmin => (self.vmin, self.vmax),
            (true, _) => (self.vmin - 0.5, self.vmin + 0.5),
            _ => (0.0, 1.0),
        }
    }
}

/// Render `data` with a percentile color range and save it as a PNG figure:
/// the title on top, the section as a heatmap (row 0 on top) and a colorbar
/// on the right.
pub fn render_heatmap(
    data: ArrayView2<'_, f32>,
    title: &str,
    colormap: Colormap,
    path: &Path,
) -> Result<()> {
    let range = DisplayRange::of(data);
    draw_figure(data, title, range, colormap, path)?;
    debug!(
        "created {path:?} ({colormap:?}, display range {:.4} to {:.4})",
        range.vmin, range.vmax
    );
    Ok(())
}

fn draw_figure(
    data: ArrayView2<'_, f32>,
    title: &str,
    range: DisplayRange,
    colormap: Colormap,
    path: &Path,
) -> Result<()> {
    let (ny, nx) = data.dim();
    let (width, _) = FIGURE_SIZE;

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(Error::plot(path))?;
    let (plot_area, colorbar_area) = root.split_horizontally(width - COLORBAR_WIDTH);

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(title, ("sans-serif", CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..nx as f64, 0.0..ny as f64)
        .map_err(Error::plot(path))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{:.0}", ny as f64 - v))
        .draw()
        .map_err(Error::plot(path))?;

    chart
        .draw_series(data.indexed_iter().map(|((row, col), &v)| {
            let color = if v.is_finite() {
                colormap.color(range.normalize(v as f64))
            } else {
                BAD_VALUE
            };
            let top = (ny - row) as f64;
            let left = col as f64;
            Rectangle::new([(left, top - 1.0), (left + 1.0, top)], color.filled())
        }))
        .map_err(Error::plot(path))?;

    let (lo, hi) = range.colorbar_limits();
    let mut colorbar = ChartBuilder::on(&colorbar_area)
        .margin(10)
        .margin_top(CAPTION_SIZE + 20)
        .margin_bottom(40)
        .set_label_area_size(LabelAreaPosition::Right, 80)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(Error::plot(path))?;

    colorbar
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()
        .map_err(Error::plot(path))?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    colorbar
        .draw_series((0..COLORBAR_STEPS).map(|i| {
            let v0 = lo + step * i as f64;
            let t = (i as f64 + 0.5) / COLORBAR_STEPS as f64;
            Rectangle::new([(0.0, v0), (1.0, v0 + step)], colormap.color(t).filled())
        }))
        .map_err(Error::plot(path))?;

    root.present().map_err(Error::plot(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use ndarray::{Array2, array};
    use tempfile::TempDir;

    use super::*;

    fn render(dir: &TempDir, name: &str, data: ArrayView2<'_, f32>, title: &str, colormap: Colormap) -> RgbImage {
        let path = dir.path().join(name);
        render_heatmap(data, title, colormap, &path).unwrap();
        image::open(&path).unwrap().to_rgb8()
    }

    /// Text and axis ink; no colormap entry is this dark except the low end
    /// of `hot` and `gray`.
    fn is_ink(&Rgb([r, g, b]): &Rgb<u8>) -> bool {
        r < 40 && g < 40 && b < 40
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(Colormap::Viridis.color(0.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.color(1.0), RGBColor(254, 232, 37));
        assert_eq!(Colormap::Hot.color(0.0), RGBColor(0, 0, 0));
        assert_eq!(Colormap::Hot.color(1.0), RGBColor(255, 255, 255));
        assert_eq!(Colormap::Gray.color(0.5), RGBColor(128, 128, 128));
        assert_eq!(Colormap::Gray.color(-3.0), RGBColor(0, 0, 0));
        assert_eq!(Colormap::Viridis.color(f64::NAN), RGBColor(68, 1, 84));
    }

    #[test]
    fn test_hot_is_red_before_green() {
        let RGBColor(r, g, b) = Colormap::Hot.color(0.3);
        assert!(r > 200);
        assert_eq!(g, 0);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_display_range_clips_outliers() {
        let mut values: Vec<f32> = (0..101).map(|v| v as f32).collect();
        values[100] = 1.0e6;
        let data = Array2::from_shape_vec((1, 101), values).unwrap();
        let range = DisplayRange::of(data.view());
        assert_eq!(range.vmin, 5.0);
        assert_eq!(range.vmax, 95.0);
    }

    #[test]
    fn test_display_range_ignores_non_finite() {
        let data = array![[f32::NAN, 1.0, 1.0, f32::INFINITY]];
        let range = DisplayRange::of(data.view());
        assert_eq!(range.vmin, 1.0);
        assert_eq!(range.vmax, 1.0);
    }

    #[test]
    fn test_flat_range_maps_to_low_end() {
        let range = DisplayRange::of(array![[2.0f32, 2.0]].view());
        assert_eq!(range.normalize(2.0), 0.0);
        assert_eq!(range.colorbar_limits(), (1.5, 2.5));

        let empty = DisplayRange::of(array![[f32::NAN]].view());
        assert_eq!(empty.colorbar_limits(), (0.0, 1.0));
    }

    #[test]
    fn test_heatmap_is_a_titled_figure() {
        let dir = TempDir::new().unwrap();
        let data = Array2::from_elem((6, 8), 3.0f32);

        let titled = render(&dir, "titled.png", data.view(), "Absolute Difference", Colormap::Viridis);
        let untitled = render(&dir, "untitled.png", data.view(), "", Colormap::Viridis);

        // room for a caption and a colorbar around the 6x8 section
        assert_eq!(titled.dimensions(), FIGURE_SIZE);

        // top band over the heatmap, right of the y tick labels
        let (width, height) = FIGURE_SIZE;
        let caption_band = |image: &RgbImage| -> Vec<Rgb<u8>> {
            (0..CAPTION_SIZE + 10)
                .flat_map(|y| (80..width - COLORBAR_WIDTH - 20).map(move |x| (x, y)))
                .map(|(x, y)| *image.get_pixel(x, y))
                .collect()
        };
        assert!(caption_band(&titled).iter().any(is_ink));
        assert!(!caption_band(&untitled).iter().any(is_ink));

        // a flat section sits at the low end of the colormap
        let centre = ((width - COLORBAR_WIDTH) / 2, height / 2);
        assert_eq!(*titled.get_pixel(centre.0, centre.1), Rgb([68, 1, 84]));
    }

    #[test]
    fn test_colorbar_has_vmax_on_top() {
        let dir = TempDir::new().unwrap();
        let data = Array2::from_shape_fn((6, 8), |(y, x)| (y * 8 + x) as f32);
        let image = render(&dir, "ramp.png", data.view(), "ramp", Colormap::Gray);

        let (width, height) = FIGURE_SIZE;
        let x = width - COLORBAR_WIDTH + 20;
        let Rgb([top, ..]) = *image.get_pixel(x, CAPTION_SIZE + 40);
        let Rgb([bottom, ..]) = *image.get_pixel(x, height - 60);
        assert!(top > 200, "top of colorbar is {top}");
        assert!(bottom < 50, "bottom of colorbar is {bottom}");
    }

    #[test]
    fn test_non_finite_values_are_drawn_blank() {
        let dir = TempDir::new().unwrap();
        let data = Array2::from_elem((4, 4), f32::NAN);
        let image = render(&dir, "nan.png", data.view(), "empty", Colormap::Hot);

        let (width, height) = FIGURE_SIZE;
        let centre = *image.get_pixel((width - COLORBAR_WIDTH) / 2, height / 2);
        assert_eq!(centre, Rgb([255, 255, 255]));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let data = Array2::from_elem((2, 2), 1.0f32);
        let path = dir.path().join("missing").join("map.png");
        assert!(matches!(
            render_heatmap(data.view(), "x", Colormap::Gray, &path),
            Err(Error::Plot { .. })
        ));
    }
}
