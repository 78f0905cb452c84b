use crate::{
    map,
    options::PlotArgs,
    style::{Axis, Styled},
};
use anyhow::{bail, Error as AnyError};
use log::info;
use plotters::{
    coord::{cartesian::Cartesian2d, types::RangedCoordf64, Shift},
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use std::ops::Range;
use transect::{finite_range, CrossSection, Grid, Profile};

/// Relative heights of the layer panel (top) and data panel (bottom).
const LAYER_PANEL: f64 = 9.0;
const DATA_PANEL: f64 = 2.5;

/// Share of the figure width given to the location map.
const MAP_WIDTH: f64 = 0.3;

/// Everything needed to draw one figure.
pub struct Figure<'a> {
    pub section: &'a CrossSection,
    pub layers: &'a [Styled],
    pub data: &'a [Styled],

    /// Grid shown in plan view, with its name.
    pub map: Option<(&'a str, &'a Grid)>,

    pub args: &'a PlotArgs,
}

/// Renders `figure` to `figure.args.out`, PNG or SVG by extension.
pub fn render(figure: &Figure) -> Result<(), AnyError> {
    let args = figure.args;
    let size = (args.width, args.height);
    let ext = args
        .out
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("svg") => draw(SVGBackend::new(&args.out, size).into_drawing_area(), figure)?,
        Some("png") => draw(BitMapBackend::new(&args.out, size).into_drawing_area(), figure)?,
        _ => bail!("unsupported image format {}, use .png or .svg", args.out.display()),
    }
    info!("wrote {}", args.out.display());
    Ok(())
}

fn draw<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, figure: &Figure) -> Result<(), AnyError>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = match &figure.args.title {
        Some(title) => root.titled(title, ("sans-serif", 28))?,
        None => root,
    };

    let (width, height) = root.dim_in_pixel();
    let root = match figure.map {
        Some((name, grid)) => {
            let (left, right) = root.split_horizontally(scale(width, MAP_WIDTH));
            map::draw_map(&left, name, grid, figure)?;
            right
        }
        None => root,
    };

    let has_layers = !figure.section.layers.columns().is_empty();
    match (has_layers, &figure.section.data) {
        (true, Some(data)) => {
            let split = scale(height, LAYER_PANEL / (LAYER_PANEL + DATA_PANEL));
            let (top, bottom) = root.split_vertically(split);
            draw_layers(&top, figure, true)?;
            draw_data(&bottom, data, figure, false)?;
        }
        (true, None) => draw_layers(&root, figure, true)?,
        (false, Some(data)) => draw_data(&root, data, figure, true)?,
        (false, None) => bail!("nothing to plot"),
    }

    root.present()?;
    Ok(())
}

fn draw_layers<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
    labels: bool,
) -> Result<(), AnyError>
where
    DB::ErrorType: 'static,
{
    let profile = &figure.section.layers;
    let x_range = distance_range(profile.distances());
    let y_range = padded_range(profile.value_range(), figure.args.layer_buffer);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;
    chart
        .configure_mesh()
        .x_desc("Distance (m)")
        .y_desc("Elevation (m)")
        .draw()?;

    // In order, so each layer covers the fill of the ones above it.
    for (column, style) in profile.columns().iter().zip(figure.layers) {
        let color = style.color;
        for (i, run) in finite_runs(profile.distances(), &column.values)
            .into_iter()
            .enumerate()
        {
            let series = chart.draw_series(
                AreaSeries::new(run, y_range.start, color.filled()).border_style(&BLACK),
            )?;
            if i == 0 {
                series.label(&column.name).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled())
                });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    if labels {
        draw_end_labels(chart.plotting_area(), &x_range, &y_range, figure.args)?;
    }
    Ok(())
}

fn draw_data<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &Profile,
    figure: &Figure,
    labels: bool,
) -> Result<(), AnyError>
where
    DB::ErrorType: 'static,
{
    let on_axis = |axis: Axis| {
        data.columns()
            .iter()
            .zip(figure.data)
            .filter(move |(_, style)| style.axis == axis)
    };
    let range = |axis| finite_range(on_axis(axis).flat_map(|(column, _)| column.values.iter()));
    let names = |axis| {
        on_axis(axis)
            .map(|(column, _)| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let x_range = distance_range(data.distances());
    let y_range = padded_range(range(Axis::Left), figure.args.data_buffer);
    let y2_range = padded_range(range(Axis::Right), figure.args.data_buffer);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?
        .set_secondary_coord(x_range.clone(), y2_range);
    chart
        .configure_mesh()
        .x_desc("Distance (m)")
        .y_desc(names(Axis::Left))
        .draw()?;
    if on_axis(Axis::Right).next().is_some() {
        chart
            .configure_secondary_axes()
            .y_desc(names(Axis::Right))
            .draw()?;
    }

    for (column, style) in data.columns().iter().zip(figure.data) {
        let color = style.color;
        for (i, run) in finite_runs(data.distances(), &column.values)
            .into_iter()
            .enumerate()
        {
            let line = LineSeries::new(run, color.stroke_width(2));
            let series = match style.axis {
                Axis::Left => chart.draw_series(line)?,
                Axis::Right => chart.draw_secondary_series(line)?,
            };
            if i == 0 {
                series.label(&column.name).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    if labels {
        draw_end_labels(chart.plotting_area(), &x_range, &y_range, figure.args)?;
    }
    Ok(())
}

/// Writes the start and end labels in the top corners of a panel.
fn draw_end_labels<DB: DrawingBackend>(
    area: &DrawingArea<DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x_range: &Range<f64>,
    y_range: &Range<f64>,
    args: &PlotArgs,
) -> Result<(), AnyError>
where
    DB::ErrorType: 'static,
{
    let font = ("sans-serif", 24).into_font();
    area.draw(&Text::new(
        args.start_label.clone(),
        (x_range.start, y_range.end),
        TextStyle::from(font.clone()).pos(Pos::new(HPos::Left, VPos::Top)),
    ))?;
    area.draw(&Text::new(
        args.end_label.clone(),
        (x_range.end, y_range.end),
        TextStyle::from(font).pos(Pos::new(HPos::Right, VPos::Top)),
    ))?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(pixels: u32, fraction: f64) -> u32 {
    (f64::from(pixels) * fraction).round() as u32
}

/// Returns `0..length` of a profile.
pub(crate) fn distance_range(distances: &[f64]) -> Range<f64> {
    match distances.last() {
        Some(&length) if length > 0.0 => 0.0..length,
        _ => 0.0..1.0,
    }
}

/// Widens `range` by `buffer` times its span on both ends.
///
/// Flat ranges are widened by `buffer` times their magnitude (at
/// least 1), and no range at all gives `0..1`.
pub(crate) fn padded_range(range: Option<(f64, f64)>, buffer: f64) -> Range<f64> {
    match range {
        None => 0.0..1.0,
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * buffer;
            (lo - pad)..(hi + pad)
        }
        Some((lo, hi)) => {
            let pad = (lo.abs() * buffer).max(1.0);
            (lo - pad)..(hi + pad)
        }
    }
}

/// Splits a column into runs of non-missing `(distance, value)`
/// points so gaps aren't bridged.
pub(crate) fn finite_runs(distances: &[f64], values: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut run = Vec::new();
    for (distance, value) in distances.iter().zip(values) {
        if value.is_nan() {
            if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        } else {
            run.push((*distance, *value));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::{distance_range, finite_runs, padded_range, render, Figure};
    use crate::{
        options::PlotArgs,
        style::{style_data, style_layers, GridSpec},
    };
    use approx::assert_relative_eq;
    use std::path::PathBuf;
    use transect::{CrossSection, Grids, Transect};

    fn grid_dir() -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "..", "data", "grids"]
            .iter()
            .collect()
    }

    fn specs(names: &[&str]) -> Vec<GridSpec> {
        names
            .iter()
            .map(|name| format!("{name}={}", grid_dir().join(format!("{name}.asc")).display()))
            .map(|spec| spec.parse().unwrap())
            .collect()
    }

    fn plot_args(file: &str, map: bool) -> PlotArgs {
        let dir = std::env::temp_dir().join(format!("xsect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        PlotArgs {
            out: dir.join(file),
            width: 800,
            height: 500,
            layer_buffer: 0.1,
            data_buffer: 0.1,
            start_label: "A".to_owned(),
            end_label: "B".to_owned(),
            title: Some("Test".to_owned()),
            map,
            map_buffer: 0.3,
        }
    }

    /// Renders the named layer and data fixtures, mapping the first
    /// grid when `map` is set, and returns the image size in bytes.
    fn render_fixture(layers: &[&str], data: &[&str], file: &str, map: bool) -> u64 {
        let mut data_specs = specs(data);
        for spec in &mut data_specs {
            spec.axis = Some(1);
        }
        let layers = style_layers(&specs(layers)).unwrap();
        let data = style_data(&data_specs).unwrap();

        let transect = Transect::builder()
            .start(geo::coord!(x: -490_000.0, y: -995_000.0))
            .stop(geo::coord!(x: -410_000.0, y: -965_000.0))
            .num(50)
            .build()
            .unwrap();
        let grids = Grids::default();
        let mut builder = CrossSection::builder(transect);
        for layer in &layers {
            builder = builder.layer(layer.name.clone(), layer.path.clone());
        }
        for series in &data {
            builder = builder.data(series.name.clone(), series.path.clone());
        }
        let section = builder.build(&grids).unwrap();

        let first = layers.first().or_else(|| data.first()).unwrap();
        let map_grid = grids.get(&first.path).unwrap();
        let args = plot_args(file, map);
        render(&Figure {
            section: &section,
            layers: &layers,
            data: &data,
            map: map.then(|| (first.name.as_str(), map_grid.as_ref())),
            args: &args,
        })
        .unwrap();
        std::fs::metadata(&args.out).unwrap().len()
    }

    #[test]
    fn test_render_layers_data_and_map() {
        let size = render_fixture(&["surface", "icebase", "bed"], &["gravity"], "full.svg", true);
        assert!(size > 0);
    }

    #[test]
    fn test_render_data_only() {
        assert!(render_fixture(&[], &["gravity"], "data.svg", false) > 0);
    }

    #[test]
    fn test_render_layers_only_png() {
        assert!(render_fixture(&["surface", "bed"], &[], "layers.png", true) > 0);
    }

    #[test]
    fn test_render_unsupported_format() {
        let layers = style_layers(&specs(&["bed"])).unwrap();
        let transect = Transect::builder()
            .start(geo::coord!(x: -490_000.0, y: -995_000.0))
            .stop(geo::coord!(x: -410_000.0, y: -995_000.0))
            .num(5)
            .build()
            .unwrap();
        let section = CrossSection::builder(transect)
            .layer("bed", layers[0].path.clone())
            .build(&Grids::default())
            .unwrap();
        let args = plot_args("section.pdf", false);
        let err = render(&Figure {
            section: &section,
            layers: &layers,
            data: &[],
            map: None,
            args: &args,
        })
        .unwrap_err();
        assert!(err.to_string().contains("unsupported image format"));
    }

    #[test]
    fn test_padded_range() {
        let range = padded_range(Some((-300.0, 2100.0)), 0.1);
        assert_relative_eq!(range.start, -540.0);
        assert_relative_eq!(range.end, 2340.0);

        let range = padded_range(Some((50.0, 50.0)), 0.1);
        assert_relative_eq!(range.start, 45.0);
        assert_relative_eq!(range.end, 55.0);

        let range = padded_range(Some((0.0, 0.0)), 0.1);
        assert_relative_eq!(range.start, -1.0);
        assert_relative_eq!(range.end, 1.0);

        assert_eq!(padded_range(None, 0.1), 0.0..1.0);
    }

    #[test]
    fn test_distance_range() {
        assert_eq!(distance_range(&[0.0, 5.0, 12.5]), 0.0..12.5);
        assert_eq!(distance_range(&[]), 0.0..1.0);
    }

    #[test]
    fn test_finite_runs() {
        let distances = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let values = [f64::NAN, 1.0, 2.0, f64::NAN, f64::NAN, 5.0];
        assert_eq!(
            finite_runs(&distances, &values),
            vec![vec![(1.0, 1.0), (2.0, 2.0)], vec![(5.0, 5.0)]]
        );
        assert!(finite_runs(&distances, &[f64::NAN; 6]).is_empty());
    }
}
