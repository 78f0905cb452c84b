//! Plan-view location map.

use crate::plot::Figure;
use anyhow::Error as AnyError;
use geo::{
    algorithm::BoundingRect,
    geometry::{Coord, MultiPoint, Rect},
};
use plotters::{coord::Shift, prelude::*};
use transect::Grid;

/// Most cells drawn along either axis of the map.
const MAX_CELLS: usize = 200;

/// Robust color range of the shaded grid.
const LOW_QUANTILE: f64 = 0.02;
const HIGH_QUANTILE: f64 = 0.98;

pub fn draw_map<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    name: &str,
    grid: &Grid,
    figure: &Figure,
) -> Result<(), AnyError>
where
    DB::ErrorType: 'static,
{
    let profile = &figure.section.layers;
    let length = profile.distances().last().copied().unwrap_or_default();
    let region = map_region(profile.points(), length, figure.args.map_buffer, grid.extent());
    let mut chart = ChartBuilder::on(area)
        .caption(name, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            region.min().x..region.max().x,
            region.min().y..region.max().y,
        )?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(4)
        .y_labels(4)
        .draw()?;

    let (lo, hi) = grid
        .quantiles(LOW_QUANTILE, HIGH_QUANTILE)
        .unwrap_or((0.0, 1.0));
    chart.draw_series(
        map_cells(grid, region, MAX_CELLS)
            .into_iter()
            .map(|(corners, value)| Rectangle::new(corners, colormap(value, lo, hi).filled())),
    )?;

    let points = profile.points();
    chart.draw_series(LineSeries::new(
        points.iter().map(|point| (point.x, point.y)),
        BLACK.stroke_width(2),
    ))?;
    if let (Some(start), Some(end)) = (points.first(), points.last()) {
        let font = ("sans-serif", 20).into_font();
        for (label, point) in [(&figure.args.start_label, start), (&figure.args.end_label, end)] {
            chart.draw_series(std::iter::once(Text::new(
                label.clone(),
                (point.x, point.y),
                font.clone(),
            )))?;
        }
    }
    Ok(())
}

/// Returns the area shown in the map: the transect's bounds padded
/// by `buffer` times its `length`, cut back to the grid `extent`
/// without cutting off the transect.
pub(crate) fn map_region(
    points: &[Coord<f64>],
    length: f64,
    buffer: f64,
    extent: Rect<f64>,
) -> Rect<f64> {
    let bounds = MultiPoint::from(points.to_vec())
        .bounding_rect()
        .unwrap_or(extent);
    let pad = length * buffer;
    let axis = |lo: f64, hi: f64, extent_lo: f64, extent_hi: f64| {
        let lo = (lo - pad).max(extent_lo).min(lo);
        let hi = (hi + pad).min(extent_hi).max(hi);
        if hi > lo {
            (lo, hi)
        } else {
            let half = (length / 2.0).max(1.0);
            (lo - half, hi + half)
        }
    };
    let (x0, x1) = axis(bounds.min().x, bounds.max().x, extent.min().x, extent.max().x);
    let (y0, y1) = axis(bounds.min().y, bounds.max().y, extent.min().y, extent.max().y);
    Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
}

/// Returns the corners and value of every `stride`-th cell inside
/// `region`, where `stride` keeps at most `max_cells` along each
/// axis. Corners are cut to `region` and missing cells are skipped.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn map_cells(
    grid: &Grid,
    region: Rect<f64>,
    max_cells: usize,
) -> Vec<([(f64, f64); 2], f64)> {
    let (cols, rows) = grid.dimensions();
    let origin = grid.bounds().min();
    let size = grid.cell_size();

    // Cells overlapping `lo..hi` along one axis, as a half open range.
    let span = |lo: f64, hi: f64, origin: f64, size: f64, len: usize| {
        let first = ((lo - origin) / size + 0.5).floor().clamp(0.0, len as f64) as usize;
        let end = ((hi - origin) / size + 0.5).ceil().clamp(0.0, len as f64) as usize;
        (first, end.max(first))
    };
    let (col0, col1) = span(region.min().x, region.max().x, origin.x, size.x, cols);
    let (row0, row1) = span(region.min().y, region.max().y, origin.y, size.y, rows);

    let stride = (col1 - col0)
        .max(row1 - row0)
        .div_ceil(max_cells.max(1))
        .max(1);
    let corner = |col: usize, row: usize| {
        (
            (origin.x + (col as f64 - 0.5) * size.x).clamp(region.min().x, region.max().x),
            (origin.y + (row as f64 - 0.5) * size.y).clamp(region.min().y, region.max().y),
        )
    };

    let mut cells = Vec::new();
    for row in (row0..row1).step_by(stride) {
        for col in (col0..col1).step_by(stride) {
            let value = grid.get_xy((col, row));
            if value.is_nan() {
                continue;
            }
            let upper = corner((col + stride).min(col1), (row + stride).min(row1));
            cells.push(([corner(col, row), upper], f64::from(value)));
        }
    }
    cells
}

/// Blue for `lo` and below through to red for `hi` and above.
pub(crate) fn colormap(value: f64, lo: f64, hi: f64) -> HSLColor {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    HSLColor(0.66 * (1.0 - t), 0.75, 0.5)
}
