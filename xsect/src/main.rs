mod map;
mod options;
mod plot;
mod style;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use options::{Cli, Command as CliCmd};
use plot::Figure;
use serde::Serialize;
use std::io::Write;
use style::{style_data, style_layers, GridConfig, GridSpec};
use transect::{read_line, CrossSection, GridMode, Grids, Profile, Transect};

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    env_logger::init();

    let (layer_specs, data_specs) = grid_specs(&cli)?;
    let layers = style_layers(&layer_specs)?;
    let data = style_data(&data_specs)?;

    let transect = build_transect(&cli)?;
    let grids = Grids::new(if cli.memmap {
        GridMode::MemMap
    } else {
        GridMode::InMem
    });

    let mut builder = CrossSection::builder(transect)
        .interpolation(cli.interp)
        .fill_nans(!cli.no_fill_nans)
        .min_dist(cli.min_dist)
        .max_dist(cli.max_dist);
    for layer in &layers {
        builder = builder.layer(layer.name.clone(), layer.path.clone());
    }
    for series in &data {
        builder = builder.data(series.name.clone(), series.path.clone());
    }
    let section = builder.build(&grids)?;

    match cli.cmd {
        CliCmd::Csv => print_csv(&mut std::io::stdout().lock(), &section)?,
        CliCmd::Json => print_json(&section)?,
        CliCmd::Plot(args) => {
            let first = layers.first().or_else(|| data.first());
            let map_grid = match first {
                Some(first) if args.map => Some((first.name.as_str(), grids.get(&first.path)?)),
                _ => None,
            };
            plot::render(&Figure {
                section: &section,
                layers: &layers,
                data: &data,
                map: map_grid.as_ref().map(|(name, grid)| (*name, grid.as_ref())),
                args: &args,
            })?;
        }
    };
    Ok(())
}

/// Returns config file grids followed by command line grids.
fn grid_specs(cli: &Cli) -> Result<(Vec<GridSpec>, Vec<GridSpec>), AnyError> {
    let GridConfig {
        mut layers,
        mut data,
    } = match &cli.config {
        Some(path) => GridConfig::load(path)?,
        None => GridConfig::default(),
    };
    layers.extend(cli.layers.iter().cloned());
    data.extend(cli.data.iter().cloned());
    Ok((layers, data))
}

fn build_transect(cli: &Cli) -> Result<Transect, AnyError> {
    let mut builder = Transect::builder().reverse(cli.reverse);
    if let Some(num) = cli.num {
        builder = builder.num(num);
    }
    builder = match (&cli.line, cli.start, cli.stop) {
        (Some(path), _, _) => builder.polyline(read_line(path, cli.line_crs)?),
        (None, Some(start), Some(stop)) if cli.geographic => {
            builder.start(start.geographic()).stop(stop.geographic())
        }
        (None, Some(start), Some(stop)) => builder.start(start.projected()).stop(stop.projected()),
        _ => return Err(anyhow!("a transect needs --start and --stop, or --line")),
    };
    Ok(builder.build()?)
}

/// Writes one row per sample: position, distance, then every layer
/// and data column. Missing values are written as `NaN`.
///
/// # Example with gnuplot
///
/// ```sh
/// cargo run -- --config=data/xsect.json --start=-480000,-990000 --stop=-400000,-960000 csv | tr ',' ' ' > /tmp/xsect && gnuplot -p -e "plot for [col=4:6] '/tmp/xsect' using 3:col with lines"
/// ```
fn print_csv<W: Write>(out: &mut W, section: &CrossSection) -> Result<(), AnyError> {
    let columns = || {
        section
            .layers
            .columns()
            .iter()
            .chain(section.data.iter().flat_map(Profile::columns))
    };

    write!(out, "x,y,distance")?;
    for column in columns() {
        write!(out, ",{}", column.name)?;
    }
    writeln!(out)?;

    let profile = &section.layers;
    for (row, (point, distance)) in profile
        .points()
        .iter()
        .zip(profile.distances())
        .enumerate()
    {
        write!(out, "{},{},{distance}", point.x, point.y)?;
        for column in columns() {
            write!(out, ",{}", column.values[row])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn print_json(section: &CrossSection) -> Result<(), AnyError> {
    let json = serde_json::to_string(&JsonSection::from(section))?;
    println!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct JsonSection<'a> {
    layers: Vec<&'a str>,
    data: Vec<&'a str>,
    rows: Vec<JsonRow>,
}

#[derive(Serialize)]
struct JsonRow {
    location: [f64; 2],
    distance: f64,
    layers: Vec<Option<f64>>,
    data: Vec<Option<f64>>,
}

impl<'a> From<&'a CrossSection> for JsonSection<'a> {
    fn from(section: &'a CrossSection) -> Self {
        let names = |profile: Option<&'a Profile>| -> Vec<&'a str> {
            profile
                .map(Profile::columns)
                .unwrap_or_default()
                .iter()
                .map(|column| column.name.as_str())
                .collect()
        };
        let values = |profile: Option<&Profile>, row: usize| -> Vec<Option<f64>> {
            profile
                .map(Profile::columns)
                .unwrap_or_default()
                .iter()
                .map(|column| Some(column.values[row]).filter(|value| !value.is_nan()))
                .collect()
        };

        let profile = &section.layers;
        let rows = profile
            .points()
            .iter()
            .zip(profile.distances())
            .enumerate()
            .map(|(row, (point, distance))| JsonRow {
                location: [point.x, point.y],
                distance: *distance,
                layers: values(Some(profile), row),
                data: values(section.data.as_ref(), row),
            })
            .collect();

        Self {
            layers: names(Some(profile)),
            data: names(section.data.as_ref()),
            rows,
        }
    }
}
