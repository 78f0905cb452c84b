use crate::style::GridSpec;
use anyhow::{anyhow, Error as AnyError};
use clap::{Args, Parser, Subcommand};
use geo::geometry::Coord;
use std::{path::PathBuf, str::FromStr};
use transect::{Interpolation, LineCrs};

/// Sample gridded layers along a transect and draw a cross-section.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Transect start "x,y" in EPSG:3031 meters ("lat,lon" with
    /// --geographic).
    #[arg(long, requires = "stop", conflicts_with = "line")]
    pub start: Option<XY>,

    /// Transect end "x,y" in EPSG:3031 meters ("lat,lon" with
    /// --geographic).
    #[arg(long, requires = "start")]
    pub stop: Option<XY>,

    /// Read --start and --stop as "lat,lon" degrees.
    #[arg(long, default_value_t = false)]
    pub geographic: bool,

    /// Line file (.geojson, .json, .csv, .txt, .xy) to use as the
    /// transect.
    #[arg(short, long)]
    pub line: Option<PathBuf>,

    /// Coordinates of the line file's vertices.
    #[arg(long, default_value = "projected")]
    pub line_crs: LineCrs,

    /// Number of samples. Defaults to 1000 between two points, or the
    /// line file's own vertices.
    #[arg(short, long)]
    pub num: Option<usize>,

    /// Walk the line file from its last vertex to its first.
    #[arg(long, default_value_t = false)]
    pub reverse: bool,

    /// Layer grid "NAME=PATH[,COLOR]", top first. Repeatable.
    #[arg(long = "layer")]
    pub layers: Vec<GridSpec>,

    /// Data grid "NAME=PATH[,COLOR[,AXIS]]", AXIS 0 (left) or 1
    /// (right). Repeatable.
    #[arg(long = "data")]
    pub data: Vec<GridSpec>,

    /// JSON file with "layers" and "data" grid lists, read before any
    /// --layer and --data.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interpolation: n (nearest), l (bilinear) or c (bicubic).
    #[arg(short, long, default_value = "c")]
    pub interp: Interpolation,

    /// Keep missing layer values instead of filling them from the
    /// layer above.
    #[arg(long, default_value_t = false)]
    pub no_fill_nans: bool,

    /// Drop samples closer than this to the start, in meters.
    #[arg(long)]
    pub min_dist: Option<f64>,

    /// Drop samples further than this from the start, in meters.
    #[arg(long)]
    pub max_dist: Option<f64>,

    /// Memory map binary grids instead of reading them.
    #[arg(long, default_value_t = false)]
    pub memmap: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

/// A comma separated coordinate pair.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct XY(pub f64, pub f64);

impl XY {
    /// Returns this pair as easting/northing.
    pub fn projected(self) -> Coord<f64> {
        Coord {
            x: self.0,
            y: self.1,
        }
    }

    /// Returns this pair read as "lat,lon", projected to EPSG:3031.
    pub fn geographic(self) -> Coord<f64> {
        transect::lonlat_to_epsg3031(Coord {
            x: self.1,
            y: self.0,
        })
    }
}

impl FromStr for XY {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid coordinate pair {s:?}"))?;
        let (a, b) = (f64::from_str(a.trim())?, f64::from_str(b.trim())?);
        if !a.is_finite() || !b.is_finite() {
            return Err(anyhow!("coordinates must be finite, got {s:?}"));
        }
        Ok(Self(a, b))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the profile to stdout as CSV.
    Csv,

    /// Print the profile to stdout as JSON.
    Json,

    /// Render the cross-section to an image.
    Plot(PlotArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Image file path, .png or .svg.
    pub out: PathBuf,

    /// Image width in pixels.
    #[arg(long, default_value_t = 1400)]
    pub width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 900)]
    pub height: u32,

    /// Padding above and below the layers, as a fraction of their
    /// range.
    #[arg(long, default_value_t = 0.1)]
    pub layer_buffer: f64,

    /// Padding above and below the data, as a fraction of their
    /// range.
    #[arg(long, default_value_t = 0.1)]
    pub data_buffer: f64,

    #[arg(long, default_value = "A")]
    pub start_label: String,

    #[arg(long, default_value = "B")]
    pub end_label: String,

    /// Figure title.
    #[arg(long)]
    pub title: Option<String>,

    /// Add a plan-view map of the first grid with the transect.
    #[arg(long, default_value_t = false)]
    pub map: bool,

    /// Padding around the transect in the map, as a fraction of its
    /// length.
    #[arg(long, default_value_t = 0.3)]
    pub map_buffer: f64,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, XY};
    use approx::assert_relative_eq;
    use clap::Parser;
    use transect::{Interpolation, LineCrs};

    #[test]
    fn test_parse_xy() {
        assert_eq!("-480000,-990000".parse::<XY>().unwrap(), XY(-480_000.0, -990_000.0));
        assert_eq!(" 1.5 , 2".parse::<XY>().unwrap(), XY(1.5, 2.0));
        assert!("1.5".parse::<XY>().is_err());
        assert!("1.5,north".parse::<XY>().is_err());
        assert!("nan,0".parse::<XY>().is_err());
        assert!("0,-inf".parse::<XY>().is_err());
    }

    #[test]
    fn test_geographic_xy() {
        let coord = XY(-71.0, 0.0).geographic();
        assert_relative_eq!(coord.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(coord.y, 2_082_760.108_542_913, epsilon = 1e-3);
    }

    #[test]
    fn test_cli() {
        let cli = Cli::try_parse_from([
            "xsect",
            "--start=-480000,-990000",
            "--stop=-400000,-990000",
            "--layer",
            "surface=data/grids/surface.asc",
            "--data",
            "gravity=data/grids/gravity.asc,red,1",
            "--interp",
            "l",
            "plot",
            "out.svg",
            "--map",
        ])
        .unwrap();
        assert_eq!(cli.start, Some(XY(-480_000.0, -990_000.0)));
        assert_eq!(cli.layers.len(), 1);
        assert_eq!(cli.data[0].axis, Some(1));
        assert_eq!(cli.interp, Interpolation::Bilinear);
        assert_eq!(cli.line_crs, LineCrs::Projected);
        match cli.cmd {
            Command::Plot(args) => {
                assert!(args.map);
                assert_eq!(args.start_label, "A");
                assert_relative_eq!(args.layer_buffer, 0.1);
                assert_relative_eq!(args.map_buffer, 0.3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_conflicts() {
        assert!(Cli::try_parse_from(["xsect", "--start=0,0", "csv"]).is_err());
        assert!(Cli::try_parse_from([
            "xsect",
            "--start=0,0",
            "--stop=1,1",
            "--line=line.csv",
            "csv"
        ])
        .is_err());
    }
}
