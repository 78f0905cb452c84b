use crate::C;
use esrigrid::GridError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransectError {
    #[error("missing required parameters")]
    Builder,

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    GeoJson(#[from] geojson::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("need at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("transect has zero length")]
    Degenerate,

    #[error("transect coordinates must be finite")]
    NonFinite,

    #[error("no line geometry in {0}")]
    NoLine(PathBuf),

    #[error("invalid vertex {line:?} in {path}")]
    Vertex { path: PathBuf, line: String },

    #[error("unsupported line file {0}")]
    LineFormat(PathBuf),

    #[error("fewer than 2 samples between {min:?} and {max:?}")]
    Clip { min: Option<C>, max: Option<C> },

    #[error("no layers or data to sample")]
    NoGrids,
}
