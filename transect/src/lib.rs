//! Sample gridded layers along a transect.
//!
//! A [`Transect`] is built from two points or a polyline, every grid
//! of interest is sampled at its points into a [`Profile`], and a
//! [`CrossSection`] ties stacked layers and auxiliary data together.
//!
//! Coordinates are EPSG:3031 (Antarctic Polar Stereographic) meters;
//! use [`lonlat_to_epsg3031`] for geographic input.

mod error;
mod grids;
mod line_file;
mod math;
mod profile;
mod section;
mod transect;

pub use crate::{
    error::TransectError,
    grids::Grids,
    line_file::{read_line, LineCrs},
    math::{epsg3031_to_lonlat, lonlat_to_epsg3031},
    profile::{finite_range, Column, Profile},
    section::{CrossSection, CrossSectionBuilder},
    transect::{Transect, TransectBuilder, DEFAULT_NUM},
};
pub use esrigrid::{self, Grid, GridMode, Interpolation, C};
pub use geo;

/// Returns the workspace test data directory.
#[cfg(test)]
fn test_data_dir() -> std::path::PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "..", "data"].iter().collect()
}
