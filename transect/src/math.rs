mod linspace;
mod polar_stereo;

pub(crate) use linspace::linspace;
pub use polar_stereo::{epsg3031_to_lonlat, lonlat_to_epsg3031};
