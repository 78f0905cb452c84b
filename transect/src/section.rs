use crate::{Grids, Profile, Transect, TransectError, C};
use esrigrid::Interpolation;
use geo::algorithm::Intersects;
use log::{debug, warn};
use std::path::PathBuf;

/// Layers and optional auxiliary data sampled along one transect.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// Stacked layers, top first (e.g. surface, icebase, bed).
    pub layers: Profile,

    /// Auxiliary data (e.g. gravity, magnetics), if any were given.
    pub data: Option<Profile>,
}

impl CrossSection {
    pub fn builder(transect: Transect) -> CrossSectionBuilder {
        CrossSectionBuilder {
            transect,
            layers: Vec::new(),
            data: Vec::new(),
            interpolation: Interpolation::default(),
            fill_nans: true,
            min_dist: None,
            max_dist: None,
        }
    }
}

pub struct CrossSectionBuilder {
    transect: Transect,

    /// `(name, path)` of each layer grid, top first.
    layers: Vec<(String, PathBuf)>,

    /// `(name, path)` of each data grid.
    data: Vec<(String, PathBuf)>,

    interpolation: Interpolation,

    /// Fill missing values of a layer from the layer above it.
    fill_nans: bool,

    /// Drop samples closer to the start than this.
    min_dist: Option<C>,

    /// Drop samples further from the start than this.
    max_dist: Option<C>,
}

impl CrossSectionBuilder {
    pub fn layer<S: Into<String>, P: Into<PathBuf>>(mut self, name: S, path: P) -> Self {
        self.layers.push((name.into(), path.into()));
        self
    }

    pub fn data<S: Into<String>, P: Into<PathBuf>>(mut self, name: S, path: P) -> Self {
        self.data.push((name.into(), path.into()));
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn fill_nans(mut self, fill_nans: bool) -> Self {
        self.fill_nans = fill_nans;
        self
    }

    pub fn min_dist(mut self, min_dist: Option<C>) -> Self {
        self.min_dist = min_dist;
        self
    }

    pub fn max_dist(mut self, max_dist: Option<C>) -> Self {
        self.max_dist = max_dist;
        self
    }

    pub fn build(&self, grids: &Grids) -> Result<CrossSection, TransectError> {
        if self.layers.is_empty() && self.data.is_empty() {
            return Err(TransectError::NoGrids);
        }
        let now = std::time::Instant::now();

        let mut layers = self.sample_all(&self.layers, grids)?;
        if self.fill_nans {
            layers.fill_nans();
        }
        let data = if self.data.is_empty() {
            None
        } else {
            Some(self.sample_all(&self.data, grids)?)
        };

        let clipped = self.min_dist.is_some() || self.max_dist.is_some();
        let section = if clipped {
            CrossSection {
                layers: layers.shorten(self.min_dist, self.max_dist)?,
                data: data
                    .map(|data| data.shorten(self.min_dist, self.max_dist))
                    .transpose()?,
            }
        } else {
            CrossSection { layers, data }
        };

        debug!(
            "cross-section; layers: {}, data: {}, rows: {}, exec: {:?}",
            self.layers.len(),
            self.data.len(),
            section.layers.len(),
            now.elapsed()
        );
        Ok(section)
    }
}

/// Private API.
impl CrossSectionBuilder {
    fn sample_all(&self, sources: &[(String, PathBuf)], grids: &Grids) -> Result<Profile, TransectError> {
        let mut profile = Profile::new(&self.transect);
        let bounds = self.transect.bounds();
        for (name, path) in sources {
            let grid = grids.get(path)?;
            if let Some(bounds) = bounds {
                if !grid.extent().intersects(&bounds) {
                    warn!("{name} ({}) does not overlap the transect", path.display());
                }
            }
            profile.sample(name.as_str(), &grid, self.interpolation);
        }
        Ok(profile)
    }
}
