//! Grid file cache.

use crate::TransectError;
use dashmap::DashMap;
use esrigrid::{Grid, GridMode};
use log::debug;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Grids keyed by the path they were loaded from.
///
/// Layers are often reused between a cross-section and its data
/// panel, or across several transects, so each file is only read
/// once.
#[derive(Default)]
pub struct Grids {
    /// How to load binary grids (in-memory or mapped).
    grid_mode: GridMode,

    /// Grids which have been loaded on demand.
    grids: DashMap<PathBuf, Arc<Grid>>,
}

impl Grids {
    pub fn new(grid_mode: GridMode) -> Self {
        Self {
            grid_mode,
            grids: DashMap::new(),
        }
    }

    /// Returns the grid stored at `path`.
    ///
    /// `Grids` will attempt to load the grid from disk if it doesn't
    /// already have it in memory.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Grid>, TransectError> {
        let path = path.as_ref();
        self.grids
            .entry(path.to_owned())
            .or_try_insert_with(|| -> Result<_, TransectError> {
                let now = std::time::Instant::now();
                let grid = Grid::open(path, self.grid_mode)?;
                debug!(
                    "loaded {}; dimensions: {:?}, mode: {:?}, exec: {:?}",
                    path.display(),
                    grid.dimensions(),
                    self.grid_mode,
                    now.elapsed()
                );
                Ok(Arc::new(grid))
            })
            .map(|grid| grid.clone())
    }

    /// Registers an already loaded grid under `path`, replacing any
    /// grid previously loaded from there.
    pub fn insert<P: Into<PathBuf>>(&self, path: P, grid: Grid) -> Arc<Grid> {
        let grid = Arc::new(grid);
        self.grids.insert(path.into(), grid.clone());
        grid
    }

    /// Returns the number of loaded grids.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}
