use crate::{Transect, TransectError, C};
use esrigrid::{Grid, Interpolation};
use geo::geometry::Coord;
use log::debug;

/// A named series of values sampled from one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,

    /// One value per profile row, NaN where the grid has no data.
    pub values: Vec<C>,
}

/// Table of values sampled along a transect, indexed by distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Location of each row.
    points: Vec<Coord<C>>,

    /// Distance of each row along the transect, strictly increasing.
    distances: Vec<C>,

    /// Sampled columns in the order they were added.
    columns: Vec<Column>,
}

impl Profile {
    /// Returns a profile with one row per transect sample and no
    /// columns.
    pub fn new(transect: &Transect) -> Self {
        Self {
            points: transect.points().to_vec(),
            distances: transect.distances().to_vec(),
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Coord<C>] {
        &self.points
    }

    pub fn distances(&self) -> &[C] {
        &self.distances
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[C]> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
    }

    /// Samples `grid` at every row into the column `name`, replacing
    /// an existing column of that name in place.
    pub fn sample<S: Into<String>>(&mut self, name: S, grid: &Grid, interpolation: Interpolation) {
        let name = name.into();
        let values: Vec<C> = self
            .points
            .iter()
            .map(|point| grid.sample(*point, interpolation))
            .collect();
        let missing = values.iter().filter(|value| value.is_nan()).count();
        debug!(
            "sampled {name}; rows: {}, missing: {missing}, interpolation: {interpolation}",
            values.len()
        );
        match self.columns.iter_mut().find(|column| column.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    /// Replaces missing values in each column with the value of the
    /// column before it.
    ///
    /// Columns are stacked layers (surface above ice base above bed),
    /// so where a lower layer is absent it collapses onto the one
    /// above. The first column is left untouched.
    pub fn fill_nans(&mut self) {
        for idx in 1..self.columns.len() {
            let (above, below) = self.columns.split_at_mut(idx);
            let above = &above[idx - 1];
            for (value, fill) in below[0].values.iter_mut().zip(&above.values) {
                if value.is_nan() {
                    *value = *fill;
                }
            }
        }
    }

    /// Returns the rows with `min_dist <= distance <= max_dist`, with
    /// distances rebased to start at zero.
    ///
    /// A missing bound leaves that end of the profile as-is.
    pub fn shorten(&self, min_dist: Option<C>, max_dist: Option<C>) -> Result<Self, TransectError> {
        let err = || TransectError::Clip {
            min: min_dist,
            max: max_dist,
        };
        if let (Some(min), Some(max)) = (min_dist, max_dist) {
            if min > max {
                return Err(err());
            }
        }

        let keep: Vec<usize> = self
            .distances
            .iter()
            .enumerate()
            .filter(|(_, distance)| {
                min_dist.map_or(true, |min| **distance >= min)
                    && max_dist.map_or(true, |max| **distance <= max)
            })
            .map(|(idx, _)| idx)
            .collect();
        if keep.len() < 2 {
            return Err(err());
        }

        let origin = self.distances[keep[0]];
        Ok(Self {
            points: keep.iter().map(|&idx| self.points[idx]).collect(),
            distances: keep.iter().map(|&idx| self.distances[idx] - origin).collect(),
            columns: self
                .columns
                .iter()
                .map(|column| Column {
                    name: column.name.clone(),
                    values: keep.iter().map(|&idx| column.values[idx]).collect(),
                })
                .collect(),
        })
    }

    /// Returns the lowest and highest non-missing value across all
    /// columns.
    pub fn value_range(&self) -> Option<(C, C)> {
        finite_range(self.columns.iter().flat_map(|column| column.values.iter()))
    }
}

/// Returns the lowest and highest non-NaN value, if any.
pub fn finite_range<'a, I>(values: I) -> Option<(C, C)>
where
    I: IntoIterator<Item = &'a C>,
{
    values
        .into_iter()
        .filter(|value| !value.is_nan())
        .fold(None, |acc, &value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}
