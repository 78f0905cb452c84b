use crate::{math::linspace, TransectError, C};
use geo::{
    algorithm::{BoundingRect, EuclideanDistance, LineInterpolatePoint},
    geometry::{Coord, LineString, Rect},
};
use itertools::Itertools;
use log::debug;

/// Number of samples between two points when not specified.
pub const DEFAULT_NUM: usize = 1000;

/// Ordered sample locations along a line and their distance along it.
///
/// Distances start at zero and are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Transect {
    points: Vec<Coord<C>>,
    distances: Vec<C>,
}

impl Transect {
    pub fn builder() -> TransectBuilder {
        TransectBuilder {
            start: None,
            stop: None,
            line: None,
            num: None,
            reverse: false,
        }
    }

    pub fn points(&self) -> &[Coord<C>] {
        &self.points
    }

    /// Distance of each point from the start of the transect.
    pub fn distances(&self) -> &[C] {
        &self.distances
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Total distance from first to last point.
    pub fn length(&self) -> C {
        self.distances[self.distances.len() - 1]
    }

    pub fn start(&self) -> Coord<C> {
        self.points[0]
    }

    pub fn end(&self) -> Coord<C> {
        self.points[self.points.len() - 1]
    }

    /// Returns the sample locations as a line.
    pub fn line(&self) -> LineString<C> {
        LineString::from(self.points.clone())
    }

    /// Returns the bounding rectangle of all sample locations.
    pub fn bounds(&self) -> Option<Rect<C>> {
        self.line().bounding_rect()
    }
}

pub struct TransectBuilder {
    start: Option<Coord<C>>,

    stop: Option<Coord<C>>,

    /// Polyline vertices, takes precedence over `start`/`stop`.
    line: Option<LineString<C>>,

    /// Number of samples.
    ///
    /// Between two points this defaults to [`DEFAULT_NUM`]. For a
    /// polyline the vertices are used as-is unless set.
    num: Option<usize>,

    /// Walk a polyline from its last vertex to its first.
    reverse: bool,
}

impl TransectBuilder {
    pub fn start(mut self, coord: Coord<C>) -> Self {
        self.start = Some(coord);
        self
    }

    pub fn stop(mut self, coord: Coord<C>) -> Self {
        self.stop = Some(coord);
        self
    }

    pub fn polyline<L: Into<LineString<C>>>(mut self, line: L) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn num(mut self, num: usize) -> Self {
        self.num = Some(num);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn build(&self) -> Result<Transect, TransectError> {
        let now = std::time::Instant::now();
        let mut coords = self
            .start
            .iter()
            .chain(&self.stop)
            .chain(self.line.iter().flat_map(|line| line.0.iter()));
        if !coords.all(|coord| coord.x.is_finite() && coord.y.is_finite()) {
            return Err(TransectError::NonFinite);
        }
        let transect = match (&self.line, self.start, self.stop) {
            (Some(line), _, _) => self.along_polyline(line)?,
            (None, Some(start), Some(stop)) => {
                Self::between(start, stop, self.num.unwrap_or(DEFAULT_NUM))?
            }
            _ => return Err(TransectError::Builder),
        };
        debug!(
            "transect; len: {}, length: {}, exec: {:?}",
            transect.len(),
            transect.length(),
            now.elapsed()
        );
        Ok(transect)
    }
}

/// Private API.
impl TransectBuilder {
    /// Evenly spaced samples on the straight line from `start` to
    /// `stop`, distance measured from `start`.
    fn between(start: Coord<C>, stop: Coord<C>, num: usize) -> Result<Transect, TransectError> {
        if num < 2 {
            return Err(TransectError::TooFewPoints(num));
        }
        if start == stop {
            return Err(TransectError::Degenerate);
        }
        let points: Vec<Coord<C>> = linspace(start.x, stop.x, num)
            .zip(linspace(start.y, stop.y, num))
            .map(|(x, y)| Coord { x, y })
            .collect();
        let distances: Vec<C> = points
            .iter()
            .map(|point| start.euclidean_distance(point))
            .collect();
        if !distances[num - 1].is_finite() {
            return Err(TransectError::NonFinite);
        }
        Ok(Transect { points, distances })
    }

    /// Samples along `line`, distance accumulated segment by segment.
    fn along_polyline(&self, line: &LineString<C>) -> Result<Transect, TransectError> {
        let mut vertices = line.0.clone();
        if self.reverse {
            vertices.reverse();
        }
        vertices.dedup();
        if vertices.len() < 2 {
            return Err(TransectError::TooFewPoints(vertices.len()));
        }

        let distances: Vec<C> = std::iter::once(0.0)
            .chain(
                vertices
                    .iter()
                    .tuple_windows()
                    .scan(0.0, |total, (a, b)| {
                        *total += a.euclidean_distance(b);
                        Some(*total)
                    }),
            )
            .collect();
        let length = distances[distances.len() - 1];
        if !length.is_finite() {
            return Err(TransectError::NonFinite);
        }
        if length <= 0.0 {
            return Err(TransectError::Degenerate);
        }

        match self.num {
            None => Ok(Transect {
                points: vertices,
                distances,
            }),
            Some(num) if num < 2 => Err(TransectError::TooFewPoints(num)),
            Some(num) => {
                let line = LineString::from(vertices);
                let distances: Vec<C> = linspace(0.0, length, num).collect();
                let points = distances
                    .iter()
                    .map(|distance| {
                        line.line_interpolate_point(distance / length)
                            .map(|point| point.0)
                            .ok_or(TransectError::Degenerate)
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Transect { points, distances })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Transect, DEFAULT_NUM};
    use crate::TransectError;
    use approx::assert_relative_eq;
    use geo::{coord, line_string};

    #[test]
    fn test_between_points() {
        let transect = Transect::builder()
            .start(coord!(x: -480_000.0, y: -990_000.0))
            .stop(coord!(x: -400_000.0, y: -930_000.0))
            .num(11)
            .build()
            .unwrap();
        assert_eq!(transect.len(), 11);
        assert_eq!(transect.start(), coord!(x: -480_000.0, y: -990_000.0));
        assert_eq!(transect.end(), coord!(x: -400_000.0, y: -930_000.0));
        assert_relative_eq!(transect.length(), 100_000.0);
        assert_relative_eq!(transect.distances()[1], 10_000.0);
        assert_relative_eq!(transect.points()[5].x, -440_000.0);
        assert_relative_eq!(transect.points()[5].y, -960_000.0);
        assert!(transect.distances().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_default_num() {
        let transect = Transect::builder()
            .start(coord!(x: 0.0, y: 0.0))
            .stop(coord!(x: 1.0, y: 0.0))
            .build()
            .unwrap();
        assert_eq!(transect.len(), DEFAULT_NUM);
    }

    #[test]
    fn test_polyline_vertices() {
        let transect = Transect::builder()
            .polyline(line_string![
                (x: 0.0, y: 0.0),
                (x: 3.0, y: 4.0),
                (x: 3.0, y: 4.0),
                (x: 3.0, y: 10.0)
            ])
            .build()
            .unwrap();
        assert_eq!(transect.len(), 3);
        assert_eq!(transect.distances(), &[0.0, 5.0, 11.0]);
    }

    #[test]
    fn test_polyline_reversed() {
        let transect = Transect::builder()
            .polyline(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0), (x: 3.0, y: 10.0)])
            .reverse(true)
            .build()
            .unwrap();
        assert_eq!(transect.start(), coord!(x: 3.0, y: 10.0));
        assert_eq!(transect.distances(), &[0.0, 6.0, 11.0]);
    }

    #[test]
    fn test_polyline_resampled() {
        let transect = Transect::builder()
            .polyline(line_string![(x: 0.0, y: 0.0), (x: 6.0, y: 0.0), (x: 6.0, y: 4.0)])
            .num(6)
            .build()
            .unwrap();
        assert_eq!(transect.len(), 6);
        assert_relative_eq!(transect.length(), 10.0);
        let expected = [(0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (6.0, 0.0), (6.0, 2.0), (6.0, 4.0)];
        for (point, (x, y)) in transect.points().iter().zip(expected) {
            assert_relative_eq!(point.x, x, epsilon = 1e-9);
            assert_relative_eq!(point.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bounds() {
        let transect = Transect::builder()
            .polyline(line_string![(x: 0.0, y: 5.0), (x: 6.0, y: 0.0), (x: 2.0, y: 4.0)])
            .build()
            .unwrap();
        let bounds = transect.bounds().unwrap();
        assert_eq!(bounds.min(), coord!(x: 0.0, y: 0.0));
        assert_eq!(bounds.max(), coord!(x: 6.0, y: 5.0));
    }

    #[test]
    fn test_invalid_transects() {
        assert!(matches!(
            Transect::builder().start(coord!(x: 0.0, y: 0.0)).build(),
            Err(TransectError::Builder)
        ));
        assert!(matches!(
            Transect::builder()
                .start(coord!(x: 1.0, y: 1.0))
                .stop(coord!(x: 1.0, y: 1.0))
                .build(),
            Err(TransectError::Degenerate)
        ));
        assert!(matches!(
            Transect::builder()
                .start(coord!(x: 0.0, y: 0.0))
                .stop(coord!(x: 1.0, y: 1.0))
                .num(1)
                .build(),
            Err(TransectError::TooFewPoints(1))
        ));
        assert!(matches!(
            Transect::builder()
                .polyline(line_string![(x: 2.0, y: 2.0), (x: 2.0, y: 2.0)])
                .build(),
            Err(TransectError::TooFewPoints(1))
        ));
    }

    #[test]
    fn test_non_finite_coordinates() {
        let between = |start, stop| Transect::builder().start(start).stop(stop).num(5).build();
        assert!(matches!(
            between(coord!(x: f64::NAN, y: 0.0), coord!(x: 1.0, y: 1.0)),
            Err(TransectError::NonFinite)
        ));
        assert!(matches!(
            between(coord!(x: 0.0, y: 0.0), coord!(x: 1.0, y: f64::INFINITY)),
            Err(TransectError::NonFinite)
        ));
        // Finite ends whose distance overflows.
        assert!(matches!(
            between(coord!(x: -f64::MAX, y: 0.0), coord!(x: f64::MAX, y: 0.0)),
            Err(TransectError::NonFinite)
        ));

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                Transect::builder()
                    .polyline(line_string![(x: 0.0, y: 0.0), (x: bad, y: 4.0), (x: 3.0, y: 10.0)])
                    .build(),
                Err(TransectError::NonFinite)
            ));
        }
    }
}
