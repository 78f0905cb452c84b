//! Transect lines stored on disk.

use crate::{math::lonlat_to_epsg3031, TransectError, C};
use geo::{
    algorithm::MapCoords,
    geometry::{Coord, Geometry, GeometryCollection, LineString},
};
use csv::{ReaderBuilder, Trim};
use geojson::GeoJson;
use std::{path::Path, str::FromStr};

/// Coordinate reference of a line file's vertices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineCrs {
    /// EPSG:3031 easting/northing in meters, same as the grids.
    #[default]
    Projected,

    /// `lon,lat` degrees, projected to EPSG:3031 on load.
    Geographic,
}

impl FromStr for LineCrs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "projected" | "epsg:3031" | "xy" => Ok(Self::Projected),
            "geographic" | "epsg:4326" | "lonlat" => Ok(Self::Geographic),
            other => Err(format!("unknown line crs {other:?}")),
        }
    }
}

/// Reads the transect line in `path`.
///
/// GeoJSON files (`.geojson`, `.json`) yield their first line
/// geometry. Vertex files (`.csv`, `.txt`, `.xy`) hold one `x,y` pair
/// per line, comma, tab or space separated, with optional `#`
/// comments and a header line. Extra columns are ignored.
pub fn read_line<P: AsRef<Path>>(path: P, crs: LineCrs) -> Result<LineString<C>, TransectError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase);
    let line = match ext.as_deref() {
        Some("geojson" | "json") => parse_geojson(&std::fs::read_to_string(path)?)?
            .ok_or_else(|| TransectError::NoLine(path.to_owned()))?,
        Some("csv" | "txt" | "xy") => {
            let text = std::fs::read_to_string(path)?;
            parse_vertices(&text, delimiter(&text), path)?
        }
        _ => return Err(TransectError::LineFormat(path.to_owned())),
    };

    Ok(match crs {
        LineCrs::Projected => line,
        LineCrs::Geographic => line.map_coords(lonlat_to_epsg3031),
    })
}

fn parse_geojson(text: &str) -> Result<Option<LineString<C>>, TransectError> {
    let geojson: GeoJson = text.parse()?;
    let collection = GeometryCollection::<C>::try_from(&geojson)?;
    Ok(collection.into_iter().find_map(|geometry| match geometry {
        Geometry::LineString(line) => Some(line),
        Geometry::MultiLineString(lines) => lines.0.into_iter().next(),
        _ => None,
    }))
}

/// Returns the field separator of the first data line.
fn delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or_default();
    if first.contains(',') {
        b','
    } else if first.contains('\t') {
        b'\t'
    } else {
        b' '
    }
}

fn parse_vertices(text: &str, delimiter: u8, path: &Path) -> Result<LineString<C>, TransectError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut vertices = Vec::new();
    let mut seen_header = false;
    for record in reader.records() {
        let record = record?;
        // Runs of spaces give empty fields.
        let fields: Vec<&str> = record.iter().filter(|field| !field.is_empty()).collect();
        let parsed = match fields[..] {
            [] => continue,
            [x, y, ..] => parse_coord(x).zip(parse_coord(y)),
            [_] => None,
        };
        match parsed {
            Some((x, y)) => vertices.push(Coord { x, y }),
            None if vertices.is_empty() && !seen_header => seen_header = true,
            None => {
                return Err(TransectError::Vertex {
                    path: path.to_owned(),
                    line: fields.join(char::from(delimiter).to_string().as_str()),
                })
            }
        }
    }
    Ok(LineString::from(vertices))
}

fn parse_coord(field: &str) -> Option<C> {
    field.parse::<C>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::{read_line, LineCrs};
    use crate::{lonlat_to_epsg3031, TransectError};
    use approx::assert_relative_eq;
    use geo::{coord, line_string};
    use std::{io::Write, path::PathBuf};

    fn line_dir() -> PathBuf {
        crate::test_data_dir().join("lines")
    }

    #[test]
    fn test_read_geojson() {
        let line = read_line(line_dir().join("transect.geojson"), LineCrs::Projected).unwrap();
        assert_eq!(
            line,
            line_string![
                (x: -490_000.0, y: -995_000.0),
                (x: -450_000.0, y: -995_000.0),
                (x: -450_000.0, y: -965_000.0)
            ]
        );
    }

    #[test]
    fn test_read_csv() {
        let line = read_line(line_dir().join("transect.csv"), LineCrs::Projected).unwrap();
        // The duplicate vertex is kept here, transects drop it.
        assert_eq!(line.0.len(), 4);
        assert_eq!(line.0[0], coord!(x: -490_000.0, y: -995_000.0));
        assert_eq!(line.0[3], coord!(x: -450_000.0, y: -965_000.0));
    }

    #[test]
    fn test_read_geographic() {
        let dir = std::env::temp_dir().join(format!("transect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lonlat.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "lon lat\n-45 -75\n0 -71").unwrap();

        let line = read_line(&path, LineCrs::Geographic).unwrap();
        let expected = lonlat_to_epsg3031(coord!(x: -45.0, y: -75.0));
        assert_relative_eq!(line.0[0].x, expected.x);
        assert_relative_eq!(line.0[0].y, expected.y);
        assert_relative_eq!(line.0[1].y, 2_082_760.108_542_913, epsilon = 1e-3);
    }

    #[test]
    fn test_invalid_vertex() {
        let dir = std::env::temp_dir().join(format!("transect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        std::fs::write(&path, "x,y\n1,2\n3,oops\n").unwrap();
        assert!(matches!(
            read_line(&path, LineCrs::Projected),
            Err(TransectError::Vertex { line, .. }) if line == "3,oops"
        ));
    }

    #[test]
    fn test_non_finite_vertex() {
        let dir = std::env::temp_dir().join(format!("transect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nan.xy");
        std::fs::write(&path, "0\t0\t12.5\nNaN\t4\n").unwrap();
        assert!(matches!(
            read_line(&path, LineCrs::Projected),
            Err(TransectError::Vertex { line, .. }) if line == "NaN\t4"
        ));
    }

    #[test]
    fn test_read_multi_line_string() {
        let dir = std::env::temp_dir().join(format!("transect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("multi.geojson");
        std::fs::write(
            &path,
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"name": "camp"},
                        "geometry": {"type": "Point", "coordinates": [5.0, 5.0]}
                    },
                    {
                        "type": "Feature",
                        "properties": {},
                        "geometry": {
                            "type": "MultiLineString",
                            "coordinates": [[[0.0, 0.0], [10.0, 0.0]], [[20.0, 0.0], [30.0, 0.0]]]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();
        let line = read_line(&path, LineCrs::Projected).unwrap();
        assert_eq!(line, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);

        std::fs::write(
            &path,
            r#"{"type": "Point", "coordinates": [5.0, 5.0]}"#,
        )
        .unwrap();
        assert!(matches!(
            read_line(&path, LineCrs::Projected),
            Err(TransectError::NoLine(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            read_line(line_dir().join("transect.shp"), LineCrs::Projected),
            Err(TransectError::LineFormat(_))
        ));
        assert_eq!("EPSG:4326".parse::<LineCrs>(), Ok(LineCrs::Geographic));
    }
}
