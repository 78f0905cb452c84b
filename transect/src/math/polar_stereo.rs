//! EPSG:3031, WGS 84 / Antarctic Polar Stereographic.
//!
//! Ellipsoidal south polar stereographic with true scale at 71°S and
//! 0° longitude pointing up the y axis.
//!
//! # References
//!
//! 1. Snyder, _Map Projections: A Working Manual_, USGS Professional
//!    Paper 1395, pp. 160-164.

use geo::geometry::Coord;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Latitude of true scale in degrees.
const LAT_TS: f64 = -71.0;

const MAX_ITER: usize = 15;
const TOLERANCE: f64 = 1e-12;

fn eccentricity() -> f64 {
    (WGS84_F * (2.0 - WGS84_F)).sqrt()
}

/// Snyder's `t` for co-latitude measured from the (mirrored) pole.
fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

/// `a * m_c / t_c`, the factor turning `t` into polar radius.
fn radius_factor(e: f64) -> f64 {
    let phi_c = (-LAT_TS).to_radians();
    WGS84_A * m(phi_c, e) / t(phi_c, e)
}

/// Projects `x: lon, y: lat` degrees to EPSG:3031 meters.
pub fn lonlat_to_epsg3031(Coord { x: lon, y: lat }: Coord<f64>) -> Coord<f64> {
    let e = eccentricity();
    let rho = radius_factor(e) * t((-lat).to_radians(), e);
    let (sin, cos) = lon.to_radians().sin_cos();
    Coord {
        x: rho * sin,
        y: rho * cos,
    }
}

/// Inverse of [`lonlat_to_epsg3031`], returning `x: lon, y: lat`
/// degrees.
pub fn epsg3031_to_lonlat(Coord { x, y }: Coord<f64>) -> Coord<f64> {
    let e = eccentricity();
    let t = x.hypot(y) / radius_factor(e);
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..MAX_ITER {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        let converged = (next - phi).abs() < TOLERANCE;
        phi = next;
        if converged {
            break;
        }
    }
    Coord {
        x: x.atan2(y).to_degrees(),
        y: -phi.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::{epsg3031_to_lonlat, lonlat_to_epsg3031};
    use approx::assert_relative_eq;
    use geo::coord;

    #[test]
    fn test_pole_is_origin() {
        let pole = lonlat_to_epsg3031(coord!(x: 0.0, y: -90.0));
        assert_relative_eq!(pole.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(pole.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward() {
        // At the standard parallel the radius is a * m_c.
        let ts = lonlat_to_epsg3031(coord!(x: 0.0, y: -71.0));
        assert_relative_eq!(ts.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ts.y, 2_082_760.108_542_913, epsilon = 1e-3);

        let east = lonlat_to_epsg3031(coord!(x: 90.0, y: -80.0));
        assert_relative_eq!(east.x, 1_089_179.455_626_183, epsilon = 1e-3);
        assert_relative_eq!(east.y, 0.0, epsilon = 1e-6);

        let dateline = lonlat_to_epsg3031(coord!(x: 180.0, y: -60.0));
        assert_relative_eq!(dateline.y, -3_333_134.027_630_277, epsilon = 1e-3);

        let diagonal = lonlat_to_epsg3031(coord!(x: -45.0, y: -75.0));
        assert_relative_eq!(diagonal.x, -1_158_794.740_772_607, epsilon = 1e-3);
        assert_relative_eq!(diagonal.y, 1_158_794.740_772_607, epsilon = 1e-3);
    }

    #[test]
    fn test_inverse() {
        for (lon, lat) in [(0.0, -71.0), (90.0, -80.0), (-45.0, -75.0), (135.5, -62.25)] {
            let lonlat = epsg3031_to_lonlat(lonlat_to_epsg3031(coord!(x: lon, y: lat)));
            assert_relative_eq!(lonlat.x, lon, epsilon = 1e-9);
            assert_relative_eq!(lonlat.y, lat, epsilon = 1e-9);
        }
    }
}
