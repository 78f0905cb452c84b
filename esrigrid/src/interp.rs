use std::{fmt, str::FromStr};

/// How to estimate a value between cell centers.
///
/// Letters follow GMT's `-n` flag (`n`, `l`, `c`), so `c` is bicubic
/// like `grdtrack`'s default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Value of the closest cell.
    Nearest,

    /// Weighted mean of the 4 surrounding cells.
    Bilinear,

    /// Keys cubic convolution over the 16 surrounding cells.
    #[default]
    Bicubic,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "nearest" => Ok(Self::Nearest),
            "l" | "linear" | "bilinear" => Ok(Self::Bilinear),
            "c" | "cubic" | "bicubic" => Ok(Self::Bicubic),
            other => Err(format!("unknown interpolation {other:?}")),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
        };
        f.write_str(name)
    }
}

/// Linear blend of `a` and `b`; the far end is ignored when `t` is
/// exactly 0 or 1, so a missing neighbor doesn't poison a value that
/// sits on a cell center.
#[allow(clippy::float_cmp)]
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        a + (b - a) * t
    }
}

/// Keys cubic convolution weights (a = -0.5) for the nodes at offsets
/// -1, 0, 1, 2 from the cell containing `t`.
pub(crate) fn cubic_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    ]
}

#[cfg(test)]
mod tests {
    use super::{cubic_weights, lerp, Interpolation};
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_interpolation() {
        assert_eq!("c".parse::<Interpolation>(), Ok(Interpolation::Bicubic));
        assert_eq!("L".parse::<Interpolation>(), Ok(Interpolation::Bilinear));
        assert_eq!(
            "nearest".parse::<Interpolation>(),
            Ok(Interpolation::Nearest)
        );
        assert!("spline".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_cubic_weights() {
        for t in [0.0, 0.25, 0.5, 0.9] {
            let w = cubic_weights(t);
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            // Linear data is reproduced exactly.
            assert_relative_eq!(-w[0] + w[2] + 2.0 * w[3], t, epsilon = 1e-12);
        }
        assert_eq!(cubic_weights(0.0), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_lerp_on_node_ignores_neighbor() {
        assert_eq!(lerp(3.0, f64::NAN, 0.0), 3.0);
        assert_eq!(lerp(f64::NAN, 4.0, 1.0), 4.0);
        assert!(lerp(3.0, f64::NAN, 0.5).is_nan());
        assert_eq!(lerp(2.0, 4.0, 0.25), 2.5);
    }
}
