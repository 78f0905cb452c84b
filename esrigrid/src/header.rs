//! ESRI grid header (`.asc` preamble and `.hdr` sidecar).

use crate::{GridError, C};
use geo::geometry::Coord;
use std::{iter::Peekable, str::FromStr};

/// Byte order of binary float samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `MSBFIRST`
    Big,
    /// `LSBFIRST`
    Little,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub ncols: usize,

    pub nrows: usize,

    /// Center of the south-west most cell.
    pub ll_center: Coord<C>,

    /// Cell width (`x`) and height (`y`) in grid units.
    pub cell_size: Coord<C>,

    /// Sentinel value marking missing samples.
    pub nodata: Option<f32>,

    pub byte_order: ByteOrder,
}

impl Header {
    /// Consumes `key value` pairs from the front of `tokens`.
    ///
    /// Stops at the first token that parses as a number, which is
    /// where sample data begins in an ASCII grid. Unknown keys (e.g.
    /// `nbits` in BIL headers) are skipped.
    pub(crate) fn parse<'a, I>(tokens: &mut Peekable<I>) -> Result<Self, GridError>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut ncols = None;
        let mut nrows = None;
        let mut xllcorner = None;
        let mut xllcenter = None;
        let mut yllcorner = None;
        let mut yllcenter = None;
        let mut cellsize = None;
        let mut dx = None;
        let mut dy = None;
        let mut nodata = None;
        let mut byte_order = ByteOrder::Little;

        while let Some(key) = tokens.next_if(|token| token.parse::<f64>().is_err()) {
            let value = tokens.next().ok_or_else(|| GridError::HeaderValue {
                key: key.to_owned(),
                value: String::new(),
            })?;
            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(parse_value::<usize>(key, value)?),
                "nrows" => nrows = Some(parse_value::<usize>(key, value)?),
                "xllcorner" => xllcorner = Some(parse_value::<C>(key, value)?),
                "xllcenter" => xllcenter = Some(parse_value::<C>(key, value)?),
                "yllcorner" => yllcorner = Some(parse_value::<C>(key, value)?),
                "yllcenter" => yllcenter = Some(parse_value::<C>(key, value)?),
                "cellsize" => cellsize = Some(parse_value::<C>(key, value)?),
                "dx" => dx = Some(parse_value::<C>(key, value)?),
                "dy" => dy = Some(parse_value::<C>(key, value)?),
                "nodata_value" => nodata = Some(parse_value::<f32>(key, value)?),
                "byteorder" => {
                    byte_order = match value.to_ascii_uppercase().as_str() {
                        "MSBFIRST" | "M" => ByteOrder::Big,
                        "LSBFIRST" | "I" => ByteOrder::Little,
                        _ => {
                            return Err(GridError::HeaderValue {
                                key: key.to_owned(),
                                value: value.to_owned(),
                            })
                        }
                    }
                }
                _ => (),
            }
        }

        let ncols = ncols.ok_or(GridError::MissingKey("ncols"))?;
        let nrows = nrows.ok_or(GridError::MissingKey("nrows"))?;
        let cell_size = match (cellsize, dx, dy) {
            (_, Some(x), Some(y)) => Coord { x, y },
            (Some(size), _, _) => Coord { x: size, y: size },
            _ => return Err(GridError::MissingKey("cellsize")),
        };
        if cell_size.x <= 0.0 || cell_size.y <= 0.0 || ncols == 0 || nrows == 0 {
            return Err(GridError::HeaderValue {
                key: "cellsize".to_owned(),
                value: format!("{cell_size:?} ({ncols}x{nrows})"),
            });
        }

        let x = match (xllcenter, xllcorner) {
            (Some(center), _) => center,
            (None, Some(corner)) => corner + cell_size.x / 2.0,
            (None, None) => return Err(GridError::MissingKey("xllcorner")),
        };
        let y = match (yllcenter, yllcorner) {
            (Some(center), _) => center,
            (None, Some(corner)) => corner + cell_size.y / 2.0,
            (None, None) => return Err(GridError::MissingKey("yllcorner")),
        };

        Ok(Self {
            ncols,
            nrows,
            ll_center: Coord { x, y },
            cell_size,
            nodata,
            byte_order,
        })
    }
}

impl FromStr for Header {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, GridError> {
        Self::parse(&mut s.split_whitespace().peekable())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, GridError> {
    value.parse::<T>().map_err(|_| GridError::HeaderValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
