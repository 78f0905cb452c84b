//! ESRI raster grids (`.asc` text and `.flt`/`.hdr` binary float).
//!
//! Grids are cell-center registered: the header's lower-left
//! position is converted to the _center_ of the south-west most cell
//! and every lookup works relative to it.
//!
//! # References
//!
//! 1. [Esri ASCII raster format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/esri-ascii-raster-format.htm)
//! 1. [Esri float grid (`.flt`)](https://desktop.arcgis.com/en/arcmap/latest/tools/conversion-toolbox/float-to-raster.htm)
//! 1. [Keys, Cubic convolution interpolation for digital image processing (1981)](https://doi.org/10.1109/TASSP.1981.1163711)

mod error;
mod header;
mod interp;

pub use crate::{
    error::GridError,
    header::{ByteOrder, Header},
    interp::Interpolation,
};
use crate::interp::{cubic_weights, lerp};
use byteorder::{BigEndian as BE, ByteOrder as _, LittleEndian as LE, ReadBytesExt};
use geo::geometry::{Coord, Rect};
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    mem::size_of,
    path::Path,
    sync::OnceLock,
};

/// Base floating point type used for all coordinates.
///
/// Samples are stored as `f32`, which is what the binary format
/// holds, but every calculation is done in this type.
pub type C = f64;

/// How to load binary grids.
///
/// ASCII grids are always parsed into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GridMode {
    /// Parse samples and load into memory.
    #[default]
    InMem,

    /// Memory map file contents.
    MemMap,
}

#[derive(Debug)]
pub struct Grid {
    /// Center of the south-west most cell.
    ll_center: Coord<C>,

    /// Cell width and height.
    cell_size: Coord<C>,

    /// Number of (columns, rows) in this grid.
    dimensions: (usize, usize),

    /// Sentinel for missing samples, reported as NaN.
    nodata: Option<f32>,

    /// Lowest and highest finite sample, computed on first use.
    min_max: OnceLock<Option<(f32, f32)>>,

    /// Samples, north row first.
    samples: SampleStore,
}

#[derive(Debug)]
enum SampleStore {
    InMem(Box<[f32]>),
    MemMap { raw: Mmap, byte_order: ByteOrder },
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap { raw, byte_order } => {
                let start = index * size_of::<f32>();
                let bytes = &raw[start..start + size_of::<f32>()];
                match byte_order {
                    ByteOrder::Big => BE::read_f32(bytes),
                    ByteOrder::Little => LE::read_f32(bytes),
                }
            }
        }
    }
}

impl Grid {
    /// Returns an in-memory grid.
    ///
    /// `samples` are in file order: `dimensions.1` rows of
    /// `dimensions.0` columns, north row first.
    pub fn new(
        ll_center: Coord<C>,
        cell_size: Coord<C>,
        dimensions: (usize, usize),
        samples: Vec<f32>,
        nodata: Option<f32>,
    ) -> Result<Self, GridError> {
        let expected = sample_count(dimensions)?;
        if samples.len() != expected {
            return Err(GridError::SampleCount {
                expected,
                found: samples.len(),
            });
        }
        let samples = samples
            .into_iter()
            .map(|sample| mask_nodata(sample, nodata))
            .collect();
        Ok(Self {
            ll_center,
            cell_size,
            dimensions,
            nodata,
            min_max: OnceLock::new(),
            samples: SampleStore::InMem(samples),
        })
    }

    /// Returns the grid at `path`, choosing the format from its
    /// extension.
    pub fn open<P: AsRef<Path>>(path: P, mode: GridMode) -> Result<Self, GridError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match (ext.as_deref(), mode) {
            (Some("asc"), _) => Self::load_ascii(path),
            (Some("flt"), GridMode::InMem) => Self::load_float(path),
            (Some("flt"), GridMode::MemMap) => Self::memmap_float(path),
            _ => Err(GridError::Format(path.to_owned())),
        }
    }

    /// Returns an ESRI ASCII grid read into memory from `path`.
    pub fn load_ascii<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        Self::parse_ascii(BufReader::new(File::open(path)?))
    }

    /// Parses an ESRI ASCII grid.
    pub fn parse_ascii<R: BufRead>(mut reader: R) -> Result<Self, GridError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut tokens = text.split_whitespace().peekable();
        let header = Header::parse(&mut tokens)?;

        sample_count((header.ncols, header.nrows))?;
        let mut samples = Vec::new();
        for token in tokens {
            let sample = token
                .parse::<f32>()
                .map_err(|_| GridError::Sample(token.to_owned()))?;
            samples.push(sample);
        }

        let Header {
            ncols,
            nrows,
            ll_center,
            cell_size,
            nodata,
            ..
        } = header;
        Self::new(ll_center, cell_size, (ncols, nrows), samples, nodata)
    }

    /// Returns a binary float grid read into memory from `path`.
    ///
    /// The header is read from the sibling `.hdr` file.
    pub fn load_float<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let header = read_hdr(&path)?;
        check_float_len(&path, &header)?;

        let mut file = BufReader::new(File::open(&path)?);
        let count = sample_count((header.ncols, header.nrows))?;
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let sample = match header.byte_order {
                ByteOrder::Big => file.read_f32::<BE>()?,
                ByteOrder::Little => file.read_f32::<LE>()?,
            };
            samples.push(sample);
        }

        let Header {
            ncols,
            nrows,
            ll_center,
            cell_size,
            nodata,
            ..
        } = header;
        Self::new(ll_center, cell_size, (ncols, nrows), samples, nodata)
    }

    /// Returns a binary float grid using the memory-mapped file as
    /// storage.
    pub fn memmap_float<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let header = read_hdr(&path)?;
        check_float_len(&path, &header)?;

        let samples = {
            let file = File::open(&path)?;
            let raw = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap {
                raw,
                byte_order: header.byte_order,
            }
        };

        Ok(Self {
            ll_center: header.ll_center,
            cell_size: header.cell_size,
            dimensions: (header.ncols, header.nrows),
            nodata: header.nodata,
            min_max: OnceLock::new(),
            samples,
        })
    }

    /// Returns the number of samples in this grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let (x, y) = self.dimensions;
        x * y
    }

    /// Returns (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    pub fn cell_size(&self) -> Coord<C> {
        self.cell_size
    }

    /// Returns the rectangle spanned by the outermost cell centers.
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Rect<C> {
        let ne_center = Coord {
            x: self.ll_center.x + (self.dimensions.0 - 1) as C * self.cell_size.x,
            y: self.ll_center.y + (self.dimensions.1 - 1) as C * self.cell_size.y,
        };
        Rect::new(self.ll_center, ne_center)
    }

    /// Returns the rectangle covered by the cells, edge to edge.
    pub fn extent(&self) -> Rect<C> {
        let bounds = self.bounds();
        let half = Coord {
            x: self.cell_size.x / 2.0,
            y: self.cell_size.y / 2.0,
        };
        Rect::new(bounds.min() - half, bounds.max() + half)
    }

    /// Returns true if `coord` falls on a cell of this grid.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        self.coord_to_xy(coord).is_some()
    }

    /// Returns the sample at column `x`, row `y`, where `(0, 0)` is
    /// the south-west cell. Missing samples are NaN.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the grid.
    pub fn get_xy(&self, (x, y): (usize, usize)) -> f32 {
        let idx_1d = self.xy_to_linear_index((x, y));
        mask_nodata(self.samples.get_unchecked(idx_1d), self.nodata)
    }

    /// Returns the sample of the cell containing `coord`, if any.
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        self.coord_to_xy(coord).map(|xy| self.get_xy(xy))
    }

    /// Returns the value at `coord` estimated with `interpolation`.
    ///
    /// Returns NaN when `coord` is off the grid or lands on missing
    /// samples. Bilinear and bicubic estimates are only defined
    /// between the outermost cell centers.
    pub fn sample(&self, coord: Coord<C>, interpolation: Interpolation) -> C {
        match interpolation {
            Interpolation::Nearest => self.get(coord).map_or(C::NAN, C::from),
            Interpolation::Bilinear => self.bilinear(coord),
            Interpolation::Bicubic => self.bicubic(coord),
        }
    }

    /// Returns the lowest and highest non-missing samples, or `None`
    /// if every sample is missing.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        *self.min_max.get_or_init(|| {
            (0..self.len())
                .map(|idx| mask_nodata(self.samples.get_unchecked(idx), self.nodata))
                .filter(|sample| !sample.is_nan())
                .fold(None, |acc, sample| match acc {
                    None => Some((sample, sample)),
                    Some((min, max)) => Some((min.min(sample), max.max(sample))),
                })
        })
    }

    /// Returns the `lo` and `hi` quantiles (0..=1) of the non-missing
    /// samples, linearly interpolated between ranks.
    ///
    /// `grid.quantiles(0.02, 0.98)` gives a color range robust to
    /// outliers.
    pub fn quantiles(&self, lo: C, hi: C) -> Option<(C, C)> {
        let mut finite: Vec<f32> = (0..self.len())
            .map(|idx| mask_nodata(self.samples.get_unchecked(idx), self.nodata))
            .filter(|sample| !sample.is_nan())
            .collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_unstable_by(f32::total_cmp);
        Some((quantile(&finite, lo), quantile(&finite, hi)))
    }
}

/// Private API
impl Grid {
    /// Returns fractional (column, row) of `coord`, where whole
    /// numbers are cell centers and row 0 is the southern row.
    fn fractional_xy(&self, coord: Coord<C>) -> (C, C) {
        (
            (coord.x - self.ll_center.x) / self.cell_size.x,
            (coord.y - self.ll_center.y) / self.cell_size.y,
        )
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn coord_to_xy(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let (fx, fy) = self.fractional_xy(coord);
        let (x, y) = ((fx + 0.5).floor(), (fy + 0.5).floor());
        if 0.0 <= x && x < self.dimensions.0 as C && 0.0 <= y && y < self.dimensions.1 as C {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        self.dimensions.0 * (self.dimensions.1 - y - 1) + x
    }

    /// Returns the lower node index and offset along one axis, or
    /// `None` if `f` is outside `0..=len-1`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn axis_node(f: C, len: usize) -> Option<(usize, C)> {
        const EPS: C = 1e-9;
        let last = (len - 1) as C;
        if f < -EPS || f > last + EPS {
            return None;
        }
        let f = f.clamp(0.0, last);
        let i = (f.floor() as usize).min(len.saturating_sub(2));
        Some((i, f - i as C))
    }

    fn bilinear(&self, coord: Coord<C>) -> C {
        let (fx, fy) = self.fractional_xy(coord);
        let (Some((x0, tx)), Some((y0, ty))) = (
            Self::axis_node(fx, self.dimensions.0),
            Self::axis_node(fy, self.dimensions.1),
        ) else {
            return C::NAN;
        };
        let x1 = (x0 + 1).min(self.dimensions.0 - 1);
        let y1 = (y0 + 1).min(self.dimensions.1 - 1);
        let v = |xy| C::from(self.get_xy(xy));
        let south = lerp(v((x0, y0)), v((x1, y0)), tx);
        let north = lerp(v((x0, y1)), v((x1, y1)), tx);
        lerp(south, north, ty)
    }

    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )]
    fn bicubic(&self, coord: Coord<C>) -> C {
        let (fx, fy) = self.fractional_xy(coord);
        let (Some((x0, tx)), Some((y0, ty))) = (
            Self::axis_node(fx, self.dimensions.0),
            Self::axis_node(fy, self.dimensions.1),
        ) else {
            return C::NAN;
        };
        let (cols, rows) = (self.dimensions.0 as isize, self.dimensions.1 as isize);
        let clamp = |i: isize, len: isize| i.clamp(0, len - 1) as usize;

        let wx = cubic_weights(tx);
        let wy = cubic_weights(ty);
        let mut value = 0.0;
        for (j, wy) in wy.iter().enumerate() {
            let y = clamp(y0 as isize + j as isize - 1, rows);
            let mut row = 0.0;
            for (i, wx) in wx.iter().enumerate() {
                if *wx == 0.0 || *wy == 0.0 {
                    continue;
                }
                let x = clamp(x0 as isize + i as isize - 1, cols);
                let sample = self.get_xy((x, y));
                if sample.is_nan() {
                    return self.bilinear(coord);
                }
                row += wx * C::from(sample);
            }
            value += wy * row;
        }
        value
    }
}

fn mask_nodata(sample: f32, nodata: Option<f32>) -> f32 {
    match nodata {
        #[allow(clippy::float_cmp)]
        Some(nodata) if sample == nodata => f32::NAN,
        _ => sample,
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f32], q: C) -> C {
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as C;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    lerp(C::from(sorted[lo]), C::from(sorted[hi]), rank - lo as C)
}

fn read_hdr<P: AsRef<Path>>(path: P) -> Result<Header, GridError> {
    let mut text = String::new();
    File::open(path.as_ref().with_extension("hdr"))?.read_to_string(&mut text)?;
    text.parse()
}

/// Returns `columns * rows`, rejecting empty and overflowing
/// dimensions.
fn sample_count((cols, rows): (usize, usize)) -> Result<usize, GridError> {
    match cols.checked_mul(rows) {
        Some(count) if count > 0 => Ok(count),
        _ => Err(GridError::Dimensions(cols, rows)),
    }
}

fn check_float_len<P: AsRef<Path>>(path: P, header: &Header) -> Result<(), GridError> {
    let expected = sample_count((header.ncols, header.nrows))?
        .checked_mul(size_of::<f32>())
        .and_then(|len| u64::try_from(len).ok())
        .ok_or(GridError::Dimensions(header.ncols, header.nrows))?;
    match path.as_ref().metadata().map(|m| m.len())? {
        len if len == expected => Ok(()),
        invalid_len => Err(GridError::FileLen(invalid_len, path.as_ref().to_owned())),
    }
}

/// Returns the workspace test data directory.
#[cfg(test)]
fn grid_dir() -> std::path::PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "..", "data", "grids"]
        .iter()
        .collect()
}
