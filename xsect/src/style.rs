//! Grid lists and their colors.

use anyhow::{anyhow, bail, Context, Error as AnyError};
use plotters::style::RGBColor;
use serde::Deserialize;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    str::FromStr,
};

/// A grid to sample, as given on the command line or in a config
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridSpec {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub axis: Option<u8>,
}

/// Parses "NAME=PATH[,COLOR[,AXIS]]".
impl FromStr for GridSpec {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (name, rest) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=PATH[,COLOR[,AXIS]], got {s:?}"))?;
        let mut fields = rest.split(',');
        let path = fields.next().unwrap_or_default();
        if name.is_empty() || path.is_empty() {
            bail!("expected NAME=PATH[,COLOR[,AXIS]], got {s:?}");
        }
        let color = fields.next().filter(|c| !c.is_empty()).map(str::to_owned);
        let axis = fields.next().map(u8::from_str).transpose()?;
        if let Some(extra) = fields.next() {
            bail!("unexpected field {extra:?} in {s:?}");
        }
        Ok(Self {
            name: name.to_owned(),
            path: PathBuf::from(path),
            color,
            axis,
        })
    }
}

/// Contents of a `--config` file.
#[derive(Debug, Default, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub layers: Vec<GridSpec>,
    #[serde(default)]
    pub data: Vec<GridSpec>,
}

impl GridConfig {
    /// Reads a config file. Relative grid paths are taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, AnyError> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for spec in config.layers.iter_mut().chain(config.data.iter_mut()) {
            if spec.path.is_relative() {
                spec.path = base.join(&spec.path);
            }
        }
        Ok(config)
    }
}

/// Which y axis a data series is drawn against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Axis {
    #[default]
    Left,
    Right,
}

/// A grid with its color resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Styled {
    pub name: String,
    pub path: PathBuf,
    pub color: RGBColor,
    pub axis: Axis,
}

const LIGHTSKYBLUE: RGBColor = RGBColor(135, 206, 250);
const DARKBLUE: RGBColor = RGBColor(0, 0, 139);
const LIGHTBROWN: RGBColor = RGBColor(205, 170, 125);

/// Colors used once the conventional ones run out.
const PALETTE: [RGBColor; 6] = [
    RGBColor(210, 180, 140),
    RGBColor(128, 128, 128),
    RGBColor(0, 100, 0),
    RGBColor(128, 0, 128),
    RGBColor(255, 165, 0),
    RGBColor(0, 0, 0),
];

/// Returns the color for a named or `#rrggbb` color.
pub fn parse_color(s: &str) -> Result<RGBColor, AnyError> {
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("expected #rrggbb, got {s:?}");
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).with_context(|| format!("invalid color {s:?}"))
        };
        return Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?));
    }
    let color = match s.to_ascii_lowercase().as_str() {
        "lightskyblue" => LIGHTSKYBLUE,
        "darkblue" => DARKBLUE,
        "lightbrown" => LIGHTBROWN,
        "brown" => RGBColor(165, 42, 42),
        "tan" => RGBColor(210, 180, 140),
        "red" => RGBColor(255, 0, 0),
        "green" => RGBColor(0, 128, 0),
        "darkgreen" => RGBColor(0, 100, 0),
        "blue" => RGBColor(0, 0, 255),
        "lightblue" => RGBColor(173, 216, 230),
        "skyblue" => RGBColor(135, 206, 235),
        "navy" => RGBColor(0, 0, 128),
        "cyan" => RGBColor(0, 255, 255),
        "magenta" => RGBColor(255, 0, 255),
        "purple" => RGBColor(128, 0, 128),
        "orange" => RGBColor(255, 165, 0),
        "gray" | "grey" => RGBColor(128, 128, 128),
        "lightgray" | "lightgrey" => RGBColor(211, 211, 211),
        "black" => RGBColor(0, 0, 0),
        "white" => RGBColor(255, 255, 255),
        _ => bail!("unknown color {s:?}"),
    };
    Ok(color)
}

/// Resolves layer colors: given colors first, then the usual colors
/// of surface, icebase and bed, then the palette.
pub fn style_layers(specs: &[GridSpec]) -> Result<Vec<Styled>, AnyError> {
    check_unique(specs)?;
    let mut palette = PALETTE.iter().cycle();
    specs
        .iter()
        .map(|spec| -> Result<Styled, AnyError> {
            let color = match (&spec.color, spec.name.to_ascii_lowercase().as_str()) {
                (Some(color), _) => parse_color(color)?,
                (None, "surface") => LIGHTSKYBLUE,
                (None, "icebase") => DARKBLUE,
                (None, "bed") => LIGHTBROWN,
                (None, _) => *palette.next().unwrap_or(&PALETTE[0]),
            };
            Ok(Styled {
                name: spec.name.clone(),
                path: spec.path.clone(),
                color,
                axis: Axis::Left,
            })
        })
        .collect()
}

/// Resolves data colors and axes: red, then blue, then the palette.
pub fn style_data(specs: &[GridSpec]) -> Result<Vec<Styled>, AnyError> {
    check_unique(specs)?;
    let mut defaults = [RGBColor(255, 0, 0), RGBColor(0, 0, 255)]
        .iter()
        .chain(PALETTE.iter().cycle());
    specs
        .iter()
        .map(|spec| -> Result<Styled, AnyError> {
            let default = *defaults.next().unwrap_or(&PALETTE[0]);
            let color = match &spec.color {
                Some(color) => parse_color(color)?,
                None => default,
            };
            let axis = match spec.axis {
                None | Some(0) => Axis::Left,
                Some(1) => Axis::Right,
                Some(other) => bail!("{}: axis must be 0 or 1, got {other}", spec.name),
            };
            Ok(Styled {
                name: spec.name.clone(),
                path: spec.path.clone(),
                color,
                axis,
            })
        })
        .collect()
}

/// Grids are stored by name, so a repeated name would replace the
/// earlier grid.
fn check_unique(specs: &[GridSpec]) -> Result<(), AnyError> {
    let mut names = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name.as_str()) {
            bail!("duplicate grid name {:?}", spec.name);
        }
    }
    Ok(())
}
