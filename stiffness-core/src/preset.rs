//! Preset elastic models for demonstration and testing.
//!
//! Two presets are available:
//!
//! - `constant-elastic`: uniform model, `vp` from the configuration
//!   (1.5 km/s by default), `vs = 0.5*vp`, `rho = 1`
//! - `layers-elastic`: `nlayers` layers stacked along the last axis with `vp`
//!   linearly spaced from `vp_top` to `vp_bottom`; `vs = 0.5*vp` and
//!   `rho = 0.31*(1000*vp)^0.25`, except in water-like layers
//!   (`vp < 1.51`) where `vs = 0` and `rho = 1`
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! shape = [101, 101]
//! nbl = 10
//! nlayers = 3
//! vp_top = 1.5
//! vp_bottom = 3.5
//! ```

use crate::error::{Error, Result};
use crate::model::{ElasticModel, Grid};
use crate::types::Dim;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Velocity below which a layer is treated as fluid.
const FLUID_VP: f64 = 1.51;

/// Preset model configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresetConfig {
    /// Grid points per axis (2 or 3 entries).
    pub shape: Vec<usize>,
    /// Grid spacing per axis; 10 per axis when unset.
    pub spacing: Option<Vec<f64>>,
    /// Grid origin; 0 per axis when unset.
    pub origin: Option<Vec<f64>>,
    /// Absorbing boundary width in points.
    pub nbl: usize,
    /// Spatial discretization order.
    pub space_order: usize,
    /// P-wave speed of the constant preset (km/s).
    pub vp: f64,
    /// Number of layers of the layered preset.
    pub nlayers: usize,
    /// Top-layer P-wave speed of the layered preset (km/s).
    pub vp_top: f64,
    /// Bottom-layer P-wave speed of the layered preset (km/s).
    pub vp_bottom: f64,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            shape: vec![101, 101],
            spacing: None,
            origin: None,
            nbl: 10,
            space_order: 2,
            vp: 1.5,
            nlayers: 3,
            vp_top: 1.5,
            vp_bottom: 3.5,
        }
    }
}

impl PresetConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PresetConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDimension`] for a shape of rank other than
    /// 2 or 3, and [`Error::Config`] for inconsistent values.
    pub fn validate(&self) -> Result<()> {
        let dim = Dim::new(self.shape.len())?;
        if self.shape.contains(&0) {
            return Err(Error::Config("shape entries must be positive".into()));
        }
        for (label, axis) in [("spacing", &self.spacing), ("origin", &self.origin)] {
            if let Some(v) = axis {
                if v.len() != dim.n() {
                    return Err(Error::Config(format!(
                        "{label} has {} entries, shape has {}",
                        v.len(),
                        dim.n()
                    )));
                }
            }
        }
        if self.nlayers == 0 {
            return Err(Error::Config("nlayers must be at least 1".into()));
        }
        if self.vp <= 0.0 || self.vp_top <= 0.0 || self.vp_bottom <= 0.0 {
            return Err(Error::Config("velocities must be positive".into()));
        }
        Ok(())
    }

    /// Model dimensionality.
    pub fn dim(&self) -> Result<Dim> {
        Dim::new(self.shape.len())
    }

    fn grid(&self) -> Grid {
        let n = self.shape.len();
        Grid {
            shape: self.shape.clone(),
            spacing: self.spacing.clone().unwrap_or_else(|| vec![10.0; n]),
            origin: self.origin.clone().unwrap_or_else(|| vec![0.0; n]),
            nbl: self.nbl,
            space_order: self.space_order,
        }
    }
}

/// Available presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    ConstantElastic,
    LayersElastic,
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "constant-elastic" => Ok(Preset::ConstantElastic),
            "layers-elastic" => Ok(Preset::LayersElastic),
            _ => Err(Error::UnknownPreset(s.to_string())),
        }
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// P-wave speed per point of the layered preset, row-major.
fn layered_vp(config: &PresetConfig) -> Vec<f64> {
    let depth = *config.shape.last().unwrap_or(&1);
    let n_points: usize = config.shape.iter().product();
    let layer_vp = linspace(config.vp_top, config.vp_bottom, config.nlayers);
    let thickness = depth / config.nlayers;

    (0..n_points)
        .map(|p| {
            let k = p % depth;
            (1..config.nlayers)
                .filter(|&i| k >= i * thickness)
                .last()
                .map_or(config.vp_top, |i| layer_vp[i])
        })
        .collect()
}

/// Build a preset model.
///
/// The returned model exposes `vp`, `vs`, `rho` as spatial functions (with
/// gridded values) and `lam`, `mu`, `Ip`, `Is` derived from them, so it can
/// feed any parameterization.
///
/// # Errors
///
/// - [`Error::UnknownPreset`] for an unknown preset name
/// - configuration errors from [`PresetConfig::validate`]
pub fn demo_model(preset: &str, config: &PresetConfig) -> Result<ElasticModel> {
    let preset: Preset = preset.parse()?;
    config.validate()?;
    let dim = config.dim()?;
    let grid = config.grid();
    let n_points = grid.n_points();

    let (vp, vs, rho) = match preset {
        Preset::ConstantElastic => (
            vec![config.vp; n_points],
            vec![0.5 * config.vp; n_points],
            vec![1.0; n_points],
        ),
        Preset::LayersElastic => {
            let vp = layered_vp(config);
            let (vs, rho): (Vec<f64>, Vec<f64>) = vp
                .iter()
                .map(|&v| {
                    if v < FLUID_VP {
                        (0.0, 1.0)
                    } else {
                        (0.5 * v, 0.31 * (1e3 * v).powf(0.25))
                    }
                })
                .unzip();
            (vp, vs, rho)
        }
    };

    debug!(?preset, shape = ?grid.shape, nbl = grid.nbl, "building preset model");
    let values: BTreeMap<String, Vec<f64>> = [("vp", vp), ("vs", vs), ("rho", rho)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    let model = ElasticModel::velocity_functions(dim).with_grid(grid, values)?;
    info!(?preset, %dim, points = n_points, "preset model ready");
    Ok(model)
}
