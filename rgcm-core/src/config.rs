//! Model configuration loaded from TOML.
//!
//! ```toml
//! time_step = 600.0
//! missing_inputs = "fill_defaults"
//!
//! [grid]
//! nlon = 4
//! nlat = 3
//! n_mid_levels = 10
//!
//! [constants.stellar_irradiance]
//! value = 1360.0
//! units = "W m^-2"
//! ```
//!
//! Components are attached to the [`ModelBuilder`] returned by
//! [`ModelConfig::builder`].

use crate::constants::{Constant, ConstantsTable};
use crate::errors::{RGCMError, RGCMResult};
use crate::grid::Grid;
use crate::model::{MissingInputPolicy, ModelBuilder};
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Grid section of a [`ModelConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub nlon: usize,
    pub nlat: usize,
    pub n_mid_levels: usize,
    /// Defaults to one more than `n_mid_levels`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_interface_levels: Option<usize>,
}

impl GridConfig {
    pub fn to_grid(&self) -> RGCMResult<Grid> {
        Grid::new(
            self.nlon,
            self.nlat,
            self.n_mid_levels,
            self.n_interface_levels.unwrap_or(self.n_mid_levels + 1),
        )
    }
}

/// Settings of a model run other than its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Seconds per step.
    pub time_step: Time,
    pub grid: GridConfig,
    #[serde(default)]
    pub missing_inputs: MissingInputPolicy,
    /// Overrides applied on top of the default constants.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, Constant>,
}

impl ModelConfig {
    pub fn from_toml_str(toml_str: &str) -> RGCMResult<Self> {
        let config: ModelConfig = toml::from_str(toml_str)
            .map_err(|e| RGCMError::InvalidConfiguration(format!("invalid model config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> RGCMResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RGCMError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> RGCMResult<String> {
        toml::to_string(self).map_err(|e| RGCMError::Error(e.to_string()))
    }

    fn validate(&self) -> RGCMResult<()> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(RGCMError::InvalidConfiguration(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        self.grid.to_grid()?;
        Ok(())
    }

    /// The default constants with this config's overrides applied.
    pub fn constants_table(&self) -> RGCMResult<ConstantsTable> {
        let mut table = ConstantsTable::default();
        table.update_from_map(&self.constants)?;
        Ok(table)
    }

    /// A builder preloaded with these settings.
    pub fn builder(&self) -> RGCMResult<ModelBuilder> {
        let mut builder = ModelBuilder::new();
        builder
            .with_time_step(self.time_step)
            .with_grid(self.grid.to_grid()?)
            .with_constants(self.constants_table()?)
            .with_missing_inputs(self.missing_inputs);
        Ok(builder)
    }
}
