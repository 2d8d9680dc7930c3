//! Model grid and the named dimensions quantities are laid out over.
//!
//! Arrays are always stored in the order longitude, latitude, level, with any
//! dimension a quantity does not span omitted. A surface field therefore has
//! shape `[nlon, nlat]` and a column field `[nlon, nlat, n_mid_levels]`.

use crate::errors::{RGCMError, RGCMResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named axis of the model grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridDimension {
    Longitude,
    Latitude,
    /// Full model levels, where temperature and winds live.
    MidLevels,
    /// Half levels bounding the mid levels.
    InterfaceLevels,
}

impl fmt::Display for GridDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridDimension::Longitude => "longitude",
            GridDimension::Latitude => "latitude",
            GridDimension::MidLevels => "mid_levels",
            GridDimension::InterfaceLevels => "interface_levels",
        };
        write!(f, "{}", name)
    }
}

/// Formats a dimension list as `[longitude, latitude]`.
pub fn format_dims(dims: &[GridDimension]) -> String {
    let names: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    format!("[{}]", names.join(", "))
}

/// Sizes of the active model grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub nlon: usize,
    pub nlat: usize,
    pub n_mid_levels: usize,
    pub n_interface_levels: usize,
}

impl Grid {
    /// Creates a grid, rejecting empty horizontal axes.
    pub fn new(
        nlon: usize,
        nlat: usize,
        n_mid_levels: usize,
        n_interface_levels: usize,
    ) -> RGCMResult<Self> {
        if nlon == 0 || nlat == 0 {
            return Err(RGCMError::InvalidConfiguration(format!(
                "grid must have at least one column, got nlon={} nlat={}",
                nlon, nlat
            )));
        }
        Ok(Self {
            nlon,
            nlat,
            n_mid_levels,
            n_interface_levels,
        })
    }

    /// Creates a grid whose interface levels bound its mid levels.
    pub fn from_levels(nlon: usize, nlat: usize, n_mid_levels: usize) -> RGCMResult<Self> {
        Self::new(nlon, nlat, n_mid_levels, n_mid_levels + 1)
    }

    pub fn len(&self, dim: GridDimension) -> usize {
        match dim {
            GridDimension::Longitude => self.nlon,
            GridDimension::Latitude => self.nlat,
            GridDimension::MidLevels => self.n_mid_levels,
            GridDimension::InterfaceLevels => self.n_interface_levels,
        }
    }

    /// The array shape of a quantity spanning `dims`.
    pub fn shape_for(&self, dims: &[GridDimension]) -> Vec<usize> {
        dims.iter().map(|d| self.len(*d)).collect()
    }

    pub fn n_columns(&self) -> usize {
        self.nlon * self.nlat
    }

    /// Latitude of each row's centre in degrees north, equally spaced from
    /// south to north.
    pub fn latitudes(&self) -> Array1<f64> {
        let spacing = 180.0 / self.nlat as f64;
        Array1::from_iter((0..self.nlat).map(|j| -90.0 + spacing * (j as f64 + 0.5)))
    }

    /// Longitude of each column's centre in degrees east, starting at zero.
    pub fn longitudes(&self) -> Array1<f64> {
        let spacing = 360.0 / self.nlon as f64;
        Array1::from_iter((0..self.nlon).map(|i| spacing * i as f64))
    }
}

impl Default for Grid {
    /// A single column with ten mid levels.
    fn default() -> Self {
        Self {
            nlon: 1,
            nlat: 1,
            n_mid_levels: 10,
            n_interface_levels: 11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn test_shape_for() {
        let grid = Grid::new(4, 3, 2, 3).unwrap();
        assert_eq!(
            grid.shape_for(&[
                GridDimension::Longitude,
                GridDimension::Latitude,
                GridDimension::MidLevels
            ]),
            vec![4, 3, 2]
        );
        assert_eq!(
            grid.shape_for(&[GridDimension::Longitude, GridDimension::Latitude]),
            vec![4, 3]
        );
        assert_eq!(grid.shape_for(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_from_levels() {
        let grid = Grid::from_levels(2, 2, 5).unwrap();
        assert_eq!(grid.n_interface_levels, 6);
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(matches!(
            Grid::new(0, 3, 2, 3),
            Err(RGCMError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_coordinates() {
        let grid = Grid::new(4, 2, 1, 2).unwrap();
        let lat = grid.latitudes();
        assert!(is_close!(lat[0], -45.0));
        assert!(is_close!(lat[1], 45.0));
        let lon = grid.longitudes();
        assert_eq!(lon.to_vec(), vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn test_dimension_names() {
        assert_eq!(GridDimension::InterfaceLevels.to_string(), "interface_levels");
        assert_eq!(
            serde_json::to_string(&GridDimension::MidLevels).unwrap(),
            "\"mid_levels\""
        );
        assert_eq!(
            format_dims(&[GridDimension::Longitude, GridDimension::Latitude]),
            "[longitude, latitude]"
        );
    }
}
