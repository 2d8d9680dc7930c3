//! Quantity descriptor registry.
//!
//! Every quantity exchanged between components has a single descriptor giving
//! its canonical units, the grid dimensions it spans and the value it takes
//! when a state is created from defaults. Components refer to quantities by
//! name only; the registry is the lookup service that turns a name into
//! metadata.
//!
//! # Overview
//!
//! Descriptors come from three places, checked in this order:
//! - the standard catalogue in [`crate::standard_quantities`]
//! - [`define_quantity!`](crate::define_quantity) invocations anywhere in the
//!   final binary, collected with `inventory`
//! - runtime registration through [`QuantityRegistry::register`]
//!
//! # Example
//!
//! ```rust
//! use rgcm_core::grid::GridDimension;
//! use rgcm_core::registry::{QuantityDescriptor, QUANTITY_REGISTRY};
//!
//! let descriptor = QUANTITY_REGISTRY.describe("air_temperature").unwrap();
//! assert_eq!(descriptor.units, "K");
//!
//! QUANTITY_REGISTRY
//!     .register(QuantityDescriptor::new(
//!         "tracer_concentration",
//!         "kg/kg",
//!         vec![
//!             GridDimension::Longitude,
//!             GridDimension::Latitude,
//!             GridDimension::MidLevels,
//!         ],
//!         0.0,
//!         "A passive tracer",
//!     ))
//!     .unwrap();
//! assert!(QUANTITY_REGISTRY.is_registered("tracer_concentration"));
//! ```

use crate::errors::{RGCMError, RGCMResult};
use crate::grid::GridDimension;
use crate::standard_quantities::STANDARD_QUANTITIES;
use crate::units::Unit;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Metadata describing a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityDescriptor {
    /// Unique name, e.g. `air_temperature`.
    pub name: String,
    /// Canonical units all values are validated and converted against.
    pub units: String,
    /// Dimensions spanned, in storage order.
    pub dims: Vec<GridDimension>,
    /// Fill value used when a state is created from defaults.
    pub default_value: FloatValue,
    pub description: String,
}

impl QuantityDescriptor {
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        dims: Vec<GridDimension>,
        default_value: FloatValue,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            dims,
            default_value,
            description: description.into(),
        }
    }
}

/// Compile-time descriptor holding only `'static` data so it can live in a
/// `const` and be collected by `inventory`.
#[derive(Debug, Clone, Copy)]
pub struct StaticQuantityDescriptor {
    pub name: &'static str,
    pub units: &'static str,
    pub dims: &'static [GridDimension],
    pub default_value: FloatValue,
    pub description: &'static str,
}

impl StaticQuantityDescriptor {
    pub const fn new(
        name: &'static str,
        units: &'static str,
        dims: &'static [GridDimension],
        default_value: FloatValue,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            units,
            dims,
            default_value,
            description,
        }
    }

    pub fn to_descriptor(&self) -> QuantityDescriptor {
        QuantityDescriptor {
            name: self.name.to_string(),
            units: self.units.to_string(),
            dims: self.dims.to_vec(),
            default_value: self.default_value,
            description: self.description.to_string(),
        }
    }
}

inventory::collect!(StaticQuantityDescriptor);

/// Defines a quantity descriptor at compile time.
///
/// The descriptor is exposed as a constant and submitted to every
/// [`QuantityRegistry`].
///
/// ```rust
/// use rgcm_core::define_quantity;
///
/// define_quantity!(
///     CLOUD_FRACTION,
///     name = "cloud_area_fraction_in_atmosphere_layer",
///     units = "1",
///     dims = [Longitude, Latitude, MidLevels],
///     default = 0.0,
///     description = "Fraction of each layer covered by cloud",
/// );
///
/// assert_eq!(CLOUD_FRACTION.units, "1");
/// ```
#[macro_export]
macro_rules! define_quantity {
    (
        $ident:ident,
        name = $name:expr,
        units = $units:expr,
        dims = [$($dim:ident),* $(,)?],
        default = $default:expr,
        description = $desc:expr $(,)?
    ) => {
        #[doc = concat!("Descriptor for `", $name, "`")]
        pub const $ident: $crate::registry::StaticQuantityDescriptor =
            $crate::registry::StaticQuantityDescriptor::new(
                $name,
                $units,
                &[$($crate::grid::GridDimension::$dim),*],
                $default,
                $desc,
            );

        $crate::inventory::submit! { $ident }
    };
}

/// Lookup service for quantity descriptors.
///
/// Clones share their runtime registrations, so a clone handed to a model
/// sees quantities registered through the original.
#[derive(Debug, Clone, Default)]
pub struct QuantityRegistry {
    runtime: Arc<RwLock<HashMap<String, QuantityDescriptor>>>,
}

impl QuantityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn static_descriptors() -> impl Iterator<Item = &'static StaticQuantityDescriptor> {
        STANDARD_QUANTITIES
            .iter()
            .copied()
            .chain(inventory::iter::<StaticQuantityDescriptor>)
    }

    /// Gets a descriptor by name.
    pub fn get(&self, name: &str) -> Option<QuantityDescriptor> {
        if let Some(found) = Self::static_descriptors().find(|d| d.name == name) {
            return Some(found.to_descriptor());
        }
        let runtime = self.runtime.read().unwrap_or_else(PoisonError::into_inner);
        runtime.get(name).cloned()
    }

    /// Gets a descriptor by name, failing with [`RGCMError::UnknownQuantity`].
    pub fn describe(&self, name: &str) -> RGCMResult<QuantityDescriptor> {
        self.get(name).ok_or_else(|| RGCMError::UnknownQuantity {
            name: name.to_string(),
        })
    }

    /// Registers a descriptor at runtime.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered or the units cannot be parsed.
    pub fn register(&self, descriptor: QuantityDescriptor) -> RGCMResult<()> {
        Unit::parse(&descriptor.units).map_err(|e| RGCMError::UnitParseError {
            name: descriptor.name.clone(),
            unit_string: descriptor.units.clone(),
            details: e.to_string(),
        })?;

        if Self::static_descriptors().any(|d| d.name == descriptor.name) {
            return Err(RGCMError::InvalidConfiguration(format!(
                "quantity '{}' is already registered as a static quantity",
                descriptor.name
            )));
        }

        let mut runtime = self.runtime.write().unwrap_or_else(PoisonError::into_inner);
        if runtime.contains_key(&descriptor.name) {
            return Err(RGCMError::InvalidConfiguration(format!(
                "quantity '{}' is already registered",
                descriptor.name
            )));
        }
        runtime.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// All known descriptors sorted by name.
    pub fn list(&self) -> Vec<QuantityDescriptor> {
        let mut all: BTreeMap<String, QuantityDescriptor> = BTreeMap::new();
        for d in Self::static_descriptors() {
            all.entry(d.name.to_string())
                .or_insert_with(|| d.to_descriptor());
        }
        let runtime = self.runtime.read().unwrap_or_else(PoisonError::into_inner);
        for (name, d) in runtime.iter() {
            all.entry(name.clone()).or_insert_with(|| d.clone());
        }
        all.into_values().collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes all runtime registrations. Static descriptors remain.
    pub fn clear_runtime(&self) {
        self.runtime
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Process-wide registry used when a model is not given its own.
pub static QUANTITY_REGISTRY: LazyLock<QuantityRegistry> = LazyLock::new(QuantityRegistry::new);
