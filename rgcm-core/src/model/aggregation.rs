//! Combining component results.

use crate::errors::{RGCMError, RGCMResult};
use crate::state::{unit_conversion, Quantity, QuantityMap, State};
use crate::units::tendency_units;
use crate::Time;

/// Sums tendencies per quantity name.
///
/// The first contribution for a name is taken as is and later ones are
/// converted to its units and added.
pub(crate) fn sum_tendencies(
    contributions: impl IntoIterator<Item = QuantityMap>,
) -> RGCMResult<QuantityMap> {
    let mut total = QuantityMap::new();
    for contribution in contributions {
        for (name, quantity) in contribution {
            match total.get_mut(&name) {
                None => {
                    total.insert(name, quantity);
                }
                Some(existing) => {
                    let values = quantity.values_in(&name, &existing.units)?;
                    if values.shape() != existing.values.shape() {
                        return Err(RGCMError::DimensionMismatch {
                            name: name.clone(),
                            dims: crate::grid::format_dims(&existing.dims),
                            expected: existing.values.shape().to_vec(),
                            actual: values.shape().to_vec(),
                        });
                    }
                    existing.values += &*values;
                }
            }
        }
    }
    Ok(total)
}

/// Merges maps in order so that later entries replace earlier ones.
pub(crate) fn merge_last_wins(maps: impl IntoIterator<Item = QuantityMap>) -> QuantityMap {
    let mut merged = QuantityMap::new();
    for map in maps {
        merged.extend(map);
    }
    merged
}

/// Integrates `tendencies` over one step with a forward step.
///
/// Each result keeps the units the quantity is stored in within `state`.
pub(crate) fn forward_step<'a>(
    state: &State,
    tendencies: impl IntoIterator<Item = (&'a String, &'a Quantity)>,
    time_step: Time,
) -> RGCMResult<QuantityMap> {
    let mut updated = QuantityMap::new();
    for (name, tendency) in tendencies {
        let current = state.get(name).ok_or_else(|| {
            RGCMError::Error(format!("cannot integrate '{}': it is not in the state", name))
        })?;
        let rate = unit_conversion(name, &tendency.units, &tendency_units(&current.units))?
            .apply_array(&tendency.values);
        if current.dims != tendency.dims || rate.shape() != current.values.shape() {
            return Err(RGCMError::DimensionMismatch {
                name: name.clone(),
                dims: crate::grid::format_dims(&tendency.dims),
                expected: current.values.shape().to_vec(),
                actual: rate.shape().to_vec(),
            });
        }
        updated.insert(
            name.clone(),
            Quantity {
                values: &current.values + &(rate * time_step),
                units: current.units.clone(),
                dims: current.dims.clone(),
            },
        );
    }
    Ok(updated)
}
