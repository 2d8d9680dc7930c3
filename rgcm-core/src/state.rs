use crate::constants::ConstantsTable;
use crate::errors::{RGCMError, RGCMResult};
use crate::grid::{format_dims, Grid, GridDimension};
use crate::units::{Conversion, Unit};
use crate::{FloatValue, Time};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// An array of values tagged with its units and the grid dimensions it spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub values: ArrayD<FloatValue>,
    pub units: String,
    pub dims: Vec<GridDimension>,
}

impl Quantity {
    /// Creates a quantity, checking that the array rank matches `dims`.
    pub fn new(
        values: ArrayD<FloatValue>,
        units: impl Into<String>,
        dims: Vec<GridDimension>,
    ) -> RGCMResult<Self> {
        if values.ndim() != dims.len() {
            return Err(RGCMError::Error(format!(
                "array of shape {:?} cannot span dimensions {}",
                values.shape(),
                format_dims(&dims)
            )));
        }
        Ok(Self {
            values,
            units: units.into(),
            dims,
        })
    }

    /// A quantity filled with `value` over the part of `grid` spanned by `dims`.
    pub fn filled(
        grid: &Grid,
        dims: &[GridDimension],
        units: impl Into<String>,
        value: FloatValue,
    ) -> Self {
        Self {
            values: ArrayD::from_elem(IxDyn(&grid.shape_for(dims)), value),
            units: units.into(),
            dims: dims.to_vec(),
        }
    }

    /// Checks that the array shape matches the lengths `grid` gives `dims`.
    pub fn check_grid(&self, name: &str, grid: &Grid) -> RGCMResult<()> {
        let expected = grid.shape_for(&self.dims);
        if self.values.shape() != expected.as_slice() {
            return Err(RGCMError::DimensionMismatch {
                name: name.to_string(),
                dims: format_dims(&self.dims),
                expected,
                actual: self.values.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Checks that the quantity spans exactly `dims` and fits `grid`.
    ///
    /// `dims` are the dimensions the registry gives the quantity. A quantity
    /// tagged with other dimensions is rejected even if its shape happens to
    /// match.
    pub fn check_dims(&self, name: &str, dims: &[GridDimension], grid: &Grid) -> RGCMResult<()> {
        if self.dims != dims {
            return Err(RGCMError::DimensionMismatch {
                name: name.to_string(),
                dims: format!("{} (stored over {})", format_dims(dims), format_dims(&self.dims)),
                expected: grid.shape_for(dims),
                actual: self.values.shape().to_vec(),
            });
        }
        self.check_grid(name, grid)
    }

    /// The values expressed in `units`, borrowed when no conversion is needed.
    pub fn values_in(&self, name: &str, units: &str) -> RGCMResult<Cow<'_, ArrayD<FloatValue>>> {
        let conversion = unit_conversion(name, &self.units, units)?;
        if conversion.is_identity() {
            Ok(Cow::Borrowed(&self.values))
        } else {
            Ok(Cow::Owned(conversion.apply_array(&self.values)))
        }
    }

    /// A copy of this quantity converted to `units`.
    pub fn to_units(&self, name: &str, units: &str) -> RGCMResult<Quantity> {
        Ok(Quantity {
            values: self.values_in(name, units)?.into_owned(),
            units: units.to_string(),
            dims: self.dims.clone(),
        })
    }
}

/// Looks up the conversion between two unit strings for quantity `name`.
pub fn unit_conversion(name: &str, from: &str, to: &str) -> RGCMResult<Conversion> {
    if from == to {
        return Ok(Conversion::IDENTITY);
    }
    let parse = |unit_string: &str| {
        Unit::parse(unit_string).map_err(|e| RGCMError::UnitParseError {
            name: name.to_string(),
            unit_string: unit_string.to_string(),
            details: e.to_string(),
        })
    };
    parse(from)?
        .conversion(&parse(to)?)
        .map_err(|e| RGCMError::UnitMismatch {
            name: name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            details: e.to_string(),
        })
}

/// Named quantities, ordered by name.
pub type QuantityMap = BTreeMap<String, Quantity>;

/// The model state at a point in time.
///
/// The state is owned by whoever drives the simulation. A model step borrows
/// it immutably and returns the changes as a separate [`QuantityMap`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    pub time: Time,
    quantities: QuantityMap,
}

impl State {
    pub fn new(time: Time) -> Self {
        Self {
            time,
            quantities: QuantityMap::new(),
        }
    }

    pub fn from_quantities(time: Time, quantities: QuantityMap) -> Self {
        Self { time, quantities }
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.quantities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Quantity> {
        self.quantities.get_mut(name)
    }

    /// The raw values of a quantity, in whatever units it is stored in.
    pub fn values(&self, name: &str) -> Option<&ArrayD<FloatValue>> {
        self.quantities.get(name).map(|q| &q.values)
    }

    pub fn insert(&mut self, name: impl Into<String>, quantity: Quantity) -> Option<Quantity> {
        self.quantities.insert(name.into(), quantity)
    }

    pub fn remove(&mut self, name: &str) -> Option<Quantity> {
        self.quantities.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.quantities.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.quantities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Quantity)> {
        self.quantities.iter()
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Merges `delta` into the state, replacing existing entries.
    pub fn update(&mut self, delta: QuantityMap) {
        self.quantities.extend(delta);
    }

    pub fn quantities(&self) -> &QuantityMap {
        &self.quantities
    }
}

/// Input state for a component
///
/// A read-only view of the quantities a component declared as inputs,
/// already converted to the units the component declared for them, together
/// with the current model time and the physical constants of the run.
#[derive(Debug, Clone)]
pub struct InputState<'a> {
    component: String,
    current_time: Time,
    constants: Cow<'a, ConstantsTable>,
    values: BTreeMap<String, Cow<'a, ArrayD<FloatValue>>>,
}

impl<'a> InputState<'a> {
    pub fn build(
        component: impl Into<String>,
        current_time: Time,
        constants: &'a ConstantsTable,
        values: BTreeMap<String, Cow<'a, ArrayD<FloatValue>>>,
    ) -> Self {
        Self {
            component: component.into(),
            current_time,
            constants: Cow::Borrowed(constants),
            values,
        }
    }

    /// An empty input state with default constants.
    pub fn empty() -> InputState<'static> {
        InputState {
            component: String::new(),
            current_time: 0.0,
            constants: Cow::Owned(ConstantsTable::default()),
            values: BTreeMap::new(),
        }
    }

    /// Adds an owned array, mostly useful when driving a component by hand.
    pub fn with_values(mut self, name: impl Into<String>, values: ArrayD<FloatValue>) -> Self {
        self.values.insert(name.into(), Cow::Owned(values));
        self
    }

    pub fn with_time(mut self, time: Time) -> Self {
        self.current_time = time;
        self
    }

    pub fn with_constants(mut self, constants: ConstantsTable) -> Self {
        self.constants = Cow::Owned(constants);
        self
    }

    /// Gets the values of a declared input.
    ///
    /// # Errors
    ///
    /// [`RGCMError::MissingInput`] if the name is not present.
    pub fn get(&self, name: &str) -> RGCMResult<&ArrayD<FloatValue>> {
        self.values
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| RGCMError::MissingInput {
                component: self.component.clone(),
                name: name.to_string(),
            })
    }

    /// Test if the state contains a value with the given name
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn constants(&self) -> &ConstantsTable {
        &self.constants
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

/// Output from a component: raw arrays keyed by quantity name, expressed in
/// the units the component declared.
pub type OutputState = BTreeMap<String, ArrayD<FloatValue>>;

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    fn column_dims() -> Vec<GridDimension> {
        vec![
            GridDimension::Longitude,
            GridDimension::Latitude,
            GridDimension::MidLevels,
        ]
    }

    #[test]
    fn test_filled_quantity_shape() {
        let grid = Grid::new(4, 3, 2, 3).unwrap();
        let q = Quantity::filled(&grid, &column_dims(), "K", 290.0);
        assert_eq!(q.values.shape(), &[4, 3, 2]);
        assert!(q.values.iter().all(|v| *v == 290.0));
        q.check_grid("air_temperature", &grid).unwrap();
    }

    #[test]
    fn test_check_grid_mismatch() {
        let grid = Grid::new(4, 3, 2, 3).unwrap();
        let other = Grid::new(4, 3, 5, 6).unwrap();
        let q = Quantity::filled(&other, &column_dims(), "K", 290.0);
        let err = q.check_grid("air_temperature", &grid).unwrap_err();
        assert_eq!(
            err,
            RGCMError::DimensionMismatch {
                name: "air_temperature".to_string(),
                dims: "[longitude, latitude, mid_levels]".to_string(),
                expected: vec![4, 3, 2],
                actual: vec![4, 3, 5],
            }
        );
    }

    #[test]
    fn test_check_dims_rejects_other_dimensions() {
        let grid = Grid::new(3, 2, 2, 3).unwrap();
        let surface = [GridDimension::Longitude, GridDimension::Latitude];
        let q = Quantity::filled(&grid, &surface, "K", 290.0);
        q.check_grid("air_temperature", &grid).unwrap();

        let err = q.check_dims("air_temperature", &column_dims(), &grid).unwrap_err();
        assert_eq!(
            err,
            RGCMError::DimensionMismatch {
                name: "air_temperature".to_string(),
                dims: "[longitude, latitude, mid_levels] (stored over [longitude, latitude])"
                    .to_string(),
                expected: vec![3, 2, 2],
                actual: vec![3, 2],
            }
        );
        q.check_dims("surface_temperature", &surface, &grid).unwrap();
    }

    #[test]
    fn test_rank_checked_on_construction() {
        let result = Quantity::new(array![1.0, 2.0].into_dyn(), "K", column_dims());
        assert!(matches!(result, Err(RGCMError::Error(_))));
    }

    #[test]
    fn test_values_in_borrows_when_units_match() {
        let dims = vec![GridDimension::Longitude, GridDimension::Latitude];
        let q = Quantity::new(array![[1000.0]].into_dyn(), "hPa", dims).unwrap();
        assert!(matches!(q.values_in("p", "hPa").unwrap(), Cow::Borrowed(_)));

        let pa = q.values_in("p", "Pa").unwrap();
        assert!(is_close!(pa[[0, 0]], 1e5));
    }

    #[test]
    fn test_values_in_incompatible_units() {
        let q = Quantity::new(array![1.0].into_dyn(), "K", vec![GridDimension::Latitude]).unwrap();
        let err = q.values_in("air_temperature", "Pa").unwrap_err();
        assert!(matches!(err, RGCMError::UnitMismatch { .. }));
    }

    #[test]
    fn test_state_update_replaces_entries() {
        let grid = Grid::new(1, 1, 1, 2).unwrap();
        let mut state = State::new(0.0);
        state.insert("air_temperature", Quantity::filled(&grid, &column_dims(), "K", 280.0));
        state.insert("eastward_wind", Quantity::filled(&grid, &column_dims(), "m/s", 1.0));

        let mut delta = QuantityMap::new();
        delta.insert(
            "air_temperature".to_string(),
            Quantity::filled(&grid, &column_dims(), "K", 281.0),
        );
        state.update(delta);

        assert_eq!(state.len(), 2);
        assert_eq!(state.values("air_temperature").unwrap()[[0, 0, 0]], 281.0);
        assert_eq!(state.values("eastward_wind").unwrap()[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_input_state_missing_name() {
        let input = InputState::empty().with_values("air_temperature", array![1.0].into_dyn());
        assert!(input.has("air_temperature"));
        assert_eq!(
            input.get("specific_humidity").unwrap_err(),
            RGCMError::MissingInput {
                component: String::new(),
                name: "specific_humidity".to_string()
            }
        );
    }

    #[test]
    fn test_state_serialization() {
        let grid = Grid::new(2, 1, 1, 2).unwrap();
        let mut state = State::new(600.0);
        state.insert("air_temperature", Quantity::filled(&grid, &column_dims(), "K", 280.0));
        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
