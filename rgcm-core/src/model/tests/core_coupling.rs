//! Stepping with a dynamical core.

use super::fixtures::{core_fields, grid, surface_state, ConstantHeating, SurfaceCore};
use crate::grid::GridDimension;
use crate::model::ModelBuilder;
use crate::state::Quantity;
use is_close::is_close;

#[test]
fn core_advances_owned_quantities() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore {
            bias: 1.0,
            ..Default::default()
        })
        .with_prognostic(ConstantHeating::new("surface_temperature", 86.4, "K day^-1"))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    let output = model.step(&surface_state(280.0)).unwrap();

    assert!(is_close!(
        output.state["surface_temperature"].values[[0, 0]],
        280.0 + 0.01 + 1.0
    ));
    let core = core_fields(&model);
    assert_eq!(core["steps"], 1);
    assert!(is_close!(core["last_tendency"].as_f64().unwrap(), 0.001));
}

#[test]
fn core_receives_zero_tendencies_without_contributions() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    let output = model.step(&surface_state(280.0)).unwrap();

    assert_eq!(output.state["surface_temperature"].values[[0, 0]], 280.0);
    assert_eq!(core_fields(&model)["last_tendency"], 0.0);
}

#[test]
fn core_output_is_returned_in_canonical_units() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();
    let mut state = surface_state(280.0);
    let celsius = state
        .get("surface_temperature")
        .unwrap()
        .to_units("surface_temperature", "degC")
        .unwrap();
    state.insert("surface_temperature", celsius);

    let output = model.step(&state).unwrap();

    let temperature = &output.state["surface_temperature"];
    assert_eq!(temperature.units, "K");
    assert!(is_close!(temperature.values[[0, 0]], 280.0));
}

#[test]
fn unowned_tendencies_use_forward_step() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_prognostic(ConstantHeating::new("air_temperature", 0.5, "K s^-1"))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();
    let mut state = surface_state(280.0);
    state.insert(
        "air_temperature",
        Quantity::filled(
            &grid(),
            &[
                GridDimension::Longitude,
                GridDimension::Latitude,
                GridDimension::MidLevels,
            ],
            "K",
            250.0,
        ),
    );

    let output = model.step(&state).unwrap();

    assert_eq!(output.state["air_temperature"].values[[0, 0, 0]], 255.0);
    assert_eq!(output.state["surface_temperature"].values[[0, 0]], 280.0);
}

#[test]
fn failed_core_leaves_everything_untouched() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore {
            fail: true,
            ..Default::default()
        })
        .with_prognostic(ConstantHeating::surface(0.001))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();
    let state = surface_state(280.0);
    let before = state.clone();

    assert!(model.step(&state).is_err());
    assert_eq!(state, before);
    assert_eq!(core_fields(&model)["steps"], 0);
}
