//! Basic model tests: step, dot, serialisation.

use super::fixtures::{grid, surface_state, ConstantHeating, SurfaceCore, SurfaceEmission};
use crate::model::{Model, ModelBuilder};
use is_close::is_close;

fn heated_model() -> Model {
    ModelBuilder::new()
        .with_prognostic(ConstantHeating::surface(0.001))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap()
}

#[test]
fn step() {
    let mut model = heated_model();
    let state = surface_state(280.0);
    let before = state.clone();

    let output = model.step(&state).unwrap();

    assert_eq!(state, before);
    assert_eq!(output.time, 10.0);
    let temperature = &output.state["surface_temperature"];
    assert_eq!(temperature.units, "K");
    assert_eq!(temperature.values.shape(), &[3, 2]);
    assert!(temperature.values.iter().all(|t| is_close!(*t, 280.01)));
    assert!(output.diagnostics.is_empty());
    assert!(output.warnings.is_empty());
}

#[test]
fn step_reports_tendencies_in_canonical_units() {
    let mut model = ModelBuilder::new()
        .with_prognostic(ConstantHeating::new("surface_temperature", 86.4, "K day^-1"))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    let output = model.step(&surface_state(280.0)).unwrap();

    let tendency = &output.tendencies["surface_temperature"];
    assert_eq!(tendency.units, "(K) / s");
    assert!(is_close!(tendency.values[[2, 1]], 0.001));
    assert!(is_close!(output.state["surface_temperature"].values[[2, 1]], 280.01));
}

#[test]
fn stored_units_are_kept_by_forward_step() {
    let mut model = heated_model();
    let mut state = surface_state(280.0);
    let celsius = state
        .get("surface_temperature")
        .unwrap()
        .to_units("surface_temperature", "degC")
        .unwrap();
    state.insert("surface_temperature", celsius);

    let output = model.step(&state).unwrap();

    let temperature = &output.state["surface_temperature"];
    assert_eq!(temperature.units, "degC");
    assert!(is_close!(temperature.values[[0, 0]], 280.01 - 273.15));
}

#[test]
fn component_names() {
    let model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_prognostic(ConstantHeating::surface(0.001))
        .with_diagnostic(SurfaceEmission)
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    assert_eq!(
        model.component_names(),
        vec!["SurfaceCore", "ConstantHeating", "SurfaceEmission"]
    );
}

#[test]
fn dot() {
    let model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_prognostic(ConstantHeating::surface(0.001))
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    let res = format!("{:?}", model.as_dot());
    assert!(res.starts_with("digraph {"));
    assert!(res.contains("ConstantHeating (Prognostic)"));
    assert!(res.contains("SurfaceCore (DynamicalCore)"));
    assert!(res.contains("label = \"surface_temperature\""));
    assert!(res.contains("tendencies [K s^-1]"));
    assert!(res.contains("outputs [K]"));

    // One quantity node plus two component nodes
    assert_eq!(model.coupling_graph().node_count(), 3);
    assert_eq!(model.coupling_graph().edge_count(), 4);
}

#[test]
fn serialise_and_deserialise_model() {
    let mut model = ModelBuilder::new()
        .with_core(SurfaceCore {
            bias: 0.5,
            ..Default::default()
        })
        .with_prognostic(ConstantHeating::surface(0.001))
        .with_diagnostic(SurfaceEmission)
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();
    let state = surface_state(280.0);
    model.step(&state).unwrap();

    let serialised = serde_json::to_string_pretty(&model).unwrap();
    let mut restored = serde_json::from_str::<Model>(&serialised).unwrap();

    assert_eq!(restored.time_step(), 10.0);
    assert_eq!(restored.grid(), model.grid());
    assert_eq!(restored.component_names(), model.component_names());
    assert_eq!(
        restored.coupling_graph().node_count(),
        model.coupling_graph().node_count()
    );

    let expected = model.step(&state).unwrap();
    let actual = restored.step(&state).unwrap();
    assert!(is_close!(
        actual.state["surface_temperature"].values[[1, 1]],
        expected.state["surface_temperature"].values[[1, 1]]
    ));
    assert!(is_close!(
        actual.diagnostics["surface_upward_longwave_flux_in_air"].values[[1, 1]],
        expected.diagnostics["surface_upward_longwave_flux_in_air"].values[[1, 1]]
    ));
}

#[test]
fn default_state_covers_every_declaration() {
    let model = ModelBuilder::new()
        .with_core(SurfaceCore::default())
        .with_diagnostic(SurfaceEmission)
        .with_time_step(10.0)
        .with_grid(grid())
        .build()
        .unwrap();

    let state = model.default_state().unwrap();
    let names: Vec<&String> = state.names().collect();
    assert_eq!(
        names,
        vec![
            "latitude",
            "longitude",
            "surface_temperature",
            "surface_upward_longwave_flux_in_air"
        ]
    );
    assert_eq!(state.values("surface_temperature").unwrap()[[0, 0]], 300.0);
}
