//! Coupling and time integration for atmospheric model components.
//!
//! This crate re-exports [`rgcm_core`], which holds the component contracts,
//! the quantity registry and the model, and [`rgcm_components`], a set of
//! simple reference components.
//!
//! ```
//! use rgcm::rgcm_components::{NewtonianCooling, RelaxationCore};
//! use rgcm::rgcm_core::grid::Grid;
//! use rgcm::rgcm_core::model::{ModelBuilder, Simulation};
//!
//! let model = ModelBuilder::new()
//!     .with_core(RelaxationCore::default())
//!     .with_prognostic(NewtonianCooling::default())
//!     .with_time_step(1800.0)
//!     .with_grid(Grid::from_levels(4, 3, 5).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut simulation = Simulation::from_defaults(model).unwrap();
//! simulation.run(2).unwrap();
//! assert_eq!(simulation.current_time(), 3600.0);
//! ```

pub use rgcm_components;
pub use rgcm_core;

/// The types most programs need.
pub mod prelude {
    pub use rgcm_core::component::{
        Component, CoreOutput, DiagnosticComponent, DynamicalCore, ImplicitComponent,
        ImplicitOutput, PrognosticComponent, PrognosticOutput, RequirementDefinition,
    };
    pub use rgcm_core::config::ModelConfig;
    pub use rgcm_core::constants::ConstantsTable;
    pub use rgcm_core::errors::{RGCMError, RGCMResult};
    pub use rgcm_core::grid::Grid;
    pub use rgcm_core::model::{
        MissingInputPolicy, Model, ModelBuilder, Simulation, StepOutput,
    };
    pub use rgcm_core::state::{InputState, OutputState, Quantity, State};
    pub use rgcm_core::{ComponentIO, FloatValue, Time};
}
