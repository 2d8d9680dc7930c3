pub mod adapters;
pub mod component;
pub mod config;
pub mod constants;
pub mod frequency;
pub mod grid;
pub mod initialization;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod standard_quantities;
pub mod state;
pub mod units;
pub mod util;

pub mod errors;

/// Floating point type used for all quantity values.
pub type FloatValue = f64;
/// Model time and time step lengths, in seconds.
pub type Time = f64;

// Lets `ComponentIO` expansions refer to `::rgcm_core` from inside this crate
extern crate self as rgcm_core;

// Re-export derive macro for convenience
pub use rgcm_macros::ComponentIO;

// Array types named by `ComponentIO` expansions
#[doc(hidden)]
pub use ndarray;

// Used by `define_quantity!` expansions in downstream crates
#[doc(hidden)]
pub use inventory;
