mod gray_longwave;
mod newtonian_cooling;
mod potential_temperature;
mod relative_humidity;
mod relaxation_core;
mod saturation_adjustment;
mod slab_surface;

pub use gray_longwave::{ColumnFluxes, GrayLongwaveParameters, GrayLongwaveRadiation};
pub use newtonian_cooling::{NewtonianCooling, NewtonianCoolingParameters};
pub use potential_temperature::PotentialTemperature;
pub use relative_humidity::RelativeHumidity;
pub use relaxation_core::{RelaxationCore, RelaxationCoreParameters};
pub use saturation_adjustment::{SaturationAdjustment, SaturationAdjustmentParameters};
pub use slab_surface::{SlabSurface, SlabSurfaceParameters};
