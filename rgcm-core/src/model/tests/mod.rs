//! Tests for building and stepping models.
//!
//! The components in [`fixtures`] work on surface quantities of a small grid
//! so expected values can be worked out by hand.


#[cfg(test)]
mod basic;
#[cfg(test)]
mod core_coupling;
