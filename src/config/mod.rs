//! Runtime configuration.
//!
//! [`Settings`] holds the upstream service parameters read from the
//! environment. [`ReferenceData`] is the fixed table of supported cities
//! with their centers and reference prices.

mod reference;
mod settings;

pub use reference::{CityReference, Coordinates, ReferenceData, ReferencePrice};
pub use settings::Settings;
