//! Rainfall data sources.
//!
//! Submodules:
//! - `rainfall` — the `RainfallSource` seam and the fixed-value stub.
//! - `iem` — trailing-window precipitation from IEM ASOS observations.

pub mod iem;
pub mod rainfall;

pub use rainfall::{FixedRainfall, RainfallSource};
