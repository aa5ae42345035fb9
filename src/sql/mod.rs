//! Safe SQL rendering: identifiers from resource models only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
