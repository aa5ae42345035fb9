//! Schema descriptors and the resource models built on them.

mod descriptor;
mod model;

pub use descriptor::*;
pub use model::*;

/// A record as a JSON object: validated input before persistence, or a stored row after.
pub type Record = serde_json::Map<String, serde_json::Value>;
