//! Query builder: list parameters and validated records in, store query descriptors out.

pub mod builder;
mod descriptor;
mod list;

pub use descriptor::*;
pub use list::*;
