pub mod loader;
pub mod resolved;
pub mod settings;
pub mod types;
pub mod validator;

pub use loader::*;
pub use resolved::*;
pub use settings::*;
pub use types::*;
pub use validator::*;
