//! CrudService: generic CRUD over any resource model and store driver.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::{canonical_datetime, coerce_str, value_eq, FieldError, RequestValidator, ValidationCode};
