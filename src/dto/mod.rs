/// Validated operation arguments.
pub mod requests;
