//! Request/response types and errors shared by the `field-enc-svc` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
