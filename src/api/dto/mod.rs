//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifiers travel as plain strings and are validated by the handlers.

pub mod common_dto;
pub mod domain_dto;
pub mod permission_dto;

pub use common_dto::*;
pub use domain_dto::*;
pub use permission_dto::*;
