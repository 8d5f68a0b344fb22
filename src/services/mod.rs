//! Service layer for shortening business logic
//!
//! The engine drives every storage operation through the [`Repository`]
//! contract; transport concerns (status codes, body framing) belong to the
//! caller.
//!
//! [`Repository`]: crate::storage::Repository

mod url_service;

pub use url_service::*;
