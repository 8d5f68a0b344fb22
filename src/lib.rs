//! Urlcut - a URL shortening engine with interchangeable storage backends
//!
//! This library maps arbitrary original URLs to short alphanumeric codes,
//! persists the mapping, and resolves codes back to their URLs. It is the
//! storage-facing core of a shortener service: HTTP routing, response
//! framing and authentication live in the consuming application.
//!
//! # Architecture
//! - `storage`: the `Repository` contract and its three backends
//!   (in-memory, line-delimited JSON file, sea-orm relational)
//! - `services`: the shortening engine (code generation, idempotent
//!   creation, batch ingestion, background soft-delete)
//! - `config`: environment-driven backend selection
//! - `errors`: the crate-wide error taxonomy
//! - `utils`: code generation and URL validation

pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod utils;
