//! # OSINT Harness Core
//!
//! Shared, WASM-safe logic for OSINT Harness: data models, query
//! classification, the embedding trait, store abstractions, and the
//! brute-force similarity engine used to surface related investigations.
//!
//! This crate contains no tokio, sqlx, reqwest, or other native-only
//! dependencies. Provider clients, the query dispatcher, and the SQLite
//! store live in the `osint-harness` app crate.

pub mod classify;
pub mod embedding;
pub mod error;
pub mod models;
pub mod similarity;
pub mod store;

pub use error::{Error, Result};
