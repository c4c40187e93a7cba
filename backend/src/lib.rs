//! Fitlog Backend Library
//!
//! User entity store and the web process that serves it. Exposed as a
//! library for the binary and for integration tests.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod state;
