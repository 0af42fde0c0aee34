//! Core types and trait definitions for the Rostrum schedule store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod arrangement;
pub mod congregation;
pub mod date;
pub mod entry;
pub mod error;
pub mod gaps;
pub mod history;
pub mod speaker;
pub mod store;
pub mod talk;

pub use error::{Error, Result};
