//! # keyval core
//!
//! Error types and on-disk format constants shared by the keyval WAL and
//! storage engine crates.
//!
//! This crate is an internal implementation detail; depend on `keyval`
//! instead.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format_version;

pub use error::{Error, Result};
