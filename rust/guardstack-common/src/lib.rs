//! Core definitions shared by all guardstack-* crates: the error taxonomy,
//! the `Result` alias and the state verification helpers.

pub mod error;
pub mod flags;
pub mod result;

pub use result::Result;
