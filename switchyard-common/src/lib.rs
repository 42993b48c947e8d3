//! Common functionality for Switchyard crates.
#![warn(missing_docs)]

mod stats;

pub use crate::stats::*;
