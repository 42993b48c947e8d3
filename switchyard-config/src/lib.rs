//! Configuration for the Switchyard CLI and pipeline.
//!
//! Settings are resolved in increasing precedence from built-in defaults, an optional YAML file,
//! environment variables and command line arguments. See [`Config`] for loading and
//! [`OverridableConfig`] for the environment and command line layers.
#![warn(missing_docs)]

mod config;
mod env_override;

pub use crate::config::*;
pub use crate::env_override::*;
