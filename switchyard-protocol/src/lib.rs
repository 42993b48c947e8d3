//! Metric points and their wire formats.
//!
//! A [`MetricPoint`] is the unit handed to a metric sink. It is serialized in one of two text
//! protocols, both of which can be parsed back:
//!
//! # Put Protocol
//!
//! ```text
//! put <name> <epoch-millis> <value> <tag>=<value> <tag>=<value>
//! ```
//!
//! The put protocol carries exactly one value per point, which is taken from the
//! [`VALUE_FIELD`] field. See [`MetricPoint::to_put_line`] and [`MetricPoint::parse_put`].
//!
//! # Line Protocol
//!
//! ```text
//! <name>,<tag>=<value>,<tag>=<value> <field>=<value>,<field>="<text>" [<timestamp>]
//! ```
//!
//! See [`MetricPoint::to_line`] and [`MetricPoint::parse_line`]. Multiple points are submitted
//! together as a [`DispatchBatch`].
#![warn(missing_docs)]

mod batch;
mod line;
mod point;
mod put;
mod time;

pub use crate::batch::*;
pub use crate::point::*;
pub use crate::time::*;

/// An error returned by [`MetricPoint::parse_put`] and [`MetricPoint::parse_line`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("failed to parse metric point: {0}")]
pub struct ParsePointError(&'static str);
