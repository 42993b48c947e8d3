//! Turns router access-log records into metric emissions.
//!
//! Processing a record happens in three steps:
//!
//! 1. [`parse`] reads the raw payload into a [`FieldMapping`]. Both the whitespace-delimited
//!    `key=value` token format and flat JSON objects are supported, see [`RecordFormat`]. Parsing
//!    never fails; malformed input yields empty values.
//! 2. [`should_filter`] decides whether the record is eligible. Records from test hosts, short
//!    fragments and records mentioning the excluded port are dropped with a [`FilterReason`].
//! 3. [`derive`] produces the [`Emission`]s of an eligible record: either the service set or the
//!    client-closed set, once per host label.
//!
//! Emissions become [`MetricPoint`](switchyard_protocol::MetricPoint)s through
//! [`Emission::into_point`], which applies the numeric [`Coercion`] required by the sink.
#![warn(missing_docs)]

mod config;
mod derive;
mod duration;
mod filter;
mod mapping;

pub use crate::config::*;
pub use crate::derive::*;
pub use crate::duration::*;
pub use crate::filter::*;
pub use crate::mapping::*;
