use serde::Serialize;

use crate::{MetricPoint, Precision};

/// Points of one record, written to the backend with a single request.
///
/// A batch is built per record, handed to the dispatcher once, and discarded after the write
/// completes or fails. Its body is the line protocol with timestamps in [`Self::precision`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchBatch {
    /// Name of the target database.
    pub database: String,
    /// Precision of the timestamps in the body.
    pub precision: Precision,
    /// Points in submission order.
    pub points: Vec<MetricPoint>,
}

impl DispatchBatch {
    /// Creates an empty batch for the given database.
    pub fn new(database: impl Into<String>, precision: Precision) -> Self {
        Self {
            database: database.into(),
            precision,
            points: Vec::new(),
        }
    }

    /// Appends a point to the batch.
    pub fn push(&mut self, point: MetricPoint) {
        self.points.push(point);
    }

    /// Returns the number of points in this batch.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if this batch contains no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Renders the request body: one line per point, each terminated by a newline.
    pub fn to_line_protocol(&self) -> String {
        self.points
            .iter()
            .map(|point| point.to_line(Some(self.precision)))
            .collect()
    }
}

impl Extend<MetricPoint> for DispatchBatch {
    fn extend<T: IntoIterator<Item = MetricPoint>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}
