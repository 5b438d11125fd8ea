use std::path::PathBuf;

use chrono::NaiveDate;

use crate::identifiers::{StationId, StationPair};

/// Fatal problems with the input data or the correction tables.
///
/// Per-record defects that only affect a single run or edge are not errors,
/// they are collected as [`crate::diagnostics::Defect`] values instead.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("cannot parse timestamp {value:?} (expected {format:?})")]
    Timestamp { value: String, format: &'static str },
    #[error("cannot parse number {value:?} in column {column}")]
    Number { value: String, column: &'static str },
    #[error("correction table {table} names unknown station {name:?}")]
    UnknownCorrectionStation { table: &'static str, name: String },
    #[error("station {0} is referenced by a graph but has no reference entry")]
    MissingStation(StationId),
    #[error("no coordinates to measure edge {0}")]
    NoDistance(StationPair),
    #[error("no stop events left in {0:?} to infer the service day from")]
    NoServiceDay(PathBuf),
    #[error("service day {requested} does not occur in the stop events (first day is {found})")]
    ServiceDayMismatch {
        requested: NaiveDate,
        found: NaiveDate,
    },
}
