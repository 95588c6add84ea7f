//! Small pure helpers shared by the domain and its adapters.

pub mod datetime;

pub use datetime::{parse_datetime, parse_datetime_or};
