//! Utility modules for hostmetrics.

mod duration;
mod hostname;

pub use duration::{DurationParseError, parse_duration};
pub use hostname::hostname;
