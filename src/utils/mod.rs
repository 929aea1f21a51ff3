pub mod time;

pub use time::{format_clock, format_relative_time};
