//! Software debouncing for GPIO inputs.

mod timed;

pub use timed::*;
