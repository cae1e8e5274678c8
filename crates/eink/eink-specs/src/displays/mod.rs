//! Pre-configured display specifications

pub mod waveshare;

pub use waveshare::*;
