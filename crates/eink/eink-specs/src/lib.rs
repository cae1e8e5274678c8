//! E-Ink Panel Specifications
//!
//! Compile-time descriptions of the panels this workspace drives: geometry,
//! controller family, color mode and refresh timing.
//!
//! # Features
//!
//! - **no_std compatible** - plain data, no allocation
//! - **Serde support** - optional serialization for JSON configs
//!
//! # Example
//!
//! ```
//! use eink_specs::displays::WAVESHARE_7_3_E;
//!
//! let spec = WAVESHARE_7_3_E;
//! assert_eq!((spec.width, spec.height), (800, 480));
//! assert_eq!(spec.color_mode.palette_size(), 6);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

mod display_spec;
pub mod displays;

pub use display_spec::{ColorMode, Controller, DisplaySpec};
