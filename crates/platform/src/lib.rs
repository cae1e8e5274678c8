//! Hardware Abstraction Layer for the EPD 7in3e panel driver
//!
//! This crate provides the hardware-facing seams of the driver so that the
//! frame-buffer codec, palette and lifecycle logic can be built and tested
//! without a panel attached.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (epd crate: Device, Panel, FrameBuffer)
//!         ↓
//! Vendor protocol (PanelProtocol implementors)
//!         ↓
//! Platform HAL (this crate - GPIO lines, SPI opener, config)
//!         ↓
//! Backend (sysfs GPIO + spidev on Linux, in-memory simulation in tests)
//! ```
//!
//! # Abstraction Levels
//!
//! - [`PanelProtocol`] - vendor panel command boundary
//! - [`gpio`] - exclusive, direction-checked GPIO lines over a [`LineBackend`]
//! - [`peripheral`] - SPI configuration and the [`SpiOpener`] seam
//! - [`config`] - pin map, bus settings and version strings
//!
//! # Features
//!
//! - `mock`: simulated GPIO chip, SPI recorder and panel mock
//! - `linux`: sysfs GPIO and spidev backends via `linux-embedded-hal`
//! - `serde`: (de)serialize [`DeviceConfig`]
//!
//! # Example
//!
//! ```
//! use platform::{GpioLines, PinState, Direction};
//! # #[cfg(feature = "mock")]
//! # fn demo() -> Result<(), platform::GpioError> {
//! use platform::mocks::SimBackend;
//!
//! let chip = SimBackend::with_lines([17, 24]);
//! let lines = GpioLines::new(chip);
//! let mut rst = lines.acquire(17)?;
//! rst.set_direction(Direction::Output)?;
//! rst.write(PinState::High)?;
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod display;
pub mod gpio;
#[cfg(feature = "linux")]
pub mod linux;
#[cfg(any(test, feature = "mock"))]
pub mod mocks;
pub mod peripheral;

// Re-export main high-level traits
pub use display::{DisplayInfo, PanelProtocol};

// Re-export GPIO types
pub use gpio::{Direction, GpioError, GpioLines, Line, LineBackend, PinId, PinState};

// Re-export peripheral and config types
pub use config::{ConfigError, DeviceConfig, PinConfig, VERSION_STRING};
pub use peripheral::{SpiConfig, SpiMode, SpiOpener};
