//! Waveshare 7.3" (E) Spectra 6 e-paper driver
//!
//! Six-color, 4-bit-per-pixel panel driven over GPIO + SPI.
//!
//! # Architecture
//!
//! ```text
//! Caller
//!         ↓
//! Device (lifecycle gate) ──→ Panel (command facade)
//!         ↓                          ↓
//! FrameBuffer (packed 4bpp)   PanelProtocol (platform crate)
//!                                    ↓
//!                             PanelModule → Epd7in3e (vendor protocol)
//!                                    ↓
//!                             GPIO lines + SPI
//! ```
//!
//! [`FrameBuffer`] and [`Color`] are pure and need no hardware. Everything
//! that touches the panel goes through a [`Device`], which refuses to issue
//! commands until [`Device::initialize`] has succeeded.
//!
//! # Features
//!
//! - `linux` - sysfs GPIO + spidev backends and the `epd` binary
//! - `serde` - JSON device configuration
//!
//! # Example
//!
//! ```
//! use epd::{Color, FrameBuffer};
//!
//! let mut frame = FrameBuffer::new(800, 480, Color::White)?;
//! frame.set_color(10, 20, Color::Red)?;
//! assert_eq!(frame.as_bytes().len(), 192_000);
//! assert_eq!(frame.get_pixel(10, 20)?, Color::Red as u8);
//! # Ok::<(), epd::EpdError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod device;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod palette;
pub mod panel;

pub use device::{Device, DeviceState};
pub use display::{DISPLAY_HEIGHT, DISPLAY_WIDTH, WAVESHARE_7_3_E_SPEC};
pub use error::{EpdError, ErrorKind, InitStage};
pub use framebuffer::{buffer_size, validate_for_display, ColorDistribution, FrameBuffer};
pub use palette::Color;
pub use panel::Panel;

pub use platform::config::VERSION_STRING;
