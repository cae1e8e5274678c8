//! GPIO line abstraction layer
//!
//! Lines are acquired by pin number from a [`GpioLines`] registry layered
//! over a [`LineBackend`]. The registry enforces the rules the backend does
//! not:
//!
//! - a pin is held by at most one [`Line`] at a time;
//! - a line is written only after it has been configured as an output;
//! - a released line rejects further I/O.
//!
//! Every backend failure surfaces as a [`GpioError`]; nothing is cached, so
//! each read samples the physical pin.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Pin identifier (BCM numbering on the Raspberry Pi).
pub type PinId = u32;

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sampled by the host
    Input,
    /// Driven by the host
    Output,
}

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl PinState {
    /// `true` for [`PinState::High`].
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// Errors reported by the GPIO line layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    /// The pin is already held, or the backend could not export it.
    #[error("GPIO{pin} unavailable: {reason}")]
    LineUnavailable {
        /// Requested pin
        pin: PinId,
        /// Backend or registry explanation
        reason: String,
    },
    /// The backend rejected a direction change.
    #[error("GPIO{pin} configuration failed: {reason}")]
    Configuration {
        /// Affected pin
        pin: PinId,
        /// Backend explanation
        reason: String,
    },
    /// The call is not valid in the line's current state.
    #[error("GPIO{pin}: cannot {operation}: {reason}")]
    InvalidOperation {
        /// Affected pin
        pin: PinId,
        /// Attempted operation
        operation: &'static str,
        /// Why it was refused
        reason: &'static str,
    },
    /// A read or write failed in the backend.
    #[error("GPIO{pin} I/O failed: {reason}")]
    Io {
        /// Affected pin
        pin: PinId,
        /// Backend explanation
        reason: String,
    },
}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Pin-keyed primitives a GPIO backend must provide.
///
/// Implementations talk to the hardware (or a simulation) directly and do
/// not track ownership; [`GpioLines`] does that on top.
pub trait LineBackend {
    /// Backend error type
    type Error: core::fmt::Display;

    /// Make the pin available to userspace.
    fn export(&mut self, pin: PinId) -> Result<(), Self::Error>;

    /// Hand the pin back to the kernel.
    fn unexport(&mut self, pin: PinId) -> Result<(), Self::Error>;

    /// Configure the pin as input or output.
    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), Self::Error>;

    /// Sample the pin.
    fn read(&mut self, pin: PinId) -> Result<PinState, Self::Error>;

    /// Drive the pin.
    fn write(&mut self, pin: PinId, state: PinState) -> Result<(), Self::Error>;
}

struct Registry<B> {
    backend: B,
    held: BTreeSet<PinId>,
}

type Shared<B> = Arc<Mutex<Registry<B>>>;

fn lock<B>(shared: &Shared<B>) -> MutexGuard<'_, Registry<B>> {
    // A panic while holding the lock cannot leave the pin set half-updated,
    // so a poisoned registry is still consistent.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry handing out exclusive [`Line`]s over one backend.
///
/// Cloning shares the registry: a pin held through one clone is unavailable
/// through every other.
pub struct GpioLines<B> {
    shared: Shared<B>,
}

impl<B> Clone for GpioLines<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: LineBackend> GpioLines<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Registry {
                backend,
                held: BTreeSet::new(),
            })),
        }
    }

    /// Acquire a line.
    ///
    /// The line starts out as [`Direction::Input`]; call
    /// [`Line::set_direction`] before writing to it.
    pub fn acquire(&self, pin: PinId) -> Result<Line<B>, GpioError> {
        let mut registry = lock(&self.shared);
        if registry.held.contains(&pin) {
            return Err(GpioError::LineUnavailable {
                pin,
                reason: "already held".into(),
            });
        }
        registry
            .backend
            .export(pin)
            .map_err(|e| GpioError::LineUnavailable {
                pin,
                reason: e.to_string(),
            })?;
        registry.held.insert(pin);
        tracing::debug!(pin, "GPIO line acquired");

        Ok(Line {
            pin,
            direction: Direction::Input,
            released: false,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Whether `pin` is currently held by a live [`Line`].
    pub fn is_held(&self, pin: PinId) -> bool {
        lock(&self.shared).held.contains(&pin)
    }
}

/// An exclusively held GPIO line.
///
/// Dropping the line releases it.
pub struct Line<B: LineBackend> {
    pin: PinId,
    direction: Direction,
    released: bool,
    shared: Shared<B>,
}

impl<B: LineBackend> Line<B> {
    /// Pin number of this line.
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Last direction configured on this line.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether [`Line::release`] has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_live(&self, operation: &'static str) -> Result<(), GpioError> {
        if self.released {
            return Err(GpioError::InvalidOperation {
                pin: self.pin,
                operation,
                reason: "line has been released",
            });
        }
        Ok(())
    }

    /// Configure the line as input or output.
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError> {
        self.ensure_live("set direction")?;
        let pin = self.pin;
        lock(&self.shared)
            .backend
            .set_direction(pin, direction)
            .map_err(|e| GpioError::Configuration {
                pin,
                reason: e.to_string(),
            })?;
        self.direction = direction;
        tracing::trace!(pin, ?direction, "GPIO direction set");
        Ok(())
    }

    /// Drive the line. Only valid on an output.
    pub fn write(&mut self, state: PinState) -> Result<(), GpioError> {
        self.ensure_live("write")?;
        if self.direction != Direction::Output {
            return Err(GpioError::InvalidOperation {
                pin: self.pin,
                operation: "write",
                reason: "line is configured as input",
            });
        }
        let pin = self.pin;
        lock(&self.shared)
            .backend
            .write(pin, state)
            .map_err(|e| GpioError::Io {
                pin,
                reason: e.to_string(),
            })
    }

    /// Sample the line.
    pub fn read(&mut self) -> Result<PinState, GpioError> {
        self.ensure_live("read")?;
        let pin = self.pin;
        lock(&self.shared)
            .backend
            .read(pin)
            .map_err(|e| GpioError::Io {
                pin,
                reason: e.to_string(),
            })
    }

    /// Release the line so the pin can be acquired again.
    ///
    /// Idempotent: releasing twice is a no-op.
    pub fn release(&mut self) -> Result<(), GpioError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let pin = self.pin;
        let mut registry = lock(&self.shared);
        registry.held.remove(&pin);
        tracing::debug!(pin, "GPIO line released");
        let unexported = registry.backend.unexport(pin);
        unexported.map_err(|e| GpioError::Io {
            pin,
            reason: e.to_string(),
        })
    }
}

impl<B: LineBackend> Drop for Line<B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(pin = self.pin, error = %e, "GPIO release on drop failed");
        }
    }
}

impl<B: LineBackend> core::fmt::Debug for Line<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Line")
            .field("pin", &self.pin)
            .field("direction", &self.direction)
            .field("released", &self.released)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// embedded-hal adapters
// ---------------------------------------------------------------------------

impl<B: LineBackend> embedded_hal::digital::ErrorType for Line<B> {
    type Error = GpioError;
}

impl<B: LineBackend> embedded_hal::digital::OutputPin for Line<B> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(PinState::High)
    }
}

impl<B: LineBackend> embedded_hal::digital::InputPin for Line<B> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read().map(PinState::is_high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read().map(|state| !state.is_high())
    }
}
