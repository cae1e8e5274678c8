//! Driver error type

use core::fmt;

use platform::{ConfigError, GpioError};
use thiserror::Error;

/// Bring-up stage named by [`EpdError::InitializationFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Acquiring lines, opening SPI, powering the module
    ModuleInit,
    /// Reset and register configuration of the controller
    PanelInit,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleInit => f.write_str("module init"),
            Self::PanelInit => f.write_str("panel init"),
        }
    }
}

/// Errors returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpdError {
    /// A panel command was issued before [`Device::initialize`](crate::Device::initialize).
    #[error("device is not initialized")]
    NotInitialized,

    /// Hardware bring-up failed; the device stays uninitialized.
    #[error("initialization failed during {stage}: {reason}")]
    InitializationFailed {
        /// Stage that failed
        stage: InitStage,
        /// Vendor-layer explanation
        reason: String,
        /// GPIO failure at the root of `reason`, if any
        #[source]
        cause: Option<GpioError>,
    },

    /// Frame memory could not be obtained.
    #[error("cannot allocate {bytes} bytes of frame memory")]
    AllocationFailure {
        /// Requested size
        bytes: usize,
    },

    /// A buffer does not have the exact length required.
    #[error("buffer is {actual} bytes, expected exactly {expected}")]
    BufferSizeMismatch {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A coordinate lies outside the frame.
    #[error("pixel ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfRange {
        /// Requested column
        x: u32,
        /// Requested row
        y: u32,
        /// Frame width
        width: u32,
        /// Frame height
        height: u32,
    },

    /// GPIO line failure.
    #[error("GPIO: {0}")]
    Gpio(#[from] GpioError),

    /// Rejected device configuration.
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The call is not valid for the arguments or state given.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A forwarded panel command failed in the vendor layer.
    #[error("panel {operation} failed: {reason}")]
    Panel {
        /// Command that failed
        operation: &'static str,
        /// Vendor-layer explanation
        reason: String,
    },

    /// No palette entry has this name.
    #[error("unknown color name {name:?}")]
    UnknownColor {
        /// Name as given
        name: String,
    },

    /// No palette entry has this index.
    #[error("color index {index} is not in the palette (0..=5)")]
    InvalidColorIndex {
        /// Index as given
        index: u8,
    },
}

/// Coarse classification of an [`EpdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Command issued outside the ready state
    NotInitialized,
    /// Bring-up failed
    InitializationFailed,
    /// Out of memory
    AllocationFailure,
    /// Buffer length differs from the panel's
    BufferSizeMismatch,
    /// Coordinate or palette value outside its range
    OutOfRange,
    /// GPIO line held elsewhere or absent
    LineUnavailable,
    /// Line direction or device configuration rejected
    ConfigurationError,
    /// Call not valid in the current state
    InvalidOperation,
    /// Failure on the wire or in the controller
    Hardware,
}

impl EpdError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InitializationFailed { .. } => ErrorKind::InitializationFailed,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::BufferSizeMismatch { .. } => ErrorKind::BufferSizeMismatch,
            Self::OutOfRange { .. } | Self::UnknownColor { .. } | Self::InvalidColorIndex { .. } => {
                ErrorKind::OutOfRange
            }
            Self::Gpio(e) => gpio_kind(e),
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Panel { .. } => ErrorKind::Hardware,
        }
    }

    /// GPIO failure behind this error, if any.
    pub fn gpio_cause(&self) -> Option<&GpioError> {
        match self {
            Self::Gpio(e) => Some(e),
            Self::InitializationFailed { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }
}

fn gpio_kind(error: &GpioError) -> ErrorKind {
    match error {
        GpioError::LineUnavailable { .. } => ErrorKind::LineUnavailable,
        GpioError::Configuration { .. } => ErrorKind::ConfigurationError,
        GpioError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
        GpioError::Io { .. } => ErrorKind::Hardware,
    }
}

/// First [`GpioError`] in the source chain of `error`, itself included.
pub(crate) fn find_gpio_cause(error: &(dyn std::error::Error + 'static)) -> Option<GpioError> {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(gpio) = e.downcast_ref::<GpioError>() {
            return Some(gpio.clone());
        }
        current = e.source();
    }
    None
}
