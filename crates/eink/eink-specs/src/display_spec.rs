//! Display specification types

use core::time::Duration;

/// Specification of an e-ink panel
///
/// Contains the characteristics the driver needs at compile time:
/// - Physical dimensions
/// - Controller family and color mode
/// - Full refresh duration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DisplaySpec {
    /// Display name (e.g., "Waveshare 7.3\" (E) Spectra 6")
    pub name: &'static str,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Display controller chip
    pub controller: Controller,

    /// Color mode of the panel
    pub color_mode: ColorMode,

    /// Full refresh duration in milliseconds
    pub full_refresh_ms: u32,
}

impl DisplaySpec {
    /// Get full refresh duration as Duration
    pub fn full_refresh_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.full_refresh_ms))
    }
}

/// E-ink display controller chips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Controller {
    /// ACeP (Advanced Color ePaper) controller for Spectra 6
    ACeP,
}

/// Color mode for e-ink display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ColorMode {
    /// Spectra 6 (6 colors: black, white, yellow, red, blue, green)
    Spectra6,
}

impl ColorMode {
    /// Bits used per pixel in the controller's frame memory
    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            Self::Spectra6 => 4,
        }
    }

    /// Number of distinct colors the panel can show
    pub const fn palette_size(self) -> u8 {
        match self {
            Self::Spectra6 => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spec() -> DisplaySpec {
        DisplaySpec {
            name: "Test Display",
            width: 250,
            height: 122,
            controller: Controller::ACeP,
            color_mode: ColorMode::Spectra6,
            full_refresh_ms: 2000,
        }
    }

    #[test]
    fn test_full_refresh_duration() {
        assert_eq!(
            test_spec().full_refresh_duration(),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_spectra6_color_mode() {
        assert_eq!(ColorMode::Spectra6.bits_per_pixel(), 4);
        assert_eq!(ColorMode::Spectra6.palette_size(), 6);
    }

    #[cfg(feature = "serde")]
    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_serialize_to_json() {
        let json = serde_json::to_string(&test_spec()).unwrap();
        assert!(json.contains("\"width\":250"), "json: {json}");
        assert!(json.contains("\"controller\":\"ACeP\""), "json: {json}");
    }
}
