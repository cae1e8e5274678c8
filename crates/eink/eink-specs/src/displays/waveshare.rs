//! Waveshare e-ink display specifications

use crate::{ColorMode, Controller, DisplaySpec};

/// Waveshare 7.3" (E) Spectra 6 (800×480, ACeP)
///
/// Six-color panel driven at 4 bits per pixel.
/// - Colors: Black, White, Yellow, Red, Blue, Green
/// - Full refresh: ~20s (color particle movement)
/// - No partial or fast refresh
pub const WAVESHARE_7_3_E: DisplaySpec = DisplaySpec {
    name: "Waveshare 7.3\" (E) Spectra 6",
    width: 800,
    height: 480,
    controller: Controller::ACeP,
    color_mode: ColorMode::Spectra6,
    full_refresh_ms: 20_000,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveshare_7_3_e() {
        assert_eq!(WAVESHARE_7_3_E.width, 800);
        assert_eq!(WAVESHARE_7_3_E.height, 480);
        assert_eq!(WAVESHARE_7_3_E.controller, Controller::ACeP);
        assert_eq!(WAVESHARE_7_3_E.color_mode, ColorMode::Spectra6);
        assert_eq!(WAVESHARE_7_3_E.full_refresh_duration().as_secs(), 20);
    }
}
