/// Adjustable display parameters and their fixed bounds.
///
/// Both ranges mirror the sliders the front-ends expose; there is no file
/// or environment configuration for them.
use std::ops::RangeInclusive;

/// Color temperature slider bounds, in Kelvin.
pub const TEMPERATURE_RANGE: RangeInclusive<u16> = 2000..=6000;

/// Brightness slider bounds, in percent.
pub const BRIGHTNESS_RANGE: RangeInclusive<u8> = 10..=100;

/// Brightness slider step, in percent.
pub const BRIGHTNESS_STEP: u8 = 5;

/// Initial color temperature.
pub const DEFAULT_TEMPERATURE: u16 = 4000;

/// Initial brightness percent.
pub const DEFAULT_BRIGHTNESS_PERCENT: u8 = 50;

/// One snapshot of the two adjustable parameters.
///
/// The supervisor copies the most recently notified value when a restart
/// fires; settings are never mutated in place after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSettings {
    /// Color temperature in Kelvin.
    pub temperature: u16,
    /// Brightness as an integer percent.
    pub brightness_percent: u8,
}

impl ColorSettings {
    /// Build settings with both fields clamped into their fixed ranges.
    pub fn new(temperature: u16, brightness_percent: u8) -> Self {
        Self {
            temperature: temperature
                .clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end()),
            brightness_percent: brightness_percent
                .clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end()),
        }
    }

    /// Brightness as the fraction the worker command expects, in (0, 1].
    pub fn brightness_fraction(&self) -> f64 {
        f64::from(self.brightness_percent) / 100.0
    }
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            brightness_percent: DEFAULT_BRIGHTNESS_PERCENT,
        }
    }
}
