//! Volatility-targeted exposure sizing.

use super::regime::Regime;

pub const DEFAULT_TARGET_VOLATILITY: f64 = 0.15;

/// Lowest volatility used as a divisor.
pub const MIN_VOLATILITY: f64 = 0.001;

/// Exposure never drops under this outside of a crash.
pub const EXPOSURE_FLOOR: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSizer {
    target_volatility: f64,
}

impl Default for ExposureSizer {
    fn default() -> Self {
        ExposureSizer::new(DEFAULT_TARGET_VOLATILITY)
    }
}

impl ExposureSizer {
    pub fn new(target_volatility: f64) -> Self {
        ExposureSizer { target_volatility }
    }

    pub fn target_volatility(&self) -> f64 {
        self.target_volatility
    }

    /// Regime-dependent maximum exposure.
    pub fn ceiling(regime: Regime) -> f64 {
        match regime {
            Regime::BearStrong => 0.4,
            Regime::BearWeak => 0.6,
            Regime::Bull | Regime::Sideways | Regime::Crash => 1.0,
        }
    }

    /// Target fraction of total value to hold in risky groups.
    ///
    /// Crash returns exactly 0.0. Every other regime lands in `[0.2, ceiling]`,
    /// with the floor taking precedence.
    pub fn size(&self, regime: Regime, volatility: f64) -> f64 {
        if regime == Regime::Crash {
            return 0.0;
        }

        // f64::max ignores NaN, so a NaN volatility also lands on the clamp.
        let effective = volatility.max(MIN_VOLATILITY);
        let raw = self.target_volatility / effective;

        raw.min(Self::ceiling(regime)).max(EXPOSURE_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crash_is_zero() {
        let sizer = ExposureSizer::default();
        assert_eq!(sizer.size(Regime::Crash, 0.15), 0.0);
        assert_eq!(sizer.size(Regime::Crash, 0.0), 0.0);
    }

    #[test]
    fn bear_strong_caps_low_volatility() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::BearStrong, 0.10), 0.4);
    }

    #[test]
    fn bear_weak_caps_at_sixty_percent() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::BearWeak, 0.05), 0.6);
    }

    #[test]
    fn bull_targets_volatility_ratio() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::Bull, 0.30), 0.5);
        assert_relative_eq!(sizer.size(Regime::Sideways, 0.25), 0.6);
    }

    #[test]
    fn high_volatility_hits_floor() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::Bull, 2.0), 0.2);
        assert_relative_eq!(sizer.size(Regime::BearStrong, 5.0), 0.2);
    }

    #[test]
    fn zero_volatility_does_not_divide_by_zero() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::Bull, 0.0), 1.0);
        assert_relative_eq!(sizer.size(Regime::BearWeak, 0.0), 0.6);
    }

    #[test]
    fn nan_volatility_is_clamped() {
        let sizer = ExposureSizer::default();
        assert_relative_eq!(sizer.size(Regime::Sideways, f64::NAN), 1.0);
    }

    #[test]
    fn custom_target() {
        let sizer = ExposureSizer::new(0.10);
        assert_relative_eq!(sizer.target_volatility(), 0.10);
        assert_relative_eq!(sizer.size(Regime::Bull, 0.20), 0.5);
    }
}
