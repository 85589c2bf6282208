//! Slew rate limiting of demands

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits how quickly a value may change.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlewRateLimiter {
    /// Maximum change of the value per second. Zero or less disables the
    /// limit.
    rate_limit: f64,

    /// Value output on the previous call
    prev: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SlewRateLimiter {
    pub fn new(rate_limit: f64) -> Self {
        Self {
            rate_limit,
            prev: 0.0,
        }
    }

    /// Move towards `input` by at most `rate_limit * dt_s`, returning the new
    /// value.
    pub fn calculate(&mut self, input: f64, dt_s: f64) -> f64 {
        if self.rate_limit <= 0.0 {
            self.prev = input;
            return input;
        }

        let max_step = self.rate_limit * dt_s;
        self.prev += (input - self.prev).max(-max_step).min(max_step);

        self.prev
    }

    /// Jump straight to `value`.
    pub fn reset(&mut self, value: f64) {
        self.prev = value;
    }

    pub fn value(&self) -> f64 {
        self.prev
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ramps_up_and_down() {
        let mut lim = SlewRateLimiter::new(2.0);

        // 2 per second at 0.1 s steps is 0.2 per step
        assert!((lim.calculate(1.0, 0.1) - 0.2).abs() < 1e-12);
        assert!((lim.calculate(1.0, 0.1) - 0.4).abs() < 1e-12);

        for _ in 0..10 {
            lim.calculate(1.0, 0.1);
        }
        assert!((lim.value() - 1.0).abs() < 1e-12);

        assert!((lim.calculate(-1.0, 0.1) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_and_reset() {
        let mut lim = SlewRateLimiter::new(0.0);
        assert_eq!(lim.calculate(5.0, 0.02), 5.0);

        let mut lim = SlewRateLimiter::new(1.0);
        lim.reset(3.0);
        assert!((lim.calculate(3.0, 0.02) - 3.0).abs() < 1e-12);
    }
}
