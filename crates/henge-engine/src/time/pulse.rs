/// Repeating phase in `[0, 1)`.
///
/// Drives the pulsing light marker: the shader maps the phase to a brightness
/// curve, so the marker "beats" once per period.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PulseTimer {
    period: f32,
    acc: f32,
}

impl PulseTimer {
    pub fn new(period_secs: f32) -> Self {
        Self {
            period: period_secs.max(f32::EPSILON),
            acc: 0.0,
        }
    }

    /// Advances the timer and returns the new phase.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.acc = (self.acc + dt.max(0.0)) % self.period;
        self.phase()
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.acc / self.period
    }
}

impl Default for PulseTimer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_every_period() {
        let mut p = PulseTimer::new(1.0);
        assert!((p.advance(0.25) - 0.25).abs() < 1e-6);
        assert!((p.advance(0.5) - 0.75).abs() < 1e-6);
        assert!((p.advance(0.5) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn negative_dt_is_ignored() {
        let mut p = PulseTimer::new(2.0);
        p.advance(1.0);
        assert!((p.advance(-3.0) - 0.5).abs() < 1e-6);
    }
}
