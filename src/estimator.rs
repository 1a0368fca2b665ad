//! Signed speed estimation from frequency-output edge timestamps.
//!
//! The DRV8308 mirrors the motor's electrical frequency as a square wave
//! on its FGOUT pin. Edge capture timestamps each rising edge; this
//! module turns successive timestamps into a signed RPM value. There is
//! no periodic polling; the estimator is purely edge-triggered, so its
//! effective rate equals the electrical frequency (at most ~166.7 Hz at
//! the 2500 RPM envelope).
//!
//! # Example
//!
//! ```rust
//! use flywheel::estimator::SpeedEstimator;
//! use flywheel::Direction;
//!
//! let mut est = SpeedEstimator::new(0);
//! // Edges 6 ms apart = 166.67 Hz electrical = 2500 RPM
//! let rpm = est.process_edge(6_000, Direction::Forward).unwrap();
//! assert!((rpm - 2500.0).abs() < 0.1);
//! ```

use crate::traits::Direction;
use crate::units::RPM_PER_ELECTRICAL_HZ;

/// Converts successive edge timestamps into signed RPM.
///
/// Holds only the previous edge timestamp; the caller publishes results
/// into the shared actual-speed register.
pub struct SpeedEstimator {
    last_edge_us: u32,
}

impl SpeedEstimator {
    /// Create an estimator seeded with the current time, so the first
    /// real edge measures against startup rather than against zero.
    pub fn new(now_us: u32) -> Self {
        Self { last_edge_us: now_us }
    }

    /// Process one rising-edge timestamp.
    ///
    /// Returns the new signed RPM, or `None` when the interval since the
    /// previous edge is exactly zero. Such a sample is discarded rather
    /// than fabricating a speed from a divide by zero, and the previously
    /// published value stays in effect.
    ///
    /// Subtraction is wrapping, so the estimate stays correct across the
    /// 32-bit microsecond counter rollover.
    pub fn process_edge(&mut self, edge_us: u32, direction: Direction) -> Option<f32> {
        let dt_us = edge_us.wrapping_sub(self.last_edge_us);
        self.last_edge_us = edge_us;

        if dt_us == 0 {
            return None;
        }

        let frequency_hz = 1.0 / (dt_us as f32 / 1_000_000.0);
        Some(frequency_hz * RPM_PER_ELECTRICAL_HZ * direction.rpm_sign())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_edge_interval_gives_positive_rpm() {
        let mut est = SpeedEstimator::new(0);
        // 6000 us interval -> 166.67 Hz electrical -> 2500 RPM
        let rpm = est.process_edge(6_000, Direction::Forward).unwrap();
        assert!((rpm - 2500.0).abs() < 0.1);
    }

    #[test]
    fn reverse_edge_interval_gives_negative_rpm() {
        let mut est = SpeedEstimator::new(0);
        let rpm = est.process_edge(6_000, Direction::Reverse).unwrap();
        assert!((rpm + 2500.0).abs() < 0.1);
    }

    #[test]
    fn slow_wheel() {
        let mut est = SpeedEstimator::new(0);
        // 1 second between edges = 1 Hz = 15 RPM
        let rpm = est.process_edge(1_000_000, Direction::Forward).unwrap();
        assert!((rpm - 15.0).abs() < 1e-3);
    }

    #[test]
    fn zero_interval_discards_sample() {
        let mut est = SpeedEstimator::new(0);
        let _ = est.process_edge(5_000, Direction::Forward);
        assert!(est.process_edge(5_000, Direction::Forward).is_none());
        // Next edge measures against the duplicate, not the original
        let rpm = est.process_edge(11_000, Direction::Forward).unwrap();
        assert!((rpm - 2500.0).abs() < 0.1);
    }

    #[test]
    fn survives_counter_wraparound() {
        let mut est = SpeedEstimator::new(u32::MAX - 2_999);
        // 6000 us interval straddling the rollover
        let rpm = est.process_edge(3_000, Direction::Forward).unwrap();
        assert!((rpm - 2500.0).abs() < 0.1);
    }

    #[test]
    fn seeded_start_time_is_the_first_baseline() {
        let mut est = SpeedEstimator::new(1_000_000);
        let rpm = est.process_edge(1_006_000, Direction::Forward).unwrap();
        assert!((rpm - 2500.0).abs() < 0.1);
    }
}
