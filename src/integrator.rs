//! Torque-to-speed integration.
//!
//! Converts a commanded torque into a speed command with one forward
//! Euler step per call: `omega = (torque / J) * dt + omega_measured`.
//! The step is added to the *measured* speed rather than to the
//! integrator's own previous output, so commanded and real speed cannot
//! drift apart over time; every step restarts from ground truth.
//!
//! # Example
//!
//! ```rust
//! use flywheel::integrator::TorqueIntegrator;
//!
//! let mut integrator = TorqueIntegrator::new(0.001712, 2500.0);
//! // Zero torque: the next setpoint is just the measured speed
//! let rpm = integrator.step(0.0, 1200.0, 500);
//! assert!((rpm - 1200.0).abs() < 0.01);
//! ```

use crate::units::{rad_s_to_rpm, rpm_to_rad_s};

/// Shortest integration step, in seconds. Applied when the clock reports
/// zero or negative elapsed time.
const DT_FLOOR_S: f32 = 0.001;

/// Longest integration step, in seconds. Bounds the effect of a dropped
/// or delayed torque command.
const DT_CEIL_S: f32 = 1.0;

/// Forward Euler torque integrator.
///
/// Stateless in effect apart from update-time bookkeeping: each step
/// resynchronizes against the measured speed passed in by the caller.
pub struct TorqueIntegrator {
    inertia_kg_m2: f32,
    max_speed_rpm: f32,
    last_update_ms: u64,
}

impl TorqueIntegrator {
    /// Create an integrator for a wheel with the given moment of inertia
    /// (motor plus flywheel, in kg·m²) and speed envelope (in RPM).
    pub fn new(inertia_kg_m2: f32, max_speed_rpm: f32) -> Self {
        Self {
            inertia_kg_m2,
            max_speed_rpm,
            last_update_ms: 0,
        }
    }

    /// Integrate one torque command into a speed command.
    ///
    /// - `torque_nm`: commanded torque in N·m (signed).
    /// - `actual_rpm`: last published measured speed.
    /// - `now_ms`: current monotonic time.
    ///
    /// The elapsed time since the previous call is clamped to
    /// [1 ms, 1 s]: the floor guards clock non-monotonicity, the ceiling
    /// keeps a long gap between commands from integrating into an
    /// unreasonable jump. The result is clamped to the configured speed
    /// envelope and returned in RPM.
    pub fn step(&mut self, torque_nm: f32, actual_rpm: f32, now_ms: u64) -> f32 {
        let elapsed_ms = now_ms.saturating_sub(self.last_update_ms);
        let dt_s = (elapsed_ms as f32 / 1000.0).clamp(DT_FLOOR_S, DT_CEIL_S);
        self.last_update_ms = now_ms;

        let alpha_rad_s2 = torque_nm / self.inertia_kg_m2;
        let mut omega_rad_s = alpha_rad_s2 * dt_s + rpm_to_rad_s(actual_rpm);

        let omega_max = rpm_to_rad_s(self.max_speed_rpm);
        omega_rad_s = omega_rad_s.clamp(-omega_max, omega_max);

        rad_s_to_rpm(omega_rad_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const J: f32 = 0.001712;
    const MAX_RPM: f32 = 2500.0;

    #[test]
    fn zero_torque_returns_measured_speed() {
        let mut integrator = TorqueIntegrator::new(J, MAX_RPM);
        let rpm = integrator.step(0.0, 843.5, 100);
        assert!((rpm - 843.5).abs() < 0.01);
    }

    #[test]
    fn dt_floor_applies_for_non_advancing_clock() {
        let mut integrator = TorqueIntegrator::new(1.0, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 500);
        // Same timestamp again: elapsed is 0, step must use exactly 1 ms.
        // torque 1 N*m / J 1 -> alpha 1 rad/s^2 -> omega 0.001 rad/s
        let rpm = integrator.step(1.0, 0.0, 500);
        assert!((rpm - rad_s_to_rpm(0.001)).abs() < 1e-5);
    }

    #[test]
    fn dt_floor_applies_for_clock_stepping_backwards() {
        let mut integrator = TorqueIntegrator::new(1.0, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 500);
        let rpm = integrator.step(1.0, 0.0, 200);
        assert!((rpm - rad_s_to_rpm(0.001)).abs() < 1e-5);
    }

    #[test]
    fn dt_ceiling_bounds_a_delayed_command() {
        let mut integrator = TorqueIntegrator::new(1.0, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 0);
        // 30 s gap clamps to a 1 s step: omega = 1 rad/s
        let rpm = integrator.step(1.0, 0.0, 30_000);
        assert!((rpm - rad_s_to_rpm(1.0)).abs() < 1e-3);
    }

    #[test]
    fn output_clamped_to_envelope() {
        let mut integrator = TorqueIntegrator::new(J, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 0);
        let rpm = integrator.step(1000.0, 0.0, 1_000);
        assert!((rpm - 2500.0).abs() < 0.1);

        let rpm = integrator.step(-1000.0, 0.0, 2_000);
        assert!((rpm + 2500.0).abs() < 0.1);
    }

    #[test]
    fn clamp_holds_when_already_at_envelope() {
        let mut integrator = TorqueIntegrator::new(J, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 0);
        let rpm = integrator.step(0.5, 2500.0, 100);
        assert!(rpm <= 2500.0 + 0.01);
    }

    #[test]
    fn step_resynchronizes_against_measured_speed() {
        let mut integrator = TorqueIntegrator::new(1.0, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 0);
        // A large internal estimate from a previous call must not leak:
        // with zero torque the output tracks whatever is measured now.
        let _ = integrator.step(1000.0, 0.0, 100);
        let rpm = integrator.step(0.0, 60.0, 200);
        assert!((rpm - 60.0).abs() < 0.01);
    }

    #[test]
    fn known_step_math() {
        // torque 0.1712 N*m / J 0.001712 -> alpha 100 rad/s^2
        // 100 ms step -> +10 rad/s on top of 0 measured
        let mut integrator = TorqueIntegrator::new(J, MAX_RPM);
        let _ = integrator.step(0.0, 0.0, 0);
        let rpm = integrator.step(0.1712, 0.0, 100);
        assert!((rpm - rad_s_to_rpm(10.0)).abs() < 0.05);
    }

    #[test]
    fn tightened_envelope_bounds_output() {
        // A caller narrowing the envelope must see it honored, not the
        // full hardware limit
        let mut integrator = TorqueIntegrator::new(J, 100.0);
        let _ = integrator.step(0.0, 0.0, 0);
        let rpm = integrator.step(1000.0, 0.0, 1_000);
        assert!((rpm - 100.0).abs() < 0.01);

        let rpm = integrator.step(-1000.0, 0.0, 2_000);
        assert!((rpm + 100.0).abs() < 0.01);
    }
}
