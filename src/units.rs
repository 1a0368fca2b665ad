//! Unit conversions and motor constants.
//!
//! The motor is a 4-pole-pair BLDC whose driver relates shaft speed to
//! commutation (electrical) frequency by a fixed constant: one electrical
//! hertz corresponds to 15 RPM at the shaft. All speed plumbing in this
//! crate is signed RPM; conversions to rad/s and electrical Hz live here.

/// Shaft RPM per electrical hertz for this motor (DRV8308 datasheet).
pub const RPM_PER_ELECTRICAL_HZ: f32 = 15.0;

/// Physical speed envelope of the motor and flywheel, in RPM.
///
/// The chip-side speed clamp keeps commanded speed inside this bound;
/// the torque integrator clamps to the same envelope in software.
pub const MAX_SPEED_RPM: f32 = 2500.0;

const TWO_PI: f32 = 2.0 * core::f32::consts::PI;

/// Convert shaft speed in RPM to angular velocity in rad/s.
#[inline]
pub fn rpm_to_rad_s(rpm: f32) -> f32 {
    rpm * (TWO_PI / 60.0)
}

/// Convert angular velocity in rad/s to shaft speed in RPM.
#[inline]
pub fn rad_s_to_rpm(rad_s: f32) -> f32 {
    rad_s * (60.0 / TWO_PI)
}

/// Convert shaft speed in RPM to the chip's electrical frequency in Hz.
#[inline]
pub fn rpm_to_electrical_hz(rpm: f32) -> f32 {
    rpm / RPM_PER_ELECTRICAL_HZ
}

/// Convert electrical frequency in Hz to shaft speed in RPM.
#[inline]
pub fn electrical_hz_to_rpm(hz: f32) -> f32 {
    hz * RPM_PER_ELECTRICAL_HZ
}

/// Sign convention used throughout the control path.
///
/// Returns `+1.0` for `x >= 0.0` and `-1.0` otherwise. Zero is treated as
/// positive on purpose: a stopped wheel counts as "forward" so a command
/// away from rest never looks like a direction reversal.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}
