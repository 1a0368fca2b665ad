//! Configuration for the driver chip and the control loop.
//!
//! # Example
//!
//! ```rust
//! use flywheel::config::{Config, ControlConfig, DriverConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_driver(DriverConfig::default().with_filter(127, 507))
//!     .with_control(ControlConfig::default().with_deadband_rpm(25.0));
//! ```

use crate::units::MAX_SPEED_RPM;

/// Complete configuration for one actuator axis.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Driver chip register coefficients.
    pub driver: DriverConfig,
    /// Control loop parameters.
    pub control: ControlConfig,
}

impl Config {
    /// Set the driver chip configuration.
    pub fn with_driver(mut self, driver: DriverConfig) -> Self {
        self.driver = driver;
        self
    }

    /// Set the control loop configuration.
    pub fn with_control(mut self, control: ControlConfig) -> Self {
        self.control = control;
        self
    }
}

// ============================================================================
// Driver Config
// ============================================================================

/// Tunable DRV8308 loop coefficients, written during the power-up
/// register sequence.
///
/// The defaults are gains tuned for mediocre but stable performance at
/// all speeds, in both idle and transient states. Better values can be
/// derived from the equations in the chip datasheet for a specific
/// motor/flywheel pairing.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    /// Speed filter pole coefficient (FILK1 register).
    pub filk1: u16,
    /// Speed filter zero coefficient (FILK2 register).
    pub filk2: u16,
    /// Compensator pole coefficient (COMPK1 register).
    pub compk1: u16,
    /// Compensator zero coefficient (COMPK2 register).
    pub compk2: u16,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            filk1: 127,
            filk2: 507,
            compk1: 100,
            compk2: 100,
        }
    }
}

impl DriverConfig {
    /// Set the speed filter pole and zero coefficients.
    pub fn with_filter(mut self, filk1: u16, filk2: u16) -> Self {
        self.filk1 = filk1;
        self.filk2 = filk2;
        self
    }

    /// Set the compensator pole and zero coefficients.
    pub fn with_compensator(mut self, compk1: u16, compk2: u16) -> Self {
        self.compk1 = compk1;
        self.compk2 = compk2;
        self
    }
}

// ============================================================================
// Control Config
// ============================================================================

/// Control loop parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlConfig {
    /// Moment of inertia of motor plus flywheel, in kg·m².
    pub inertia_kg_m2: f32,
    /// Tolerance inside which command and actual speed count as equal,
    /// and inside which the wheel counts as near zero for a reversal.
    pub deadband_rpm: f32,
    /// Physical speed envelope, in RPM.
    pub max_speed_rpm: f32,
    /// Re-evaluation period of the control loop outside `Idle`.
    pub poll_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            inertia_kg_m2: 0.001712,
            deadband_rpm: 20.0,
            max_speed_rpm: MAX_SPEED_RPM,
            poll_interval_ms: 10,
        }
    }
}

impl ControlConfig {
    /// Set the moment of inertia.
    pub fn with_inertia_kg_m2(mut self, inertia: f32) -> Self {
        self.inertia_kg_m2 = inertia;
        self
    }

    /// Set the deadband.
    pub fn with_deadband_rpm(mut self, deadband: f32) -> Self {
        self.deadband_rpm = deadband;
        self
    }

    /// Set the speed envelope.
    pub fn with_max_speed_rpm(mut self, max_speed: f32) -> Self {
        self.max_speed_rpm = max_speed;
        self
    }

    /// Set the control loop poll interval.
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }
}
