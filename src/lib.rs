//! # flywheel
//!
//! Closed-loop speed controller for a BLDC reaction wheel driven by a
//! TI DRV8308 motor driver chip.
//!
//! ## Features
//!
//! - **Register-level chip driver**: DRV8308 wire protocol, power-up
//!   register sequence with read-back diagnostics, and discrete pin
//!   control (enable, brake, direction)
//! - **Speed control state machine**: pure transition function
//!   arbitrating the chip's accelerate-only loop against the on/off
//!   brake, including controlled direction reversals through zero
//! - **Speed estimation**: signed RPM from hall-sensor edge timestamps
//! - **Torque interface**: commanded torque integrated over the wheel's
//!   moment of inertia into speed setpoints
//! - **Task pipeline**: bounded channels and a single-slot speed
//!   register wiring three async tasks together
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware seams (serial bus, pins, waveform, clock)
//! - `driver` - DRV8308 wire protocol and pin control
//! - `control` - Speed control state machine
//! - `estimator` / `integrator` - Speed measurement and torque math
//! - `shares` / `tasks` - Channels and the async control tasks
//! - `hal` - Concrete implementations (mock for testing; a board port
//!   implements the same traits against real peripherals)
//!
//! ## Example
//!
//! ```rust
//! use flywheel::{Drv8308, SpeedControl, ControlState, Direction};
//! use flywheel::config::DriverConfig;
//! use flywheel::hal::{MockDelay, MockPins, MockSpi, MockWave};
//!
//! // Bring the chip up
//! let mut drv = Drv8308::new(MockSpi::new(), MockPins::new(), MockWave::new(), MockDelay::new());
//! let report = drv.init(&DriverConfig::default()).unwrap();
//! assert!(report.is_clean());
//!
//! // Step the control machine by hand: spin up from rest
//! let mut control = SpeedControl::new(20.0);
//! for action in control.on_command(600.0, 0.0, Direction::Forward) {
//!     // a control task applies these to the driver
//!     let _ = action;
//! }
//! assert_eq!(control.state(), ControlState::Accelerating);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Configuration for the driver chip and the control loop.
pub mod config;
/// Speed control state machine.
pub mod control;
/// DRV8308 register protocol and pin control.
pub mod driver;
/// Speed estimation from hall-sensor edge timestamps.
pub mod estimator;
/// Hardware abstraction layer with mock implementations for testing.
#[cfg(feature = "std")]
pub mod hal;
/// Torque-to-speed-setpoint integration.
pub mod integrator;
/// Shared registers and bounded channels.
#[cfg(feature = "runtime")]
pub mod shares;
/// The async control tasks.
#[cfg(feature = "runtime")]
pub mod tasks;
/// Hardware trait seams.
pub mod traits;
/// Unit conversions and physical constants.
pub mod units;

pub use config::{Config, ControlConfig, DriverConfig};
pub use control::{Actions, ControlState, MotorAction, SpeedControl};
pub use driver::{Drv8308, Drv8308Error, DriverError, RegisterMismatch, SetupReport};
pub use estimator::SpeedEstimator;
pub use integrator::TorqueIntegrator;
#[cfg(feature = "runtime")]
pub use shares::{EdgeCapture, SpeedReader, SpeedShare};
pub use traits::Direction;
