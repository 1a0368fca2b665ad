//! Trait definitions for hardware abstraction.
//!
//! This module defines the abstractions that let the control path run on
//! real hardware or on the desktop mocks in [`crate::hal`]:
//!
//! - [`SpiBus`]: register-protocol byte transfers
//! - [`ControlPins`]: chip select, enable, brake, direction, status pins
//! - [`WaveOutput`]: frequency-encoded speed command output
//! - [`Delay`]: microsecond bus timing
//! - [`Clock`]: monotonic time source
//! - [`DirectionSense`]: shared read-only direction pin view

pub mod hardware;

pub use hardware::*;
