//! Hardware Abstraction Layer implementations.
//!
//! Concrete implementations of the traits defined in [`crate::traits`].
//! Currently this is the desktop mock set; a real board port implements
//! the same traits against its GPIO, SPI, and timer peripherals.

pub mod mock;

pub use mock::*;
