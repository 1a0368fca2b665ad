//! Hardware abstraction traits for the DRV8308 driver chip and its pins.
//!
//! These interfaces let the control path run against real hardware or the
//! desktop mocks in [`crate::hal::mock`]. The chip driver composes them:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`SpiBus`] | Full-duplex byte transfer on the register bus |
//! | [`ControlPins`] | Chip select, enable, brake, direction, status pins |
//! | [`WaveOutput`] | Frequency-encoded speed command (CLKIN square wave) |
//! | [`Delay`] | Microsecond delays for bus setup/hold/recovery timing |
//! | [`Clock`] | Monotonic time source for edge timestamps and integration |
//! | [`DirectionSense`] | Shared read-only view of the direction pin |
//!
//! # Example
//!
//! ```rust
//! use flywheel::traits::{ControlPins, Direction};
//! use flywheel::hal::MockPins;
//!
//! let mut pins = MockPins::new();
//! pins.set_direction(Direction::Reverse).unwrap();
//! assert_eq!(pins.direction().unwrap(), Direction::Reverse);
//! ```

/// Direction of wheel rotation.
///
/// Maps onto a single hardware pin with the convention that a low level
/// is forward (positive RPM) and a high level is reverse (negative RPM).
///
/// # Default
///
/// Defaults to [`Forward`](Self::Forward), matching the startup state the
/// control loop programs before the first command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Positive rotation (direction pin low).
    #[default]
    Forward,
    /// Negative rotation (direction pin high).
    Reverse,
}

impl Direction {
    /// Returns the direction as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }

    /// Sign of the RPM values this direction produces: `+1.0` or `-1.0`.
    #[inline]
    pub const fn rpm_sign(&self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    /// Logic level of the direction pin for this direction (low = forward).
    #[inline]
    pub const fn pin_level(&self) -> bool {
        matches!(self, Direction::Reverse)
    }

    /// Direction encoded by a direction pin level (low = forward).
    #[inline]
    pub const fn from_pin_level(level: bool) -> Self {
        if level {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn reversed(&self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Full-duplex serial bus for the chip's register protocol.
///
/// The chip driver builds register frames itself; implementations only
/// shift one byte out while shifting one byte in (SPI mode 0, MSB first).
/// Chip select is *not* part of this trait: the DRV8308 uses an
/// active-high select with explicit setup/hold timing, so the driver
/// sequences it through [`ControlPins`] and [`Delay`].
pub trait SpiBus {
    /// Error type for bus transfers.
    type Error;

    /// Shift `byte` out on MOSI and return the byte shifted in on MISO.
    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;
}

/// Discrete control and status pins of the driver chip.
///
/// # Implementation Notes
///
/// - Chip select is active high on the DRV8308, inverted from the usual
///   SPI convention, which is why the driver sequences it manually.
/// - The fault and lock inputs are wired but not consulted by the speed
///   control loop; they are exposed for diagnostics and future use.
pub trait ControlPins {
    /// Error type for pin operations.
    type Error;

    /// Drive the chip-select line (`true` = asserted, pin high).
    fn set_chip_select(&mut self, asserted: bool) -> Result<(), Self::Error>;

    /// Drive the enable pin. Disabling the chip zeroes all of its
    /// internal registers, so the setup sequence must be replayed after
    /// every re-enable.
    fn set_enable(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Drive the brake pin (`true` = brake engaged).
    fn set_brake(&mut self, engaged: bool) -> Result<(), Self::Error>;

    /// Drive the direction pin.
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Read the direction pin back.
    fn direction(&self) -> Result<Direction, Self::Error>;

    /// Read the fault status input (`true` = fault asserted).
    fn fault_active(&self) -> Result<bool, Self::Error>;

    /// Read the phase-lock status input (`true` = loop locked).
    fn lock_active(&self) -> Result<bool, Self::Error>;
}

/// Continuous square-wave output for the chip's clock-reference input.
///
/// The chip's internal control loop servos the motor's electrical
/// frequency to the frequency present on this output. Duty cycle is
/// fixed at 50%; only the frequency is commanded.
pub trait WaveOutput {
    /// Error type for waveform updates.
    type Error;

    /// Set the output frequency in hertz.
    ///
    /// A frequency of exactly `0.0` must hold the output at a constant
    /// level rather than producing an undefined waveform.
    fn set_frequency_hz(&mut self, hz: f32) -> Result<(), Self::Error>;
}

/// Blocking microsecond delay for bus timing.
///
/// Only used inside register transactions, where the required delays are
/// single-digit microseconds and an async yield would cost more than it
/// saves.
pub trait Delay {
    /// Busy-wait for the given number of microseconds.
    fn delay_us(&mut self, us: u32);
}

/// Monotonic time source.
///
/// Microsecond time is a wrapping 32-bit counter (about 71 minutes per
/// wrap); consumers must use wrapping subtraction on it. Millisecond time
/// is 64-bit and does not wrap in practice.
pub trait Clock {
    /// Current time in microseconds since an arbitrary epoch (wraps).
    fn now_us(&self) -> u32;

    /// Current time in milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u64;
}

/// Read-only view of the direction pin, shareable across tasks.
///
/// The speed estimator signs its RPM output with the direction pin while
/// the control loop owns the pin for writes. Implementations are cheap
/// handles onto the same underlying pin (a second GPIO handle on real
/// hardware, a shared cell in the mocks).
pub trait DirectionSense {
    /// Current direction encoded on the pin.
    fn direction(&self) -> Direction;
}
