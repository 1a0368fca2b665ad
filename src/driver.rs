//! Register-level driver for the TI DRV8308 brushless motor driver chip.
//!
//! The DRV8308 is programmed over a synchronous serial bus with an
//! active-high chip select and commanded with a square wave on its
//! clock-reference input: the chip's internal loop servos the motor's
//! electrical frequency to the input frequency. This module owns the
//! wire protocol, the speed-command waveform, and the discrete control
//! pins (enable, brake, direction).
//!
//! # Example
//!
//! ```rust
//! use flywheel::driver::Drv8308;
//! use flywheel::config::DriverConfig;
//! use flywheel::hal::{MockSpi, MockPins, MockWave, MockDelay};
//!
//! let mut drv = Drv8308::new(MockSpi::new(), MockPins::new(), MockWave::new(), MockDelay::new());
//! let report = drv.init(&DriverConfig::default()).unwrap();
//! assert!(report.is_clean()); // mock bus echoes writes back
//!
//! drv.command_speed(1500.0).unwrap(); // 100 Hz electrical
//! ```
//!
//! # Failure semantics
//!
//! The wire protocol has no error detection: a stuck or miswired bus
//! silently yields wrong register values. [`Drv8308::read_register`] is
//! kept as a diagnostic aid, not a recovery path; control flow never
//! branches on a read-back.

use crate::config::DriverConfig;
use crate::traits::{ControlPins, Delay, Direction, SpiBus, WaveOutput};
use crate::units::rpm_to_electrical_hz;

/// DRV8308 register addresses (7-bit), named per the datasheet map.
pub mod reg {
    /// Control register (commutation and modulation setup).
    pub const CTRL: u8 = 0x00;
    /// MOD120 modulation constant.
    pub const MOD120: u8 = 0x03;
    /// Automatic gain control enable.
    pub const AUTOGAIN: u8 = 0x04;
    /// Speed loop gain and internal clock select.
    pub const SPDGAIN: u8 = 0x05;
    /// Speed filter pole coefficient.
    pub const FILK1: u8 = 0x06;
    /// Speed filter zero coefficient.
    pub const FILK2: u8 = 0x07;
    /// Compensator pole coefficient.
    pub const COMPK1: u8 = 0x08;
    /// Compensator zero coefficient.
    pub const COMPK2: u8 = 0x09;
    /// Overall loop gain.
    pub const LOOPGAIN: u8 = 0x0A;
    /// Fixed speed command register.
    pub const SPEED: u8 = 0x0B;
}

/// Chip-select setup time before the first clocked bit, in microseconds.
const CS_SETUP_US: u32 = 1;
/// Data hold time after the last clocked bit, in microseconds.
const CS_HOLD_US: u32 = 1;
/// Recovery time between back-to-back transactions, in microseconds.
const RECOVERY_US: u32 = 5;

/// Read/write select bit in the frame header (set = read).
const HEADER_READ: u8 = 0x80;

/// Error from any of the driver's hardware interfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverError<B, P, W> {
    /// Serial bus transfer failed.
    Bus(B),
    /// Pin write or read failed.
    Pin(P),
    /// Speed waveform update failed.
    Wave(W),
}

impl<B, P, W> core::fmt::Display for DriverError<B, P, W>
where
    B: core::fmt::Debug,
    P: core::fmt::Debug,
    W: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "serial bus transfer failed: {e:?}"),
            Self::Pin(e) => write!(f, "pin access failed: {e:?}"),
            Self::Wave(e) => write!(f, "speed waveform update failed: {e:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<B, P, W> std::error::Error for DriverError<B, P, W>
where
    B: core::fmt::Debug,
    P: core::fmt::Debug,
    W: core::fmt::Debug,
{
}

/// Shorthand for the error type of a concrete [`Drv8308`] instantiation.
pub type Drv8308Error<B, P, W> = DriverError<
    <B as SpiBus>::Error,
    <P as ControlPins>::Error,
    <W as WaveOutput>::Error,
>;

/// One register whose read-back did not match what was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterMismatch {
    /// Register address.
    pub address: u8,
    /// Value written during setup.
    pub wrote: u16,
    /// Value read back afterwards.
    pub read_back: u16,
}

/// Read-back diagnostics from the power-up register sequence.
///
/// A mismatch usually means a bus wiring problem. The control loop does
/// not act on this; it exists so a human can tell a dead bus from a dead
/// motor.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetupReport {
    /// Registers whose read-back differed from the written value.
    pub mismatches: heapless::Vec<RegisterMismatch, 12>,
}

impl SetupReport {
    /// True if every register read back exactly what was written.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// DRV8308 chip driver.
///
/// Generic over the hardware seams so the same protocol code runs against
/// real peripherals or the mocks in [`crate::hal`].
///
/// # Bus ownership
///
/// In steady state only the speed control loop touches the bus (the setup
/// sequence runs before the tasks start), so the driver does no internal
/// locking. If telemetry read-back is added later, access must be
/// serialized by the caller.
pub struct Drv8308<B, P, W, D> {
    bus: B,
    pins: P,
    wave: W,
    delay: D,
}

impl<B, P, W, D> Drv8308<B, P, W, D>
where
    B: SpiBus,
    P: ControlPins,
    W: WaveOutput,
    D: Delay,
{
    /// Create a driver from its hardware parts. No pins are touched until
    /// [`init`](Self::init) or an explicit control call.
    pub fn new(bus: B, pins: P, wave: W, delay: D) -> Self {
        Self {
            bus,
            pins,
            wave,
            delay,
        }
    }

    /// Tear the driver back down into its hardware parts.
    ///
    /// Used by tests to inspect mock state after driving the protocol.
    pub fn into_parts(self) -> (B, P, W, D) {
        (self.bus, self.pins, self.wave, self.delay)
    }

    /// Power-up initialization: enable the chip, release the brake, set
    /// direction forward, then program the internal registers.
    ///
    /// The chip zeroes its registers whenever it is disabled or loses
    /// power, so this must run before the control tasks start.
    pub fn init(
        &mut self,
        config: &DriverConfig,
    ) -> Result<SetupReport, Drv8308Error<B, P, W>> {
        self.enable()?;
        self.unbrake()?;
        self.set_direction(Direction::Forward)?;
        self.apply_setup(config)
    }

    /// Program the fixed register set and the four tunable loop
    /// coefficients, reading each register back for diagnostics.
    ///
    /// The fixed values follow the DRV8308EVM bring-up guide; only the
    /// filter/compensator coefficients are meant to be tuned.
    pub fn apply_setup(
        &mut self,
        config: &DriverConfig,
    ) -> Result<SetupReport, Drv8308Error<B, P, W>> {
        let sequence: [(u8, u16); 10] = [
            (reg::CTRL, 0x2000),
            (reg::MOD120, 0x0F82), // MOD120 = 3970
            (reg::AUTOGAIN, 0x0200),
            (reg::SPDGAIN, 0x0800), // SPDGAIN = 2048, internal clock 000
            (reg::FILK1, config.filk1),
            (reg::FILK2, config.filk2),
            (reg::COMPK1, config.compk1),
            (reg::COMPK2, config.compk2),
            (reg::LOOPGAIN, 0x0200),
            (reg::SPEED, 0x0500),
        ];

        let mut report = SetupReport::default();
        for (address, value) in sequence {
            self.write_register(address, value)?;
            let read_back = self.read_register(address)?;
            if read_back != value {
                // Report is sized for the whole sequence; push cannot fail.
                let _ = report.mismatches.push(RegisterMismatch {
                    address,
                    wrote: value,
                    read_back,
                });
            }
        }
        Ok(report)
    }

    /// Write a 16-bit value to a 7-bit register address.
    ///
    /// Frame: header byte with the read bit clear, then the value MSB
    /// first, inside one chip-select window with the datasheet setup,
    /// hold, and recovery delays.
    pub fn write_register(
        &mut self,
        address: u8,
        value: u16,
    ) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins
            .set_chip_select(true)
            .map_err(DriverError::Pin)?;
        self.delay.delay_us(CS_SETUP_US);

        self.transfer(address & 0x7F)?;
        self.transfer((value >> 8) as u8)?;
        self.transfer((value & 0xFF) as u8)?;

        self.delay.delay_us(CS_HOLD_US);
        self.pins
            .set_chip_select(false)
            .map_err(DriverError::Pin)?;
        self.delay.delay_us(RECOVERY_US);
        Ok(())
    }

    /// Read a 16-bit register value from a 7-bit address.
    ///
    /// Same framing as a write with the read bit set; the two data bytes
    /// shifted in during the data phase form the result, MSB first.
    pub fn read_register(&mut self, address: u8) -> Result<u16, Drv8308Error<B, P, W>> {
        self.pins
            .set_chip_select(true)
            .map_err(DriverError::Pin)?;
        self.delay.delay_us(CS_SETUP_US);

        self.transfer(HEADER_READ | (address & 0x7F))?;
        let msb = self.transfer(0x00)?;
        let lsb = self.transfer(0x00)?;

        self.delay.delay_us(CS_HOLD_US);
        self.pins
            .set_chip_select(false)
            .map_err(DriverError::Pin)?;
        self.delay.delay_us(RECOVERY_US);
        Ok(u16::from(msb) << 8 | u16::from(lsb))
    }

    /// Command a motor speed by driving the chip's clock-reference input
    /// at the matching electrical frequency (RPM / 15, 50% duty).
    ///
    /// Callers pass the speed magnitude; direction goes through
    /// [`set_direction`](Self::set_direction). A command of exactly zero
    /// holds the output at a constant level.
    pub fn command_speed(&mut self, rpm: f32) -> Result<(), Drv8308Error<B, P, W>> {
        self.wave
            .set_frequency_hz(rpm_to_electrical_hz(rpm))
            .map_err(DriverError::Wave)
    }

    /// Set the direction pin.
    pub fn set_direction(
        &mut self,
        direction: Direction,
    ) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins.set_direction(direction).map_err(DriverError::Pin)
    }

    /// Read the direction pin back.
    pub fn read_direction(&self) -> Result<Direction, Drv8308Error<B, P, W>> {
        self.pins.direction().map_err(DriverError::Pin)
    }

    /// Engage the brake.
    ///
    /// The chip has no deceleration control loop; without the brake a
    /// lower speed command just lets the wheel coast down. While braked
    /// the chip ignores the speed-command waveform.
    pub fn brake(&mut self) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins.set_brake(true).map_err(DriverError::Pin)
    }

    /// Release the brake.
    ///
    /// Known hardware defect: release does not reliably resume chip
    /// operation; occasionally the motor must be spun by hand before it
    /// takes commands again. This is an accepted limitation of the board,
    /// not something the software can detect or compensate for.
    pub fn unbrake(&mut self) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins.set_brake(false).map_err(DriverError::Pin)
    }

    /// Enable the chip.
    pub fn enable(&mut self) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins.set_enable(true).map_err(DriverError::Pin)
    }

    /// Disable the chip. This zeroes every internal register; call
    /// [`init`](Self::init) again before further use.
    pub fn disable(&mut self) -> Result<(), Drv8308Error<B, P, W>> {
        self.pins.set_enable(false).map_err(DriverError::Pin)
    }

    /// Read the fault status input (wired, not consulted by the control
    /// loop).
    pub fn fault_active(&self) -> Result<bool, Drv8308Error<B, P, W>> {
        self.pins.fault_active().map_err(DriverError::Pin)
    }

    /// Read the phase-lock status input (wired, not consulted by the
    /// control loop).
    pub fn lock_active(&self) -> Result<bool, Drv8308Error<B, P, W>> {
        self.pins.lock_active().map_err(DriverError::Pin)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Drv8308Error<B, P, W>> {
        self.bus.transfer(byte).map_err(DriverError::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDelay, MockPins, MockSpi, MockWave};

    fn driver() -> Drv8308<MockSpi, MockPins, MockWave, MockDelay> {
        Drv8308::new(MockSpi::new(), MockPins::new(), MockWave::new(), MockDelay::new())
    }

    // === Register framing ===

    #[test]
    fn write_register_frames_three_bytes_msb_first() {
        let mut drv = driver();
        drv.write_register(0x03, 0x0FC2).unwrap();

        let (spi, pins, _, delay) = drv.into_parts();
        assert_eq!(spi.written, vec![0x03, 0x0F, 0xC2]);
        // One full chip-select pulse around the frame
        assert_eq!(pins.chip_select_pulses(), 1);
        assert!(!pins.chip_select());
        // Setup, hold, recovery delays in order
        assert_eq!(delay.delays_us, vec![1, 1, 5]);
    }

    #[test]
    fn write_register_masks_address_to_seven_bits() {
        let mut drv = driver();
        drv.write_register(0xFF, 0x0000).unwrap();
        let (spi, ..) = drv.into_parts();
        // Header bit must stay clear for a write
        assert_eq!(spi.written[0], 0x7F);
    }

    #[test]
    fn read_register_sets_header_bit_and_returns_msb_first() {
        let mut spi = MockSpi::new();
        spi.queue_response_word(0xABCD);
        let mut drv = Drv8308::new(spi, MockPins::new(), MockWave::new(), MockDelay::new());

        let value = drv.read_register(0x0B).unwrap();
        assert_eq!(value, 0xABCD);

        let (spi, _, _, delay) = drv.into_parts();
        assert_eq!(spi.written, vec![0x8B, 0x00, 0x00]);
        assert_eq!(delay.delays_us, vec![1, 1, 5]);
    }

    // === Speed command ===

    #[test]
    fn command_speed_converts_rpm_to_electrical_hz() {
        let mut drv = driver();
        drv.command_speed(1500.0).unwrap();
        let (_, _, wave, _) = drv.into_parts();
        assert!((wave.frequency_hz() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn command_speed_zero_holds_output_flat() {
        let mut drv = driver();
        drv.command_speed(750.0).unwrap();
        drv.command_speed(0.0).unwrap();
        let (_, _, wave, _) = drv.into_parts();
        assert_eq!(wave.frequency_hz(), 0.0);
    }

    // === Pin control ===

    #[test]
    fn pin_controls_drive_expected_levels() {
        let mut drv = driver();
        drv.enable().unwrap();
        drv.brake().unwrap();
        drv.set_direction(Direction::Reverse).unwrap();

        assert_eq!(drv.read_direction().unwrap(), Direction::Reverse);

        drv.unbrake().unwrap();
        let (_, pins, _, _) = drv.into_parts();
        assert!(pins.enabled());
        assert!(!pins.brake_engaged());
        assert!(pins.direction_level()); // reverse = high
    }

    #[test]
    fn status_pins_are_readable() {
        let pins = MockPins::new();
        pins.set_fault(true);
        let drv = Drv8308::new(MockSpi::new(), pins, MockWave::new(), MockDelay::new());
        assert!(drv.fault_active().unwrap());
        assert!(!drv.lock_active().unwrap());
    }

    // === Setup sequence ===

    #[test]
    fn init_programs_registers_in_order() {
        let mut drv = driver();
        let report = drv.init(&DriverConfig::default()).unwrap();
        assert!(report.is_clean());

        let (spi, pins, _, _) = drv.into_parts();
        assert!(pins.enabled());
        assert!(!pins.brake_engaged());
        assert!(!pins.direction_level()); // forward

        // 10 write frames + 10 read frames, 3 bytes each
        assert_eq!(spi.written.len(), 60);
        // First write targets CTRL with 0x2000
        assert_eq!(&spi.written[0..3], &[0x00, 0x20, 0x00]);
        // MOD120 write carries the bring-up constant
        assert_eq!(&spi.written[6..9], &[0x03, 0x0F, 0x82]);
    }

    #[test]
    fn setup_reports_mismatched_read_back() {
        let mut spi = MockSpi::new();
        spi.set_echo_writes(false); // bus reads back zeros
        let mut drv = Drv8308::new(spi, MockPins::new(), MockWave::new(), MockDelay::new());

        let report = drv.apply_setup(&DriverConfig::default()).unwrap();
        assert!(!report.is_clean());
        // Every non-zero register value mismatches against a dead bus
        let first = report.mismatches.first().unwrap();
        assert_eq!(first.address, reg::CTRL);
        assert_eq!(first.wrote, 0x2000);
        assert_eq!(first.read_back, 0x0000);
    }
}
