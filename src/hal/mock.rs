//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every hardware trait, so the
//! whole control path, register protocol included, runs on a desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockSpi`] | [`SpiBus`] | Records frames, models the chip's registers |
//! | [`MockPins`] | [`ControlPins`], [`DirectionSense`] | Shared pin levels |
//! | [`MockWave`] | [`WaveOutput`] | Records commanded frequencies |
//! | [`MockDelay`] | [`Delay`] | Records requested delays, never sleeps |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//!
//! [`MockPins`], [`MockWave`], and [`MockClock`] are cheap clonable
//! handles onto shared state, because on real hardware those signals are
//! observable from more than one place (the estimator reads the
//! direction pin the control loop writes).
//!
//! # Example
//!
//! ```rust
//! use flywheel::hal::{MockPins, MockWave};
//! use flywheel::traits::{ControlPins, Direction, DirectionSense, WaveOutput};
//!
//! let mut pins = MockPins::new();
//! let probe = pins.clone();
//! pins.set_direction(Direction::Reverse).unwrap();
//! assert_eq!(DirectionSense::direction(&probe), Direction::Reverse);
//!
//! let mut wave = MockWave::new();
//! wave.set_frequency_hz(100.0).unwrap();
//! assert_eq!(wave.frequency_hz(), 100.0);
//! ```
//!
//! [`SpiBus`]: crate::traits::SpiBus
//! [`ControlPins`]: crate::traits::ControlPins
//! [`DirectionSense`]: crate::traits::DirectionSense
//! [`WaveOutput`]: crate::traits::WaveOutput
//! [`Delay`]: crate::traits::Delay
//! [`Clock`]: crate::traits::Clock

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{Clock, ControlPins, Delay, Direction, DirectionSense, SpiBus, WaveOutput};

// ============================================================================
// MockSpi
// ============================================================================

/// Mock serial bus that behaves like the chip's register file.
///
/// Every transferred byte is recorded in [`written`](Self::written).
/// Frames are parsed as the DRV8308 does (a header byte with a read bit
/// and 7-bit address, then two data bytes MSB first) and writes are
/// stored in an internal register model so later reads of the same
/// address echo them back. Scripted responses queued with
/// [`queue_response_word`](Self::queue_response_word) take precedence
/// over the register model during read data phases.
#[derive(Debug)]
pub struct MockSpi {
    /// Every byte shifted out on MOSI, in order.
    pub written: Vec<u8>,
    regs: [u16; 128],
    frame: Vec<u8>,
    queued: VecDeque<u8>,
    echo_writes: bool,
}

impl MockSpi {
    /// Creates a mock bus with an empty register model.
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            regs: [0; 128],
            frame: Vec::new(),
            queued: VecDeque::new(),
            echo_writes: true,
        }
    }

    /// Queue a 16-bit word to be shifted in during the next read's data
    /// phase, MSB first.
    pub fn queue_response_word(&mut self, word: u16) {
        self.queued.push_back((word >> 8) as u8);
        self.queued.push_back((word & 0xFF) as u8);
    }

    /// When false, reads ignore the register model and return zeros,
    /// simulating a dead or miswired bus for diagnostics tests.
    pub fn set_echo_writes(&mut self, echo: bool) {
        self.echo_writes = echo;
    }

    /// Value currently held in the register model at `address`.
    pub fn register(&self, address: u8) -> u16 {
        self.regs[(address & 0x7F) as usize]
    }
}

impl Default for MockSpi {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiBus for MockSpi {
    type Error = Infallible;

    fn transfer(&mut self, byte: u8) -> Result<u8, Infallible> {
        self.written.push(byte);
        self.frame.push(byte);
        let pos = self.frame.len();
        let header = self.frame[0];
        let is_read = header & 0x80 != 0;
        let address = (header & 0x7F) as usize;

        let response = if pos == 1 {
            0x00
        } else if let Some(scripted) = self.queued.pop_front() {
            scripted
        } else if is_read && self.echo_writes {
            let value = self.regs[address];
            if pos == 2 {
                (value >> 8) as u8
            } else {
                (value & 0xFF) as u8
            }
        } else {
            0x00
        };

        if pos == 3 {
            if !is_read {
                self.regs[address] = u16::from(self.frame[1]) << 8 | u16::from(self.frame[2]);
            }
            self.frame.clear();
        }

        Ok(response)
    }
}

// ============================================================================
// MockPins
// ============================================================================

#[derive(Debug, Default)]
struct PinState {
    chip_select: bool,
    chip_select_pulses: usize,
    enabled: bool,
    brake: bool,
    direction_level: bool,
    fault: bool,
    lock: bool,
}

/// Mock control/status pins.
///
/// A clonable handle onto shared pin state, so a test (or the speed
/// estimator) can observe levels while the chip driver owns the handle
/// that writes them.
#[derive(Clone, Debug, Default)]
pub struct MockPins {
    state: Arc<Mutex<PinState>>,
}

impl MockPins {
    /// Creates pins with everything low/deasserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current chip-select level.
    pub fn chip_select(&self) -> bool {
        self.state.lock().unwrap().chip_select
    }

    /// Number of completed chip-select assertions so far.
    pub fn chip_select_pulses(&self) -> usize {
        self.state.lock().unwrap().chip_select_pulses
    }

    /// Current enable level.
    pub fn enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    /// Current brake level.
    pub fn brake_engaged(&self) -> bool {
        self.state.lock().unwrap().brake
    }

    /// Raw direction pin level (high = reverse).
    pub fn direction_level(&self) -> bool {
        self.state.lock().unwrap().direction_level
    }

    /// Set the fault status input.
    pub fn set_fault(&self, active: bool) {
        self.state.lock().unwrap().fault = active;
    }

    /// Set the phase-lock status input.
    pub fn set_lock(&self, active: bool) {
        self.state.lock().unwrap().lock = active;
    }
}

impl ControlPins for MockPins {
    type Error = Infallible;

    fn set_chip_select(&mut self, asserted: bool) -> Result<(), Infallible> {
        let mut state = self.state.lock().unwrap();
        if asserted && !state.chip_select {
            state.chip_select_pulses += 1;
        }
        state.chip_select = asserted;
        Ok(())
    }

    fn set_enable(&mut self, enabled: bool) -> Result<(), Infallible> {
        self.state.lock().unwrap().enabled = enabled;
        Ok(())
    }

    fn set_brake(&mut self, engaged: bool) -> Result<(), Infallible> {
        self.state.lock().unwrap().brake = engaged;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), Infallible> {
        self.state.lock().unwrap().direction_level = direction.pin_level();
        Ok(())
    }

    fn direction(&self) -> Result<Direction, Infallible> {
        Ok(Direction::from_pin_level(
            self.state.lock().unwrap().direction_level,
        ))
    }

    fn fault_active(&self) -> Result<bool, Infallible> {
        Ok(self.state.lock().unwrap().fault)
    }

    fn lock_active(&self) -> Result<bool, Infallible> {
        Ok(self.state.lock().unwrap().lock)
    }
}

impl DirectionSense for MockPins {
    fn direction(&self) -> Direction {
        Direction::from_pin_level(self.state.lock().unwrap().direction_level)
    }
}

// ============================================================================
// MockWave
// ============================================================================

#[derive(Debug, Default)]
struct WaveState {
    frequency_hz: f32,
    history: Vec<f32>,
}

/// Mock speed-command waveform output.
///
/// Clonable handle; records every commanded frequency so tests can
/// assert on the sequence as well as the latest value.
#[derive(Clone, Debug, Default)]
pub struct MockWave {
    state: Arc<Mutex<WaveState>>,
}

impl MockWave {
    /// Creates a wave output holding 0 Hz (constant level).
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest commanded frequency in Hz.
    pub fn frequency_hz(&self) -> f32 {
        self.state.lock().unwrap().frequency_hz
    }

    /// Every frequency commanded so far, in order.
    pub fn history(&self) -> Vec<f32> {
        self.state.lock().unwrap().history.clone()
    }
}

impl WaveOutput for MockWave {
    type Error = Infallible;

    fn set_frequency_hz(&mut self, hz: f32) -> Result<(), Infallible> {
        let mut state = self.state.lock().unwrap();
        state.frequency_hz = hz;
        state.history.push(hz);
        Ok(())
    }
}

// ============================================================================
// MockDelay
// ============================================================================

/// Mock delay that records requested durations without sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Every requested delay, in microseconds, in order.
    pub delays_us: Vec<u32>,
}

impl MockDelay {
    /// Creates a delay with an empty record.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Delay for MockDelay {
    fn delay_us(&mut self, us: u32) {
        self.delays_us.push(us);
    }
}

// ============================================================================
// MockClock
// ============================================================================

/// Mock monotonic clock.
///
/// Clonable handle onto a shared microsecond counter. `now_us()` wraps
/// at 32 bits the way a hardware microsecond timer does, which lets
/// tests exercise rollover paths deliberately.
///
/// # Example
///
/// ```rust
/// use flywheel::hal::MockClock;
/// use flywheel::traits::Clock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_us(), 0);
///
/// clock.advance_ms(12);
/// assert_eq!(clock.now_us(), 12_000);
/// assert_eq!(clock.now_ms(), 12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    micros: Arc<AtomicU64>,
}

impl MockClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by the given number of microseconds.
    pub fn advance_us(&self, us: u64) {
        self.micros.fetch_add(us, Ordering::Relaxed);
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }

    /// Set the absolute microsecond count.
    pub fn set_us(&self, us: u64) {
        self.micros.store(us, Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u32 {
        self.micros.load(Ordering::Relaxed) as u32
    }

    fn now_ms(&self) -> u64 {
        self.micros.load(Ordering::Relaxed) / 1000
    }
}
