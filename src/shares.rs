//! Shared registers and bounded channels wiring the control tasks.
//!
//! Two primitives coordinate everything, matching the two sharing
//! patterns the control path needs:
//!
//! - **Single-slot overwrite register** ([`SpeedShare`]/[`SpeedReader`],
//!   a `tokio::sync::watch` pair): last value wins, no history, readable
//!   at any time. Holds the actual speed; written only by the speed
//!   estimator, read by the integrator, the control loop, and telemetry.
//! - **Bounded FIFO channels** (`tokio::sync::mpsc`): edge timestamps
//!   (capacity 4), speed commands (capacity 2), torque commands
//!   (capacity 2). Consumers block on empty.
//!
//! # Overflow policy
//!
//! All channels are fixed capacity, so full-channel behavior is explicit:
//!
//! - The edge channel is fed from interrupt context through
//!   [`EdgeCapture::on_edge`], which must never block: when the channel
//!   is full the *newest* timestamp is dropped. The estimator simply
//!   measures a longer interval on the next edge it does see.
//! - The command channels are fed from task context, where blocking is
//!   safe: producers `await` space, so no command is ever lost.

use tokio::sync::{mpsc, watch};

/// Depth of the edge-timestamp channel.
pub const EDGE_QUEUE_DEPTH: usize = 4;

/// Depth of the speed- and torque-command channels.
pub const COMMAND_QUEUE_DEPTH: usize = 2;

// ============================================================================
// Actual speed register
// ============================================================================

/// Writer half of the actual-speed register.
///
/// Owned by the speed estimator; no other task may write the register.
pub struct SpeedShare {
    tx: watch::Sender<f32>,
}

impl SpeedShare {
    /// Overwrite the register with a new signed RPM value.
    pub fn publish(&self, rpm: f32) {
        self.tx.send_replace(rpm);
    }

    /// Create another reader handle.
    pub fn subscribe(&self) -> SpeedReader {
        SpeedReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reader half of the actual-speed register.
///
/// Cheap to clone; this is also the telemetry boundary: an external
/// sink polls [`latest`](Self::latest) at its own cadence with no
/// back-pressure on the control core.
#[derive(Clone)]
pub struct SpeedReader {
    rx: watch::Receiver<f32>,
}

impl SpeedReader {
    /// Read the most recent value. Never blocks; returns the initial
    /// zero before the first edge has been observed.
    pub fn latest(&self) -> f32 {
        *self.rx.borrow()
    }

    /// Wait for the next publish and return it. Returns `None` if the
    /// writer half has been dropped.
    pub async fn updated(&mut self) -> Option<f32> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Create the actual-speed register, initialized to 0 RPM.
pub fn speed_share() -> (SpeedShare, SpeedReader) {
    let (tx, rx) = watch::channel(0.0);
    (SpeedShare { tx }, SpeedReader { rx })
}

// ============================================================================
// Edge capture
// ============================================================================

/// Producer handle for the edge-timestamp channel, held by the interrupt
/// (or the platform layer that registers one).
///
/// This is a context-passing registration: the interrupt handler
/// captures this handle at setup instead of routing through a global
/// instance pointer.
#[derive(Clone)]
pub struct EdgeCapture {
    tx: mpsc::Sender<u32>,
}

impl EdgeCapture {
    /// Record one rising-edge timestamp. Non-blocking and allocation
    /// free, the only operation permitted in interrupt context.
    ///
    /// Returns `false` when the channel was full and the timestamp was
    /// dropped.
    pub fn on_edge(&self, timestamp_us: u32) -> bool {
        self.tx.try_send(timestamp_us).is_ok()
    }
}

/// Create the edge-timestamp channel (capacity [`EDGE_QUEUE_DEPTH`]).
pub fn edge_channel() -> (EdgeCapture, mpsc::Receiver<u32>) {
    let (tx, rx) = mpsc::channel(EDGE_QUEUE_DEPTH);
    (EdgeCapture { tx }, rx)
}

// ============================================================================
// Command channels
// ============================================================================

/// Create the speed-command channel (signed RPM targets, capacity
/// [`COMMAND_QUEUE_DEPTH`]). Fed by the torque integrator or directly by
/// an external command source.
pub fn speed_command_channel() -> (mpsc::Sender<f32>, mpsc::Receiver<f32>) {
    mpsc::channel(COMMAND_QUEUE_DEPTH)
}

/// Create the torque-command channel (signed N·m, capacity
/// [`COMMAND_QUEUE_DEPTH`]). Fed by an external command source.
pub fn torque_command_channel() -> (mpsc::Sender<f32>, mpsc::Receiver<f32>) {
    mpsc::channel(COMMAND_QUEUE_DEPTH)
}
