//! The three scheduled tasks of the control core.
//!
//! Each task is a plain `async fn` over the channel halves and hardware
//! handles it needs, so a binary (or a test) decides the wiring and the
//! runtime. The shape of the pipeline:
//!
//! ```text
//! interrupt --edges--> read_actual_task --SpeedShare--+--> telemetry
//!                                                     |
//! torque source --torques--> setpoint_task <----------+
//!                                 |                   |
//!                              speed cmds             |
//!                                 v                   |
//!                         speed_control_task <--------+
//!                                 |
//!                              Drv8308
//! ```
//!
//! `read_actual_task` and `setpoint_task` run until their input channel
//! closes. `speed_control_task` additionally returns early on a hardware
//! error, carrying it out for the binary to report.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config::ControlConfig;
use crate::control::{MotorAction, SpeedControl};
use crate::driver::{Drv8308, Drv8308Error};
use crate::estimator::SpeedEstimator;
use crate::integrator::TorqueIntegrator;
use crate::shares::{SpeedReader, SpeedShare};
use crate::traits::{Clock, ControlPins, Delay, DirectionSense, SpiBus, WaveOutput};

/// Turn captured rising-edge timestamps into signed speed measurements.
///
/// Blocks on the edge channel, so measurement latency is one edge, not
/// one poll interval. Each timestamp is paired with the direction pin as
/// read *now*; during the brief window of a reversal the sign can lag
/// one edge, which the deadband absorbs. Runs until every [`EdgeCapture`]
/// handle is dropped.
///
/// [`EdgeCapture`]: crate::shares::EdgeCapture
pub async fn read_actual_task<C, S>(
    clock: C,
    mut edges: mpsc::Receiver<u32>,
    direction: S,
    speed: SpeedShare,
) where
    C: Clock,
    S: DirectionSense,
{
    // Seed with "now" so the first real edge measures a plausible
    // interval instead of one against timestamp zero.
    let mut estimator = SpeedEstimator::new(clock.now_us());

    while let Some(edge_us) = edges.recv().await {
        if let Some(rpm) = estimator.process_edge(edge_us, direction.direction()) {
            speed.publish(rpm);
        }
    }
}

/// Turn torque commands into speed commands by integrating over the
/// wheel's moment of inertia.
///
/// Blocks on the torque channel; each command is integrated against the
/// measured speed and the wall clock, then forwarded as a speed target.
/// Runs until the torque channel closes or the speed-command consumer
/// goes away.
pub async fn setpoint_task<C>(
    clock: C,
    mut torques: mpsc::Receiver<f32>,
    actual: SpeedReader,
    commands: mpsc::Sender<f32>,
    config: ControlConfig,
) where
    C: Clock,
{
    let mut integrator = TorqueIntegrator::new(config.inertia_kg_m2, config.max_speed_rpm);

    while let Some(torque_nm) = torques.recv().await {
        let target_rpm = integrator.step(torque_nm, actual.latest(), clock.now_ms());
        if commands.send(target_rpm).await.is_err() {
            return;
        }
    }
}

/// Run the speed control state machine against the chip driver.
///
/// In `Idle` the task blocks on the speed-command channel; in every
/// other state it re-evaluates at the configured poll interval, reading
/// the measured speed and the direction pin fresh each iteration. The
/// actions a transition emits are applied to the driver in order.
///
/// Returns `Ok(())` when the command channel closes (the machine parks
/// wherever it is; the chip holds its last pin and waveform state), or
/// the first hardware error otherwise.
pub async fn speed_control_task<B, P, W, D>(
    mut driver: Drv8308<B, P, W, D>,
    mut commands: mpsc::Receiver<f32>,
    actual: SpeedReader,
    config: ControlConfig,
) -> Result<(), Drv8308Error<B, P, W>>
where
    B: SpiBus,
    P: ControlPins,
    W: WaveOutput,
    D: Delay,
{
    let mut control = SpeedControl::new(config.deadband_rpm);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    loop {
        let actions = if control.is_idle() {
            match commands.recv().await {
                Some(command_rpm) => {
                    let direction = driver.read_direction()?;
                    control.on_command(command_rpm, actual.latest(), direction)
                }
                None => return Ok(()),
            }
        } else {
            sleep(poll_interval).await;
            let direction = driver.read_direction()?;
            control.poll(actual.latest(), direction)
        };

        for action in actions {
            match action {
                MotorAction::CommandSpeed(rpm) => driver.command_speed(rpm)?,
                MotorAction::Brake => driver.brake()?,
                MotorAction::Unbrake => driver.unbrake()?,
                MotorAction::SetDirection(direction) => driver.set_direction(direction)?,
            }
        }
    }
}
