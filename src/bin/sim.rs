//! Desktop simulation of the complete control pipeline.
//!
//! Wires the three control tasks to the mock HAL plus a crude
//! first-order motor/flywheel model, then runs a short scripted
//! scenario: spin up, a few torque pulses, a full reversal, stop.
//!
//! Run with `cargo run --bin sim`.

use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use flywheel::config::Config;
use flywheel::hal::{MockClock, MockDelay, MockPins, MockSpi, MockWave};
use flywheel::shares::{
    edge_channel, speed_command_channel, speed_share, torque_command_channel, EdgeCapture,
    SpeedReader,
};
use flywheel::tasks::{read_actual_task, setpoint_task, speed_control_task};
use flywheel::traits::Clock;
use flywheel::units::RPM_PER_ELECTRICAL_HZ;
use flywheel::Drv8308;

/// Simulation tick; mock time advances in lockstep with real time.
const TICK: Duration = Duration::from_micros(500);

/// Spin-up time constant under the chip's internal loop, in seconds.
const MOTOR_TAU_S: f32 = 0.25;

/// Spin-down time constant with the brake engaged, in seconds.
const BRAKE_TAU_S: f32 = 0.08;

/// First-order stand-in for the motor, flywheel, and the chip's internal
/// loop: speed relaxes toward the commanded waveform frequency (or
/// toward zero under the brake), and hall edges come out at the
/// resulting electrical frequency.
async fn plant(clock: MockClock, pins: MockPins, wave: MockWave, edges: EdgeCapture) {
    let dt_s = TICK.as_secs_f32();
    let mut rpm = 0.0f32;
    let mut phase = 0.0f32;

    loop {
        sleep(TICK).await;
        clock.advance_us(TICK.as_micros() as u64);

        let magnitude = wave.frequency_hz() * RPM_PER_ELECTRICAL_HZ;
        let target = if pins.direction_level() {
            -magnitude
        } else {
            magnitude
        };

        if pins.brake_engaged() {
            rpm -= rpm * (dt_s / BRAKE_TAU_S);
        } else {
            rpm += (target - rpm) * (dt_s / MOTOR_TAU_S);
        }

        phase += rpm.abs() / RPM_PER_ELECTRICAL_HZ * dt_s;
        if phase >= 1.0 {
            phase -= 1.0;
            edges.on_edge(clock.now_us());
        }
    }
}

async fn watch(label: &str, reader: &SpeedReader, wave: &MockWave, pins: &MockPins, for_ms: u64) {
    for _ in 0..for_ms / 250 {
        sleep(Duration::from_millis(250)).await;
        println!(
            "[sim] {label:<10} actual {:+8.1} rpm   wave {:6.1} hz   brake {}",
            reader.latest(),
            wave.frequency_hz(),
            if pins.brake_engaged() { "on" } else { "off" },
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::default();

    let clock = MockClock::new();
    let pins = MockPins::new();
    let wave = MockWave::new();

    let mut driver = Drv8308::new(MockSpi::new(), pins.clone(), wave.clone(), MockDelay::new());
    let report = driver.init(&config.driver)?;
    println!(
        "[sim] chip setup {}",
        if report.is_clean() { "clean" } else { "MISMATCHED" }
    );

    let (capture, edge_rx) = edge_channel();
    let (speed_tx, speed_reader) = speed_share();
    let (cmd_tx, cmd_rx) = speed_command_channel();
    let (torque_tx, torque_rx) = torque_command_channel();

    let plant_task = tokio::spawn(plant(clock.clone(), pins.clone(), wave.clone(), capture));
    tokio::spawn(read_actual_task(
        clock.clone(),
        edge_rx,
        pins.clone(),
        speed_tx,
    ));
    tokio::spawn(setpoint_task(
        clock.clone(),
        torque_rx,
        speed_reader.clone(),
        cmd_tx.clone(),
        config.control.clone(),
    ));
    let control = tokio::spawn(speed_control_task(
        driver,
        cmd_rx,
        speed_reader.clone(),
        config.control.clone(),
    ));

    println!("[sim] commanding +900 rpm");
    cmd_tx.send(900.0).await?;
    watch("spin up", &speed_reader, &wave, &pins, 1500).await;

    println!("[sim] four torque pulses of +0.05 N·m");
    for _ in 0..4 {
        torque_tx.send(0.05).await?;
        watch("torque", &speed_reader, &wave, &pins, 250).await;
    }

    println!("[sim] reversing to -600 rpm");
    cmd_tx.send(-600.0).await?;
    watch("reversal", &speed_reader, &wave, &pins, 2500).await;

    println!("[sim] commanding stop");
    cmd_tx.send(0.0).await?;
    watch("stop", &speed_reader, &wave, &pins, 1500).await;

    // Closing the torque channel stops the setpoint task; once its
    // speed-command sender is gone too, the control task parks.
    drop(torque_tx);
    drop(cmd_tx);
    control.await??;
    plant_task.abort();

    println!("[sim] done");
    Ok(())
}
