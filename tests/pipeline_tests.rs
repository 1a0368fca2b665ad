//! Integration tests for the async task pipeline, run on a paused tokio
//! clock so the 10 ms poll cadence costs nothing and nothing is flaky.

use std::time::Duration;

use flywheel::config::{ControlConfig, DriverConfig};
use flywheel::hal::{MockClock, MockDelay, MockPins, MockSpi, MockWave};
use flywheel::shares::{edge_channel, speed_command_channel, speed_share, torque_command_channel};
use flywheel::tasks::{read_actual_task, setpoint_task, speed_control_task};
use flywheel::traits::ControlPins;
use flywheel::{Direction, Drv8308};

/// Poll a mock-observable condition under paused time.
async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let poll = async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

// === Edge pipeline ===

#[tokio::test(start_paused = true)]
async fn edges_become_signed_speed_in_the_share() {
    let clock = MockClock::new();
    let mut pins = MockPins::new();
    let (capture, edge_rx) = edge_channel();
    let (share, mut reader) = speed_share();

    tokio::spawn(read_actual_task(clock.clone(), edge_rx, pins.clone(), share));
    // Let the task start and seed its estimator at t=0
    tokio::task::yield_now().await;

    // One electrical period of 6 ms: 166.67 Hz, 2500 RPM forward
    clock.set_us(6_000);
    assert!(capture.on_edge(6_000));
    let rpm = reader.updated().await.unwrap();
    assert!((rpm - 2500.0).abs() < 0.5);

    // Same cadence with the direction pin reversed reads negative
    pins.set_direction(Direction::Reverse).unwrap();
    clock.set_us(12_000);
    assert!(capture.on_edge(12_000));
    let rpm = reader.updated().await.unwrap();
    assert!((rpm + 2500.0).abs() < 0.5);
}

#[tokio::test(start_paused = true)]
async fn duplicate_edge_timestamp_keeps_previous_value() {
    let clock = MockClock::new();
    let pins = MockPins::new();
    let (capture, edge_rx) = edge_channel();
    let (share, mut reader) = speed_share();

    tokio::spawn(read_actual_task(clock.clone(), edge_rx, pins.clone(), share));
    tokio::task::yield_now().await;

    clock.set_us(6_000);
    capture.on_edge(6_000);
    let first = reader.updated().await.unwrap();

    // A duplicate timestamp (zero interval) must be discarded, not
    // published as an infinite speed
    capture.on_edge(6_000);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reader.latest(), first);

    // The next distinct edge measures from the duplicate's timestamp
    clock.set_us(18_000);
    capture.on_edge(18_000);
    let rpm = reader.updated().await.unwrap();
    assert!((rpm - 1250.0).abs() < 0.5);
}

// === Torque setpoints ===

#[tokio::test(start_paused = true)]
async fn torque_commands_integrate_into_speed_targets() {
    let clock = MockClock::new();
    let (share, reader) = speed_share();
    let (torque_tx, torque_rx) = torque_command_channel();
    let (cmd_tx, mut cmd_rx) = speed_command_channel();

    tokio::spawn(setpoint_task(
        clock.clone(),
        torque_rx,
        reader,
        cmd_tx,
        ControlConfig::default(),
    ));

    // 0.1712 N·m over 100 ms at the default inertia: 100 rad/s² for
    // 0.1 s on a resting wheel is 10 rad/s, about 95.5 RPM
    clock.set_us(100_000);
    torque_tx.send(0.1712).await.unwrap();
    let target = cmd_rx.recv().await.unwrap();
    assert!((target - 95.493).abs() < 0.05);

    // Integration re-anchors on the measured speed, so zero torque
    // forwards the wheel's current speed unchanged
    share.publish(1000.0);
    clock.advance_ms(100);
    torque_tx.send(0.0).await.unwrap();
    let target = cmd_rx.recv().await.unwrap();
    assert!((target - 1000.0).abs() < 0.1);
}

#[tokio::test(start_paused = true)]
async fn tightened_speed_envelope_caps_setpoints() {
    let clock = MockClock::new();
    let (_share, reader) = speed_share();
    let (torque_tx, torque_rx) = torque_command_channel();
    let (cmd_tx, mut cmd_rx) = speed_command_channel();

    tokio::spawn(setpoint_task(
        clock.clone(),
        torque_rx,
        reader,
        cmd_tx,
        ControlConfig::default().with_max_speed_rpm(100.0),
    ));

    // A huge torque over a full second would integrate far past the
    // hardware limit; the configured envelope must bound it instead
    clock.advance_ms(1_000);
    torque_tx.send(1000.0).await.unwrap();
    let target = cmd_rx.recv().await.unwrap();
    assert!((target - 100.0).abs() < 0.01);
}

// === Control loop ===

#[tokio::test(start_paused = true)]
async fn speed_command_drives_waveform_and_settles() {
    let pins = MockPins::new();
    let wave = MockWave::new();
    let mut driver = Drv8308::new(MockSpi::new(), pins.clone(), wave.clone(), MockDelay::new());
    driver.init(&DriverConfig::default()).unwrap();

    let (share, reader) = speed_share();
    let (cmd_tx, cmd_rx) = speed_command_channel();
    let control = tokio::spawn(speed_control_task(
        driver,
        cmd_rx,
        reader,
        ControlConfig::default(),
    ));

    cmd_tx.send(300.0).await.unwrap();
    wait_for("waveform at 20 Hz", || {
        (wave.frequency_hz() - 20.0).abs() < 1e-3
    })
    .await;
    assert!(!pins.brake_engaged());

    // Wheel reaches the target; the loop settles back to blocking on
    // the command channel, which is what lets it terminate cleanly here
    share.publish(300.0);
    drop(cmd_tx);
    tokio::time::timeout(Duration::from_secs(5), control)
        .await
        .expect("control task did not settle")
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn reversal_brakes_through_zero_then_flips_direction() {
    let pins = MockPins::new();
    let wave = MockWave::new();
    let mut driver = Drv8308::new(MockSpi::new(), pins.clone(), wave.clone(), MockDelay::new());
    driver.init(&DriverConfig::default()).unwrap();

    let (share, reader) = speed_share();
    let (cmd_tx, cmd_rx) = speed_command_channel();
    let control = tokio::spawn(speed_control_task(
        driver,
        cmd_rx,
        reader,
        ControlConfig::default(),
    ));

    // Bring the wheel to +600 and let the machine settle
    cmd_tx.send(600.0).await.unwrap();
    wait_for("waveform at 40 Hz", || {
        (wave.frequency_hz() - 40.0).abs() < 1e-3
    })
    .await;
    share.publish(600.0);

    // Reverse: first the brake engages and the waveform drops to zero
    cmd_tx.send(-600.0).await.unwrap();
    wait_for("brake engaged with waveform flat", || {
        pins.brake_engaged() && wave.frequency_hz() == 0.0
    })
    .await;
    assert!(!pins.direction_level()); // still forward while braking

    // Wheel spins down; once strictly inside the deadband the machine
    // crosses: direction flips, brake releases, waveform restarts
    share.publish(250.0);
    share.publish(10.0);
    wait_for("direction reversed and re-commanded", || {
        pins.direction_level()
            && !pins.brake_engaged()
            && (wave.frequency_hz() - 40.0).abs() < 1e-3
    })
    .await;

    // Wheel comes up to speed in reverse and the loop settles
    share.publish(-600.0);
    drop(cmd_tx);
    tokio::time::timeout(Duration::from_secs(5), control)
        .await
        .expect("control task did not settle")
        .unwrap()
        .unwrap();
}
