//! Speed control state machine.
//!
//! The DRV8308 has an internal control loop for acceleration but none
//! for deceleration, and a strictly on/off brake. This state machine is
//! the control authority that arbitrates between them: it accelerates
//! through the chip's loop when the command moves away from zero, brakes
//! when the command moves toward zero, and sequences a controlled
//! direction reversal through a near-zero deadband when the command
//! changes sign.
//!
//! The machine itself is pure: [`transition`] maps
//! `(state, command, actual, direction)` to a new state plus a bounded
//! list of [`MotorAction`]s, so every row of the transition table is unit
//! testable without hardware. [`SpeedControl`] wraps it with the
//! last-command bookkeeping the control task needs.
//!
//! # Example
//!
//! ```rust
//! use flywheel::control::{ControlState, MotorAction, SpeedControl};
//! use flywheel::Direction;
//!
//! let mut control = SpeedControl::new(20.0);
//! assert!(control.is_idle());
//!
//! // Spin up from rest: command straight through the chip's loop
//! let actions = control.on_command(600.0, 0.0, Direction::Forward);
//! assert_eq!(control.state(), ControlState::Accelerating);
//! assert_eq!(actions.as_slice(), &[MotorAction::CommandSpeed(600.0)]);
//!
//! // Within the deadband the machine settles back to idle
//! let actions = control.poll(585.0, Direction::Forward);
//! assert!(control.is_idle());
//! assert!(actions.is_empty());
//! ```

use heapless::Vec;

use crate::traits::Direction;
use crate::units::sign;

/// Maximum side effects a single transition can emit (a zero crossing
/// emits three).
pub const MAX_ACTIONS: usize = 4;

/// Side effects the control task applies to the chip driver, in order.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorAction {
    /// Drive the speed-command waveform at this RPM magnitude.
    CommandSpeed(f32),
    /// Engage the brake.
    Brake,
    /// Release the brake.
    Unbrake,
    /// Flip the direction pin.
    SetDirection(Direction),
}

/// Bounded list of side effects from one transition.
pub type Actions = Vec<MotorAction, MAX_ACTIONS>;

/// States of the speed control machine. There is no terminal state; the
/// control loop runs indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlState {
    /// Stable or stopped; blocks until the next speed command arrives.
    #[default]
    Idle,
    /// Speeding up under the chip's internal control loop.
    Accelerating,
    /// Braking down toward the command (or toward zero for a reversal).
    Decelerating,
    /// Near zero after braking from reverse; about to flip forward.
    CrossingNegToPos,
    /// Near zero after braking from forward; about to flip reverse.
    CrossingPosToNeg,
}

/// One evaluation of the transition table.
///
/// `command` is the pending (in `Idle`) or last-consumed speed command,
/// `actual` the current measured speed, `direction` the direction pin as
/// read this iteration. `deadband_rpm` is the tolerance inside which
/// command and actual count as equal, and inside which the wheel counts
/// as "near zero" for a reversal.
///
/// Sign convention: exactly zero is positive, so a command away from
/// rest never reads as a direction change.
pub fn transition(
    state: ControlState,
    command: f32,
    actual: f32,
    direction: Direction,
    deadband_rpm: f32,
) -> (ControlState, Actions) {
    let mut actions = Actions::new();
    let same_sign = sign(command) == sign(actual);

    let next = match state {
        ControlState::Idle => {
            // Six cases: larger/smaller magnitude within each sign, and a
            // sign change in either direction.
            if command > actual {
                if same_sign && direction == Direction::Forward {
                    // Positive to larger positive: the chip's loop handles it
                    push(&mut actions, MotorAction::CommandSpeed(command.abs()));
                    ControlState::Accelerating
                } else {
                    // Negative to smaller-magnitude negative, or negative to
                    // positive: brake down first
                    push(&mut actions, MotorAction::CommandSpeed(0.0));
                    push(&mut actions, MotorAction::Brake);
                    ControlState::Decelerating
                }
            } else if command < actual {
                if same_sign && direction == Direction::Reverse {
                    // Negative to larger-magnitude negative
                    push(&mut actions, MotorAction::CommandSpeed(command.abs()));
                    ControlState::Accelerating
                } else {
                    // Positive to smaller positive, or positive to negative
                    push(&mut actions, MotorAction::CommandSpeed(0.0));
                    push(&mut actions, MotorAction::Brake);
                    ControlState::Decelerating
                }
            } else {
                // Already there; stay idle and issue nothing
                ControlState::Idle
            }
        }

        ControlState::Accelerating => {
            if (actual - command).abs() <= deadband_rpm {
                ControlState::Idle
            } else {
                ControlState::Accelerating
            }
        }

        ControlState::Decelerating => {
            if same_sign {
                if (actual - command).abs() <= deadband_rpm {
                    // Unbrake before commanding: the chip ignores the
                    // speed waveform while braked
                    push(&mut actions, MotorAction::Unbrake);
                    push(&mut actions, MotorAction::CommandSpeed(command.abs()));
                    ControlState::Idle
                } else {
                    ControlState::Decelerating
                }
            } else if actual.abs() < deadband_rpm {
                match direction {
                    Direction::Reverse => ControlState::CrossingNegToPos,
                    Direction::Forward => ControlState::CrossingPosToNeg,
                }
            } else {
                ControlState::Decelerating
            }
        }

        ControlState::CrossingNegToPos => {
            push(&mut actions, MotorAction::SetDirection(Direction::Forward));
            push(&mut actions, MotorAction::Unbrake);
            push(&mut actions, MotorAction::CommandSpeed(command.abs()));
            ControlState::Accelerating
        }

        ControlState::CrossingPosToNeg => {
            push(&mut actions, MotorAction::SetDirection(Direction::Reverse));
            push(&mut actions, MotorAction::Unbrake);
            push(&mut actions, MotorAction::CommandSpeed(command.abs()));
            ControlState::Accelerating
        }
    };

    (next, actions)
}

// Actions is sized for the largest transition; overflow is unreachable.
fn push(actions: &mut Actions, action: MotorAction) {
    let _ = actions.push(action);
}

/// Stateful wrapper around [`transition`] for the control task.
///
/// Owns the current state and the last speed command. Never shared;
/// the control task is its only user.
pub struct SpeedControl {
    state: ControlState,
    command_rpm: f32,
    deadband_rpm: f32,
}

impl SpeedControl {
    /// Create a controller in `Idle` with a zero command.
    pub fn new(deadband_rpm: f32) -> Self {
        Self {
            state: ControlState::Idle,
            command_rpm: 0.0,
            deadband_rpm,
        }
    }

    /// Current state tag.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Last consumed speed command, in RPM.
    pub fn command(&self) -> f32 {
        self.command_rpm
    }

    /// True while the machine is waiting for the next speed command.
    pub fn is_idle(&self) -> bool {
        self.state == ControlState::Idle
    }

    /// Consume a freshly received speed command (only meaningful in
    /// `Idle`, where the control task blocks for one) and evaluate the
    /// table.
    pub fn on_command(&mut self, command: f32, actual: f32, direction: Direction) -> Actions {
        self.command_rpm = command;
        self.step(actual, direction)
    }

    /// Re-evaluate the table against the stored command. Called once per
    /// 10 ms poll while not idle.
    pub fn poll(&mut self, actual: f32, direction: Direction) -> Actions {
        self.step(actual, direction)
    }

    fn step(&mut self, actual: f32, direction: Direction) -> Actions {
        let (next, actions) =
            transition(self.state, self.command_rpm, actual, direction, self.deadband_rpm);
        self.state = next;
        actions
    }
}
