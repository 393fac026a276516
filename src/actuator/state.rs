//! Vent position state machine.

use serde::Serialize;

use crate::matter::units::{ANGLE_CLOSED, ANGLE_OPEN, clamp_angle};

/// Coarse vent state derived from the servo angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VentState {
    Open,
    Closed,
    Partial,
    Moving,
}

impl VentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VentState::Open => "open",
            VentState::Closed => "closed",
            VentState::Partial => "partial",
            VentState::Moving => "moving",
        }
    }

    pub fn from_angle(angle: u8) -> Self {
        match angle {
            ANGLE_CLOSED => VentState::Closed,
            ANGLE_OPEN => VentState::Open,
            _ => VentState::Partial,
        }
    }
}

/// Current and target servo angle, advanced one degree per step.
#[derive(Debug, Clone)]
pub struct VentStateMachine {
    current_angle: u8,
    target_angle: u8,
}

impl VentStateMachine {
    pub fn new(initial_angle: u8) -> Self {
        let angle = clamp_angle(initial_angle);
        Self {
            current_angle: angle,
            target_angle: angle,
        }
    }

    pub fn current_angle(&self) -> u8 {
        self.current_angle
    }

    pub fn target_angle(&self) -> u8 {
        self.target_angle
    }

    pub fn state(&self) -> VentState {
        if self.is_moving() {
            VentState::Moving
        } else {
            VentState::from_angle(self.current_angle)
        }
    }

    /// Set a new (clamped) target angle. Returns the angle the vent was at.
    pub fn set_target(&mut self, angle: u8) -> u8 {
        self.target_angle = clamp_angle(angle);
        self.current_angle
    }

    /// Advance one degree toward the target. Returns true if a step was taken.
    pub fn step(&mut self) -> bool {
        if self.current_angle < self.target_angle {
            self.current_angle += 1;
            true
        } else if self.current_angle > self.target_angle {
            self.current_angle -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_moving(&self) -> bool {
        self.current_angle != self.target_angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let sm = VentStateMachine::new(ANGLE_CLOSED);
        assert_eq!(sm.state(), VentState::Closed);
        assert!(!sm.is_moving());

        let sm = VentStateMachine::new(ANGLE_OPEN);
        assert_eq!(sm.state(), VentState::Open);
    }

    #[test]
    fn test_out_of_range_angles_clamp() {
        assert_eq!(VentStateMachine::new(0).current_angle(), ANGLE_CLOSED);
        assert_eq!(VentStateMachine::new(255).current_angle(), ANGLE_OPEN);

        let mut sm = VentStateMachine::new(120);
        sm.set_target(10);
        assert_eq!(sm.target_angle(), ANGLE_CLOSED);
    }

    #[test]
    fn test_steps_toward_target() {
        let mut sm = VentStateMachine::new(90);
        assert_eq!(sm.set_target(93), 90);
        assert_eq!(sm.state(), VentState::Moving);

        let mut steps = 0;
        while sm.step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(sm.current_angle(), 93);
        assert_eq!(sm.state(), VentState::Partial);
    }

    #[test]
    fn test_full_cycle() {
        let mut sm = VentStateMachine::new(ANGLE_CLOSED);
        sm.set_target(ANGLE_OPEN);
        while sm.step() {}
        assert_eq!(sm.state(), VentState::Open);

        sm.set_target(ANGLE_CLOSED);
        while sm.step() {}
        assert_eq!(sm.state(), VentState::Closed);
    }
}
