//! Behavior state machine: Patrol, Chase and Return.
//!
//! All state changes go through [`BehaviorMachine::transition_to`], which
//! rejects edges outside the graph:
//!
//! ```text
//! Patrol -> Chase -> Return -> Patrol
//!             ^         |
//!             +---------+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use warden_common::{distance, Vec3};

use crate::patrol::PatrolRoute;

/// Behavior state machine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BehaviorError {
    /// Edge not in the transition graph
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: BehaviorState,
        /// Requested state
        to: BehaviorState,
    },
}

/// Result type for behavior operations.
pub type BehaviorResult<T> = Result<T, BehaviorError>;

/// Behavioral mode of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Walking the patrol route
    #[default]
    Patrol,
    /// Pursuing the target
    Chase,
    /// Heading back to the route after losing the target
    Return,
}

impl BehaviorState {
    /// Returns whether `next` is reachable from this state in one step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Patrol, Self::Chase)
                | (Self::Chase, Self::Return)
                | (Self::Return, Self::Patrol)
                | (Self::Return, Self::Chase)
        )
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Patrol => "Patrol",
            Self::Chase => "Chase",
            Self::Return => "Return",
        };
        f.write_str(name)
    }
}

/// What the patrol step wants the agent to do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatrolDirective {
    /// No usable route; stand still
    Hold,
    /// Walk to a waypoint
    MoveTo(Vec3),
    /// Waiting at a waypoint
    Wait,
}

/// Behavior bookkeeping for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorMachine {
    state: BehaviorState,
    /// Index of the waypoint being walked to
    pub current_patrol_index: usize,
    /// Ping-pong direction
    pub is_moving_forward: bool,
    /// Whether the agent is waiting at a waypoint
    pub waiting_at_point: bool,
    /// When the current wait started
    pub wait_start: f32,
    /// Last time the target was known to be detected
    pub last_target_seen: f32,
    /// Where the target was last known to be
    pub last_known_target_position: Option<Vec3>,
    /// Spawn position
    pub original_position: Vec3,
    /// Destination while returning
    pub return_anchor: Vec3,
}

impl BehaviorMachine {
    /// Creates a machine in Patrol for an agent spawned at `position`.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self {
            state: BehaviorState::Patrol,
            current_patrol_index: 0,
            is_moving_forward: true,
            waiting_at_point: false,
            wait_start: 0.0,
            last_target_seen: 0.0,
            last_known_target_position: None,
            original_position: position,
            return_anchor: position,
        }
    }

    /// Active state.
    #[must_use]
    pub const fn state(&self) -> BehaviorState {
        self.state
    }

    /// Moves to `next`, applying the entry actions of the new state.
    ///
    /// Entering Chase stamps `last_target_seen`. Entering Return picks the
    /// return anchor. Entering Patrol resumes from the nearest waypoint.
    pub fn transition_to(
        &mut self,
        next: BehaviorState,
        route: Option<&PatrolRoute>,
        position: Vec3,
        now: f32,
    ) -> BehaviorResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(BehaviorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        match next {
            BehaviorState::Chase => {
                self.last_target_seen = now;
                self.waiting_at_point = false;
            },
            BehaviorState::Return => {
                self.return_anchor = self.anchor_for(route, position);
            },
            BehaviorState::Patrol => {
                if let Some(route) = route.filter(|r| r.is_valid()) {
                    self.current_patrol_index = route.nearest_index(position);
                }
                self.waiting_at_point = false;
            },
        }

        self.state = next;
        Ok(())
    }

    /// Nearest waypoint when the route is usable, else the spawn position.
    #[must_use]
    pub fn anchor_for(&self, route: Option<&PatrolRoute>, position: Vec3) -> Vec3 {
        route
            .filter(|r| r.is_valid())
            .and_then(|r| r.point_at(r.nearest_index(position)))
            .map_or(self.original_position, |point| point.position)
    }

    /// Returns whether the agent has reached the return anchor.
    #[must_use]
    pub fn has_returned(&self, position: Vec3, tolerance: f32) -> bool {
        distance(position, self.return_anchor) <= tolerance
    }

    /// Returns whether the target has been out of mind for longer than `delay`.
    #[must_use]
    pub fn target_lost(&self, now: f32, delay: f32) -> bool {
        now - self.last_target_seen > delay
    }

    /// Advances the patrol walk and says what to do this tick.
    ///
    /// On arrival the agent waits for the waypoint's wait time, then advances,
    /// reversing first at the ends of a ping-pong route.
    pub fn patrol_directive(
        &mut self,
        route: Option<&PatrolRoute>,
        position: Vec3,
        tolerance: f32,
        now: f32,
    ) -> PatrolDirective {
        let Some(route) = route.filter(|r| r.is_valid()) else {
            return PatrolDirective::Hold;
        };
        self.current_patrol_index = route.clamp_index(self.current_patrol_index);
        let Some(point) = route.point_at(self.current_patrol_index).copied() else {
            return PatrolDirective::Hold;
        };

        if self.waiting_at_point {
            if now - self.wait_start < point.wait_time {
                return PatrolDirective::Wait;
            }
            self.waiting_at_point = false;
            self.advance(route);
            return route
                .point_at(self.current_patrol_index)
                .filter(|p| p.is_resolvable())
                .map_or(PatrolDirective::Hold, |p| PatrolDirective::MoveTo(p.position));
        }

        if !point.is_resolvable() {
            self.advance(route);
            return PatrolDirective::Hold;
        }

        if distance(position, point.position) <= tolerance {
            self.waiting_at_point = true;
            self.wait_start = now;
            return PatrolDirective::Wait;
        }

        PatrolDirective::MoveTo(point.position)
    }

    fn advance(&mut self, route: &PatrolRoute) {
        if route.should_reverse(self.current_patrol_index, self.is_moving_forward) {
            self.is_moving_forward = !self.is_moving_forward;
        }
        self.current_patrol_index = route.next_index(self.current_patrol_index, self.is_moving_forward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patrol::Waypoint;

    fn route() -> PatrolRoute {
        PatrolRoute::new(
            vec![
                Waypoint::new(Vec3::new(0.0, 0.0, 0.0), 1.0),
                Waypoint::new(Vec3::new(10.0, 0.0, 0.0), 0.0),
                Waypoint::new(Vec3::new(20.0, 0.0, 0.0), 2.0),
            ],
            false,
        )
    }

    #[test]
    fn test_transition_graph() {
        use BehaviorState::{Chase, Patrol, Return};
        assert!(Patrol.can_transition_to(Chase));
        assert!(Chase.can_transition_to(Return));
        assert!(Return.can_transition_to(Patrol));
        assert!(Return.can_transition_to(Chase));
        assert!(!Patrol.can_transition_to(Return));
        assert!(!Chase.can_transition_to(Patrol));
        assert!(!Patrol.can_transition_to(Patrol));
    }

    #[test]
    fn test_rejected_transition_keeps_state() {
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        let err = machine
            .transition_to(BehaviorState::Return, None, Vec3::ZERO, 0.0)
            .expect_err("patrol cannot return");
        assert_eq!(
            err,
            BehaviorError::InvalidTransition {
                from: BehaviorState::Patrol,
                to: BehaviorState::Return
            }
        );
        assert_eq!(err.to_string(), "invalid transition from Patrol to Return");
        assert_eq!(machine.state(), BehaviorState::Patrol);
    }

    #[test]
    fn test_chase_entry_stamps_time() {
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        machine
            .transition_to(BehaviorState::Chase, None, Vec3::ZERO, 4.0)
            .expect("valid");
        assert_eq!(machine.last_target_seen, 4.0);
        assert!(!machine.target_lost(7.0, 3.0));
        assert!(machine.target_lost(7.5, 3.0));
    }

    #[test]
    fn test_return_anchor_nearest_waypoint_or_spawn() {
        let route = route();
        let spawn = Vec3::new(5.0, 0.0, 5.0);
        let mut machine = BehaviorMachine::new(spawn);
        machine.transition_to(BehaviorState::Chase, Some(&route), spawn, 0.0).expect("valid");
        machine
            .transition_to(BehaviorState::Return, Some(&route), Vec3::new(18.0, 0.0, 3.0), 1.0)
            .expect("valid");
        assert_eq!(machine.return_anchor, Vec3::new(20.0, 0.0, 0.0));

        let mut lone = BehaviorMachine::new(spawn);
        lone.transition_to(BehaviorState::Chase, None, spawn, 0.0).expect("valid");
        lone.transition_to(BehaviorState::Return, None, Vec3::ZERO, 1.0).expect("valid");
        assert_eq!(lone.return_anchor, spawn);
        assert!(lone.has_returned(Vec3::new(5.2, 0.0, 5.0), 0.5));
    }

    #[test]
    fn test_patrol_entry_resets_to_nearest() {
        let route = route();
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        machine.waiting_at_point = true;
        machine.transition_to(BehaviorState::Chase, Some(&route), Vec3::ZERO, 0.0).expect("valid");
        machine.transition_to(BehaviorState::Return, Some(&route), Vec3::new(11.0, 0.0, 0.0), 1.0).expect("valid");
        machine.waiting_at_point = true;
        machine.transition_to(BehaviorState::Patrol, Some(&route), Vec3::new(10.2, 0.0, 0.0), 2.0).expect("valid");
        assert_eq!(machine.current_patrol_index, 1);
        assert!(!machine.waiting_at_point);
    }

    #[test]
    fn test_patrol_holds_without_route() {
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        assert_eq!(machine.patrol_directive(None, Vec3::ZERO, 0.5, 0.0), PatrolDirective::Hold);
        let empty = PatrolRoute::default();
        assert_eq!(machine.patrol_directive(Some(&empty), Vec3::ZERO, 0.5, 0.0), PatrolDirective::Hold);
    }

    #[test]
    fn test_patrol_waits_then_advances() {
        let route = route();
        let mut machine = BehaviorMachine::new(Vec3::ZERO);

        // Arrive at waypoint 0 (wait 1s)
        assert_eq!(machine.patrol_directive(Some(&route), Vec3::ZERO, 0.5, 0.0), PatrolDirective::Wait);
        assert!(machine.waiting_at_point);
        assert_eq!(machine.patrol_directive(Some(&route), Vec3::ZERO, 0.5, 0.5), PatrolDirective::Wait);

        // Wait elapsed: head to waypoint 1
        assert_eq!(
            machine.patrol_directive(Some(&route), Vec3::ZERO, 0.5, 1.0),
            PatrolDirective::MoveTo(Vec3::new(10.0, 0.0, 0.0))
        );
        assert_eq!(machine.current_patrol_index, 1);
        assert!(!machine.waiting_at_point);
    }

    #[test]
    fn test_patrol_reverses_at_end() {
        let route = route();
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        machine.current_patrol_index = 2;
        let end = Vec3::new(20.0, 0.0, 0.0);

        assert_eq!(machine.patrol_directive(Some(&route), end, 0.5, 0.0), PatrolDirective::Wait);
        assert_eq!(
            machine.patrol_directive(Some(&route), end, 0.5, 2.0),
            PatrolDirective::MoveTo(Vec3::new(10.0, 0.0, 0.0))
        );
        assert!(!machine.is_moving_forward);
        assert_eq!(machine.current_patrol_index, 1);
    }

    #[test]
    fn test_patrol_index_is_clamped() {
        let route = route();
        let mut machine = BehaviorMachine::new(Vec3::ZERO);
        machine.current_patrol_index = 40;
        assert_eq!(
            machine.patrol_directive(Some(&route), Vec3::ZERO, 0.5, 0.0),
            PatrolDirective::MoveTo(Vec3::new(20.0, 0.0, 0.0))
        );
        assert_eq!(machine.current_patrol_index, 2);
    }
}
