//! Relay lifecycle state machine.
//!
//! # Valid Transitions
//!
//! - Uninitialized → Running (`Init`)
//! - Running → Draining (`Exit`)
//! - Draining → Terminated (worker finished the queue and tore down)
//! - Running → Uninitialized (worker thread failed to spawn)
//!
//! Anything else is rejected, which the entrypoint layer turns into an
//! ignored call.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Loaded, `Init` not yet called. Events are buffered.
    Uninitialized,
    /// Worker thread active.
    Running,
    /// `Exit` called; the worker drains the queue and stops.
    Draining,
    /// Worker loop has exited. Every entrypoint is ignored from here on.
    Terminated,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Uninitialized, Running)
                | (Running, Draining)
                | (Draining, Terminated)
                | (Running, Uninitialized)
        )
    }

    /// Whether new events may still be queued.
    pub fn accepts_events(self) -> bool {
        !matches!(self, LifecycleState::Terminated)
    }

    /// Whether the worker should keep looping once the queue is empty.
    pub fn keeps_worker_alive(self) -> bool {
        matches!(self, LifecycleState::Running)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move from {} to {}", self.from, self.to)
    }
}

/// Tracks the current state and applies checked transitions.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn transition_to(&mut self, next: LifecycleState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
