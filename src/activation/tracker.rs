//! Instruction-driven activation state machine

use super::ActivationState;
use crate::host::MethodIdentity;

/// Tracks entry into and exit from one target method.
///
/// Activation is structural: any instruction owned by the target opens the
/// interval, and the first return instruction owned by the target since
/// then closes it. There is no call-depth counter, so for a recursive
/// target the interval ends at the first return observed, which may belong
/// to an inner invocation rather than the outermost one.
///
/// An invocation that exits by throwing executes no return instruction; the
/// interval then stays open until the target next returns normally.
#[derive(Debug, Clone)]
pub struct ActivationTracker {
    target: MethodIdentity,
    state: ActivationState,

    /// Inactive -> Active edges seen so far
    activations: u64,
}

impl ActivationTracker {
    /// Create a tracker for `target`, starting inactive.
    pub fn new(target: MethodIdentity) -> Self {
        Self {
            target,
            state: ActivationState::Inactive,
            activations: 0,
        }
    }

    /// Apply one executed instruction and return the resulting state.
    pub fn on_instruction(&mut self, owner: MethodIdentity, is_return: bool) -> ActivationState {
        let owned = owner == self.target;
        self.state = match self.state {
            ActivationState::Inactive if owned => {
                self.activations = self.activations.saturating_add(1);
                ActivationState::Active
            }
            ActivationState::Active if owned && is_return => ActivationState::Inactive,
            unchanged => unchanged,
        };
        self.state
    }

    /// Current state.
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Is the tracker inside the target's extent?
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Method whose extent is tracked.
    pub fn target(&self) -> MethodIdentity {
        self.target
    }

    /// Number of times the interval has opened.
    pub fn activations(&self) -> u64 {
        self.activations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: MethodIdentity = MethodIdentity::from_raw(1);
    const OTHER: MethodIdentity = MethodIdentity::from_raw(2);

    #[test]
    fn test_any_owned_instruction_activates() {
        let mut tracker = ActivationTracker::new(TARGET);
        assert_eq!(tracker.on_instruction(OTHER, false), ActivationState::Inactive);
        assert_eq!(tracker.on_instruction(TARGET, false), ActivationState::Active);
        assert_eq!(tracker.activations(), 1);
    }

    #[test]
    fn test_owned_return_from_inactive_activates() {
        // Entry is only about ownership; a return seen while inactive still opens
        let mut tracker = ActivationTracker::new(TARGET);
        assert_eq!(tracker.on_instruction(TARGET, true), ActivationState::Active);
    }

    #[test]
    fn test_only_owned_return_deactivates() {
        let mut tracker = ActivationTracker::new(TARGET);
        tracker.on_instruction(TARGET, false);

        assert_eq!(tracker.on_instruction(OTHER, true), ActivationState::Active);
        assert_eq!(tracker.on_instruction(TARGET, false), ActivationState::Active);
        assert_eq!(tracker.on_instruction(TARGET, true), ActivationState::Inactive);
    }

    #[test]
    fn test_recursive_inner_return_closes_interval() {
        let mut tracker = ActivationTracker::new(TARGET);
        tracker.on_instruction(TARGET, false); // outer entry
        tracker.on_instruction(TARGET, false); // inner entry, no re-arm
        assert_eq!(tracker.activations(), 1);

        assert_eq!(tracker.on_instruction(TARGET, true), ActivationState::Inactive);
        // the outer body's next instruction re-opens a second interval
        assert_eq!(tracker.on_instruction(TARGET, false), ActivationState::Active);
        assert_eq!(tracker.activations(), 2);
    }

    #[test]
    fn test_unrelated_instructions_leave_inactive_tracker_alone() {
        let mut tracker = ActivationTracker::new(TARGET);
        for _ in 0..100 {
            tracker.on_instruction(OTHER, false);
            tracker.on_instruction(OTHER, true);
        }
        assert!(!tracker.is_active());
        assert_eq!(tracker.activations(), 0);
        assert_eq!(tracker.target(), TARGET);
    }

    #[test]
    fn test_activation_count_saturates() {
        let mut tracker = ActivationTracker::new(TARGET);
        tracker.activations = u64::MAX;
        tracker.on_instruction(TARGET, false);
        assert!(tracker.is_active());
        assert_eq!(tracker.activations(), u64::MAX);
    }
}
