//! Activation tracking
//!
//! Decides, from the stream of executed instructions, whether execution is
//! currently inside the target method's dynamic extent.

mod tracker;

pub use tracker::ActivationTracker;

/// Whether the probe is currently counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivationState {
    /// Outside the target method; object events are ignored
    #[default]
    Inactive,

    /// Inside the target method; object events are counted
    Active,
}

impl ActivationState {
    /// Is this the counting state?
    pub fn is_active(self) -> bool {
        matches!(self, ActivationState::Active)
    }
}
