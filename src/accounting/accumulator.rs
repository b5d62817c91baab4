//! Byte and object counting gated on activation

use super::{AccumulatedCounters, GrowthProfile};
use crate::activation::ActivationState;

/// Accumulates allocations and releases seen while the tracker is active.
#[derive(Debug)]
pub struct MemoryAccumulator {
    counters: AccumulatedCounters,

    /// Profile data (if enabled)
    profile: Option<GrowthProfile>,
}

impl MemoryAccumulator {
    /// Create an empty accumulator.
    pub fn new(profile_enabled: bool) -> Self {
        Self {
            counters: AccumulatedCounters::default(),
            profile: profile_enabled.then(GrowthProfile::default),
        }
    }

    /// Count an object creation if `state` is active.
    pub fn on_object_created(&mut self, state: ActivationState, size_bytes: u64) {
        if !state.is_active() {
            self.note_ignored();
            return;
        }
        self.counters.allocation_count = self.counters.allocation_count.saturating_add(1);
        self.counters.allocated_bytes = self.counters.allocated_bytes.saturating_add(size_bytes);
        self.update_peak();
    }

    /// Count an object release if `state` is active.
    pub fn on_object_released(&mut self, state: ActivationState, size_bytes: u64) {
        if !state.is_active() {
            self.note_ignored();
            return;
        }
        self.counters.deallocation_count = self.counters.deallocation_count.saturating_add(1);
        self.counters.freed_bytes = self.counters.freed_bytes.saturating_add(size_bytes);
    }

    /// Record that the activation interval opened.
    pub fn note_activation(&mut self) {
        if let Some(ref mut p) = self.profile {
            p.activations = p.activations.saturating_add(1);
        }
    }

    /// Net growth so far. Only final once a full interval has closed.
    pub fn net_allocated_bytes(&self) -> i64 {
        self.counters.net_allocated_bytes()
    }

    /// Snapshot of the running totals.
    pub fn counters(&self) -> AccumulatedCounters {
        self.counters
    }

    /// Take profile (leaves profiling disabled)
    pub fn take_profile(&mut self) -> Option<GrowthProfile> {
        self.profile.take()
    }

    fn note_ignored(&mut self) {
        if let Some(ref mut p) = self.profile {
            p.ignored_events = p.ignored_events.saturating_add(1);
        }
    }

    fn update_peak(&mut self) {
        let net = self.counters.net_allocated_bytes();
        if let Some(ref mut p) = self.profile {
            p.peak_net_bytes = p.peak_net_bytes.max(net);
        }
    }
}
