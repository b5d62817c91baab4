//! # Memory-growth goals for instrumented virtual machines
//!
//! This library measures the net heap growth caused by one invocation of a
//! target method, using nothing but the events an instrumented execution
//! engine already emits: instruction executed, object created, object
//! released.
//!
//! ## Core Algorithm
//!
//! 1. **Activation tracking**: an instruction owned by the target opens the
//!    measurement interval; the first return owned by the target closes it
//! 2. **Gated accounting**: object events count only while the interval is
//!    open, summing allocated and freed bytes
//! 3. **Goal evaluation**: `allocated - freed <= max_growth` decides pass/fail
//!
//! ## Usage Example
//!
//! ```
//! use memgoal::{GoalProbe, ScriptedHost};
//!
//! let mut host = ScriptedHost::new();
//! let method = host.define_method("Cache.fill()")?;
//! let target = GoalProbe::resolve(&host, &method)?;
//!
//! let handle = GoalProbe::begin(&mut host, target)?;
//! host.call(method, |h| {
//!     h.allocate(100);
//!     h.allocate(50);
//! })?;
//! let result = GoalProbe::end(&mut host, handle, 200)?;
//!
//! assert_eq!(result.net_allocated_bytes, 150);
//! assert!(result.passed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules
pub mod activation; // Entry/exit detection
pub mod accounting; // Byte and object counters
pub mod host;       // Host engine boundary
pub mod probe;      // Probe composition and harness goal
pub mod trace;      // Event trace replay

// Re-exports for convenience
pub use accounting::{AccumulatedCounters, GrowthProfile, MemoryAccumulator};
pub use activation::{ActivationState, ActivationTracker};
pub use host::{
    ExecutionEvent, ExecutionListener, HostEngine, HostError, ListenerId, MethodIdentity,
    MethodRef, ObjectId, ScriptedHost,
};
pub use probe::{
    GoalProbe, GoalResult, InvocationOutcome, MemoryGoal, ProbeConfig, ProbeHandle, TestContext,
};

use thiserror::Error;

/// Errors raised while arming or evaluating a memory goal
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The host refused to register the probe
    #[error("failed to arm memory probe: {0}")]
    ArmingFailure(#[source] HostError),

    /// A probe was ended without being armed, or ended twice
    #[error("invalid probe state: {0}")]
    InvalidState(String),

    /// The host could not resolve the target method
    #[error("host cannot resolve method {0}")]
    MissingMethodIdentity(MethodRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ProbeError::ArmingFailure(HostError::ListenerRejected("full".into()));
        assert_eq!(err.to_string(), "failed to arm memory probe: listener rejected: full");

        let err = ProbeError::MissingMethodIdentity(MethodRef::from_raw(9));
        assert_eq!(err.to_string(), "host cannot resolve method ref@9");
    }
}
