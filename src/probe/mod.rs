//! Memory-growth probe
//!
//! A [`GoalProbe`] pairs an [`ActivationTracker`] with a
//! [`MemoryAccumulator`] and is registered with the host for exactly one
//! check. [`GoalProbe::begin`] arms it and hands back a [`ProbeHandle`];
//! [`GoalProbe::end`] consumes the handle, unregisters the probe and
//! evaluates the growth limit.
//!
//! The probe assumes the target method runs on a single monitored thread for
//! the duration of a check. Two threads executing the target concurrently
//! interleave their instructions and corrupt the activation interval.

mod goal;

pub use goal::{InvocationOutcome, MemoryGoal, TestContext};

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::accounting::{AccumulatedCounters, GrowthProfile, MemoryAccumulator};
use crate::activation::{ActivationState, ActivationTracker};
use crate::host::{ExecutionListener, HostEngine, HostError, ListenerId, MethodIdentity, MethodRef};
use crate::ProbeError;

/// Configuration for a memory goal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Default growth limit in bytes, used when a check names none
    pub max_growth_bytes: i64,

    /// Collect a [`GrowthProfile`] alongside the counters
    pub profile_growth: bool,
}

impl ProbeConfig {
    /// Set the default growth limit.
    pub fn with_max_growth(mut self, max_growth_bytes: i64) -> Self {
        self.max_growth_bytes = max_growth_bytes;
        self
    }

    /// Enable growth profiling.
    pub fn with_growth_profiling(mut self, enabled: bool) -> Self {
        self.profile_growth = enabled;
        self
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalResult {
    /// Allocated minus freed bytes inside the interval
    pub net_allocated_bytes: i64,

    /// Whether `net_allocated_bytes <= max_growth_bytes`
    pub passed: bool,

    /// Limit the check was evaluated against
    pub max_growth_bytes: i64,

    /// Final totals
    pub counters: AccumulatedCounters,

    /// Profile (if enabled)
    pub profile: Option<GrowthProfile>,
}

impl GoalResult {
    /// Single-line report.
    pub fn report(&self) -> String {
        let mut line = format!(
            "{} net={}B limit={}B allocated={}B/{} freed={}B/{}",
            if self.passed { "PASS" } else { "FAIL" },
            self.net_allocated_bytes,
            self.max_growth_bytes,
            self.counters.allocated_bytes,
            self.counters.allocation_count,
            self.counters.freed_bytes,
            self.counters.deallocation_count,
        );
        if let Some(profile) = &self.profile {
            line.push(' ');
            line.push_str(&profile.report());
        }
        line
    }
}

/// Serial numbers for probes, unique within the process.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Proof that a probe is registered with a host.
///
/// Not `Clone`: ending a probe consumes its handle. The handle remembers the
/// serial of the probe it armed, so it only ends that probe even when another
/// host reuses the same [`ListenerId`].
#[derive(Debug)]
pub struct ProbeHandle {
    listener: ListenerId,
    target: MethodIdentity,
    serial: u64,
}

impl ProbeHandle {
    /// Host registration backing this probe.
    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    /// Method being measured.
    pub fn target(&self) -> MethodIdentity {
        self.target
    }
}

/// Listener that measures heap growth across one target method.
#[derive(Debug)]
pub struct GoalProbe {
    tracker: ActivationTracker,
    accumulator: MemoryAccumulator,
    serial: u64,
}

impl GoalProbe {
    /// Build an unregistered probe for `target`.
    pub fn new(target: MethodIdentity, config: &ProbeConfig) -> Self {
        Self {
            tracker: ActivationTracker::new(target),
            accumulator: MemoryAccumulator::new(config.profile_growth),
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Resolve a harness method reference through the host.
    pub fn resolve<H: HostEngine + ?Sized>(
        host: &H,
        method: &MethodRef,
    ) -> Result<MethodIdentity, ProbeError> {
        host.resolve_method(method)
            .ok_or(ProbeError::MissingMethodIdentity(*method))
    }

    /// Arm a probe for `target` with default configuration.
    pub fn begin<H: HostEngine + ?Sized>(
        host: &mut H,
        target: MethodIdentity,
    ) -> Result<ProbeHandle, ProbeError> {
        Self::begin_with_config(host, target, &ProbeConfig::default())
    }

    /// Arm a probe for `target` and register it with `host`.
    pub fn begin_with_config<H: HostEngine + ?Sized>(
        host: &mut H,
        target: MethodIdentity,
        config: &ProbeConfig,
    ) -> Result<ProbeHandle, ProbeError> {
        let probe = Box::new(Self::new(target, config));
        let serial = probe.serial;
        let listener = host.add_listener(probe).map_err(ProbeError::ArmingFailure)?;
        debug!(method = %target, %listener, serial, "memory probe armed");
        Ok(ProbeHandle {
            listener,
            target,
            serial,
        })
    }

    /// Unregister the probe behind `handle` and compare its net growth with
    /// `max_growth_bytes`.
    ///
    /// The registration is checked before it is removed. A handle that names
    /// a missing listener, a listener that is not a probe, or a probe armed
    /// through another handle fails with [`ProbeError::InvalidState`] and
    /// leaves the host untouched.
    pub fn end<H: HostEngine + ?Sized>(
        host: &mut H,
        handle: ProbeHandle,
        max_growth_bytes: i64,
    ) -> Result<GoalResult, ProbeError> {
        Self::check_registration(&*host, &handle)?;

        let listener = host.remove_listener(handle.listener).map_err(|err| match err {
            HostError::UnknownListener(id) => {
                ProbeError::InvalidState(format!("probe {} is not registered", id))
            }
            other => ProbeError::InvalidState(other.to_string()),
        })?;
        let mut probe = listener.into_any().downcast::<GoalProbe>().map_err(|_| {
            ProbeError::InvalidState(format!(
                "{} is not a memory probe",
                handle.listener
            ))
        })?;

        if probe.tracker.is_active() {
            debug!(method = %handle.target, "probe disarmed inside an open interval");
        }

        let net_allocated_bytes = probe.accumulator.net_allocated_bytes();
        let passed = net_allocated_bytes <= max_growth_bytes;
        let result = GoalResult {
            net_allocated_bytes,
            passed,
            max_growth_bytes,
            counters: probe.accumulator.counters(),
            profile: probe.accumulator.take_profile(),
        };

        if passed {
            debug!(method = %handle.target, net = net_allocated_bytes, "memory goal met");
        } else {
            warn!(
                method = %handle.target,
                net = net_allocated_bytes,
                limit = max_growth_bytes,
                "memory goal exceeded"
            );
        }
        Ok(result)
    }

    fn check_registration<H: HostEngine + ?Sized>(
        host: &H,
        handle: &ProbeHandle,
    ) -> Result<(), ProbeError> {
        let listener = host.listener(handle.listener).ok_or_else(|| {
            ProbeError::InvalidState(format!("probe {} is not registered", handle.listener))
        })?;
        let probe = listener.as_any().downcast_ref::<GoalProbe>().ok_or_else(|| {
            ProbeError::InvalidState(format!("{} is not a memory probe", handle.listener))
        })?;
        if probe.serial != handle.serial || probe.tracker.target() != handle.target {
            return Err(ProbeError::InvalidState(format!(
                "{} holds a different probe than the one armed for {}",
                handle.listener, handle.target
            )));
        }
        Ok(())
    }

    /// Current activation state.
    pub fn state(&self) -> ActivationState {
        self.tracker.state()
    }

    /// Running totals.
    pub fn counters(&self) -> AccumulatedCounters {
        self.accumulator.counters()
    }

    /// Net growth so far.
    pub fn net_allocated_bytes(&self) -> i64 {
        self.accumulator.net_allocated_bytes()
    }
}

impl ExecutionListener for GoalProbe {
    fn on_object_created(&mut self, size_bytes: u64) {
        trace!(size_bytes, state = ?self.tracker.state(), "object created");
        self.accumulator.on_object_created(self.tracker.state(), size_bytes);
    }

    fn on_object_released(&mut self, size_bytes: u64) {
        trace!(size_bytes, state = ?self.tracker.state(), "object released");
        self.accumulator.on_object_released(self.tracker.state(), size_bytes);
    }

    fn on_instruction(&mut self, owner: MethodIdentity, is_return: bool) {
        let before = self.tracker.state();
        let after = self.tracker.on_instruction(owner, is_return);
        if before != after {
            debug!(method = %self.tracker.target(), ?after, "activation changed");
            if after.is_active() {
                self.accumulator.note_activation();
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
