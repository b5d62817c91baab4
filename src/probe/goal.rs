//! Harness-facing memory goal
//!
//! A test harness calls [`MemoryGoal::pre_check`] before invoking the method
//! under test and [`MemoryGoal::post_check`] afterwards. The armed probe's
//! handle lives in the harness-owned [`TestContext`] between the two calls.

use std::fmt;

use tracing::{debug, info, warn};

use super::{GoalProbe, GoalResult, ProbeConfig, ProbeHandle};
use crate::host::{HostEngine, MethodRef};
use crate::ProbeError;

/// How the invocation under test finished.
///
/// Carried through for logging only; growth is measured the same way either
/// way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The method returned normally.
    Returned,

    /// The method raised; the payload describes the exception.
    Raised(String),
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Returned => write!(f, "returned"),
            InvocationOutcome::Raised(exception) => write!(f, "raised {}", exception),
        }
    }
}

/// Per-check state owned by the harness.
#[derive(Debug, Default)]
pub struct TestContext {
    handle: Option<ProbeHandle>,
    last_result: Option<GoalResult>,
}

impl TestContext {
    /// Fresh context with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a probe currently armed through this context?
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Handle of the armed probe, if any.
    pub fn handle(&self) -> Option<&ProbeHandle> {
        self.handle.as_ref()
    }

    /// Result of the most recent completed check.
    pub fn last_result(&self) -> Option<&GoalResult> {
        self.last_result.as_ref()
    }
}

/// Goal asserting that a method grows the heap by at most a byte limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryGoal {
    config: ProbeConfig,
}

impl MemoryGoal {
    /// Create a goal with the given configuration.
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Goal configuration.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Arm a probe for `method`. Always `Ok(true)` once armed.
    pub fn pre_check<H: HostEngine + ?Sized>(
        &self,
        host: &mut H,
        ctx: &mut TestContext,
        method: &MethodRef,
    ) -> Result<bool, ProbeError> {
        if let Some(handle) = &ctx.handle {
            return Err(ProbeError::InvalidState(format!(
                "context already armed for {}",
                handle.target()
            )));
        }
        let target = GoalProbe::resolve(&*host, method)?;
        let handle = GoalProbe::begin_with_config(host, target, &self.config)?;
        debug!(%method, %target, "memory goal pre-check");
        ctx.handle = Some(handle);
        Ok(true)
    }

    /// Disarm the probe in `ctx` and report whether growth stayed within
    /// `max_growth_bytes`.
    pub fn post_check<H: HostEngine + ?Sized>(
        &self,
        host: &mut H,
        ctx: &mut TestContext,
        method: &MethodRef,
        outcome: &InvocationOutcome,
        max_growth_bytes: i64,
    ) -> Result<bool, ProbeError> {
        let handle = ctx.handle.take().ok_or_else(|| {
            ProbeError::InvalidState(format!("post-check for {} without pre-check", method))
        })?;

        match host.resolve_method(method) {
            Some(identity) if identity == handle.target() => {}
            other => warn!(
                %method,
                resolved = ?other,
                armed = %handle.target(),
                "post-check method differs from the armed target"
            ),
        }

        let result = GoalProbe::end(host, handle, max_growth_bytes)?;
        info!(%method, %outcome, "{}", result.report());
        let passed = result.passed;
        ctx.last_result = Some(result);
        Ok(passed)
    }

    /// [`post_check`](Self::post_check) against the configured default limit.
    pub fn post_check_default<H: HostEngine + ?Sized>(
        &self,
        host: &mut H,
        ctx: &mut TestContext,
        method: &MethodRef,
        outcome: &InvocationOutcome,
    ) -> Result<bool, ProbeError> {
        self.post_check(host, ctx, method, outcome, self.config.max_growth_bytes)
    }
}
