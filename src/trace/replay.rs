//! Replay a parsed trace against a scripted host

use std::collections::HashMap;
use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use super::{Directive, TraceLine};
use crate::host::{MethodRef, ObjectId, ScriptedHost};
use crate::probe::{GoalResult, InvocationOutcome, MemoryGoal, ProbeConfig, TestContext};

/// Outcome of one `check` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Trace line of the check
    pub line: usize,
    /// Method that was checked
    pub method: String,
    /// How the invocation finished
    pub outcome: InvocationOutcome,
    /// Goal evaluation
    pub result: GoalResult,
}

/// All checks performed by one replay, in trace order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Per-check results
    pub checks: Vec<CheckReport>,
}

impl ReplayReport {
    /// Did every check pass?
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.result.passed)
    }

    /// Number of failed checks.
    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|check| !check.result.passed).count()
    }
}

/// Drives a [`ScriptedHost`] and a [`MemoryGoal`] from trace directives.
#[derive(Debug)]
pub struct TraceReplay {
    host: ScriptedHost,
    goal: MemoryGoal,

    /// Harness contexts, one per armed method
    contexts: HashMap<String, TestContext>,

    /// Exceptions recorded for the next check of a method
    outcomes: HashMap<String, InvocationOutcome>,

    /// Live objects by trace label
    objects: HashMap<String, ObjectId>,
}

impl TraceReplay {
    /// Create a replay with the given goal configuration.
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            host: ScriptedHost::new(),
            goal: MemoryGoal::new(config),
            contexts: HashMap::new(),
            outcomes: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    /// Host state after (or during) the replay.
    pub fn host(&self) -> &ScriptedHost {
        &self.host
    }

    /// Run every directive in order.
    pub fn run(&mut self, lines: &[TraceLine]) -> Result<ReplayReport> {
        let mut report = ReplayReport::default();
        for line in lines {
            if let Some(check) = self
                .step(line)
                .with_context(|| format!("trace line {}", line.number))?
            {
                report.checks.push(check);
            }
        }

        let dangling: Vec<&str> = self
            .contexts
            .iter()
            .filter(|(_, ctx)| ctx.is_armed())
            .map(|(name, _)| name.as_str())
            .collect();
        if !dangling.is_empty() {
            debug!(?dangling, "trace ended with armed goals");
        }
        Ok(report)
    }

    fn step(&mut self, line: &TraceLine) -> Result<Option<CheckReport>> {
        match &line.directive {
            Directive::Arm(name) => {
                let method = self.host.define_method(name)?;
                let ctx = self.contexts.entry(name.clone()).or_default();
                self.goal.pre_check(&mut self.host, ctx, &method)?;
            }
            Directive::Exec(name) => {
                let method = self.host.define_method(name)?;
                self.host.execute(method)?;
            }
            Directive::Ret(name) => {
                let method = self.host.define_method(name)?;
                self.host.return_from(method)?;
            }
            Directive::New { label, size_bytes } => {
                if self.objects.contains_key(label) {
                    bail!("object '{}' is already live", label);
                }
                let object = self.host.allocate(*size_bytes);
                self.objects.insert(label.clone(), object);
            }
            Directive::Free(label) => {
                let object = self
                    .objects
                    .remove(label)
                    .ok_or_else(|| anyhow!("object '{}' is not live", label))?;
                self.host.release(object)?;
            }
            Directive::Raise { method, exception } => {
                self.outcomes
                    .insert(method.clone(), InvocationOutcome::Raised(exception.clone()));
            }
            Directive::Check {
                method: name,
                max_growth_bytes,
            } => {
                let method = self.host.define_method(name)?;
                return self.check(line.number, name, method, *max_growth_bytes).map(Some);
            }
        }
        Ok(None)
    }

    fn check(
        &mut self,
        line: usize,
        name: &str,
        method: MethodRef,
        max_growth_bytes: Option<i64>,
    ) -> Result<CheckReport> {
        let ctx = self
            .contexts
            .get_mut(name)
            .ok_or_else(|| anyhow!("`check {}` without a matching `arm`", name))?;
        let outcome = self
            .outcomes
            .remove(name)
            .unwrap_or(InvocationOutcome::Returned);
        let limit = max_growth_bytes.unwrap_or(self.goal.config().max_growth_bytes);

        self.goal
            .post_check(&mut self.host, ctx, &method, &outcome, limit)?;
        let result = ctx
            .last_result()
            .cloned()
            .ok_or_else(|| anyhow!("post-check for {} produced no result", name))?;

        Ok(CheckReport {
            line,
            method: name.to_string(),
            outcome,
            result,
        })
    }
}

/// Write one line per check.
pub fn write_report<W: Write>(writer: &mut W, report: &ReplayReport) -> Result<()> {
    for check in &report.checks {
        writeln!(
            writer,
            "{line}\t{method}\t{outcome}\t{result}",
            line = check.line,
            method = check.method,
            outcome = check.outcome,
            result = check.result.report()
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a report into a string (useful for tests and fingerprints).
pub fn render_report(report: &ReplayReport) -> Result<String> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, report)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered report is not valid UTF-8"))
}
