//! Test helper functions for building hosts and scripted invocations

#![allow(dead_code)]
use memgoal::{GoalProbe, MethodIdentity, MethodRef, ScriptedHost};

/// Host with a single target method defined
pub fn host_with_target(name: &str) -> (ScriptedHost, MethodRef, MethodIdentity) {
    let mut host = ScriptedHost::new();
    let method = host.define_method(name).expect("method defines");
    let identity = GoalProbe::resolve(&host, &method).expect("defined method resolves");
    (host, method, identity)
}

/// One step of a scripted run
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Non-return instruction of the target
    Enter,
    /// Return instruction of the target
    Exit,
    /// Instruction of some other method
    Other { is_return: bool },
    /// Object created
    Alloc(u64),
    /// Most recent live object released
    FreeLast,
    /// Event with an explicit size, not tied to a live object
    Release(u64),
}

/// Apply steps to a host; `other` is any method distinct from the target
pub fn drive(host: &mut ScriptedHost, target: MethodRef, other: MethodRef, steps: &[Step]) {
    let mut live = Vec::new();
    for step in steps {
        match *step {
            Step::Enter => host.execute(target).unwrap(),
            Step::Exit => host.return_from(target).unwrap(),
            Step::Other { is_return: false } => host.execute(other).unwrap(),
            Step::Other { is_return: true } => host.return_from(other).unwrap(),
            Step::Alloc(size) => live.push(host.allocate(size)),
            Step::FreeLast => {
                if let Some(obj) = live.pop() {
                    host.release(obj).unwrap();
                }
            }
            Step::Release(size) => host.deliver(memgoal::ExecutionEvent::ObjectReleased {
                size_bytes: size,
            }),
        }
    }
}
