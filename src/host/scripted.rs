//! In-memory host engine driven by explicit calls
//!
//! `ScriptedHost` stands in for an instrumented virtual machine. It does not
//! interpret anything: callers tell it which instructions ran and which
//! objects were created or released, and it pushes the matching events to
//! every registered listener in registration order.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::{
    ExecutionEvent, ExecutionListener, HostEngine, HostError, ListenerId, MethodIdentity,
    MethodRef,
};

/// Handle to an object living in the host's object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Scriptable host that records methods, live objects and listeners.
pub struct ScriptedHost {
    /// Method names in definition order; the index is the raw identity
    method_names: Vec<String>,

    /// Name lookup for idempotent definitions
    methods_by_name: HashMap<String, MethodRef>,

    /// Live objects and the byte size attributed to each
    objects: HashMap<ObjectId, u64>,
    next_object: u64,

    /// Registered listeners, in delivery order
    listeners: Vec<(ListenerId, Box<dyn ExecutionListener>)>,
    next_listener: u64,

    /// Refuse registrations beyond this many listeners
    listener_limit: Option<usize>,

    /// Number of events pushed so far
    delivered: u64,
}

impl fmt::Debug for ScriptedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedHost")
            .field("methods", &self.method_names)
            .field("live_objects", &self.objects.len())
            .field(
                "listeners",
                &self.listeners.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            )
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self {
            method_names: Vec::new(),
            methods_by_name: HashMap::new(),
            objects: HashMap::new(),
            next_object: 0,
            listeners: Vec::new(),
            next_listener: 0,
            listener_limit: None,
            delivered: 0,
        }
    }

    /// Reject registrations once `limit` listeners are attached.
    pub fn with_listener_limit(mut self, limit: usize) -> Self {
        self.listener_limit = Some(limit);
        self
    }

    /// Define a method, or return the existing reference for `name`.
    ///
    /// At most `u32::MAX + 1` methods fit; defining one more fails with
    /// [`HostError::MethodTableFull`].
    pub fn define_method(&mut self, name: &str) -> Result<MethodRef, HostError> {
        if let Some(&method) = self.methods_by_name.get(name) {
            return Ok(method);
        }
        let method = method_ref_at(self.method_names.len())?;
        self.method_names.push(name.to_string());
        self.methods_by_name.insert(name.to_string(), method);
        Ok(method)
    }

    /// Look up a previously defined method.
    pub fn method(&self, name: &str) -> Option<MethodRef> {
        self.methods_by_name.get(name).copied()
    }

    /// Name of a defined method.
    pub fn method_name(&self, method: MethodRef) -> Option<&str> {
        self.method_names
            .get(method.raw() as usize)
            .map(String::as_str)
    }

    /// Execute a non-return instruction owned by `method`.
    pub fn execute(&mut self, method: MethodRef) -> Result<(), HostError> {
        let owner = self.identity(method)?;
        self.deliver(ExecutionEvent::InstructionExecuted {
            owner,
            is_return: false,
        });
        Ok(())
    }

    /// Execute a return instruction owned by `method`.
    pub fn return_from(&mut self, method: MethodRef) -> Result<(), HostError> {
        let owner = self.identity(method)?;
        self.deliver(ExecutionEvent::InstructionExecuted {
            owner,
            is_return: true,
        });
        Ok(())
    }

    /// Run `body` as one invocation of `method`: an entry instruction, the
    /// body's own events, then a return instruction.
    pub fn call<R>(
        &mut self,
        method: MethodRef,
        body: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, HostError> {
        self.execute(method)?;
        let out = body(self);
        self.return_from(method)?;
        Ok(out)
    }

    /// Create an object of `size_bytes` and announce it.
    pub fn allocate(&mut self, size_bytes: u64) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(id, size_bytes);
        self.deliver(ExecutionEvent::ObjectCreated { size_bytes });
        id
    }

    /// Release a live object; its size comes from the object table.
    pub fn release(&mut self, object: ObjectId) -> Result<u64, HostError> {
        let size_bytes = self
            .objects
            .remove(&object)
            .ok_or(HostError::UnknownObject(object))?;
        self.deliver(ExecutionEvent::ObjectReleased { size_bytes });
        Ok(size_bytes)
    }

    /// Size the host attributes to a live object.
    pub fn object_size(&self, object: ObjectId) -> Option<u64> {
        self.objects.get(&object).copied()
    }

    /// Total bytes held by live objects.
    pub fn live_bytes(&self) -> u64 {
        self.objects
            .values()
            .fold(0u64, |total, size| total.saturating_add(*size))
    }

    /// Push an event to every registered listener.
    pub fn deliver(&mut self, event: ExecutionEvent) {
        trace!(?event, listeners = self.listeners.len(), "delivering event");
        self.delivered += 1;
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_event(&event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of events delivered so far.
    pub fn delivered_events(&self) -> u64 {
        self.delivered
    }

    fn identity(&self, method: MethodRef) -> Result<MethodIdentity, HostError> {
        self.resolve_method(&method)
            .ok_or(HostError::UnknownMethod(method))
    }
}

impl HostEngine for ScriptedHost {
    fn add_listener(
        &mut self,
        listener: Box<dyn ExecutionListener>,
    ) -> Result<ListenerId, HostError> {
        if let Some(limit) = self.listener_limit {
            if self.listeners.len() >= limit {
                return Err(HostError::ListenerRejected(format!(
                    "listener limit {} reached",
                    limit
                )));
            }
        }
        let id = ListenerId::from_raw(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        Ok(id)
    }

    fn remove_listener(
        &mut self,
        id: ListenerId,
    ) -> Result<Box<dyn ExecutionListener>, HostError> {
        let idx = self
            .listeners
            .iter()
            .position(|(registered, _)| *registered == id)
            .ok_or(HostError::UnknownListener(id))?;
        Ok(self.listeners.remove(idx).1)
    }

    fn listener(&self, id: ListenerId) -> Option<&dyn ExecutionListener> {
        self.listeners
            .iter()
            .find(|(registered, _)| *registered == id)
            .map(|(_, listener)| listener.as_ref())
    }

    fn resolve_method(&self, method: &MethodRef) -> Option<MethodIdentity> {
        ((method.raw() as usize) < self.method_names.len())
            .then(|| MethodIdentity::from_raw(method.raw()))
    }
}

fn method_ref_at(index: usize) -> Result<MethodRef, HostError> {
    u32::try_from(index)
        .map(MethodRef::from_raw)
        .map_err(|_| HostError::MethodTableFull(index))
}
