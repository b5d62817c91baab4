//! Boundary with the instrumented execution engine
//!
//! The host is an external collaborator: it emits instruction and object
//! lifecycle events, keeps a set of registered listeners, and resolves
//! method references into comparable identities. Everything the probe needs
//! from it is captured by [`ExecutionListener`] and [`HostEngine`].

mod scripted;

pub use scripted::{ObjectId, ScriptedHost};

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Opaque, comparable token identifying a method inside the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodIdentity(u32);

impl MethodIdentity {
    /// Wrap a raw host identifier.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw host identifier.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

/// Host-side reference to a method, as handed over by a test harness.
///
/// A reference is only meaningful once the host resolves it with
/// [`HostEngine::resolve_method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef(u32);

impl MethodRef {
    /// Wrap a raw reference value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw reference value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref@{}", self.0)
    }
}

/// Registration token returned by [`HostEngine::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw registration number chosen by the host.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw registration number.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A single event pushed by the host. Consumed immediately, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// An instruction owned by `owner` finished executing.
    InstructionExecuted {
        /// Method that owns the executed instruction
        owner: MethodIdentity,
        /// Whether the instruction was a return instruction
        is_return: bool,
    },
    /// A heap object was created; the size is supplied by the host.
    ObjectCreated {
        /// Bytes attributed to the object
        size_bytes: u64,
    },
    /// A heap object was released; the size is supplied by the host.
    ObjectReleased {
        /// Bytes attributed to the object
        size_bytes: u64,
    },
}

/// Capabilities a host expects from anything it drives with events.
///
/// Delivery is synchronous and serialized: the host calls one method at a
/// time and waits for it to return before resuming the monitored program.
/// Listeners are not safe to drive from several monitored threads at once.
pub trait ExecutionListener: Any + Send {
    /// Called after the host creates an object of `size_bytes`.
    fn on_object_created(&mut self, size_bytes: u64);

    /// Called after the host releases an object of `size_bytes`.
    fn on_object_released(&mut self, size_bytes: u64);

    /// Called after an instruction owned by `owner` executes.
    fn on_instruction(&mut self, owner: MethodIdentity, is_return: bool);

    /// Route a tagged event to the matching capability method.
    fn on_event(&mut self, event: &ExecutionEvent) {
        match *event {
            ExecutionEvent::InstructionExecuted { owner, is_return } => {
                self.on_instruction(owner, is_return)
            }
            ExecutionEvent::ObjectCreated { size_bytes } => self.on_object_created(size_bytes),
            ExecutionEvent::ObjectReleased { size_bytes } => self.on_object_released(size_bytes),
        }
    }

    /// Inspect the concrete listener while it is still registered.
    fn as_any(&self) -> &dyn Any;

    /// Recover the concrete listener after it has been unregistered.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Registration and lookup primitives provided by the host.
pub trait HostEngine {
    /// Register a listener; the host starts delivering events to it.
    fn add_listener(&mut self, listener: Box<dyn ExecutionListener>)
        -> Result<ListenerId, HostError>;

    /// Unregister a listener and hand it back to the caller.
    fn remove_listener(&mut self, id: ListenerId)
        -> Result<Box<dyn ExecutionListener>, HostError>;

    /// Whether `id` is currently registered.
    fn has_listener(&self, id: ListenerId) -> bool {
        self.listener(id).is_some()
    }

    /// Borrow a registered listener without unregistering it.
    fn listener(&self, id: ListenerId) -> Option<&dyn ExecutionListener>;

    /// Turn a method reference into a comparable identity.
    fn resolve_method(&self, method: &MethodRef) -> Option<MethodIdentity>;
}

/// Failures reported by the host boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host refused to register another listener.
    #[error("listener rejected: {0}")]
    ListenerRejected(String),

    /// No listener is registered under this id.
    #[error("unknown listener {0}")]
    UnknownListener(ListenerId),

    /// The object is not live in the host's object table.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    /// The method reference does not resolve.
    #[error("unknown method {0}")]
    UnknownMethod(MethodRef),

    /// Every raw method reference is already in use.
    #[error("method table is full ({0} methods)")]
    MethodTableFull(usize),
}
