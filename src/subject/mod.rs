//! Real subjects that a mock can wrap and temporarily patch.
//!
//! Rust types cannot have their methods replaced at runtime, so a mock
//! reaches real behaviour in one of two ways:
//!
//! - Collaborators are consumed through [`Dispatch`], and a [`Mock`] is
//!   handed in wholesale where the real implementation would go.
//! - Objects that need in-place patching expose a method table through
//!   [`Patchable`]. [`DynObject`] is the ready-made implementation; the
//!   mock's [`PatchStack`] swaps its bindings for forwarding shims and puts
//!   the originals back afterwards.
//!
//! # Example
//!
//! ```rust
//! use testkit_double::{args, Mock, Value};
//! use testkit_double::subject::{Binding, DynObject};
//!
//! let clock = DynObject::new("clock")
//!     .with_method("now", Binding::free(|_| Ok(Value::from(1_000))));
//!
//! let mock = Mock::of(clock.clone());
//! mock.when("now").unwrap().invoke(args![]).unwrap().then_return(42);
//! assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(42));
//!
//! mock.unstub();
//! assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(1_000));
//! ```
//!
//! [`Mock`]: crate::Mock

mod object;
mod patch;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::invocation::Args;

pub use object::DynObject;
pub use patch::{Forward, PatchEntry, PatchStack};

/// Something that answers calls by member name.
///
/// Code under test that takes `&dyn Dispatch` accepts both a real
/// [`DynObject`] and a [`Mock`](crate::Mock).
pub trait Dispatch {
    /// Call `member` with `args`.
    ///
    /// # Errors
    ///
    /// Whatever the underlying implementation reports.
    fn dispatch(&self, member: &str, args: Args) -> Result<Value>;
}

/// Whether a subject behaves like a class or like an instance.
///
/// Calls made through a class-like subject pass the class itself as an
/// implicit leading receiver to instance- and class-bound methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    /// An ordinary object.
    Instance,
    /// A class-like object.
    Class,
}

/// How a method binding receives its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Bound to an instance; receives the receiver when called through a class.
    Instance,
    /// Bound to the class; receives the class as receiver.
    Class,
    /// A static method; never receives a receiver.
    Static,
    /// A context-free function stored on the object.
    Free,
}

impl BindingKind {
    /// Whether calls through a subject of `kind` pass an implicit receiver.
    #[must_use]
    pub fn takes_receiver(self, kind: SubjectKind) -> bool {
        kind == SubjectKind::Class && matches!(self, Self::Instance | Self::Class)
    }
}

type Method = Arc<dyn Fn(Args) -> Result<Value> + Send + Sync>;

/// A member's behaviour on a [`Patchable`] subject.
///
/// Bindings compare by identity: two bindings are equal only if they are
/// clones of the same binding.
#[derive(Clone)]
pub struct Binding {
    kind: BindingKind,
    method: Method,
}

impl Binding {
    /// Create a binding of the given kind.
    pub fn new<F>(kind: BindingKind, method: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            kind,
            method: Arc::new(method),
        }
    }

    /// An instance-bound method.
    pub fn instance<F>(method: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(BindingKind::Instance, method)
    }

    /// A class-bound method.
    pub fn class<F>(method: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(BindingKind::Class, method)
    }

    /// A static method.
    pub fn static_method<F>(method: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(BindingKind::Static, method)
    }

    /// A free function stored as a member.
    pub fn free<F>(method: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(BindingKind::Free, method)
    }

    /// The binding kind.
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Run the bound method.
    ///
    /// # Errors
    ///
    /// Whatever the method returns.
    pub fn call(&self, args: Args) -> Result<Value> {
        (self.method)(args)
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && Arc::ptr_eq(&self.method, &other.method)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind)
            .field("method", &Arc::as_ptr(&self.method).cast::<()>())
            .finish()
    }
}

/// An object whose member bindings can be read, replaced and removed.
///
/// `binding` reports only members the subject holds itself; members it
/// merely inherits report `None` but still count for `has_member`.
pub trait Patchable: Send + Sync {
    /// Human-readable name, used in diagnostics.
    fn name(&self) -> String;

    /// Whether the subject is class-like.
    fn kind(&self) -> SubjectKind;

    /// Whether the subject answers `member`, directly or by inheritance.
    fn has_member(&self, member: &str) -> bool;

    /// The subject's own binding for `member`.
    fn binding(&self, member: &str) -> Option<Binding>;

    /// Replace (or create) the own binding for `member`.
    fn set_binding(&self, member: &str, binding: Binding);

    /// Remove the own binding for `member`.
    fn remove_binding(&self, member: &str);
}

/// What a mock stands in for.
#[derive(Clone)]
pub enum Subject {
    /// An anonymous placeholder with no behaviour of its own.
    Synthetic,
    /// A real, externally owned object.
    Real(Arc<dyn Patchable>),
}

impl Subject {
    /// Wrap a real object.
    pub fn real<P: Patchable + 'static>(subject: P) -> Self {
        Self::Real(Arc::new(subject))
    }

    /// Whether this is a real subject.
    #[must_use]
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Synthetic => "synthetic subject".to_string(),
            Self::Real(subject) => subject.name(),
        }
    }

    /// Whether the subject answers `member`. Synthetic subjects answer everything.
    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        match self {
            Self::Synthetic => true,
            Self::Real(subject) => subject.has_member(member),
        }
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthetic => f.write_str("Synthetic"),
            Self::Real(subject) => f.debug_tuple("Real").field(&subject.name()).finish(),
        }
    }
}
