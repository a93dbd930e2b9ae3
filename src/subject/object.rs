//! `DynObject`, a live object with a replaceable method table.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::{Binding, Dispatch, Patchable, SubjectKind};
use crate::error::{Error, Result};
use crate::invocation::Args;

/// A live object whose behaviour is a table of named [`Binding`]s.
///
/// Members are looked up on the object first and then on its parent, so an
/// instance created with [`DynObject::instance_of`] inherits its class's
/// methods. Clones share the same table.
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Value};
/// use testkit_double::subject::{Binding, DynObject};
///
/// let greeter = DynObject::class("Greeter")
///     .with_method("greet", Binding::static_method(|args| {
///         Ok(Value::from(format!("hello {}", args.positional()[0].as_str().unwrap_or("?"))))
///     }));
///
/// let instance = DynObject::instance_of(&greeter, "greeter");
/// assert_eq!(instance.invoke("greet", args!["bob"]).unwrap(), Value::from("hello bob"));
/// ```
#[derive(Clone)]
pub struct DynObject {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    name: String,
    kind: SubjectKind,
    slots: Mutex<BTreeMap<String, Binding>>,
    parent: Option<DynObject>,
}

impl DynObject {
    /// Create an instance-like object with no members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), SubjectKind::Instance, None)
    }

    /// Create a class-like object with no members.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::build(name.into(), SubjectKind::Class, None)
    }

    /// Create an instance that inherits the members of `class`.
    #[must_use]
    pub fn instance_of(class: &DynObject, name: impl Into<String>) -> Self {
        Self::build(name.into(), SubjectKind::Instance, Some(class.clone()))
    }

    fn build(name: String, kind: SubjectKind, parent: Option<DynObject>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                name,
                kind,
                slots: Mutex::new(BTreeMap::new()),
                parent,
            }),
        }
    }

    /// Add a member, builder style.
    #[must_use]
    pub fn with_method(self, member: impl Into<String>, binding: Binding) -> Self {
        self.define(member, binding);
        self
    }

    /// Add or replace a member.
    pub fn define(&self, member: impl Into<String>, binding: Binding) {
        self.inner.slots.lock().insert(member.into(), binding);
    }

    /// Find the binding that answers `member`, following inheritance.
    #[must_use]
    pub fn resolve(&self, member: &str) -> Option<Binding> {
        let own = self.inner.slots.lock().get(member).cloned();
        own.or_else(|| self.inner.parent.as_ref().and_then(|p| p.resolve(member)))
    }

    /// Names of the object's own members.
    #[must_use]
    pub fn members(&self) -> Vec<String> {
        self.inner.slots.lock().keys().cloned().collect()
    }

    /// Call `member` with `args`.
    ///
    /// On a class-like object, instance- and class-bound methods receive
    /// the object's name as a leading receiver argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMember`] if nothing answers `member`, or
    /// whatever the bound method returns.
    pub fn invoke(&self, member: &str, mut args: Args) -> Result<Value> {
        let binding = self.resolve(member).ok_or_else(|| Error::MissingMember {
            subject: self.inner.name.clone(),
            member: member.to_string(),
        })?;
        if binding.kind().takes_receiver(self.inner.kind) {
            args.unshift(Value::from(self.inner.name.as_str()));
        }
        binding.call(args)
    }
}

impl Patchable for DynObject {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn kind(&self) -> SubjectKind {
        self.inner.kind
    }

    fn has_member(&self, member: &str) -> bool {
        self.resolve(member).is_some()
    }

    fn binding(&self, member: &str) -> Option<Binding> {
        self.inner.slots.lock().get(member).cloned()
    }

    fn set_binding(&self, member: &str, binding: Binding) {
        self.define(member, binding);
    }

    fn remove_binding(&self, member: &str) {
        self.inner.slots.lock().remove(member);
    }
}

impl Dispatch for DynObject {
    fn dispatch(&self, member: &str, args: Args) -> Result<Value> {
        self.invoke(member, args)
    }
}

impl fmt::Debug for DynObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynObject")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("members", &self.members())
            .field("parent", &self.inner.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn echo() -> Binding {
        Binding::instance(|args| Ok(Value::from(args.positional().to_vec())))
    }

    #[test]
    fn test_invoke_missing_member() {
        let obj = DynObject::new("obj");
        let err = obj.invoke("nope", args![]).unwrap_err();
        assert!(matches!(err, Error::MissingMember { ref member, .. } if member == "nope"));
    }

    #[test]
    fn test_class_passes_receiver() {
        let class = DynObject::class("Cls").with_method("echo", echo());
        assert_eq!(
            class.invoke("echo", args![1]).unwrap(),
            Value::from(vec![Value::from("Cls"), Value::from(1)])
        );
    }

    #[test]
    fn test_instance_does_not_pass_receiver() {
        let class = DynObject::class("Cls").with_method("echo", echo());
        let instance = DynObject::instance_of(&class, "obj");
        assert_eq!(
            instance.invoke("echo", args![1]).unwrap(),
            Value::from(vec![Value::from(1)])
        );
    }

    #[test]
    fn test_inherited_member_is_not_own_binding() {
        let class = DynObject::class("Cls").with_method("echo", echo());
        let instance = DynObject::instance_of(&class, "obj");
        assert!(instance.has_member("echo"));
        assert!(instance.binding("echo").is_none());
        assert!(class.binding("echo").is_some());
    }

    #[test]
    fn test_remove_binding_uncovers_parent() {
        let class = DynObject::class("Cls").with_method("v", Binding::free(|_| Ok(Value::from(1))));
        let instance = DynObject::instance_of(&class, "obj");
        instance.set_binding("v", Binding::free(|_| Ok(Value::from(2))));
        assert_eq!(instance.invoke("v", args![]).unwrap(), Value::from(2));
        instance.remove_binding("v");
        assert_eq!(instance.invoke("v", args![]).unwrap(), Value::from(1));
    }

    #[test]
    fn test_clones_share_table() {
        let a = DynObject::new("obj");
        let b = a.clone();
        a.define("x", Binding::free(|_| Ok(Value::Null)));
        assert_eq!(b.members(), vec!["x".to_string()]);
    }
}
