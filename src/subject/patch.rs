//! Reversible patching of a subject's member bindings.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::{Binding, BindingKind, Subject};
use crate::error::Result;
use crate::invocation::Args;

/// Where a patched member sends its calls: `(member, args) -> result`.
pub type Forward = Arc<dyn Fn(&str, Args) -> Result<Value> + Send + Sync>;

/// The binding a capture will put back. Shared with [`CAPTURES`] so that a
/// capture sitting below another one can hand its original upward.
type Slot = Arc<Mutex<Option<Binding>>>;

/// Every live capture, across all stacks and subjects.
///
/// When an entry is restored while another stack has already patched over
/// its shim, the capture holding that shim takes over the entry's original
/// instead. Restores may then happen in any order and the subject still ends
/// up with its true original.
static CAPTURES: Mutex<Vec<Weak<Mutex<Option<Binding>>>>> = Mutex::new(Vec::new());

fn track(slot: &Slot) {
    let mut captures = CAPTURES.lock();
    captures.retain(|weak| weak.strong_count() > 0);
    captures.push(Arc::downgrade(slot));
}

/// Replace `shim` with `original` in whichever live capture holds it.
fn hand_over(shim: &Binding, original: Option<Binding>) -> bool {
    let captures = CAPTURES.lock();
    for slot in captures.iter().filter_map(Weak::upgrade) {
        let mut held = slot.lock();
        if held.as_ref() == Some(shim) {
            *held = original;
            return true;
        }
    }
    false
}

/// One captured member: its original binding and how the shim treats receivers.
#[derive(Debug, Clone)]
pub struct PatchEntry {
    member: String,
    original: Slot,
    shim: Option<Binding>,
    strip_receiver: bool,
}

impl PatchEntry {
    /// The patched member.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The binding restoring this entry puts back, `None` if the member was
    /// absent.
    #[must_use]
    pub fn original(&self) -> Option<Binding> {
        self.original.lock().clone()
    }

    /// Whether the shim drops a leading receiver argument before forwarding.
    #[must_use]
    pub fn strips_receiver(&self) -> bool {
        self.strip_receiver
    }

    fn shim_kind(&self) -> BindingKind {
        self.original().map_or(BindingKind::Free, |b| b.kind())
    }
}

/// LIFO record of the bindings a mock replaced on its subject.
///
/// Capturing the same member twice stacks two entries, so restoring walks
/// back through every intermediate state to the true original.
/// All operations are no-ops for [`Subject::Synthetic`].
#[derive(Debug, Default)]
pub struct PatchStack {
    entries: Vec<PatchEntry>,
}

impl PatchStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the subject's current own binding for `member`.
    ///
    /// The receiver policy of the future shim is fixed here: it strips a
    /// leading receiver only for class-like subjects whose original binding
    /// is instance- or class-bound.
    pub fn capture(&mut self, subject: &Subject, member: &str) {
        let Subject::Real(real) = subject else {
            return;
        };
        let original = real.binding(member);
        let strip_receiver = original
            .as_ref()
            .is_some_and(|b| b.kind().takes_receiver(real.kind()));
        tracing::debug!(
            subject = %real.name(),
            member,
            absent = original.is_none(),
            strip_receiver,
            "captured binding"
        );
        let slot = Arc::new(Mutex::new(original));
        track(&slot);
        self.entries.push(PatchEntry {
            member: member.to_string(),
            original: slot,
            shim: None,
            strip_receiver,
        });
    }

    /// Replace `member` on the subject with a shim that calls `forward`.
    ///
    /// Uses the most recent capture of `member`. Returns `false` if the
    /// member was never captured or the subject is synthetic.
    pub fn install(&mut self, subject: &Subject, member: &str, forward: Forward) -> bool {
        let Subject::Real(real) = subject else {
            return false;
        };
        let Some(entry) = self.entries.iter_mut().rev().find(|e| e.member == member) else {
            tracing::warn!(subject = %real.name(), member, "install without capture");
            return false;
        };

        let strip_receiver = entry.strip_receiver;
        let name = entry.member.clone();
        let shim = Binding::new(entry.shim_kind(), move |mut args: Args| {
            if strip_receiver {
                args.shift();
            }
            forward(&name, args)
        });
        real.set_binding(member, shim.clone());
        entry.shim = Some(shim);
        tracing::debug!(subject = %real.name(), member, "installed shim");
        true
    }

    /// Capture and install in one step.
    pub fn patch(&mut self, subject: &Subject, member: &str, forward: Forward) -> bool {
        self.capture(subject, member);
        self.install(subject, member, forward)
    }

    /// Put every captured binding back, newest first.
    ///
    /// Members that were absent are removed again. If another stack has
    /// patched over one of this stack's shims, the subject is left alone and
    /// that stack inherits the original instead. Returns how many entries
    /// were restored; calling it on an empty stack does nothing.
    pub fn restore_all(&mut self, subject: &Subject) -> usize {
        let Subject::Real(real) = subject else {
            self.entries.clear();
            return 0;
        };
        let restored = self.entries.len();
        while let Some(entry) = self.entries.pop() {
            let original = entry.original.lock().take();
            if let Some(shim) = &entry.shim {
                if real.binding(&entry.member).as_ref() != Some(shim) {
                    if hand_over(shim, original) {
                        tracing::debug!(subject = %real.name(), member = %entry.member, "handed original to covering patch");
                    } else {
                        tracing::warn!(subject = %real.name(), member = %entry.member, "shim replaced outside the mock, leaving member as is");
                    }
                    continue;
                }
            }
            match original {
                Some(binding) => real.set_binding(&entry.member, binding),
                None => real.remove_binding(&entry.member),
            }
            tracing::debug!(subject = %real.name(), member = %entry.member, "restored binding");
        }
        restored
    }

    /// Number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captured entries in installation order.
    #[must_use]
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::subject::{DynObject, Patchable};

    fn forward_to(tag: &'static str) -> Forward {
        Arc::new(move |member: &str, args: Args| Ok(Value::from(format!("{tag}:{member}{args}"))))
    }

    #[test]
    fn test_round_trip_restores_identity() {
        let original = Binding::free(|_| Ok(Value::from("real")));
        let obj = DynObject::new("obj").with_method("m", original.clone());
        let subject = Subject::real(obj.clone());

        let mut stack = PatchStack::new();
        assert!(stack.patch(&subject, "m", forward_to("mock")));
        assert_eq!(obj.invoke("m", args![1]).unwrap(), Value::from("mock:m(1)"));
        assert_ne!(obj.binding("m"), Some(original.clone()));

        assert_eq!(stack.restore_all(&subject), 1);
        assert_eq!(obj.binding("m"), Some(original));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_double_patch_unwinds_in_reverse() {
        let original = Binding::free(|_| Ok(Value::from("real")));
        let obj = DynObject::new("obj").with_method("m", original.clone());
        let subject = Subject::real(obj.clone());

        let mut stack = PatchStack::new();
        stack.patch(&subject, "m", forward_to("first"));
        stack.patch(&subject, "m", forward_to("second"));
        assert_eq!(stack.len(), 2);
        assert!(stack.entries()[1].original().is_some());
        assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from("second:m()"));

        stack.restore_all(&subject);
        assert_eq!(obj.binding("m"), Some(original));
    }

    #[test]
    fn test_absent_member_is_removed_again() {
        let obj = DynObject::new("obj");
        let subject = Subject::real(obj.clone());

        let mut stack = PatchStack::new();
        stack.patch(&subject, "ghost", forward_to("mock"));
        assert!(obj.has_member("ghost"));
        assert!(stack.entries()[0].original().is_none());

        stack.restore_all(&subject);
        assert!(!obj.has_member("ghost"));
    }

    #[test]
    fn test_receiver_policy() {
        let class = DynObject::class("Cls")
            .with_method("inst", Binding::instance(|_| Ok(Value::Null)))
            .with_method("cls", Binding::class(|_| Ok(Value::Null)))
            .with_method("stat", Binding::static_method(|_| Ok(Value::Null)));
        let subject = Subject::real(class.clone());

        let mut stack = PatchStack::new();
        stack.capture(&subject, "inst");
        stack.capture(&subject, "cls");
        stack.capture(&subject, "stat");
        stack.capture(&subject, "missing");
        let strips: Vec<bool> = stack.entries().iter().map(PatchEntry::strips_receiver).collect();
        assert_eq!(strips, vec![true, true, false, false]);
    }

    #[test]
    fn test_shim_strips_receiver_on_class() {
        let class = DynObject::class("Cls").with_method("inst", Binding::instance(|_| Ok(Value::Null)));
        let subject = Subject::real(class.clone());

        let mut stack = PatchStack::new();
        stack.patch(&subject, "inst", forward_to("mock"));
        assert_eq!(
            class.invoke("inst", args![7]).unwrap(),
            Value::from("mock:inst(7)")
        );
        assert_eq!(class.binding("inst").map(|b| b.kind()), Some(BindingKind::Instance));
    }

    #[test]
    fn test_synthetic_subject_is_untouched() {
        let mut stack = PatchStack::new();
        assert!(!stack.patch(&Subject::Synthetic, "m", forward_to("mock")));
        assert!(stack.is_empty());
        assert_eq!(stack.restore_all(&Subject::Synthetic), 0);
    }

    #[test]
    fn test_install_without_capture() {
        let obj = DynObject::new("obj");
        let mut stack = PatchStack::new();
        assert!(!stack.install(&Subject::real(obj.clone()), "m", forward_to("mock")));
        assert!(!obj.has_member("m"));
    }

    #[test]
    fn test_two_stacks_restore_in_either_order() {
        for lower_first in [true, false] {
            let original = Binding::free(|_| Ok(Value::from("real")));
            let obj = DynObject::new("obj").with_method("m", original.clone());
            let subject = Subject::real(obj.clone());

            let mut lower = PatchStack::new();
            let mut upper = PatchStack::new();
            lower.patch(&subject, "m", forward_to("lower"));
            upper.patch(&subject, "m", forward_to("upper"));
            assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from("upper:m()"));

            if lower_first {
                lower.restore_all(&subject);
                assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from("upper:m()"));
                upper.restore_all(&subject);
            } else {
                upper.restore_all(&subject);
                assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from("lower:m()"));
                lower.restore_all(&subject);
            }
            assert_eq!(obj.binding("m"), Some(original));
        }
    }

    #[test]
    fn test_out_of_order_restore_of_absent_member() {
        let obj = DynObject::new("obj");
        let subject = Subject::real(obj.clone());

        let mut lower = PatchStack::new();
        let mut upper = PatchStack::new();
        lower.patch(&subject, "ghost", forward_to("lower"));
        upper.patch(&subject, "ghost", forward_to("upper"));

        lower.restore_all(&subject);
        assert!(obj.has_member("ghost"));
        upper.restore_all(&subject);
        assert!(!obj.has_member("ghost"));
    }

    #[test]
    fn test_restore_all_is_idempotent() {
        let obj = DynObject::new("obj").with_method("m", Binding::free(|_| Ok(Value::Null)));
        let subject = Subject::real(obj);
        let mut stack = PatchStack::new();
        stack.patch(&subject, "m", forward_to("mock"));
        assert_eq!(stack.restore_all(&subject), 1);
        assert_eq!(stack.restore_all(&subject), 0);
    }
}
