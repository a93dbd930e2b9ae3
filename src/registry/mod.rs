//! Process-wide registry of mocks for bulk teardown.
//!
//! Every mock built with the default configuration joins
//! [`Registry::global`]. The registry only holds weak references, so it
//! never keeps a mock alive; dead entries are pruned during sweeps.
//!
//! - [`Registry::reset_all`] / [`Registry::unstub_all`] sweep every live mock
//! - [`Registry::reset_current_thread`] / [`Registry::unstub_current_thread`]
//!   sweep only mocks created on the calling thread
//! - [`Teardown`] runs a thread-scoped sweep when dropped
//!
//! The thread-scoped sweeps exist because the test harness runs tests on
//! parallel threads; a global sweep from one test would strip the stubs of
//! another.
//!
//! # Example
//!
//! ```rust
//! use testkit_double::{args, Mock, Value};
//! use testkit_double::registry::{Teardown, TeardownScope};
//! use testkit_double::subject::{Binding, DynObject};
//!
//! let clock = DynObject::new("clock").with_method("now", Binding::free(|_| Ok(Value::from(0))));
//! {
//!     let _teardown = Teardown::new(TeardownScope::Unstub);
//!     let mock = Mock::of(clock.clone());
//!     mock.when("now").unwrap().invoke(args![]).unwrap().then_return(42);
//!     assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(42));
//! }
//! assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(0));
//! ```

use std::sync::Weak;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::mock::{Mock, MockInner};

struct Entry {
    mock: Weak<MockInner>,
    thread: ThreadId,
}

/// A set of weakly held mocks.
pub struct Registry {
    entries: Mutex<Vec<Entry>>,
}

static GLOBAL: Registry = Registry::new();

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Track `mock`, tagged with the calling thread.
    pub fn register(&self, mock: &Mock) {
        self.entries.lock().push(Entry {
            mock: mock.downgrade(),
            thread: thread::current().id(),
        });
    }

    /// Number of entries, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of registered mocks still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.mock.strong_count() > 0)
            .count()
    }

    /// Reset the history of every live mock. Returns how many were reset.
    pub fn reset_all(&self) -> usize {
        self.sweep(None, Mock::reset)
    }

    /// Unstub every live mock. Returns how many were swept.
    pub fn unstub_all(&self) -> usize {
        self.sweep(None, Mock::unstub)
    }

    /// Reset the live mocks created on the calling thread.
    pub fn reset_current_thread(&self) -> usize {
        self.sweep(Some(thread::current().id()), Mock::reset)
    }

    /// Unstub the live mocks created on the calling thread.
    pub fn unstub_current_thread(&self) -> usize {
        self.sweep(Some(thread::current().id()), Mock::unstub)
    }

    fn sweep(&self, thread: Option<ThreadId>, action: fn(&Mock)) -> usize {
        // Collect first: the action may patch subjects whose shims lock mocks.
        let targets: Vec<Mock> = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|entry| entry.mock.strong_count() > 0);
            let pruned = before - entries.len();
            if pruned > 0 {
                tracing::trace!(pruned, "pruned dropped mocks");
            }
            entries
                .iter()
                .filter(|entry| thread.map_or(true, |id| entry.thread == id))
                .filter_map(|entry| entry.mock.upgrade())
                .map(Mock::from_inner)
                .collect()
        };
        // Newest first, so stacked patches on a shared subject unwind in order.
        for mock in targets.iter().rev() {
            action(mock);
        }
        tracing::debug!(swept = targets.len(), thread_scoped = thread.is_some(), "registry sweep");
        targets.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.len())
            .field("live", &self.live_count())
            .finish()
    }
}

/// Reset every live mock in the global registry.
pub fn reset_all() -> usize {
    Registry::global().reset_all()
}

/// Unstub every live mock in the global registry.
pub fn unstub_all() -> usize {
    Registry::global().unstub_all()
}

/// What a [`Teardown`] does when dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownScope {
    /// Restore patched subjects and drop stubs.
    #[default]
    Unstub,
    /// Clear recorded calls.
    Reset,
    /// Both.
    All,
}

/// Sweeps the mocks of the current thread in the global registry on drop.
///
/// Used by `#[testkit_double::test]`; runs on every exit path, including
/// a panicking test.
#[derive(Debug)]
#[must_use = "teardown runs as soon as the guard is dropped"]
pub struct Teardown {
    scope: TeardownScope,
}

impl Teardown {
    /// Create a guard with the given scope.
    pub fn new(scope: TeardownScope) -> Self {
        Self { scope }
    }

    /// The scope this guard sweeps with.
    #[must_use]
    pub fn scope(&self) -> TeardownScope {
        self.scope
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        let registry = Registry::global();
        if matches!(self.scope, TeardownScope::Unstub | TeardownScope::All) {
            registry.unstub_current_thread();
        }
        if matches!(self.scope, TeardownScope::Reset | TeardownScope::All) {
            registry.reset_current_thread();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::subject::{Binding, DynObject, Patchable};
    use serde_json::Value;

    fn unregistered(subject: &DynObject) -> Mock {
        Mock::builder().subject(subject.clone()).register(false).build()
    }

    #[test]
    fn test_registry_holds_weak_references() {
        let registry = Registry::new();
        let mock = Mock::builder().register(false).build();
        registry.register(&mock);
        assert_eq!(registry.live_count(), 1);

        drop(mock);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.reset_all(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unstub_all_restores_subjects() {
        let registry = Registry::new();
        let obj = DynObject::new("obj").with_method("m", Binding::free(|_| Ok(Value::from(1))));
        let first = unregistered(&obj);
        let second = Mock::builder().register(false).build();
        registry.register(&first);
        registry.register(&second);

        first.when("m").unwrap().invoke(args![]).unwrap().then_return(2);
        second.when("x").unwrap().invoke(args![]).unwrap();
        assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from(2));

        assert_eq!(registry.unstub_all(), 2);
        assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from(1));
        assert_eq!(second.stub_count(), 0);
    }

    #[test]
    fn test_unstub_all_with_two_mocks_on_one_subject() {
        let registry = Registry::new();
        let original = Binding::free(|_| Ok(Value::from("real")));
        let obj = DynObject::new("obj").with_method("m", original.clone());
        let first = unregistered(&obj);
        let second = unregistered(&obj);
        registry.register(&first);
        registry.register(&second);

        first.when("m").unwrap().invoke(args![]).unwrap().then_return(1);
        second.when("m").unwrap().invoke(args![]).unwrap().then_return(2);
        assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from(2));

        assert_eq!(registry.unstub_all(), 2);
        assert_eq!(obj.binding("m"), Some(original));
        assert_eq!(obj.invoke("m", args![]).unwrap(), Value::from("real"));
    }

    #[test]
    fn test_reset_all_clears_history() {
        let registry = Registry::new();
        let mock = Mock::builder().register(false).build();
        registry.register(&mock);
        mock.record("a", args![]).unwrap();

        assert_eq!(registry.reset_all(), 1);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_thread_scoped_sweep_skips_other_threads() {
        let registry = std::sync::Arc::new(Registry::new());
        let local = Mock::builder().register(false).build();
        registry.register(&local);
        local.record("a", args![]).unwrap();

        let remote = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                let mock = Mock::builder().register(false).build();
                registry.register(&mock);
                mock.record("b", args![]).unwrap();
                mock
            })
            .join()
            .unwrap()
        };

        assert_eq!(registry.reset_current_thread(), 1);
        assert_eq!(local.call_count(), 0);
        assert_eq!(remote.call_count(), 1);
    }

    #[test]
    fn test_default_teardown_scope() {
        assert_eq!(TeardownScope::default(), TeardownScope::Unstub);
        assert_eq!(Teardown::new(TeardownScope::All).scope(), TeardownScope::All);
    }
}
