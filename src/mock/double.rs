//! `Mock` and its state machine.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::config::{MockBuilder, MockConfig, UnmatchedPolicy};
use super::interceptor::{Interceptor, Outcome, StubInterceptor};
use super::stub::{StubConfigurator, StubEntry};
use super::verify::{Verification, VerificationFailure};
use super::Mode;
use crate::error::{Error, Result};
use crate::invocation::{Args, ArgsPattern, Invocation, MockId, Times};
use crate::registry::Registry;
use crate::subject::{Dispatch, Forward, Patchable, PatchStack, Subject};

static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1);

/// A test double that records, stubs and verifies calls.
///
/// `Mock` is a handle: clones share the same state. A mock either stands
/// alone with a synthetic subject ([`Mock::new`]) or wraps a real
/// [`Patchable`] subject ([`Mock::of`]). Stubbing a member of a real subject
/// replaces that member on the subject until [`Mock::unstub`].
///
/// A mock supports one in-flight stub or verification at a time and is
/// meant to be driven from a single test thread. Dropping the last handle
/// restores anything still patched.
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Mock, Value};
/// use testkit_double::subject::{Binding, DynObject};
///
/// let real = DynObject::new("real").with_method("bar", Binding::free(|_| Ok(Value::from(1))));
/// let mock = Mock::of(real.clone());
///
/// mock.when("bar").unwrap().invoke(args![]).unwrap().then_return(99);
/// assert_eq!(real.invoke("bar", args![]).unwrap(), Value::from(99));
///
/// mock.unstub();
/// assert_eq!(real.invoke("bar", args![]).unwrap(), Value::from(1));
/// ```
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

pub(crate) struct MockInner {
    id: MockId,
    name: String,
    subject: Subject,
    strict: bool,
    unmatched: UnmatchedPolicy,
    default_value: Value,
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    mode: Mode,
    /// Constraint stashed by `begin_verify`, consumed by the next verification.
    pending: Option<Times>,
    /// Newest first.
    history: VecDeque<Invocation>,
    /// Newest first; the first accepting entry answers.
    stubs: VecDeque<StubEntry>,
    patches: PatchStack,
    verified: HashSet<u64>,
    next_seq: u64,
    next_stub: u64,
}

impl Drop for MockInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.patches.is_empty() {
            tracing::debug!(mock = %self.id, "mock dropped while stubbed, restoring subject");
            state.patches.restore_all(&self.subject);
        }
    }
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl Mock {
    /// Create a non-strict mock with a synthetic subject.
    #[must_use]
    pub fn new() -> Self {
        MockBuilder::new().build()
    }

    /// Create a strict mock wrapping a real subject.
    #[must_use]
    pub fn of<P: Patchable + 'static>(subject: P) -> Self {
        MockBuilder::new().subject(subject).build()
    }

    /// Start configuring a mock.
    #[must_use]
    pub fn builder() -> MockBuilder {
        MockBuilder::new()
    }

    pub(crate) fn from_parts(subject: Subject, config: MockConfig) -> Self {
        let id = MockId(NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed));
        let strict = config.strict && subject.is_real();
        if config.strict && !strict {
            tracing::trace!(mock = %id, "strict mode ignored for synthetic subject");
        }
        let name = match (config.name, &subject) {
            (Some(name), _) => name,
            (None, Subject::Real(real)) => real.name(),
            (None, Subject::Synthetic) => id.to_string(),
        };
        let mock = Self {
            inner: Arc::new(MockInner {
                id,
                name,
                subject,
                strict,
                unmatched: config.unmatched,
                default_value: config.default_value,
                state: Mutex::new(MockState::default()),
            }),
        };
        if config.register {
            Registry::global().register(&mock);
        }
        tracing::debug!(mock = %mock.inner.id, name = %mock.inner.name, strict, "created mock");
        mock
    }

    pub(crate) fn from_inner(inner: Arc<MockInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<MockInner> {
        Arc::downgrade(&self.inner)
    }

    /// Identity of this mock.
    #[must_use]
    pub fn id(&self) -> MockId {
        self.inner.id
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the mock is strict.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.inner.strict
    }

    /// The subject this mock stands in for.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.inner.subject
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.state.lock().mode
    }

    // -------------------------------------------------------------------------
    // Mode transitions
    // -------------------------------------------------------------------------

    /// Enter stubbing mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`] unless the mock is in normal mode.
    pub fn begin_stub(&self) -> Result<()> {
        self.transition(Mode::Stubbing, None)
    }

    /// Enter verifying mode, stashing `times` for the next verification.
    ///
    /// Without a constraint the verification expects exactly one call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`] unless the mock is in normal mode.
    pub fn begin_verify(&self, times: Option<Times>) -> Result<()> {
        self.transition(Mode::Verifying, times)
    }

    fn transition(&self, requested: Mode, pending: Option<Times>) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.mode != Mode::Normal {
            return Err(Error::ModeConflict {
                current: state.mode,
                requested,
            });
        }
        state.mode = requested;
        state.pending = pending;
        tracing::trace!(mock = %self.inner.id, mode = %requested, "entered mode");
        Ok(())
    }

    /// Abandon an unfinished stub or verification and return to normal mode.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.mode = Mode::Normal;
        state.pending = None;
    }

    pub(crate) fn set_pending(&self, times: Times) {
        self.inner.state.lock().pending = Some(times);
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// The interceptor for `member` in the current mode. Never fails.
    #[must_use]
    pub fn member(&self, member: &str) -> Interceptor {
        Interceptor::for_mode(self.mode(), self.clone(), member)
    }

    /// Dispatch a call of `member` with `args` according to the current mode.
    ///
    /// # Errors
    ///
    /// Propagates the error of the selected interceptor.
    pub fn call(&self, member: &str, args: Args) -> Result<Outcome> {
        self.member(member).invoke(args)
    }

    /// Enter stubbing mode and return the stub interceptor for `member`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`] unless the mock is in normal mode.
    pub fn when(&self, member: &str) -> Result<StubInterceptor> {
        self.begin_stub()?;
        Ok(StubInterceptor::new(self.clone(), member))
    }

    /// Enter verifying mode expecting exactly one matching call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`] unless the mock is in normal mode.
    pub fn verify(&self) -> Result<Verification> {
        self.begin_verify(None)?;
        Ok(Verification::new(self.clone()))
    }

    /// Enter verifying mode with the given constraint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`] unless the mock is in normal mode.
    pub fn verify_times(&self, times: Times) -> Result<Verification> {
        self.begin_verify(Some(times))?;
        Ok(Verification::new(self.clone()))
    }

    /// Record a call of `member` and answer it, whatever the current mode.
    ///
    /// The call is logged first; then the most recently registered stub that
    /// accepts it supplies the answer. Unanswered calls return the default
    /// value, except on strict mocks with [`UnmatchedPolicy::Fail`].
    ///
    /// # Errors
    ///
    /// - [`Error::MissingMember`] if a strict subject lacks `member`; the call
    ///   is not recorded.
    /// - [`Error::UnexpectedCall`] for an unanswered call on a failing strict mock.
    /// - Whatever the matching stub raises.
    pub fn record(&self, member: &str, args: Args) -> Result<Value> {
        self.ensure_member(member)?;

        let candidates: Vec<(u64, Arc<ArgsPattern>)> = {
            let mut state = self.inner.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state
                .history
                .push_front(Invocation::new(seq, member, args.clone(), self.inner.id));
            state
                .stubs
                .iter()
                .filter_map(|stub| stub.candidate(member))
                .collect()
        };

        // Matchers are user code and may read this mock, so they run unlocked.
        let answer = candidates
            .into_iter()
            .find(|(_, pattern)| pattern.matches(&args))
            .and_then(|(id, _)| {
                let mut state = self.inner.state.lock();
                state
                    .stubs
                    .iter_mut()
                    .find(|stub| stub.id == id)
                    .map(StubEntry::next_answer)
            });

        match answer {
            Some(answer) => {
                tracing::trace!(mock = %self.inner.id, member, %args, "answered call");
                answer.resolve(member, &args)
            }
            None if self.inner.strict && self.inner.unmatched == UnmatchedPolicy::Fail => {
                tracing::warn!(mock = %self.inner.id, member, %args, "unexpected call");
                Err(Error::UnexpectedCall {
                    member: member.to_string(),
                    args,
                })
            }
            None => {
                tracing::trace!(mock = %self.inner.id, member, %args, "unanswered call");
                Ok(self.inner.default_value.clone())
            }
        }
    }

    fn ensure_member(&self, member: &str) -> Result<()> {
        if self.inner.strict && !self.inner.subject.has_member(member) {
            return Err(Error::MissingMember {
                subject: self.inner.subject.name(),
                member: member.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn register_stub(&self, member: &str, pattern: ArgsPattern) -> Result<StubConfigurator> {
        let forward = self.forwarder();
        let id = {
            let mut state = self.inner.state.lock();
            if state.mode != Mode::Stubbing {
                return Err(Error::ModeConflict {
                    current: state.mode,
                    requested: Mode::Stubbing,
                });
            }
            state.mode = Mode::Normal;
            self.ensure_member(member)?;

            if self.inner.subject.is_real() {
                state.patches.patch(&self.inner.subject, member, forward);
            }
            let id = state.next_stub;
            state.next_stub += 1;
            tracing::debug!(mock = %self.inner.id, member, %pattern, "registered stub");
            state.stubs.push_front(StubEntry::new(id, member, pattern));
            id
        };
        Ok(StubConfigurator::new(self.clone(), id))
    }

    pub(crate) fn run_verification(&self, member: &str, pattern: &ArgsPattern) -> Result<usize> {
        let (expected, calls) = {
            let mut state = self.inner.state.lock();
            if state.mode != Mode::Verifying {
                return Err(Error::ModeConflict {
                    current: state.mode,
                    requested: Mode::Verifying,
                });
            }
            state.mode = Mode::Normal;
            let expected = state.pending.take().unwrap_or_default();
            let calls: Vec<Invocation> = state
                .history
                .iter()
                .filter(|call| call.member() == member)
                .cloned()
                .collect();
            (expected, calls)
        };
        self.ensure_member(member)?;

        let (matching, near_misses): (Vec<Invocation>, Vec<Invocation>) = calls
            .into_iter()
            .partition(|call| pattern.matches(call.args()));
        let actual = matching.len();

        if !expected.is_satisfied_by(actual) {
            let failure = VerificationFailure {
                member: member.to_string(),
                wanted: pattern.describe(),
                expected,
                actual,
                near_misses,
            };
            tracing::debug!(mock = %self.inner.id, %failure, "verification failed");
            return Err(failure.into());
        }

        self.inner
            .state
            .lock()
            .verified
            .extend(matching.iter().map(Invocation::seq));
        Ok(actual)
    }

    /// Patch shim target: records through this mock while it is alive.
    fn forwarder(&self) -> Forward {
        let weak = self.downgrade();
        Arc::new(move |member: &str, args: Args| match weak.upgrade() {
            Some(inner) => Mock::from_inner(inner).record(member, args),
            None => Err(Error::Detached {
                member: member.to_string(),
            }),
        })
    }

    pub(crate) fn with_stub(&self, stub_id: u64, update: impl FnOnce(&mut StubEntry)) {
        let mut state = self.inner.state.lock();
        match state.stubs.iter_mut().find(|stub| stub.id == stub_id) {
            Some(entry) => update(entry),
            None => tracing::warn!(mock = %self.inner.id, stub_id, "stub no longer exists"),
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Recorded calls, newest first.
    #[must_use]
    pub fn history(&self) -> Vec<Invocation> {
        self.inner.state.lock().history.iter().cloned().collect()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.state.lock().history.len()
    }

    /// Recorded calls of `member`, newest first.
    #[must_use]
    pub fn calls_to(&self, member: &str) -> Vec<Invocation> {
        self.inner
            .state
            .lock()
            .history
            .iter()
            .filter(|call| call.member() == member)
            .cloned()
            .collect()
    }

    /// Number of registered stubs.
    #[must_use]
    pub fn stub_count(&self) -> usize {
        self.inner.state.lock().stubs.len()
    }

    /// Members currently patched on the subject, in installation order.
    #[must_use]
    pub fn patched_members(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .patches
            .entries()
            .iter()
            .map(|entry| entry.member().to_string())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Whole-mock checks
    // -------------------------------------------------------------------------

    /// Check that the mock was never called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unverified`] listing every recorded call.
    pub fn verify_zero_interactions(&self) -> Result<()> {
        let calls = self.history();
        if calls.is_empty() {
            Ok(())
        } else {
            Err(Error::Unverified(calls))
        }
    }

    /// Check that every recorded call was matched by a passed verification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unverified`] listing the calls nothing verified.
    pub fn verify_no_more_interactions(&self) -> Result<()> {
        let state = self.inner.state.lock();
        let unverified: Vec<Invocation> = state
            .history
            .iter()
            .filter(|call| !state.verified.contains(&call.seq()))
            .cloned()
            .collect();
        if unverified.is_empty() {
            Ok(())
        } else {
            Err(Error::Unverified(unverified))
        }
    }

    /// Check the usage expectations set with [`StubConfigurator::times`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Expectation`] describing every unmet expectation.
    pub fn verify_expectations(&self) -> Result<()> {
        let state = self.inner.state.lock();
        let unmet: Vec<String> = state
            .stubs
            .iter()
            .filter_map(StubEntry::unmet_expectation)
            .collect();
        if unmet.is_empty() {
            Ok(())
        } else {
            Err(Error::Expectation(unmet.join("; ")))
        }
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Forget recorded calls and any unfinished stub or verification.
    ///
    /// Stubs and patches are kept.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.history.clear();
        state.verified.clear();
        state.pending = None;
        state.mode = Mode::Normal;
        tracing::trace!(mock = %self.inner.id, "reset history");
    }

    /// Restore every patched member of the subject and drop all stubs.
    ///
    /// Safe to call repeatedly; later calls do nothing.
    pub fn unstub(&self) {
        let mut state = self.inner.state.lock();
        let restored = state.patches.restore_all(&self.inner.subject);
        state.stubs.clear();
        if restored > 0 {
            tracing::debug!(mock = %self.inner.id, restored, "unstubbed");
        }
    }

    /// Unstub this mock when the returned guard is dropped.
    #[must_use = "the mock is unstubbed as soon as the guard is dropped"]
    pub fn guard(&self) -> UnstubGuard {
        UnstubGuard { mock: self.clone() }
    }
}

impl Dispatch for Mock {
    fn dispatch(&self, member: &str, args: Args) -> Result<Value> {
        self.record(member, args)
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Mock")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("subject", &self.inner.subject)
            .field("strict", &self.inner.strict)
            .field("mode", &state.mode)
            .field("calls", &state.history.len())
            .field("stubs", &state.stubs.len())
            .field("patches", &state.patches.len())
            .finish()
    }
}

/// Unstubs its mock on drop, including during unwinding.
#[derive(Debug)]
pub struct UnstubGuard {
    mock: Mock,
}

impl Drop for UnstubGuard {
    fn drop(&mut self) {
        self.mock.unstub();
    }
}
