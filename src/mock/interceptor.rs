//! The three handlers a mock returns for a member lookup.

use serde_json::Value;

use super::{Mock, Mode, StubConfigurator};
use crate::error::Result;
use crate::invocation::{Args, ArgsPattern};

/// Handler for one member, selected by the mock's mode at lookup time.
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Mock, Value};
/// use testkit_double::mock::{Interceptor, Mode, Outcome};
///
/// let mock = Mock::new();
///
/// mock.begin_stub().unwrap();
/// let stub = mock.member("size");
/// assert_eq!(stub.mode(), Mode::Stubbing);
/// if let Outcome::Stubbed(config) = stub.invoke(args![]).unwrap() {
///     config.then_return(3);
/// }
///
/// let outcome = mock.member("size").invoke(args![]).unwrap();
/// assert_eq!(outcome.into_value(), Some(Value::from(3)));
/// ```
#[derive(Debug, Clone)]
pub enum Interceptor {
    /// Records calls and answers them.
    Record(RecordInterceptor),
    /// Registers a stub.
    Stub(StubInterceptor),
    /// Verifies recorded calls.
    Verify(VerifyInterceptor),
}

impl Interceptor {
    pub(crate) fn for_mode(mode: Mode, mock: Mock, member: &str) -> Self {
        match mode {
            Mode::Normal => Self::Record(RecordInterceptor::new(mock, member)),
            Mode::Stubbing => Self::Stub(StubInterceptor::new(mock, member)),
            Mode::Verifying => Self::Verify(VerifyInterceptor::new(mock, member)),
        }
    }

    /// The member this interceptor handles.
    #[must_use]
    pub fn member(&self) -> &str {
        match self {
            Self::Record(i) => &i.member,
            Self::Stub(i) => &i.member,
            Self::Verify(i) => &i.member,
        }
    }

    /// The mode this interceptor acts for.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Record(_) => Mode::Normal,
            Self::Stub(_) => Mode::Stubbing,
            Self::Verify(_) => Mode::Verifying,
        }
    }

    /// Perform the mode's action for a call with `args`.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying interceptor.
    pub fn invoke(self, args: Args) -> Result<Outcome> {
        match self {
            Self::Record(i) => i.invoke(args).map(Outcome::Returned),
            Self::Stub(i) => i.invoke(args).map(Outcome::Stubbed),
            Self::Verify(i) => i.invoke(args).map(Outcome::Verified),
        }
    }
}

/// Result of invoking an [`Interceptor`].
#[derive(Debug)]
pub enum Outcome {
    /// A recorded call's answer.
    Returned(Value),
    /// A stub was registered.
    Stubbed(StubConfigurator),
    /// A verification passed with this many matching calls.
    Verified(usize),
}

impl Outcome {
    /// The answer of a recorded call.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Returned(value) => Some(value),
            _ => None,
        }
    }

    /// The configurator of a registered stub.
    #[must_use]
    pub fn into_stub(self) -> Option<StubConfigurator> {
        match self {
            Self::Stubbed(config) => Some(config),
            _ => None,
        }
    }

    /// The match count of a passed verification.
    #[must_use]
    pub fn verified_count(&self) -> Option<usize> {
        match self {
            Self::Verified(count) => Some(*count),
            _ => None,
        }
    }
}

/// Records calls to a member and answers them from the stubs.
#[derive(Debug, Clone)]
pub struct RecordInterceptor {
    mock: Mock,
    member: String,
}

impl RecordInterceptor {
    pub(crate) fn new(mock: Mock, member: &str) -> Self {
        Self {
            mock,
            member: member.to_string(),
        }
    }

    /// Record a call and return its answer.
    ///
    /// # Errors
    ///
    /// See [`Mock::record`].
    pub fn invoke(&self, args: Args) -> Result<Value> {
        self.mock.record(&self.member, args)
    }
}

/// Registers a stub for a member.
#[derive(Debug, Clone)]
pub struct StubInterceptor {
    mock: Mock,
    member: String,
}

impl StubInterceptor {
    pub(crate) fn new(mock: Mock, member: &str) -> Self {
        Self {
            mock,
            member: member.to_string(),
        }
    }

    /// Stub calls whose arguments equal `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeConflict`](crate::Error::ModeConflict) if the mock
    /// left stubbing mode since this interceptor was created, and
    /// [`Error::MissingMember`](crate::Error::MissingMember) if a strict
    /// subject lacks the member.
    pub fn invoke(self, args: Args) -> Result<StubConfigurator> {
        self.invoke_matching(ArgsPattern::from(args))
    }

    /// Stub calls whose arguments match `pattern`.
    ///
    /// # Errors
    ///
    /// Same as [`StubInterceptor::invoke`].
    pub fn invoke_matching(self, pattern: ArgsPattern) -> Result<StubConfigurator> {
        self.mock.register_stub(&self.member, pattern)
    }

    /// Stub every call of the member.
    ///
    /// # Errors
    ///
    /// Same as [`StubInterceptor::invoke`].
    pub fn with_any_args(self) -> Result<StubConfigurator> {
        self.invoke_matching(ArgsPattern::any())
    }
}

/// Verifies recorded calls of a member.
#[derive(Debug, Clone)]
pub struct VerifyInterceptor {
    mock: Mock,
    member: String,
}

impl VerifyInterceptor {
    pub(crate) fn new(mock: Mock, member: &str) -> Self {
        Self {
            mock,
            member: member.to_string(),
        }
    }

    /// Count calls with exactly `args` against the pending constraint.
    ///
    /// Returns the number of matching calls when the constraint holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`](crate::Error::Verification) when the
    /// count does not satisfy the constraint, plus the usage errors of
    /// [`StubInterceptor::invoke`].
    pub fn invoke(self, args: Args) -> Result<usize> {
        self.invoke_matching(ArgsPattern::from(args))
    }

    /// Count calls whose arguments match `pattern`.
    ///
    /// # Errors
    ///
    /// Same as [`VerifyInterceptor::invoke`].
    pub fn invoke_matching(self, pattern: ArgsPattern) -> Result<usize> {
        self.mock.run_verification(&self.member, &pattern)
    }
}
