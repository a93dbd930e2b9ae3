//! Verification builder and failure report.

use std::fmt;

use super::interceptor::VerifyInterceptor;
use super::Mock;
use crate::error::Result;
use crate::invocation::{Args, ArgsPattern, Invocation, Times};

/// A verification in progress, returned by [`Mock::verify`].
///
/// The mock stays in verifying mode until a member is checked.
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Mock};
///
/// let mock = Mock::new();
/// mock.record("ping", args![]).unwrap();
/// mock.record("ping", args![]).unwrap();
///
/// assert_eq!(mock.verify().unwrap().at_least(2).called("ping", args![]).unwrap(), 2);
/// assert!(mock.verify().unwrap().never().called("pong", args![]).is_ok());
/// ```
#[derive(Debug)]
pub struct Verification {
    mock: Mock,
}

impl Verification {
    pub(crate) fn new(mock: Mock) -> Self {
        Self { mock }
    }

    /// Replace the pending call-count constraint.
    #[must_use]
    pub fn times(self, times: Times) -> Self {
        self.mock.set_pending(times);
        self
    }

    /// Expect no matching calls.
    #[must_use]
    pub fn never(self) -> Self {
        self.times(Times::never())
    }

    /// Expect exactly one matching call.
    #[must_use]
    pub fn once(self) -> Self {
        self.times(Times::once())
    }

    /// Expect exactly `n` matching calls.
    #[must_use]
    pub fn exactly(self, n: usize) -> Self {
        self.times(Times::exactly(n))
    }

    /// Expect at least `n` matching calls.
    #[must_use]
    pub fn at_least(self, n: usize) -> Self {
        self.times(Times::at_least(n))
    }

    /// Expect at most `n` matching calls.
    #[must_use]
    pub fn at_most(self, n: usize) -> Self {
        self.times(Times::at_most(n))
    }

    /// The interceptor for `member`.
    #[must_use]
    pub fn member(self, member: &str) -> VerifyInterceptor {
        VerifyInterceptor::new(self.mock, member)
    }

    /// Check calls of `member` with exactly `args`.
    ///
    /// # Errors
    ///
    /// See [`VerifyInterceptor::invoke`].
    pub fn called(self, member: &str, args: Args) -> Result<usize> {
        self.member(member).invoke(args)
    }

    /// Check calls of `member` whose arguments match `pattern`.
    ///
    /// # Errors
    ///
    /// See [`VerifyInterceptor::invoke`].
    pub fn called_matching(self, member: &str, pattern: ArgsPattern) -> Result<usize> {
        self.member(member).invoke_matching(pattern)
    }
}

/// Why a verification failed.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationFailure {
    /// Verified member.
    pub member: String,
    /// Rendered argument pattern.
    pub wanted: String,
    /// The constraint that was not met.
    pub expected: Times,
    /// Number of matching calls observed.
    pub actual: usize,
    /// Calls to the same member whose arguments did not match, newest first.
    pub near_misses: Vec<Invocation>,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wanted {}{} {}, but it was called {} time(s)",
            self.member, self.wanted, self.expected, self.actual
        )?;
        if !self.near_misses.is_empty() {
            write!(f, "; other calls:")?;
            for call in &self.near_misses {
                write!(f, " {call}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for VerificationFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::invocation::MockId;

    #[test]
    fn test_failure_display() {
        let failure = VerificationFailure {
            member: "m".to_string(),
            wanted: "(1)".to_string(),
            expected: Times::once(),
            actual: 0,
            near_misses: vec![Invocation::new(0, "m", args![2], MockId(1))],
        };
        assert_eq!(
            failure.to_string(),
            "wanted m(1) exactly 1 time, but it was called 0 time(s); other calls: m(2)"
        );
    }

    #[test]
    fn test_failure_display_without_near_misses() {
        let failure = VerificationFailure {
            member: "m".to_string(),
            wanted: "()".to_string(),
            expected: Times::never(),
            actual: 2,
            near_misses: Vec::new(),
        };
        assert_eq!(failure.to_string(), "wanted m() never, but it was called 2 time(s)");
    }
}
