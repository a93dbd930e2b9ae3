//! Error definitions
//!
//! This module provides the error taxonomy of testkit-double: usage errors,
//! unexpected calls, verification failures and errors raised by stubs.

use thiserror::Error;

use crate::invocation::{Args, Invocation};
use crate::mock::{Mode, VerificationFailure};

/// Main error type for testkit-double
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A mode was entered while the mock was busy with another one.
    #[error("cannot enter {requested} mode while the mock is {current}")]
    ModeConflict {
        /// Mode the mock was in.
        current: Mode,
        /// Mode that was requested.
        requested: Mode,
    },

    /// A strict subject has no member with the given name.
    #[error("{subject} has no member named `{member}`")]
    MissingMember {
        /// Name of the subject.
        subject: String,
        /// Member that was looked up.
        member: String,
    },

    /// A strict mock received a call that no stub answers.
    #[error("unexpected call: {member}{args}")]
    UnexpectedCall {
        /// Member that was called.
        member: String,
        /// Arguments of the call.
        args: Args,
    },

    /// A verification did not observe the expected number of calls.
    #[error(transparent)]
    Verification(Box<VerificationFailure>),

    /// A stub was configured to raise this error.
    #[error("{member} raised: {message}")]
    Raised {
        /// Member whose stub raised.
        member: String,
        /// Configured message.
        message: String,
    },

    /// A patched member was called after its mock was dropped.
    #[error("`{member}` is patched by a mock that no longer exists")]
    Detached {
        /// Member that was called.
        member: String,
    },

    /// Stub usage expectations were not met.
    #[error("unmet expectation: {0}")]
    Expectation(String),

    /// Calls were recorded that no verification accounted for.
    #[error("{} unverified call(s): {}", .0.len(), render_calls(.0))]
    Unverified(Vec<Invocation>),
}

fn render_calls(calls: &[Invocation]) -> String {
    calls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a raised error, as a stub answer or a real binding would.
    #[must_use]
    pub fn raised(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            member: member.into(),
            message: message.into(),
        }
    }

    /// Returns the verification failure carried by this error, if any.
    #[must_use]
    pub fn as_verification(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Verification(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether this error reports misuse of the mock rather than a test outcome.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::ModeConflict { .. } | Self::MissingMember { .. })
    }
}

impl From<VerificationFailure> for Error {
    fn from(failure: VerificationFailure) -> Self {
        Self::Verification(Box::new(failure))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
