//! Mocks that record, stub and verify calls.
//!
//! A [`Mock`] is always in exactly one [`Mode`]. Looking up a member with
//! [`Mock::member`] hands back an [`Interceptor`] chosen by that mode:
//!
//! - [`Mode::Normal`] gives a [`RecordInterceptor`] that logs the call and
//!   answers it from the configured stubs.
//! - [`Mode::Stubbing`] gives a [`StubInterceptor`] that registers a stub
//!   and returns a [`StubConfigurator`].
//! - [`Mode::Verifying`] gives a [`VerifyInterceptor`] that counts matching
//!   calls against a [`Times`](crate::invocation::Times) constraint.
//!
//! Both configuring interceptors return the mock to `Normal` when invoked.
//!
//! # Stubbing
//!
//! ```rust
//! use testkit_double::{args, Mock, Value};
//!
//! let mock = Mock::new();
//! mock.when("foo").unwrap().invoke(args![1]).unwrap().then_return("x");
//!
//! assert_eq!(mock.record("foo", args![1]).unwrap(), Value::from("x"));
//! assert_eq!(mock.record("foo", args![2]).unwrap(), Value::Null);
//! assert_eq!(mock.history().len(), 2);
//! ```
//!
//! # Verification
//!
//! ```rust
//! use testkit_double::{args, Mock};
//! use testkit_double::invocation::Times;
//!
//! let mock = Mock::new();
//! mock.record("save", args!["a"]).unwrap();
//!
//! assert!(mock.verify().unwrap().called("save", args!["a"]).is_ok());
//! let failure = mock.verify_times(Times::once()).unwrap().called("save", args!["b"]).unwrap_err();
//! assert_eq!(failure.as_verification().unwrap().actual, 0);
//! ```

mod config;
mod double;
mod interceptor;
mod stub;
mod verify;

use std::fmt;

pub use config::{MockBuilder, MockConfig, UnmatchedPolicy};
pub use double::{Mock, UnstubGuard};
pub(crate) use double::MockInner;
pub use interceptor::{Interceptor, Outcome, RecordInterceptor, StubInterceptor, VerifyInterceptor};
pub use stub::StubConfigurator;
pub use verify::{Verification, VerificationFailure};

/// The dispatch mode of a mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Calls are recorded and answered.
    #[default]
    Normal,
    /// The next invoked member registers a stub.
    Stubbing,
    /// The next invoked member is verified.
    Verifying,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Stubbing => "stubbing",
            Self::Verifying => "verifying",
        })
    }
}
