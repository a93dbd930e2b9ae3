//! Mock configuration.

use serde_json::Value;

use super::Mock;
use crate::subject::{Patchable, Subject};

/// What a strict mock does with a call that no stub answers.
///
/// The policy is fixed per mock. Non-strict mocks always return the
/// default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Report [`Error::UnexpectedCall`](crate::Error::UnexpectedCall) to the caller.
    #[default]
    Fail,
    /// Answer with the mock's default value.
    ReturnDefault,
}

/// Settings shared by every mock a [`MockBuilder`] creates.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Request strict behaviour. Ignored for synthetic subjects.
    pub strict: bool,
    /// How strict mocks treat unanswered calls.
    pub unmatched: UnmatchedPolicy,
    /// Value returned for unanswered calls that are not failures.
    pub default_value: Value,
    /// Name used in diagnostics; defaults to the subject's name.
    pub name: Option<String>,
    /// Whether the mock joins the global registry.
    pub register: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            strict: true,
            unmatched: UnmatchedPolicy::Fail,
            default_value: Value::Null,
            name: None,
            register: true,
        }
    }
}

/// Builder for [`Mock`].
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Mock, Value};
/// use testkit_double::mock::UnmatchedPolicy;
/// use testkit_double::subject::DynObject;
///
/// let mock = Mock::builder()
///     .subject(DynObject::new("store"))
///     .strict(false)
///     .default_value(0)
///     .name("store double")
///     .build();
///
/// assert!(!mock.is_strict());
/// assert_eq!(mock.name(), "store double");
/// assert_eq!(mock.record("anything", args![]).unwrap(), Value::from(0));
/// ```
#[derive(Debug, Clone)]
pub struct MockBuilder {
    subject: Subject,
    config: MockConfig,
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuilder {
    /// Start a builder for a synthetic mock with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subject: Subject::Synthetic,
            config: MockConfig::default(),
        }
    }

    /// Wrap a real subject.
    #[must_use]
    pub fn subject<P: Patchable + 'static>(mut self, subject: P) -> Self {
        self.subject = Subject::real(subject);
        self
    }

    /// Wrap an already shared subject.
    #[must_use]
    pub fn subject_ref(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    /// Request strict or lenient behaviour.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Set the unanswered-call policy for strict mocks.
    #[must_use]
    pub fn unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.config.unmatched = policy;
        self
    }

    /// Set the value returned for unanswered calls.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.config.default_value = value.into();
        self
    }

    /// Set the diagnostic name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Choose whether the mock joins the global registry.
    #[must_use]
    pub fn register(mut self, register: bool) -> Self {
        self.config.register = register;
        self
    }

    /// Replace all settings at once.
    #[must_use]
    pub fn config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the mock.
    #[must_use]
    pub fn build(self) -> Mock {
        Mock::from_parts(self.subject, self.config)
    }
}
