//! Stub entries and the configurator returned when one is registered.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Mock;
use crate::error::{Error, Result};
use crate::invocation::{Args, ArgsPattern, Times};

type AnswerFn = Arc<dyn Fn(&Args) -> Result<Value> + Send + Sync>;

/// One configured response.
#[derive(Clone)]
pub(crate) enum Answer {
    Return(Value),
    Raise(String),
    Compute(AnswerFn),
}

impl Answer {
    pub(crate) fn resolve(self, member: &str, args: &Args) -> Result<Value> {
        match self {
            Self::Return(value) => Ok(value),
            Self::Raise(message) => Err(Error::raised(member, message)),
            Self::Compute(answer) => answer(args),
        }
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return(value) => f.debug_tuple("Return").field(value).finish(),
            Self::Raise(message) => f.debug_tuple("Raise").field(message).finish(),
            Self::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// A stub: which calls it accepts and how it answers them.
///
/// Answers are handed out in order; once the last one is reached it repeats.
#[derive(Debug)]
pub(crate) struct StubEntry {
    pub(crate) id: u64,
    pub(crate) member: String,
    pub(crate) pattern: Arc<ArgsPattern>,
    answers: Vec<Answer>,
    cursor: usize,
    pub(crate) uses: usize,
    pub(crate) expected: Option<Times>,
}

impl StubEntry {
    pub(crate) fn new(id: u64, member: impl Into<String>, pattern: ArgsPattern) -> Self {
        Self {
            id,
            member: member.into(),
            pattern: Arc::new(pattern),
            answers: Vec::new(),
            cursor: 0,
            uses: 0,
            expected: None,
        }
    }

    /// The id and pattern to try for a call of `member`, if this stub covers it.
    pub(crate) fn candidate(&self, member: &str) -> Option<(u64, Arc<ArgsPattern>)> {
        (self.member == member).then(|| (self.id, Arc::clone(&self.pattern)))
    }

    pub(crate) fn push_answer(&mut self, answer: Answer) {
        self.answers.push(answer);
    }

    /// Take the answer for the next call. A stub without answers returns `null`.
    pub(crate) fn next_answer(&mut self) -> Answer {
        self.uses += 1;
        let Some(last) = self.answers.len().checked_sub(1) else {
            return Answer::Return(Value::Null);
        };
        let answer = self.answers[self.cursor.min(last)].clone();
        if self.cursor < last {
            self.cursor += 1;
        }
        answer
    }

    /// Describe an unmet usage expectation, if any.
    pub(crate) fn unmet_expectation(&self) -> Option<String> {
        let expected = self.expected?;
        if expected.is_satisfied_by(self.uses) {
            None
        } else {
            Some(format!(
                "stub {}{} expected to be used {expected}, but was used {} time(s)",
                self.member, self.pattern, self.uses
            ))
        }
    }
}

/// Chains answers and expectations onto a freshly registered stub.
///
/// Every call appends to the same stub; successive answers are used for
/// successive calls and the last one repeats.
///
/// # Example
///
/// ```rust
/// use testkit_double::{args, Mock, Value};
///
/// let mock = Mock::new();
/// mock.when("next").unwrap().invoke(args![]).unwrap()
///     .then_return(1)
///     .then_return(2)
///     .then_raise("exhausted");
///
/// assert_eq!(mock.record("next", args![]).unwrap(), Value::from(1));
/// assert_eq!(mock.record("next", args![]).unwrap(), Value::from(2));
/// assert!(mock.record("next", args![]).is_err());
/// assert!(mock.record("next", args![]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StubConfigurator {
    mock: Mock,
    stub_id: u64,
}

impl StubConfigurator {
    pub(crate) fn new(mock: Mock, stub_id: u64) -> Self {
        Self { mock, stub_id }
    }

    /// Answer with `value`.
    #[allow(clippy::return_self_not_must_use)]
    pub fn then_return(self, value: impl Into<Value>) -> Self {
        self.push(Answer::Return(value.into()));
        self
    }

    /// Answer with [`Error::Raised`] carrying `message`.
    #[allow(clippy::return_self_not_must_use)]
    pub fn then_raise(self, message: impl Into<String>) -> Self {
        self.push(Answer::Raise(message.into()));
        self
    }

    /// Answer by running `answer` on the call's arguments.
    ///
    /// The closure runs without the mock locked, so it may call back into
    /// the mock.
    #[allow(clippy::return_self_not_must_use)]
    pub fn then_answer<F>(self, answer: F) -> Self
    where
        F: Fn(&Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.push(Answer::Compute(Arc::new(answer)));
        self
    }

    /// Expect this stub to be used `times`; checked by
    /// [`Mock::verify_expectations`].
    #[allow(clippy::return_self_not_must_use)]
    pub fn times(self, times: Times) -> Self {
        self.mock.with_stub(self.stub_id, |entry| entry.expected = Some(times));
        self
    }

    /// The mock this stub belongs to.
    #[must_use]
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    fn push(&self, answer: Answer) {
        self.mock.with_stub(self.stub_id, |entry| entry.push_answer(answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_entry_without_answers_returns_null() {
        let mut entry = StubEntry::new(0, "m", ArgsPattern::any());
        assert!(matches!(entry.next_answer(), Answer::Return(Value::Null)));
        assert_eq!(entry.uses, 1);
    }

    #[test]
    fn test_entry_answers_in_order_then_repeats_last() {
        let mut entry = StubEntry::new(0, "m", ArgsPattern::any());
        entry.push_answer(Answer::Return(Value::from(1)));
        entry.push_answer(Answer::Return(Value::from(2)));

        let seen: Vec<Value> = (0..4)
            .map(|_| entry.next_answer().resolve("m", &Args::new()).unwrap())
            .collect();
        let expected: Vec<Value> = vec![1.into(), 2.into(), 2.into(), 2.into()];
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_entry_candidate_by_member() {
        let entry = StubEntry::new(7, "m", ArgsPattern::from(args![1]));
        let (id, pattern) = entry.candidate("m").unwrap();
        assert_eq!(id, 7);
        assert!(pattern.matches(&args![1]));
        assert!(!pattern.matches(&args![2]));
        assert!(entry.candidate("n").is_none());
    }

    #[test]
    fn test_raise_answer() {
        let err = Answer::Raise("boom".into())
            .resolve("m", &Args::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "m raised: boom");
    }

    #[test]
    fn test_unmet_expectation() {
        let mut entry = StubEntry::new(0, "m", ArgsPattern::from(args![1]));
        assert!(entry.unmet_expectation().is_none());
        entry.expected = Some(Times::once());
        assert!(entry
            .unmet_expectation()
            .is_some_and(|msg| msg.contains("m(1)") && msg.contains("used 0 time")));
        entry.next_answer();
        assert!(entry.unmet_expectation().is_none());
    }
}
