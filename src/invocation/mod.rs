//! Call records and the matching collaborator.
//!
//! This module holds everything the mock needs to describe and compare calls:
//!
//! - [`Args`] - positional and keyword arguments of one call
//! - [`Invocation`] - an immutable ledger entry for a recorded call
//! - [`ArgsPattern`] - decides whether a stub or verification accepts a call
//! - [`Times`] - call-count constraints used by verification
//! - [`matcher`] - value matchers that patterns are built from
//!
//! # Example
//!
//! ```rust
//! use testkit_double::args;
//! use testkit_double::invocation::{matcher::gt, ArgsPattern};
//!
//! let pattern = ArgsPattern::new().arg(gt(10)).any_rest();
//! assert!(pattern.matches(&args![11, "extra"]));
//! assert!(!pattern.matches(&args![3]));
//! ```

pub mod matcher;
mod pattern;
mod times;

use std::collections::BTreeMap;
use std::fmt;

pub use pattern::ArgsPattern;
pub use serde_json::Value;
pub use times::Times;

/// Build [`Args`] from positional values.
///
/// Each expression is converted with `Value::from`, so anything
/// `serde_json::Value` can be built from works here.
///
/// ```rust
/// use testkit_double::{args, Value};
///
/// let a = args![1, "two", true];
/// assert_eq!(a.positional()[1], Value::from("two"));
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::invocation::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::invocation::Args::from_values(::std::vec![$($crate::Value::from($value)),+])
    };
}

/// Arguments of a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
}

impl Args {
    /// Empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments made of the given positional values.
    #[must_use]
    pub fn from_values(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keyword: BTreeMap::new(),
        }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Positional arguments in call order.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments by name.
    #[must_use]
    pub fn keyword(&self) -> &BTreeMap<String, Value> {
        &self.keyword
    }

    /// Total number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    /// Whether the call had no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Drop the first positional argument, returning it.
    ///
    /// Used by patch shims to remove an implicit receiver.
    pub(crate) fn shift(&mut self) -> Option<Value> {
        if self.positional.is_empty() {
            None
        } else {
            Some(self.positional.remove(0))
        }
    }

    /// Insert a value in front of the positional arguments.
    pub(crate) fn unshift(&mut self, value: Value) {
        self.positional.insert(0, value);
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .positional
            .iter()
            .map(ToString::to_string)
            .chain(self.keyword.iter().map(|(k, v)| format!("{k}={v}")))
            .collect();
        write!(f, "({})", rendered.join(", "))
    }
}

impl From<Vec<Value>> for Args {
    fn from(positional: Vec<Value>) -> Self {
        Self::from_values(positional)
    }
}

/// Identity of a mock, used to tag the ledger entries it records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockId(pub(crate) u64);

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock#{}", self.0)
    }
}

/// One observed call, as recorded in a mock's history.
///
/// Entries are immutable once recorded; the mock hands out clones.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    seq: u64,
    member: String,
    args: Args,
    owner: MockId,
}

impl Invocation {
    pub(crate) fn new(seq: u64, member: impl Into<String>, args: Args, owner: MockId) -> Self {
        Self {
            seq,
            member: member.into(),
            args,
            owner,
        }
    }

    /// Position of this call in its mock's lifetime, starting at zero.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Name of the called member.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Arguments of the call.
    #[must_use]
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// The mock that recorded this call.
    #[must_use]
    pub fn owner(&self) -> MockId {
        self.owner
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.member, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro() {
        let a = args![1, "x", 2.5];
        assert_eq!(a.len(), 3);
        assert_eq!(a.positional()[0], Value::from(1));
        assert_eq!(a.positional()[1], Value::from("x"));
        assert!(args![].is_empty());
    }

    #[test]
    fn test_args_keyword() {
        let a = Args::new().arg(1).kwarg("key", "v");
        assert_eq!(a.len(), 2);
        assert_eq!(a.keyword().get("key"), Some(&Value::from("v")));
    }

    #[test]
    fn test_args_display() {
        let a = args![1, "x"].kwarg("k", true);
        assert_eq!(a.to_string(), "(1, \"x\", k=true)");
        assert_eq!(Args::new().to_string(), "()");
    }

    #[test]
    fn test_args_shift_and_unshift() {
        let mut a = args![1, 2];
        a.unshift(Value::from("recv"));
        assert_eq!(a.shift(), Some(Value::from("recv")));
        assert_eq!(a, args![1, 2]);

        let mut empty = Args::new();
        assert_eq!(empty.shift(), None);
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new(0, "foo", args![1], MockId(7));
        assert_eq!(inv.to_string(), "foo(1)");
        assert_eq!(inv.owner(), MockId(7));
        assert_eq!(inv.owner().to_string(), "mock#7");
    }
}
